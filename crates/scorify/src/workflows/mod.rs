pub mod dataset;
pub mod lead_scoring;
