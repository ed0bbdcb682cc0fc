//! Batch lead scoring with exactly-once persistence of every scored
//! (customer, campaign) pair.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
