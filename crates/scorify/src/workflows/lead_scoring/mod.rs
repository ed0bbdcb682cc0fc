//! Idempotent batch scoring of (customer, campaign) pairs.
//!
//! A run joins campaigns to their owners, drops pairs that already carry a
//! score, scores the rest, and commits the new records in one transaction.
//! Running it again over unchanged data commits nothing.

pub mod dedup;
pub mod domain;
pub mod features;
pub mod macro_context;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod pairing;
pub mod persist;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod store;

#[cfg(test)]
mod tests;

pub use dedup::ExistingScoreIndex;
pub use domain::{
    summarize_labels, BatchId, BatchRun, Campaign, CampaignKey, Customer, CustomerKey,
    LabelSummary, MacroRecord, PairKey, PredictedLabel, RunResult, RunStatus, ScoreRecord,
};
pub use features::{FeaturePayload, FeatureValue, FEATURE_NAMES};
pub use macro_context::{MacroContext, MacroContextResolver};
pub use metrics::{MetricsEmitter, MetricsError, MetricsSink, PrometheusMetricsSink, RunMetrics};
pub use model::{LogisticModel, ModelLoadError};
pub use orchestrator::{BatchError, BatchInProgress, BatchOrchestrator, RunPhase};
pub use pairing::{CandidatePair, CandidatePairIndex};
pub use persist::{BatchPersister, PersistOutcome};
pub use repository::{RepositoryError, ScoreRepository};
pub use router::{batch_router, TriggerAuth};
pub use scoring::{InferenceError, ScoredPair, ScoringInvoker, ScoringModel};
pub use store::InMemoryScoreStore;
