use super::domain::{BatchId, Campaign, Customer, MacroRecord, PairKey, ScoreRecord};

/// Storage abstraction so the pipeline can be exercised in isolation.
///
/// `commit_scores` is all-or-nothing: either every record becomes visible or
/// none does, and a record whose pair is already stored is a
/// [`RepositoryError::Conflict`].
pub trait ScoreRepository: Send + Sync {
    fn load_customers(&self) -> Result<Vec<Customer>, RepositoryError>;
    fn load_campaigns(&self) -> Result<Vec<Campaign>, RepositoryError>;
    fn load_macro_records(&self) -> Result<Vec<MacroRecord>, RepositoryError>;
    /// Every pair that already has a score, in one bulk read.
    fn load_scored_pairs(&self) -> Result<Vec<PairKey>, RepositoryError>;
    fn commit_scores(&self, records: Vec<ScoreRecord>) -> Result<usize, RepositoryError>;
    fn scores(&self, batch_id: Option<&BatchId>) -> Result<Vec<ScoreRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("score already recorded for pair {0}")]
    Conflict(PairKey),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("malformed data: {0}")]
    Malformed(String),
}
