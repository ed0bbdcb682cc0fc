use std::collections::HashSet;

use super::domain::PairKey;
use super::repository::{RepositoryError, ScoreRepository};

/// Snapshot of already-scored pairs taken at the start of a run.
///
/// Runs that commit after the snapshot is taken are invisible here; the
/// store's uniqueness constraint and the run lock cover that window.
#[derive(Debug, Clone, Default)]
pub struct ExistingScoreIndex {
    keys: HashSet<PairKey>,
}

impl ExistingScoreIndex {
    pub fn load<R>(repository: &R) -> Result<Self, RepositoryError>
    where
        R: ScoreRepository + ?Sized,
    {
        let keys = repository.load_scored_pairs()?;
        Ok(Self::from_keys(keys))
    }

    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = PairKey>,
    {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn contains(&self, pair: &PairKey) -> bool {
        self.keys.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
