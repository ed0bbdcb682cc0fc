use uuid::Uuid;

use super::domain::{BatchRun, PairKey, PredictedLabel, ScoreRecord};
use super::repository::{RepositoryError, ScoreRepository};
use super::scoring::ScoredPair;

/// How the persistence step ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    Committed(BatchRun),
    NoNewData(BatchRun),
}

impl PersistOutcome {
    pub fn batch(&self) -> &BatchRun {
        match self {
            Self::Committed(batch) | Self::NoNewData(batch) => batch,
        }
    }
}

/// Collects the run's new records and writes them in one transaction.
///
/// Nothing staged here is visible to anyone until [`BatchPersister::commit`]
/// succeeds; dropping the persister discards the whole batch.
#[derive(Debug)]
pub struct BatchPersister {
    batch: BatchRun,
    pending: Vec<ScoreRecord>,
}

impl BatchPersister {
    pub fn new(batch: BatchRun) -> Self {
        Self {
            batch,
            pending: Vec::new(),
        }
    }

    pub fn batch(&self) -> &BatchRun {
        &self.batch
    }

    pub fn pending(&self) -> &[ScoreRecord] {
        &self.pending
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.batch.skipped += count;
    }

    /// Builds the record for a scored pair. The label is recomputed from the
    /// batch threshold so every record of the run agrees with it.
    pub fn stage(&mut self, pair: PairKey, scored: ScoredPair) -> &ScoreRecord {
        let PairKey {
            customer_key,
            campaign_key,
        } = pair;
        let timestamp = self.batch.started_at;

        self.pending.push(ScoreRecord {
            id: Uuid::new_v4(),
            customer_key,
            campaign_key,
            predicted_label: PredictedLabel::from_score(scored.score, self.batch.threshold),
            score: scored.score,
            threshold: self.batch.threshold,
            model_version: self.batch.model_version.clone(),
            batch_id: self.batch.batch_id,
            created_at: timestamp,
            updated_at: timestamp,
        });

        let last = self.pending.len() - 1;
        &self.pending[last]
    }

    /// Empty batches report `NoNewData` without touching the repository.
    pub fn commit<R>(self, repository: &R) -> Result<PersistOutcome, RepositoryError>
    where
        R: ScoreRepository + ?Sized,
    {
        let Self { mut batch, pending } = self;

        if pending.is_empty() {
            return Ok(PersistOutcome::NoNewData(batch));
        }

        batch.created = repository.commit_scores(pending)?;
        Ok(PersistOutcome::Committed(batch))
    }
}
