use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{error, info, warn};

use super::dedup::ExistingScoreIndex;
use super::domain::{BatchId, BatchRun, PairKey, RunResult, RunStatus, ScoreRecord};
use super::features::FeaturePayload;
use super::macro_context::MacroContextResolver;
use super::metrics::{MetricsEmitter, MetricsSink, RunMetrics};
use super::pairing::{CandidatePair, CandidatePairIndex};
use super::persist::{BatchPersister, PersistOutcome};
use super::repository::{RepositoryError, ScoreRepository};
use super::scoring::{InferenceError, ScoredPair, ScoringInvoker, ScoringModel};
use crate::config::ScoringConfig;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Loading,
    Processing,
    Persisting,
    Success,
    NoNewData,
    Error,
    MetricsEmitted,
    Done,
}

impl RunPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Loading => "loading",
            Self::Processing => "processing",
            Self::Persisting => "persisting",
            Self::Success => "success",
            Self::NoNewData => "no_new_data",
            Self::Error => "error",
            Self::MetricsEmitted => "metrics_emitted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failures that end a run with `status: error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    #[error("failed to load {entity}: {source}")]
    Load {
        entity: &'static str,
        #[source]
        source: RepositoryError,
    },
    #[error("scoring failed for pair {pair}: {source}")]
    Inference {
        pair: PairKey,
        #[source]
        source: InferenceError,
    },
    #[error("commit failed: {0}")]
    Persistence(#[source] RepositoryError),
}

impl BatchError {
    fn load(entity: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| Self::Load { entity, source }
    }
}

/// Returned instead of running when another run holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a scoring batch is already running")]
pub struct BatchInProgress;

/// Sequences one scoring run end to end.
///
/// A single lock covers the whole run, so the dedup snapshot and the commit
/// of one run can never interleave with another's.
pub struct BatchOrchestrator<R, M: ?Sized> {
    repository: Arc<R>,
    invoker: ScoringInvoker,
    metrics: MetricsEmitter<M>,
    config: ScoringConfig,
    run_lock: Mutex<()>,
    last_result: Mutex<Option<RunResult>>,
}

impl<R, M> BatchOrchestrator<R, M>
where
    R: ScoreRepository + 'static,
    M: MetricsSink + ?Sized + 'static,
{
    pub fn new(
        repository: Arc<R>,
        model: Arc<dyn ScoringModel>,
        metrics: Arc<M>,
        config: ScoringConfig,
    ) -> Self {
        Self {
            repository,
            invoker: ScoringInvoker::new(model, config.threshold),
            metrics: MetricsEmitter::new(metrics),
            config,
            run_lock: Mutex::new(()),
            last_result: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Runs now, or reports [`BatchInProgress`] if a run is active.
    pub fn try_run_batch(&self) -> Result<RunResult, BatchInProgress> {
        let guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(BatchInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        Ok(self.run_exclusive(guard))
    }

    /// Waits for any active run to finish, then runs.
    pub fn run_batch(&self) -> RunResult {
        let guard = self
            .run_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.run_exclusive(guard)
    }

    /// Result of the most recent run.
    pub fn last_result(&self) -> Option<RunResult> {
        self.last_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn scores(&self, batch_id: Option<&BatchId>) -> Result<Vec<ScoreRecord>, RepositoryError> {
        self.repository.scores(batch_id)
    }

    // The guard is held until the result is recorded, and dropped on every
    // path out of this function.
    fn run_exclusive(&self, _guard: MutexGuard<'_, ()>) -> RunResult {
        let started = Instant::now();
        let batch = BatchRun::begin(self.config.model_version.clone(), self.config.threshold);
        let batch_id = batch.batch_id;
        let model_version = batch.model_version.clone();
        enter(batch_id, RunPhase::Init);

        let result = match self.execute(batch) {
            Ok(PersistOutcome::Committed(batch)) => {
                enter(batch_id, RunPhase::Success);
                info!(
                    %batch_id,
                    created = batch.created,
                    skipped = batch.skipped,
                    "scoring batch committed"
                );
                RunResult {
                    status: RunStatus::Success,
                    batch_id,
                    model_version,
                    created: batch.created,
                    skipped: batch.skipped,
                    message: None,
                }
            }
            Ok(PersistOutcome::NoNewData(batch)) => {
                enter(batch_id, RunPhase::NoNewData);
                info!(%batch_id, skipped = batch.skipped, "scoring batch found no new pairs");
                RunResult {
                    status: RunStatus::NoNewData,
                    batch_id,
                    model_version,
                    created: 0,
                    skipped: batch.skipped,
                    message: None,
                }
            }
            Err(err) => {
                enter(batch_id, RunPhase::Error);
                error!(%batch_id, error = %err, "scoring batch failed; nothing committed");
                RunResult {
                    status: RunStatus::Error,
                    batch_id,
                    model_version,
                    created: 0,
                    skipped: 0,
                    message: Some(err.to_string()),
                }
            }
        };

        let duration = started.elapsed();
        let accepted = self.metrics.emit_run(&RunMetrics {
            created: result.created,
            skipped: result.skipped,
            duration,
            errored: result.is_error(),
        });
        if accepted < 4 {
            warn!(%batch_id, accepted, "some run metrics were not delivered");
        }
        enter(batch_id, RunPhase::MetricsEmitted);

        *self
            .last_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(result.clone());

        info!(
            %batch_id,
            status = result.status.label(),
            duration_secs = duration.as_secs_f64(),
            "scoring batch finished"
        );
        enter(batch_id, RunPhase::Done);
        result
    }

    fn execute(&self, batch: BatchRun) -> Result<PersistOutcome, BatchError> {
        let batch_id = batch.batch_id;
        let mut persister = BatchPersister::new(batch);

        enter(batch_id, RunPhase::Loading);
        let repository = self.repository.as_ref();
        let customers = repository
            .load_customers()
            .map_err(BatchError::load("customers"))?;
        let campaigns = repository
            .load_campaigns()
            .map_err(BatchError::load("campaigns"))?;
        let macro_records = repository
            .load_macro_records()
            .map_err(BatchError::load("macro data"))?;
        let existing =
            ExistingScoreIndex::load(repository).map_err(BatchError::load("existing scores"))?;

        enter(batch_id, RunPhase::Processing);
        let resolver = MacroContextResolver::from_records(&macro_records);
        let index = CandidatePairIndex::build(&customers, &campaigns);
        info!(
            %batch_id,
            customers = customers.len(),
            campaigns = campaigns.len(),
            candidates = index.len(),
            orphaned = index.orphaned(),
            already_scored = existing.len(),
            "candidate pairs built"
        );

        let (fresh, skipped): (Vec<_>, Vec<_>) = index
            .into_pairs()
            .into_iter()
            .map(|pair| (pair.key(), pair))
            .partition(|(key, _)| !existing.contains(key));
        persister.record_skipped(skipped.len());

        for (key, scored) in self.score_pairs(fresh, &resolver)? {
            persister.stage(key, scored);
        }

        enter(batch_id, RunPhase::Persisting);
        persister
            .commit(repository)
            .map_err(BatchError::Persistence)
    }

    /// Fails on the first pair the model cannot score.
    fn score_pairs(
        &self,
        pairs: Vec<(PairKey, CandidatePair<'_>)>,
        resolver: &MacroContextResolver,
    ) -> Result<Vec<(PairKey, ScoredPair)>, BatchError> {
        let score_one = |(key, pair): (PairKey, CandidatePair<'_>)| {
            let context = resolver.resolve(pair.campaign.month.as_deref());
            let features = FeaturePayload::assemble(pair.customer, pair.campaign, &context);
            match self.invoker.score(&features) {
                Ok(scored) => Ok((key, scored)),
                Err(source) => Err(BatchError::Inference { pair: key, source }),
            }
        };

        if self.config.parallel {
            pairs.into_par_iter().map(score_one).collect()
        } else {
            pairs.into_iter().map(score_one).collect()
        }
    }
}

fn enter(batch_id: BatchId, phase: RunPhase) {
    info!(%batch_id, %phase, "scoring batch phase");
}
