use std::sync::Arc;

use super::domain::PredictedLabel;
use super::features::FeaturePayload;

/// Opaque probability model. Implementations must be deterministic for a
/// fixed input and free of side effects, since pairs may be scored from
/// several threads.
pub trait ScoringModel: Send + Sync {
    fn score(&self, features: &FeaturePayload) -> Result<f64, InferenceError>;
}

/// The model could not produce a usable probability.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("malformed feature '{feature}': {reason}")]
    MalformedInput { feature: String, reason: String },
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("model returned {0}, expected a probability in [0, 1]")]
    OutOfRange(f64),
}

/// Probability plus the label derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPair {
    pub score: f64,
    pub label: PredictedLabel,
}

/// Calls the model and applies the run's threshold.
#[derive(Clone)]
pub struct ScoringInvoker {
    model: Arc<dyn ScoringModel>,
    threshold: f64,
}

impl ScoringInvoker {
    pub fn new(model: Arc<dyn ScoringModel>, threshold: f64) -> Self {
        Self { model, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score(&self, features: &FeaturePayload) -> Result<ScoredPair, InferenceError> {
        let score = self.model.score(features)?;
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(InferenceError::OutOfRange(score));
        }

        Ok(ScoredPair {
            score,
            label: PredictedLabel::from_score(score, self.threshold),
        })
    }
}

impl std::fmt::Debug for ScoringInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringInvoker")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
