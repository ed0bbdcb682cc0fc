use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

pub const LEADS_PROCESSED: &str = "leads_processed";
pub const LEADS_SKIPPED: &str = "leads_skipped";
pub const BATCH_DURATION_SECONDS: &str = "batch_duration_seconds";
pub const BATCH_ERRORS: &str = "batch_errors";

/// Outbound metrics hook (Prometheus, a cloud monitoring client, ...).
pub trait MetricsSink: Send + Sync {
    fn emit(&self, name: &str, value: f64) -> Result<(), MetricsError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics sink unavailable: {0}")]
    Unavailable(String),
    #[error("metric '{name}' rejected: {reason}")]
    Rejected { name: String, reason: String },
}

/// Figures reported once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunMetrics {
    pub created: usize,
    pub skipped: usize,
    pub duration: Duration,
    pub errored: bool,
}

/// Best-effort reporter: every metric is sent on its own and failures are
/// logged, never returned.
pub struct MetricsEmitter<M: ?Sized> {
    sink: Arc<M>,
}

impl<M: ?Sized> Clone for MetricsEmitter<M> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<M> MetricsEmitter<M>
where
    M: MetricsSink + ?Sized,
{
    pub fn new(sink: Arc<M>) -> Self {
        Self { sink }
    }

    /// Returns how many of the four metrics were accepted by the sink.
    pub fn emit_run(&self, metrics: &RunMetrics) -> usize {
        let points = [
            (LEADS_PROCESSED, metrics.created as f64),
            (LEADS_SKIPPED, metrics.skipped as f64),
            (BATCH_DURATION_SECONDS, metrics.duration.as_secs_f64()),
            (BATCH_ERRORS, if metrics.errored { 1.0 } else { 0.0 }),
        ];

        points
            .into_iter()
            .filter(|(name, value)| match self.sink.emit(name, *value) {
                Ok(()) => {
                    debug!(metric = name, value, "metric emitted");
                    true
                }
                Err(error) => {
                    warn!(metric = name, %error, "failed to emit metric");
                    false
                }
            })
            .count()
    }
}

/// Records the run metrics as gauges on the globally installed `metrics`
/// recorder, which the service exports at `/metrics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetricsSink;

impl MetricsSink for PrometheusMetricsSink {
    fn emit(&self, name: &str, value: f64) -> Result<(), MetricsError> {
        if !value.is_finite() {
            return Err(MetricsError::Rejected {
                name: name.to_string(),
                reason: "value is not finite".to_string(),
            });
        }
        ::metrics::gauge!(name.to_string()).set(value);
        Ok(())
    }
}
