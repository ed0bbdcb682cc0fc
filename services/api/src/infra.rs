use metrics_exporter_prometheus::PrometheusHandle;
use scorify::config::{AppConfig, DataConfig};
use scorify::workflows::dataset::{Dataset, DatasetError};
use scorify::workflows::lead_scoring::{
    InMemoryScoreStore, LogisticModel, MetricsError, MetricsSink, ModelLoadError, TriggerAuth,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reads coefficients from `path`, or falls back to the built-in baseline.
pub(crate) fn load_model(path: Option<&Path>) -> Result<LogisticModel, ModelLoadError> {
    match path {
        Some(path) => {
            let model = LogisticModel::from_path(path)?;
            info!(path = %path.display(), "scoring model loaded");
            Ok(model)
        }
        None => {
            info!("no model file configured; using baseline coefficients");
            Ok(LogisticModel::baseline())
        }
    }
}

/// Seeds the store from the configured data directory. Without one the
/// service starts empty and every run reports no new data.
pub(crate) fn build_store(data: &DataConfig) -> Result<InMemoryScoreStore, DatasetError> {
    match data.data_dir.as_deref() {
        Some(dir) => Ok(Dataset::from_dir(dir)?.into_store()),
        None => {
            warn!("SCORIFY_DATA_DIR not set; starting with an empty store");
            Ok(InMemoryScoreStore::default())
        }
    }
}

/// An unset token leaves the trigger open outside production and disabled
/// in production.
pub(crate) fn trigger_auth(config: &AppConfig) -> TriggerAuth {
    let allow_anonymous = !config.environment.is_production();
    if config.trigger.token.is_none() && allow_anonymous {
        warn!("SCORIFY_TRIGGER_TOKEN not set; manual trigger is unauthenticated");
    }
    TriggerAuth::new(config.trigger.token.clone(), allow_anonymous)
}

/// Metrics sink for one-off CLI runs, where no exporter is scraped.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn emit(&self, name: &str, value: f64) -> Result<(), MetricsError> {
        info!(metric = name, value, "run metric");
        Ok(())
    }
}

pub(crate) fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as a number ({err})"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be within [0, 1], got {value}"))
    }
}
