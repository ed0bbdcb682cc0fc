use crate::infra::{load_model, parse_threshold, LogMetricsSink};
use clap::Args;
use scorify::config::AppConfig;
use scorify::error::AppError;
use scorify::telemetry;
use scorify::workflows::dataset::Dataset;
use scorify::workflows::lead_scoring::{
    summarize_labels, BatchOrchestrator, RunResult, ScoreRecord, ScoreRepository,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct BatchRunArgs {
    /// Directory holding customers.csv, campaigns.csv and optionally macro.csv
    #[arg(long, env = "SCORIFY_DATA_DIR")]
    pub(crate) data_dir: PathBuf,
    /// Model coefficients as JSON (defaults to the built-in baseline)
    #[arg(long, env = "SCORIFY_MODEL_PATH")]
    pub(crate) model: Option<PathBuf>,
    /// Override the configured classification threshold
    #[arg(long, value_parser = parse_threshold)]
    pub(crate) threshold: Option<f64>,
    /// Override the configured model version stamped on records
    #[arg(long)]
    pub(crate) model_version: Option<String>,
    /// Earlier report whose records count as already scored
    #[arg(long)]
    pub(crate) previous: Option<PathBuf>,
    /// Write the run result and every stored record to this file
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct BatchSummaryArgs {
    /// Report written by `batch run --output`
    #[arg(long)]
    pub(crate) input: PathBuf,
}

/// File format shared by `batch run --output`, `--previous`, and
/// `batch summary`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BatchReport {
    pub(crate) result: RunResult,
    pub(crate) records: Vec<ScoreRecord>,
}

pub(crate) fn run_batch(args: BatchRunArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(threshold) = args.threshold {
        config.scoring.threshold = threshold;
    }
    if let Some(version) = args.model_version {
        config.scoring.model_version = version;
    }
    telemetry::init(&config.telemetry)?;

    let store = Arc::new(Dataset::from_dir(&args.data_dir)?.into_store());
    if let Some(previous) = args.previous.as_deref() {
        let report = read_report(previous)?;
        let seeded = store.commit_scores(report.records)?;
        info!(path = %previous.display(), seeded, "previous scores restored");
    }

    let model = load_model(args.model.as_deref())?;
    let orchestrator = BatchOrchestrator::new(
        Arc::clone(&store),
        Arc::new(model),
        Arc::new(LogMetricsSink),
        config.scoring,
    );
    let result = orchestrator.run_batch();
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(output) = args.output.as_deref() {
        let report = BatchReport {
            result: result.clone(),
            records: store.scores(None)?,
        };
        write_report(output, &report)?;
        info!(path = %output.display(), records = report.records.len(), "report written");
    }

    if result.is_error() {
        let message = result.message.unwrap_or_else(|| result.status.label().to_string());
        return Err(AppError::Batch(message));
    }
    Ok(())
}

pub(crate) fn summarize_report(args: BatchSummaryArgs) -> Result<(), AppError> {
    let report = read_report(&args.input)?;
    let summary = summarize_labels(&report.records);

    println!(
        "Batch {} ({}) created {} | skipped {}",
        report.result.batch_id,
        report.result.status.label(),
        report.result.created,
        report.result.skipped
    );
    println!(
        "Stored scores: {} total | {} yes | {} no",
        summary.total, summary.yes, summary.no
    );
    Ok(())
}

fn read_report(path: &Path) -> Result<BatchReport, AppError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_report(path: &Path, report: &BatchReport) -> Result<(), AppError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorify::workflows::lead_scoring::{
        BatchId, CampaignKey, CustomerKey, PredictedLabel, RunStatus,
    };

    fn record(campaign: &str, label: PredictedLabel, batch_id: BatchId) -> ScoreRecord {
        let now = chrono::Utc::now();
        ScoreRecord {
            id: uuid::Uuid::new_v4(),
            customer_key: CustomerKey("c1".to_string()),
            campaign_key: CampaignKey(campaign.to_string()),
            predicted_label: label,
            score: if label == PredictedLabel::Yes { 0.8 } else { 0.2 },
            threshold: 0.5,
            model_version: "v1.0".to_string(),
            batch_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn written_report_can_be_summarized() {
        let batch_id = BatchId::generate();
        let report = BatchReport {
            result: RunResult {
                status: RunStatus::Success,
                batch_id,
                model_version: "v1.0".to_string(),
                created: 2,
                skipped: 0,
                message: None,
            },
            records: vec![
                record("k1", PredictedLabel::Yes, batch_id),
                record("k2", PredictedLabel::No, batch_id),
            ],
        };
        let path = std::env::temp_dir().join(format!("scorify-report-{batch_id}.json"));

        write_report(&path, &report).expect("report written");
        let restored = read_report(&path).expect("report read");
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.result, report.result);
        assert_eq!(restored.records, report.records);
        let summary = summarize_labels(&restored.records);
        assert_eq!((summary.yes, summary.no), (1, 1));
    }
}
