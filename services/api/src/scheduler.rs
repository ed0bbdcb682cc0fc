use chrono::Utc;
use scorify::config::SchedulerConfig;
use scorify::workflows::lead_scoring::{
    BatchOrchestrator, MetricsSink, RunResult, ScoreRepository,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Runs a batch every `interval`, first at startup when configured. Ticks
/// that land while a run is active are dropped rather than queued.
pub(crate) fn spawn<R, M>(
    orchestrator: Arc<BatchOrchestrator<R, M>>,
    config: SchedulerConfig,
) -> JoinHandle<()>
where
    R: ScoreRepository + 'static,
    M: MetricsSink + ?Sized + 'static,
{
    let period = config.interval();
    let first = if config.run_on_startup {
        Instant::now()
    } else {
        Instant::now() + period
    };
    info!(
        interval_minutes = config.interval_minutes,
        run_on_startup = config.run_on_startup,
        "batch scheduler started"
    );

    tokio::spawn(async move {
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_scheduled(&orchestrator).await;
            let next_run = chrono::Duration::from_std(period)
                .ok()
                .and_then(|delta| Utc::now().checked_add_signed(delta));
            if let Some(next_run) = next_run {
                info!(next_run = %next_run.to_rfc3339(), "next scheduled batch");
            }
        }
    })
}

/// One scheduled tick. `None` when another run held the lock.
pub(crate) async fn run_scheduled<R, M>(
    orchestrator: &Arc<BatchOrchestrator<R, M>>,
) -> Option<RunResult>
where
    R: ScoreRepository + 'static,
    M: MetricsSink + ?Sized + 'static,
{
    let orchestrator = Arc::clone(orchestrator);
    match tokio::task::spawn_blocking(move || orchestrator.try_run_batch()).await {
        Ok(Ok(result)) => {
            info!(
                batch_id = %result.batch_id,
                status = result.status.label(),
                created = result.created,
                skipped = result.skipped,
                "scheduled batch finished"
            );
            Some(result)
        }
        Ok(Err(busy)) => {
            info!("scheduled batch skipped: {busy}");
            None
        }
        Err(join_error) => {
            error!(error = %join_error, "scheduled batch aborted");
            None
        }
    }
}
