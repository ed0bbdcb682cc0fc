use crate::cli::ServeArgs;
use crate::infra::{build_store, load_model, trigger_auth, AppState};
use crate::routes::with_batch_routes;
use crate::scheduler;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scorify::config::AppConfig;
use scorify::error::AppError;
use scorify::telemetry;
use scorify::workflows::lead_scoring::{BatchOrchestrator, PrometheusMetricsSink};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.no_startup_run {
        config.scheduler.run_on_startup = false;
    }

    telemetry::init(&config.telemetry)?;

    // Installs the global recorder the run gauges are written to.
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(build_store(&config.data)?);
    let model = load_model(config.data.model_path.as_deref())?;
    let orchestrator = Arc::new(BatchOrchestrator::new(
        store,
        Arc::new(model),
        Arc::new(PrometheusMetricsSink),
        config.scoring.clone(),
    ));

    let app = with_batch_routes(Arc::clone(&orchestrator), trigger_auth(&config))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let scheduler = scheduler::spawn(orchestrator, config.scheduler.clone());
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        model_version = %config.scoring.model_version,
        threshold = config.scoring.threshold,
        "lead scoring service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    scheduler.abort();
    info!("lead scoring service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
