use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use super::domain::{summarize_labels, BatchId};
use super::metrics::MetricsSink;
use super::orchestrator::BatchOrchestrator;
use super::repository::ScoreRepository;

/// Guards the manual trigger. With a token configured the request must carry
/// `Authorization: Bearer <token>`; without one the trigger is either open or
/// disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerAuth {
    token: Option<String>,
    allow_anonymous: bool,
}

impl TriggerAuth {
    pub fn new(token: Option<String>, allow_anonymous: bool) -> Self {
        Self {
            token: token.filter(|value| !value.trim().is_empty()),
            allow_anonymous,
        }
    }

    fn check(&self, headers: &HeaderMap) -> Result<(), Response> {
        let Some(expected) = self.token.as_deref() else {
            if self.allow_anonymous {
                return Ok(());
            }
            let payload = json!({ "error": "batch trigger is disabled" });
            return Err((StatusCode::FORBIDDEN, axum::Json(payload)).into_response());
        };

        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        if presented == Some(expected) {
            Ok(())
        } else {
            let payload = json!({ "error": "missing or invalid trigger token" });
            Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response())
        }
    }
}

pub struct BatchApiState<R, M: ?Sized> {
    orchestrator: Arc<BatchOrchestrator<R, M>>,
    auth: Arc<TriggerAuth>,
}

impl<R, M: ?Sized> BatchApiState<R, M> {
    pub(crate) fn new(orchestrator: Arc<BatchOrchestrator<R, M>>, auth: TriggerAuth) -> Self {
        Self {
            orchestrator,
            auth: Arc::new(auth),
        }
    }
}

impl<R, M: ?Sized> Clone for BatchApiState<R, M> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Router builder exposing the batch trigger and read endpoints.
pub fn batch_router<R, M>(orchestrator: Arc<BatchOrchestrator<R, M>>, auth: TriggerAuth) -> Router
where
    R: ScoreRepository + 'static,
    M: MetricsSink + ?Sized + 'static,
{
    let state = BatchApiState::new(orchestrator, auth);

    Router::new()
        .route("/api/v1/batches/run", post(trigger_handler::<R, M>))
        .route("/api/v1/batches/latest", get(latest_handler::<R, M>))
        .route("/api/v1/scores", get(scores_handler::<R, M>))
        .with_state(state)
}

pub(crate) async fn trigger_handler<R, M>(
    State(state): State<BatchApiState<R, M>>,
    headers: HeaderMap,
) -> Response
where
    R: ScoreRepository + 'static,
    M: MetricsSink + ?Sized + 'static,
{
    if let Err(rejection) = state.auth.check(&headers) {
        return rejection;
    }

    let orchestrator = Arc::clone(&state.orchestrator);
    match tokio::task::spawn_blocking(move || orchestrator.try_run_batch()).await {
        Ok(Ok(result)) => {
            let status = if result.is_error() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            };
            (status, axum::Json(result)).into_response()
        }
        Ok(Err(busy)) => {
            warn!("manual trigger rejected: batch already running");
            let payload = json!({ "error": busy.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(join_error) => {
            error!(error = %join_error, "batch task aborted");
            let payload = json!({ "error": format!("batch task aborted: {join_error}") });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn latest_handler<R, M>(State(state): State<BatchApiState<R, M>>) -> Response
where
    R: ScoreRepository + 'static,
    M: MetricsSink + ?Sized + 'static,
{
    match state.orchestrator.last_result() {
        Some(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        None => {
            let payload = json!({ "error": "no batch has run yet" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoresQuery {
    #[serde(default)]
    pub(crate) batch_id: Option<String>,
}

pub(crate) async fn scores_handler<R, M>(
    State(state): State<BatchApiState<R, M>>,
    Query(query): Query<ScoresQuery>,
) -> Response
where
    R: ScoreRepository + 'static,
    M: MetricsSink + ?Sized + 'static,
{
    let batch_id = match query.batch_id.as_deref().map(Uuid::parse_str).transpose() {
        Ok(id) => id.map(BatchId),
        Err(err) => {
            let payload = json!({ "error": format!("invalid batch_id: {err}") });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    match state.orchestrator.scores(batch_id.as_ref()) {
        Ok(records) => {
            let summary = summarize_labels(&records);
            let payload = json!({
                "summary": summary,
                "records": records,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
