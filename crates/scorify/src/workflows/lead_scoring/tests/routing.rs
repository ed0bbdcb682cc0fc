use std::sync::Arc;
use std::thread;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::lead_scoring::router::{scores_handler, BatchApiState, ScoresQuery};
use crate::workflows::lead_scoring::{
    batch_router, BatchOrchestrator, InMemoryScoreStore, ScoreRepository, TriggerAuth,
};

const TOKEN: &str = "batch-secret";

fn router_for(
    orchestrator: Arc<BatchOrchestrator<InMemoryScoreStore, RecordingSink>>,
    auth: TriggerAuth,
) -> Router {
    batch_router(orchestrator, auth)
}

fn trigger(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/v1/batches/run");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn trigger_with_valid_token_runs_a_batch() {
    let store = seeded_store(1);
    let (orchestrator, _) = orchestrator(Arc::clone(&store), Arc::new(FixedModel(0.62)));
    let router = router_for(orchestrator, TriggerAuth::new(Some(TOKEN.to_string()), false));

    let response = router.oneshot(trigger(Some(TOKEN))).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "success");
    assert_eq!(payload["created"], 1);
    assert_eq!(payload["skipped"], 0);
    assert_eq!(payload["model_version"], "v1.0");
    assert!(payload.get("message").is_none());
    assert_eq!(store.score_count().expect("count"), 1);
}

#[tokio::test]
async fn trigger_with_wrong_token_is_unauthorized() {
    let store = seeded_store(1);
    let (orchestrator, _) = orchestrator(Arc::clone(&store), Arc::new(FixedModel(0.62)));
    let router = router_for(orchestrator, TriggerAuth::new(Some(TOKEN.to_string()), false));

    let wrong = router
        .clone()
        .oneshot(trigger(Some("guess")))
        .await
        .expect("response");
    let missing = router.oneshot(trigger(None)).await.expect("response");

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.score_count().expect("count"), 0);
}

#[tokio::test]
async fn trigger_without_configured_token_follows_the_anonymous_policy() {
    let (closed, _) = orchestrator(seeded_store(1), Arc::new(FixedModel(0.62)));
    let response = router_for(closed, TriggerAuth::new(None, false))
        .oneshot(trigger(None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (open, _) = orchestrator(seeded_store(1), Arc::new(FixedModel(0.62)));
    let response = router_for(open, TriggerAuth::new(Some("   ".to_string()), true))
        .oneshot(trigger(None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn failed_run_returns_internal_error_with_result_body() {
    let store = seeded_store(1);
    let (orchestrator, _) = orchestrator(Arc::clone(&store), Arc::new(FixedModel(-0.2)));
    let router = router_for(orchestrator, TriggerAuth::new(None, true));

    let response = router.oneshot(trigger(None)).await.expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["created"], 0);
    assert!(payload["message"]
        .as_str()
        .is_some_and(|message| message.contains("c1/k1")));
}

#[tokio::test]
async fn trigger_during_an_active_run_conflicts() {
    let store = seeded_store(1);
    let (repository, gate) = GatedRepository::new(Arc::clone(&store));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Arc::new(BatchOrchestrator::new(
        Arc::new(repository),
        Arc::new(FixedModel(0.62)),
        Arc::clone(&sink),
        scoring_config(),
    ));
    let router = batch_router(Arc::clone(&orchestrator), TriggerAuth::new(None, true));

    let background = {
        let orchestrator = Arc::clone(&orchestrator);
        thread::spawn(move || orchestrator.run_batch())
    };
    gate.entered.recv().expect("run started");

    let response = router.oneshot(trigger(None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    gate.release.send(()).expect("release run");
    assert_eq!(background.join().expect("run thread").created, 1);
    assert_eq!(store.score_count().expect("count"), 1);
}

#[tokio::test]
async fn latest_is_not_found_until_a_run_finishes() {
    let (orchestrator, _) = orchestrator(seeded_store(2), Arc::new(FixedModel(0.4)));
    let router = router_for(Arc::clone(&orchestrator), TriggerAuth::new(None, true));

    let before = router
        .clone()
        .oneshot(get("/api/v1/batches/latest"))
        .await
        .expect("response");
    assert_eq!(before.status(), StatusCode::NOT_FOUND);

    let result = orchestrator.run_batch();
    let after = router
        .oneshot(get("/api/v1/batches/latest"))
        .await
        .expect("response");
    assert_eq!(after.status(), StatusCode::OK);
    let payload = read_json_body(after).await;
    assert_eq!(payload["batch_id"], result.batch_id.to_string());
    assert_eq!(payload["created"], 2);
}

#[tokio::test]
async fn scores_endpoint_filters_by_batch() {
    let store = seeded_store(2);
    let (orchestrator, _) = orchestrator(Arc::clone(&store), Arc::new(FixedModel(0.9)));
    let first = orchestrator.run_batch();
    store
        .add_campaigns([campaign("k5", "c1")])
        .expect("seed campaign");
    orchestrator.run_batch();
    let router = router_for(orchestrator, TriggerAuth::new(None, true));

    let all = router
        .clone()
        .oneshot(get("/api/v1/scores"))
        .await
        .expect("response");
    let payload = read_json_body(all).await;
    assert_eq!(payload["summary"]["total"], 3);
    assert_eq!(payload["summary"]["yes"], 3);

    let uri = format!("/api/v1/scores?batch_id={}", first.batch_id);
    let filtered = router.oneshot(get(&uri)).await.expect("response");
    assert_eq!(filtered.status(), StatusCode::OK);
    let payload = read_json_body(filtered).await;
    assert_eq!(payload["summary"]["total"], 2);
    assert_eq!(payload["records"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn scores_handler_rejects_malformed_batch_id() {
    let (orchestrator, _) = orchestrator(seeded_store(1), Arc::new(FixedModel(0.9)));
    let state = BatchApiState::new(orchestrator, TriggerAuth::new(None, true));

    let response = scores_handler::<InMemoryScoreStore, RecordingSink>(
        State(state),
        Query(ScoresQuery {
            batch_id: Some("not-a-uuid".to_string()),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
