// [apps/orchestrator/tests/s6_push_bad_signature.rs]
//! S6 — Push with a bad signature: a webhook whose `X-Signature` doesn't
//! match the configured shared secret must be rejected before any account
//! lookup or queueing happens, and counted as an auth failure.

mod common;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};

use courier_core_rate_governor::RateGovernor;
use courier_infra_analyzer_client::testing::FakeAnalyzer;
use courier_infra_dispatch_client::testing::FakeDispatcher;
use courier_infra_source_client::testing::FakeSourceClient;
use courier_infra_store::{LibsqlStore, Store};
use courier_orchestrator::handlers::push::handle_push;
use courier_orchestrator::state::{AppState, PipelineQueues};

#[tokio::test]
async fn bad_signature_is_rejected_before_any_account_lookup() {
    let store: Arc<dyn Store> = Arc::new(
        LibsqlStore::connect(":memory:", None)
            .await
            .expect("in-memory store should bootstrap"),
    );
    store
        .upsert_account(&common::monitored_account("alice", Some("100")))
        .await
        .unwrap();

    let config = Arc::new(common::test_config());
    let (push_tx, mut push_rx) = tokio::sync::mpsc::channel(8);
    let (trigger_tx, trigger_rx) = tokio::sync::mpsc::channel(8);
    let (analysis_hint_tx, analysis_hint_rx) = tokio::sync::mpsc::channel(8);
    let (dispatch_hint_tx, dispatch_hint_rx) = tokio::sync::mpsc::channel(8);
    // Keep the unused receivers alive for the duration of the test so the
    // handler's `try_send` calls don't see a closed channel.
    let _keepalive = (trigger_rx, analysis_hint_rx, dispatch_hint_rx);

    let state = AppState {
        store: store.clone(),
        source_client: Arc::new(FakeSourceClient::with_posts(Vec::new())),
        analyzer: Arc::new(FakeAnalyzer::always_succeeding("x", 1, 0.0)),
        dispatcher: Arc::new(FakeDispatcher::always_acking()),
        rate_governor: Arc::new(RateGovernor::new()),
        config,
        gate: common::gate(),
        queues: PipelineQueues {
            push_tx,
            trigger_tx,
            analysis_hint_tx,
            dispatch_hint_tx,
        },
        health: common::health(),
    };

    let body = axum::body::Bytes::from_static(br#"{"account":"alice"}"#);
    let mut headers = HeaderMap::new();
    headers.insert("x-signature", HeaderValue::from_static("0000deadbeef0000"));

    let (status, _json) = handle_push(State(state.clone()), headers, body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(state.health.snapshot().push_auth_failures, 1);

    // No push signal reached the coordinator and the account is untouched.
    assert!(
        tokio::time::timeout(std::time::Duration::from_millis(100), push_rx.recv())
            .await
            .is_err(),
        "a rejected push must never be queued"
    );
    let account = store.get_account("alice").await.unwrap();
    assert_eq!(account.last_seen_post_id.as_deref(), Some("100"));
}
