// [apps/orchestrator/tests/s5_graceful_shutdown_drain.rs]
//! S5 — Graceful shutdown drain: posts already in flight (ANALYZING,
//! DISPATCHING) when draining begins get one drain window to finish, and
//! are released back to a retryable state if they don't make it.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use courier_core_rate_governor::RateGovernor;
use courier_domain_models::{Analysis, PostId, PostStatus};
use courier_infra_analyzer_client::{AnalysisOutcome, Analyzer, AnalyzerError};
use courier_infra_dispatch_client::{DispatchAck, Dispatcher, DispatcherError};
use courier_infra_store::{LibsqlStore, Store};
use courier_orchestrator::services::analysis_worker::{AnalysisWorkerDeps, AnalysisWorkerPool};
use courier_orchestrator::services::dispatch_worker::{DispatchWorkerDeps, DispatchWorkerPool};

/// Never resolves within the lifetime of this test — stands in for a model
/// or chat-platform call that's still in flight when the process starts
/// draining.
struct HangingAnalyzer;

#[async_trait]
impl Analyzer for HangingAnalyzer {
    async fn analyze(&self, _prompt: &str, _model: &str, _params: &Value) -> Result<AnalysisOutcome, AnalyzerError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        unreachable!("drain should cut this off first");
    }
}

struct HangingDispatcher;

#[async_trait]
impl Dispatcher for HangingDispatcher {
    async fn send(&self, _channel: &str, _payload: &str) -> Result<DispatchAck, DispatcherError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        unreachable!("drain should cut this off first");
    }
}

#[tokio::test]
async fn in_flight_work_is_released_once_the_drain_window_elapses() {
    let store: Arc<dyn Store> = Arc::new(
        LibsqlStore::connect(":memory:", None)
            .await
            .expect("in-memory store should bootstrap"),
    );
    store
        .upsert_account(&common::monitored_account("alice", Some("100")))
        .await
        .unwrap();

    // Two posts destined for analysis, two already analyzed and destined
    // for dispatch.
    for id in ["401", "402"] {
        store
            .upsert_post(&common::sample_post(id, "alice", "body", chrono::Utc::now()))
            .await
            .unwrap();
    }
    for id in ["403", "404"] {
        let post_id: PostId = id.into();
        store
            .upsert_post(&common::sample_post(id, "alice", "body", chrono::Utc::now()))
            .await
            .unwrap();
        store.claim_for_analysis(1).await.unwrap();
        store
            .complete_analysis(
                &post_id,
                Analysis {
                    post_id: post_id.clone(),
                    model: "test-model".to_string(),
                    parameters_snapshot: serde_json::json!({}),
                    prompt_snapshot: "summarize {text}".to_string(),
                    output_text: "summary".to_string(),
                    tokens_used: 8,
                    cost_estimate: 0.001,
                    elapsed_ms: 5,
                    created_at: chrono::Utc::now(),
                },
            )
            .await
            .unwrap();
    }

    let mut config = common::test_config();
    config.shutdown_drain_s = 1;
    config.analysis_concurrency = 2;
    config.analysis_batch = 1;
    let config = Arc::new(config);
    let gate = common::gate();
    let health = common::health();
    let governor = Arc::new(RateGovernor::new());

    let (dispatch_hint_tx, _dispatch_hint_rx_keepalive) = tokio::sync::mpsc::channel(8);
    let (_analysis_hint_tx, analysis_hint_rx) = tokio::sync::mpsc::channel(8);

    let analysis_deps = Arc::new(AnalysisWorkerDeps {
        store: store.clone(),
        analyzer: Arc::new(HangingAnalyzer),
        governor: governor.clone(),
        config: config.clone(),
        gate: gate.clone(),
        health: health.clone(),
        dispatch_hint_tx,
    });
    let _analysis_handles = AnalysisWorkerPool::spawn(2, analysis_deps, analysis_hint_rx);

    let dispatch_deps = Arc::new(DispatchWorkerDeps {
        store: store.clone(),
        dispatcher: Arc::new(HangingDispatcher),
        governor,
        config: config.clone(),
        gate: gate.clone(),
        health,
    });
    let _dispatch_handles = DispatchWorkerPool::spawn(2, dispatch_deps, tokio::sync::mpsc::channel(8).1);

    // Let the workers claim their posts and settle into the hanging calls.
    wait_until(
        || async {
            let a = store.get_post(&"401".into()).await.unwrap();
            let b = store.get_post(&"403".into()).await.unwrap();
            a.status == PostStatus::Analyzing && b.status == PostStatus::Dispatching
        },
        Duration::from_secs(2),
    )
    .await;

    // SIGTERM-equivalent: cut intake, start the drain clock.
    gate.begin_draining();

    // Within shutdown_drain_s (1s) plus slack, the in-flight posts must be
    // released back to a retryable, non-terminal state.
    wait_until(
        || async {
            let a = store.get_post(&"401".into()).await.unwrap();
            let c = store.get_post(&"403".into()).await.unwrap();
            a.status == PostStatus::New && c.status == PostStatus::Analyzed
        },
        Duration::from_secs(4),
    )
    .await;

    let released_analysis = store.get_post(&"401".into()).await.unwrap();
    assert_eq!(released_analysis.status, PostStatus::New);
    let released_dispatch = store.get_post(&"403".into()).await.unwrap();
    assert_eq!(released_dispatch.status, PostStatus::Analyzed);
}

async fn wait_until<F, Fut>(mut predicate: F, within: Duration)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if predicate().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition never became true within {:?}", within);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
