// [apps/orchestrator/tests/s3_rate_limit_during_analysis.rs]
//! S3 — Upstream rate limit during analysis: the model provider answers the
//! first attempt with a 429/retry-after, and the post must come back to NEW
//! gated by that exact window rather than being retried immediately, then
//! succeed once the window has elapsed.

mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use courier_core_rate_governor::RateGovernor;
use courier_infra_analyzer_client::{AnalysisOutcome, Analyzer, AnalyzerError};
use courier_infra_store::{LibsqlStore, Store};
use courier_orchestrator::services::analysis_worker::{AnalysisWorkerDeps, AnalysisWorkerPool};
use courier_domain_models::PostStatus;

/// Plays back a fixed sequence of outcomes, one per call, then repeats the
/// last one. Used here to script "rate-limited once, then succeeds".
struct SequencedAnalyzer {
    remaining: Mutex<VecDeque<Result<AnalysisOutcome, AnalyzerError>>>,
}

impl SequencedAnalyzer {
    fn new(outcomes: Vec<Result<AnalysisOutcome, AnalyzerError>>) -> Self {
        Self {
            remaining: Mutex::new(outcomes.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Analyzer for SequencedAnalyzer {
    async fn analyze(&self, _prompt: &str, _model: &str, _params: &Value) -> Result<AnalysisOutcome, AnalyzerError> {
        let mut remaining = self.remaining.lock().unwrap();
        remaining
            .pop_front()
            .expect("analyze called more times than the scenario scripted")
    }
}

#[tokio::test]
async fn rate_limited_analysis_retries_after_its_own_window_then_succeeds() {
    let store: Arc<dyn Store> = Arc::new(
        LibsqlStore::connect(":memory:", None)
            .await
            .expect("in-memory store should bootstrap"),
    );
    store
        .upsert_account(&common::monitored_account("alice", Some("100")))
        .await
        .unwrap();
    let post = common::sample_post("201", "alice", "rate me", chrono::Utc::now());
    store.upsert_post(&post).await.unwrap();

    // Short enough to keep the test fast, long enough to observe the gate.
    const RETRY_WINDOW_S: u64 = 1;

    let analyzer = Arc::new(SequencedAnalyzer::new(vec![
        Err(AnalyzerError::RateLimited { retry_after_s: RETRY_WINDOW_S }),
        Ok(AnalysisOutcome {
            text: "all clear".to_string(),
            tokens_used: 12,
            cost_estimate: 0.002,
        }),
    ]));

    let config = Arc::new(common::test_config());
    let gate = common::gate();
    let health = common::health();
    let governor = Arc::new(RateGovernor::new());
    let (dispatch_hint_tx, mut dispatch_hint_rx) = tokio::sync::mpsc::channel(8);
    let (_analysis_hint_tx, analysis_hint_rx) = tokio::sync::mpsc::channel(8);

    let deps = Arc::new(AnalysisWorkerDeps {
        store: store.clone(),
        analyzer: analyzer.clone(),
        governor,
        config,
        gate: gate.clone(),
        health,
        dispatch_hint_tx,
    });
    let _handles = AnalysisWorkerPool::spawn(1, deps, analysis_hint_rx);

    // First pass: the worker claims the post unprompted (it's already NEW),
    // gets rate-limited, and releases it back to NEW without retrying
    // immediately.
    let released = wait_for_status(&store, "201", |s| matches!(s, PostStatus::New), Duration::from_secs(5)).await;
    assert_eq!(released.status, PostStatus::New);

    // While the window hasn't elapsed, the post must not be claimable.
    let immediate_reclaim = store.claim_for_analysis(1).await.unwrap();
    assert!(
        immediate_reclaim.is_empty(),
        "post must stay gated until its own retry window elapses"
    );

    // Past the window, the second attempt succeeds and the post reaches
    // ANALYZED, with the dispatch hint fired.
    let analyzed = wait_for_status(
        &store,
        "201",
        |s| matches!(s, PostStatus::Analyzed),
        Duration::from_secs(5),
    )
    .await;
    assert_eq!(analyzed.status, PostStatus::Analyzed);

    let hinted = tokio::time::timeout(Duration::from_secs(1), dispatch_hint_rx.recv())
        .await
        .expect("dispatch hint should have been sent")
        .expect("dispatch hint channel should stay open");
    assert_eq!(hinted.as_str(), "201");

    gate.begin_draining();
}

async fn wait_for_status(
    store: &Arc<dyn Store>,
    id: &str,
    mut predicate: impl FnMut(&PostStatus) -> bool,
    within: Duration,
) -> courier_domain_models::Post {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let post = store.get_post(&id.into()).await.unwrap();
        if predicate(&post.status) {
            return post;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("post {} never reached the expected status (last seen: {:?})", id, post.status);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
