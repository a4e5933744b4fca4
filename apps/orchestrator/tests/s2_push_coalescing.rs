// [apps/orchestrator/tests/s2_push_coalescing.rs]
//! S2 — Push coalescing: a push arriving within `min_poll_spacing_s` of the
//! account's last trigger must not produce an immediate ingest trigger, and
//! must be visible as a coalesced-push event in the health stats.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use courier_infra_store::{LibsqlStore, Store};
use courier_orchestrator::services::source_coordinator::{PushSignal, SourceCoordinatorService};

#[tokio::test]
async fn push_within_min_spacing_is_coalesced_not_triggered() {
    let store: Arc<dyn Store> = Arc::new(
        LibsqlStore::connect(":memory:", None)
            .await
            .expect("in-memory store should bootstrap"),
    );
    store
        .upsert_account(&common::monitored_account("alice", Some("100")))
        .await
        .unwrap();

    let mut config = common::test_config();
    config.min_poll_spacing_s = 300;
    let config = Arc::new(config);
    let gate = common::gate();
    let health = common::health();

    let (push_tx, push_rx) = tokio::sync::mpsc::channel(8);
    let (trigger_tx, mut trigger_rx) = tokio::sync::mpsc::channel(8);

    let coordinator = SourceCoordinatorService::new(
        store.clone(),
        config.clone(),
        gate.clone(),
        health.clone(),
        trigger_tx,
    );
    tokio::spawn(coordinator.run(push_rx));

    let t0 = Utc::now();
    push_tx
        .send(PushSignal {
            account: "alice".into(),
            received_at: t0,
        })
        .await
        .unwrap();

    let first = tokio::time::timeout(Duration::from_millis(500), trigger_rx.recv())
        .await
        .expect("first push should trigger immediately")
        .expect("trigger channel should stay open");
    assert_eq!(first.account.as_str(), "alice");

    // Arrives 10s later, well inside the 300s minimum spacing window.
    push_tx
        .send(PushSignal {
            account: "alice".into(),
            received_at: t0 + chrono::Duration::seconds(10),
        })
        .await
        .unwrap();

    let coalesced = tokio::time::timeout(Duration::from_millis(300), trigger_rx.recv()).await;
    assert!(coalesced.is_err(), "second push within min_poll_spacing_s must not trigger immediately");

    assert_eq!(health.snapshot().push_coalesced, 1);

    gate.begin_draining();
}
