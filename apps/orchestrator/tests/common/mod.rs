// [apps/orchestrator/tests/common/mod.rs]
//! Shared scaffolding for the end-to-end scenario tests. Builds a
//! `ConfigSnapshot` directly (no env vars, no `dotenvy`) so scenarios never
//! race each other over process-global environment state.

use std::sync::Arc;

use chrono::Utc;
use courier_domain_models::{Account, Engagement, MediaItem, Post, PostStatus};
use courier_orchestrator::config::ConfigSnapshot;
use courier_orchestrator::state::mode::OperationalGate;
use courier_orchestrator::state::ComponentHealth;

pub fn test_config() -> ConfigSnapshot {
    ConfigSnapshot {
        database_url: ":memory:".to_string(),
        database_token: None,
        listen_port: 0,

        source_base_url: "https://source.invalid".to_string(),
        source_bearer_token: String::new(),
        analyzer_base_url: "https://analyzer.invalid".to_string(),
        analyzer_bearer_token: String::new(),
        dispatch_base_url: "https://dispatch.invalid".to_string(),
        dispatch_bearer_token: String::new(),

        poll_interval_s: 30,
        min_poll_spacing_s: 300,
        historical_hours: 24,
        allow_backdated_posts: false,
        max_fetch: 50,

        analyzer_model: "test-model".to_string(),
        analyzer_prompt: "summarize {text}".to_string(),
        analyze_timeout_s: 5,
        analysis_concurrency: 2,
        analysis_batch: 2,
        daily_cost_ceiling: 25.0,

        dispatch_rate_per_s: 10,
        dispatch_max_retries: 5,
        dispatch_max_backoff_s: 60,
        default_destination: "#general".to_string(),

        retention_days: 30,
        notifications_enabled: true,
        notify_only_analyzed: true,

        push_shared_secret: "test-shared-secret".to_string(),
        push_queue_depth: 64,
        ingest_queue_depth: 64,

        shutdown_drain_s: 2,
    }
}

pub fn gate() -> Arc<OperationalGate> {
    Arc::new(OperationalGate::new())
}

pub fn health() -> Arc<ComponentHealth> {
    Arc::new(ComponentHealth::new())
}

pub fn sample_post(id: &str, account: &str, text: &str, created_at: chrono::DateTime<Utc>) -> Post {
    Post {
        id: id.into(),
        account: account.into(),
        text: text.to_string(),
        created_at,
        ingested_at: Utc::now(),
        engagement: Engagement::default(),
        media: Vec::<MediaItem>::new(),
        status: PostStatus::New,
    }
}

pub fn monitored_account(username: &str, last_seen_post_id: Option<&str>) -> Account {
    Account {
        username: username.into(),
        enabled: true,
        last_polled_at: None,
        last_seen_post_id: last_seen_post_id.map(|s| s.to_string()),
    }
}
