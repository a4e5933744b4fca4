// [libs/infra/store/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COURIER INFRA STORE
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ADAPTADOR DE PERSISTENCIA DEL PIPELINE DE
 *                  INGESTA-ANÁLISIS-DESPACHO, BASADO EN LIBSQL
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;
pub mod store;

pub use client::StoreClient;
pub use errors::{StoreError, StoreResult};
pub use store::{LibsqlStore, Store};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courier_domain_models::{Account, Analysis, DispatchOutcome, DispatchRecord, Engagement, Post, PostStatus};
    use serde_json::json;

    async fn in_memory_store() -> LibsqlStore {
        LibsqlStore::connect(":memory:", None)
            .await
            .expect("in-memory store should bootstrap")
    }

    fn sample_post(id: &str, account: &str) -> Post {
        Post {
            id: id.into(),
            account: account.into(),
            text: "hello world".into(),
            created_at: Utc::now(),
            ingested_at: Utc::now(),
            engagement: Engagement::default(),
            media: vec![],
            status: PostStatus::New,
        }
    }

    #[tokio::test]
    async fn upsert_post_is_idempotent_on_id() {
        let store = in_memory_store().await;
        let post = sample_post("post-1", "alice");

        let first = store.upsert_post(&post).await.unwrap();
        let second = store.upsert_post(&post).await.unwrap();

        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn claim_for_analysis_is_disjoint_across_concurrent_callers() {
        let store = in_memory_store().await;
        for i in 0..4 {
            store
                .upsert_post(&sample_post(&format!("post-{}", i), "alice"))
                .await
                .unwrap();
        }

        let (batch_a, batch_b) = tokio::join!(
            store.claim_for_analysis(2),
            store.claim_for_analysis(2)
        );
        let batch_a = batch_a.unwrap();
        let batch_b = batch_b.unwrap();

        let ids_a: std::collections::HashSet<_> = batch_a.iter().map(|p| p.id.clone()).collect();
        let ids_b: std::collections::HashSet<_> = batch_b.iter().map(|p| p.id.clone()).collect();
        assert!(ids_a.is_disjoint(&ids_b));
        assert_eq!(ids_a.len() + ids_b.len(), 4);
    }

    #[tokio::test]
    async fn complete_analysis_writes_row_and_transitions_status_atomically() {
        let store = in_memory_store().await;
        let post = sample_post("post-1", "alice");
        store.upsert_post(&post).await.unwrap();
        store.claim_for_analysis(1).await.unwrap();

        let analysis = Analysis {
            post_id: post.id.clone(),
            model: "gpt-test".into(),
            parameters_snapshot: json!({"temperature": 0.2}),
            prompt_snapshot: "summarize".into(),
            output_text: "summary".into(),
            tokens_used: 128,
            cost_estimate: 0.01,
            elapsed_ms: 500,
            created_at: Utc::now(),
        };

        store.complete_analysis(&post.id, analysis).await.unwrap();
        let updated = store.get_post(&post.id).await.unwrap();
        assert_eq!(updated.status, PostStatus::Analyzed);
    }

    #[tokio::test]
    async fn complete_analysis_rejects_post_not_in_analyzing_state() {
        let store = in_memory_store().await;
        let post = sample_post("post-1", "alice");
        store.upsert_post(&post).await.unwrap();
        // Never claimed, so still NEW.

        let analysis = Analysis {
            post_id: post.id.clone(),
            model: "gpt-test".into(),
            parameters_snapshot: json!({}),
            prompt_snapshot: "x".into(),
            output_text: "y".into(),
            tokens_used: 1,
            cost_estimate: 0.0,
            elapsed_ms: 1,
            created_at: Utc::now(),
        };

        let result = store.complete_analysis(&post.id, analysis).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn complete_dispatch_requires_at_least_one_ok_record() {
        let store = in_memory_store().await;
        let post = sample_post("post-1", "alice");
        store.upsert_post(&post).await.unwrap();
        store.claim_for_analysis(1).await.unwrap();
        store
            .complete_analysis(
                &post.id,
                Analysis {
                    post_id: post.id.clone(),
                    model: "m".into(),
                    parameters_snapshot: json!({}),
                    prompt_snapshot: "p".into(),
                    output_text: "o".into(),
                    tokens_used: 1,
                    cost_estimate: 0.0,
                    elapsed_ms: 1,
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        store.claim_for_dispatch(1).await.unwrap();

        let record = DispatchRecord {
            post_id: post.id.clone(),
            destination: "#general".into(),
            attempt_number: 1,
            outcome: DispatchOutcome::Ok,
            error_detail: None,
            sent_at: Utc::now(),
        };

        store.complete_dispatch(&post.id, record).await.unwrap();
        let updated = store.get_post(&post.id).await.unwrap();
        assert_eq!(updated.status, PostStatus::Dispatched);
    }

    #[tokio::test]
    async fn monitored_accounts_only_returns_enabled_accounts() {
        let store = in_memory_store().await;
        store.upsert_account(&Account::new("alice")).await.unwrap();
        let mut disabled = Account::new("bob");
        disabled.enabled = false;
        store.upsert_account(&disabled).await.unwrap();

        let accounts = store.monitored_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].username.as_str(), "alice");
    }

    #[tokio::test]
    async fn settings_round_trip_through_upsert() {
        let store = in_memory_store().await;
        assert!(store.get_setting("analyzer_model").await.unwrap().is_none());

        store.set_setting("analyzer_model", "gpt-test").await.unwrap();
        let setting = store.get_setting("analyzer_model").await.unwrap().unwrap();
        assert_eq!(setting.value, "gpt-test");

        store.set_setting("analyzer_model", "gpt-test-2").await.unwrap();
        let setting = store.get_setting("analyzer_model").await.unwrap().unwrap();
        assert_eq!(setting.value, "gpt-test-2");
    }
}
