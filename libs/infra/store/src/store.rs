// [libs/infra/store/src/store.rs]
/*!
 * =================================================================
 * APARATO: STORE (FACHADA DE PERSISTENCIA)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CONTRATO ÚNICO DE PERSISTENCIA DURABLE Y SEGURA
 *                  ANTE CONCURRENCIA PARA EL PIPELINE COMPLETO
 *
 * `completeAnalysis`/`completeDispatch` escriben su fila de bitácora
 * (Analysis / DispatchRecord) y transicionan el estado del Post dentro
 * de la misma transacción — el invariante "un Post en ANALYZED tiene
 * exactamente una fila de Analysis" nunca es observable a medias desde
 * fuera del Store.
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params;
use tracing::instrument;

use courier_domain_models::{Account, Analysis, DispatchRecord, Post, PostId, Setting};

use crate::client::StoreClient;
use crate::errors::{StoreError, StoreResult};
use crate::repositories::{
    AccountRepository, AnalysisRepository, DispatchRecordRepository, PostRepository,
    SettingRepository,
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_post(&self, post: &Post) -> StoreResult<bool>;
    async fn claim_for_analysis(&self, batch_size: usize) -> StoreResult<Vec<Post>>;
    async fn complete_analysis(&self, post_id: &PostId, analysis: Analysis) -> StoreResult<()>;
    async fn fail_analysis(
        &self,
        post_id: &PostId,
        reason: &str,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    async fn claim_for_dispatch(&self, batch_size: usize) -> StoreResult<Vec<Post>>;
    async fn complete_dispatch(&self, post_id: &PostId, record: DispatchRecord) -> StoreResult<()>;
    async fn fail_dispatch(
        &self,
        post_id: &PostId,
        record: DispatchRecord,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<()>;

    async fn monitored_accounts(&self) -> StoreResult<Vec<Account>>;
    async fn get_account(&self, username: &str) -> StoreResult<Account>;
    async fn upsert_account(&self, account: &Account) -> StoreResult<()>;
    async fn advance_account_cursor(
        &self,
        username: &str,
        last_seen_post_id: &str,
        polled_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn get_setting(&self, key: &str) -> StoreResult<Option<Setting>>;
    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn get_post(&self, post_id: &PostId) -> StoreResult<Post>;
    async fn list_posts(
        &self,
        account: Option<&str>,
        status: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> StoreResult<Vec<Post>>;

    async fn latest_dispatch_attempt_number(&self, post_id: &str, destination: &str) -> StoreResult<u32>;
    async fn cumulative_analysis_cost_since(&self, since: DateTime<Utc>) -> StoreResult<f64>;

    async fn get_latest_analysis(&self, post_id: &PostId) -> StoreResult<Analysis>;
    async fn delete_terminal_posts_older_than(&self, days: i64) -> StoreResult<u64>;
    async fn reset_for_reanalysis(&self, post_id: &PostId) -> StoreResult<()>;
    async fn highest_known_created_at(&self, account: &str) -> StoreResult<Option<DateTime<Utc>>>;
}

#[derive(Clone)]
pub struct LibsqlStore {
    client: StoreClient,
}

impl LibsqlStore {
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
    ) -> StoreResult<Self> {
        let client = StoreClient::connect(database_connection_url, database_access_token).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Store for LibsqlStore {
    async fn upsert_post(&self, post: &Post) -> StoreResult<bool> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection).upsert(post).await
    }

    async fn claim_for_analysis(&self, batch_size: usize) -> StoreResult<Vec<Post>> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection)
            .claim_for_analysis(batch_size)
            .await
    }

    #[instrument(skip(self, analysis))]
    async fn complete_analysis(&self, post_id: &PostId, analysis: Analysis) -> StoreResult<()> {
        let connection = self.client.get_connection()?;
        let transaction = connection
            .transaction()
            .await
            .map_err(|e| StoreError::Unavailable(format!("transaction open failed: {}", e)))?;

        transaction
            .execute(
                r#"
                INSERT INTO analyses (
                    post_id, model, parameters_snapshot, prompt_snapshot,
                    output_text, tokens_used, cost_estimate, elapsed_ms, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    analysis.post_id.as_str().to_string(),
                    analysis.model.clone(),
                    analysis.parameters_snapshot.to_string(),
                    analysis.prompt_snapshot.clone(),
                    analysis.output_text.clone(),
                    analysis.tokens_used as i64,
                    analysis.cost_estimate,
                    analysis.elapsed_ms as i64,
                    analysis.created_at.to_rfc3339(),
                ],
            )
            .await?;

        let affected = transaction
            .execute(
                r#"
                UPDATE posts SET status = 'ANALYZED', failure_reason = NULL, retry_after = NULL
                WHERE id = ?1 AND status = 'ANALYZING'
                "#,
                params![post_id.as_str().to_string()],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::Conflict(format!(
                "post {} is not in expected state ANALYZING",
                post_id
            )));
        }

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Unavailable(format!("transaction commit failed: {}", e)))?;

        Ok(())
    }

    async fn fail_analysis(
        &self,
        post_id: &PostId,
        reason: &str,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection)
            .fail_analysis(post_id, reason, retry_after)
            .await
    }

    async fn claim_for_dispatch(&self, batch_size: usize) -> StoreResult<Vec<Post>> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection)
            .claim_for_dispatch(batch_size)
            .await
    }

    #[instrument(skip(self, record))]
    async fn complete_dispatch(&self, post_id: &PostId, record: DispatchRecord) -> StoreResult<()> {
        let connection = self.client.get_connection()?;
        let transaction = connection
            .transaction()
            .await
            .map_err(|e| StoreError::Unavailable(format!("transaction open failed: {}", e)))?;

        transaction
            .execute(
                r#"
                INSERT INTO dispatch_records (
                    post_id, destination, attempt_number, outcome, error_detail, sent_at
                ) VALUES (?1, ?2, ?3, 'OK', ?4, ?5)
                "#,
                params![
                    record.post_id.as_str().to_string(),
                    record.destination.clone(),
                    record.attempt_number as i64,
                    record.error_detail.clone(),
                    record.sent_at.to_rfc3339(),
                ],
            )
            .await?;

        let affected = transaction
            .execute(
                r#"
                UPDATE posts SET status = 'DISPATCHED', failure_reason = NULL, retry_after = NULL
                WHERE id = ?1 AND status = 'DISPATCHING'
                "#,
                params![post_id.as_str().to_string()],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::Conflict(format!(
                "post {} is not in expected state DISPATCHING",
                post_id
            )));
        }

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Unavailable(format!("transaction commit failed: {}", e)))?;

        Ok(())
    }

    async fn fail_dispatch(
        &self,
        post_id: &PostId,
        record: DispatchRecord,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        DispatchRecordRepository::new(self.client.get_connection()?)
            .append(&record)
            .await?;
        PostRepository::new(self.client.get_connection()?)
            .fail_dispatch(post_id, record.error_detail.as_deref().unwrap_or("dispatch failed"), retry_after)
            .await
    }

    async fn monitored_accounts(&self) -> StoreResult<Vec<Account>> {
        let connection = self.client.get_connection()?;
        AccountRepository::new(connection).list_monitored().await
    }

    async fn get_account(&self, username: &str) -> StoreResult<Account> {
        let connection = self.client.get_connection()?;
        AccountRepository::new(connection).get(username).await
    }

    async fn upsert_account(&self, account: &Account) -> StoreResult<()> {
        let connection = self.client.get_connection()?;
        AccountRepository::new(connection).upsert(account).await
    }

    async fn advance_account_cursor(
        &self,
        username: &str,
        last_seen_post_id: &str,
        polled_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let connection = self.client.get_connection()?;
        AccountRepository::new(connection)
            .advance_cursor(username, last_seen_post_id, polled_at)
            .await
    }

    async fn get_setting(&self, key: &str) -> StoreResult<Option<Setting>> {
        let connection = self.client.get_connection()?;
        SettingRepository::new(connection).get(key).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        let connection = self.client.get_connection()?;
        SettingRepository::new(connection).set(key, value).await
    }

    async fn get_post(&self, post_id: &PostId) -> StoreResult<Post> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection).get(post_id).await
    }

    async fn list_posts(
        &self,
        account: Option<&str>,
        status: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> StoreResult<Vec<Post>> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection)
            .list(account, status, limit, offset)
            .await
    }

    async fn latest_dispatch_attempt_number(&self, post_id: &str, destination: &str) -> StoreResult<u32> {
        let connection = self.client.get_connection()?;
        DispatchRecordRepository::new(connection)
            .latest_attempt_number(post_id, destination)
            .await
    }

    async fn cumulative_analysis_cost_since(&self, since: DateTime<Utc>) -> StoreResult<f64> {
        let connection = self.client.get_connection()?;
        AnalysisRepository::new(connection)
            .cumulative_cost_since(since)
            .await
    }

    async fn get_latest_analysis(&self, post_id: &PostId) -> StoreResult<Analysis> {
        let connection = self.client.get_connection()?;
        AnalysisRepository::new(connection)
            .latest_for_post(post_id.as_str())
            .await
    }

    async fn delete_terminal_posts_older_than(&self, days: i64) -> StoreResult<u64> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection)
            .delete_terminal_older_than(days)
            .await
    }

    async fn reset_for_reanalysis(&self, post_id: &PostId) -> StoreResult<()> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection)
            .reset_for_reanalysis(post_id)
            .await
    }

    async fn highest_known_created_at(&self, account: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let connection = self.client.get_connection()?;
        PostRepository::new(connection)
            .highest_known_created_at(account)
            .await
    }
}
