// [apps/orchestrator/src/services/ingest_pipeline.rs]
/*!
 * =================================================================
 * APARATO: INGEST PIPELINE
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L2-APP)
 * RESPONSABILIDAD: CONSUMIR DISPARADORES DE INGESTA, OBTENER POSTS
 *                  NUEVOS DE LA FUENTE Y PERSISTIRLOS IDEMPOTENTEMENTE
 *
 * Una única tarea consume el flujo de `PollTrigger`; no hay paralelismo
 * por cuenta porque `SourceClient::fetch_since` ya es por-cuenta y el
 * gobernador de tasa arbitra la concurrencia efectiva contra la fuente
 * externa. El piso de antigüedad (`historical_hours`) solo aplica al
 * primer avistamiento de una cuenta (`last_seen_post_id` ausente); el
 * piso de retroactividad (`allow_backdated_posts`) aplica siempre que
 * esté desactivado, comparando contra el `created_at` más alto ya
 * conocido de la cuenta.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use courier_core_rate_governor::{AcquireOutcome, QuotaSignal, RateGovernor};
use courier_infra_source_client::{SourceClient, SourceClientError};
use courier_infra_store::Store;

use crate::config::ConfigSnapshot;
use crate::services::source_coordinator::{PollTrigger, TriggerReceiver};
use crate::state::mode::OperationalGate;
use crate::state::{AnalysisHintSender, ComponentHealth};

const SOURCE_BUCKET: &str = "source";
const SOURCE_ACQUIRE_DEADLINE: Duration = Duration::from_secs(10);
const ANALYSIS_HINT_SEND_DEADLINE: Duration = Duration::from_millis(500);

pub struct IngestPipelineService {
    store: Arc<dyn Store>,
    source: Arc<dyn SourceClient>,
    governor: Arc<RateGovernor>,
    config: Arc<ConfigSnapshot>,
    gate: Arc<OperationalGate>,
    health: Arc<ComponentHealth>,
    analysis_hint_tx: AnalysisHintSender,
}

impl IngestPipelineService {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn SourceClient>,
        governor: Arc<RateGovernor>,
        config: Arc<ConfigSnapshot>,
        gate: Arc<OperationalGate>,
        health: Arc<ComponentHealth>,
        analysis_hint_tx: AnalysisHintSender,
    ) -> Self {
        Self {
            store,
            source,
            governor,
            config,
            gate,
            health,
            analysis_hint_tx,
        }
    }

    #[instrument(skip(self, trigger_rx))]
    pub async fn run(self, mut trigger_rx: TriggerReceiver) {
        info!("📥 [INGEST_PIPELINE_ONLINE]");
        loop {
            tokio::select! {
                _ = self.gate.until_draining() => {
                    info!("📥 [INGEST_PIPELINE_DRAINING]: no more triggers will be accepted");
                    break;
                }
                trigger = trigger_rx.recv() => {
                    match trigger {
                        Some(trigger) => self.process_trigger(trigger).await,
                        None => {
                            warn!("📥 [INGEST_PIPELINE_STALL]: trigger channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    #[instrument(skip(self), fields(account = %trigger.account))]
    async fn process_trigger(&self, trigger: PollTrigger) {
        self.health.touch("ingest_pipeline");

        let account = match self.store.get_account(trigger.account.as_str()).await {
            Ok(account) => account,
            Err(e) => {
                warn!("account lookup failed: {}", e);
                return;
            }
        };

        if !account.enabled {
            debug!("skipping disabled account");
            return;
        }

        if let AcquireOutcome::Deny { retry_after } = self
            .governor
            .acquire(SOURCE_BUCKET, 1, SOURCE_ACQUIRE_DEADLINE)
            .await
        {
            debug!("source bucket exhausted, deferring to next trigger (retry_after={:?})", retry_after);
            return;
        }

        let since_id = account.last_seen_post_id.clone();
        let fetched = match self
            .source
            .fetch_since(&account.username, since_id.as_deref(), self.config.max_fetch)
            .await
        {
            Ok(posts) => posts,
            Err(SourceClientError::RateLimited { retry_after_s }) => {
                self.governor.observe_quota_signal(
                    SOURCE_BUCKET,
                    QuotaSignal {
                        remaining: Some(0),
                        reset_at: Some(Utc::now() + chrono::Duration::seconds(retry_after_s as i64)),
                    },
                );
                warn!("source rate-limited account, retry after {}s", retry_after_s);
                return;
            }
            Err(e) => {
                warn!("fetch_since failed: {}", e);
                return;
            }
        };

        if fetched.is_empty() {
            return;
        }

        let mut posts = fetched;
        posts.sort_by_key(|post| post.created_at);

        let historical_floor = if since_id.is_none() {
            Some(Utc::now() - chrono::Duration::hours(self.config.historical_hours))
        } else {
            None
        };

        let backdate_floor = if self.config.allow_backdated_posts {
            None
        } else {
            match self.store.highest_known_created_at(account.username.as_str()).await {
                Ok(floor) => floor,
                Err(e) => {
                    warn!("could not determine backdate floor, proceeding without one: {}", e);
                    None
                }
            }
        };

        let mut new_cursor: Option<String> = since_id;
        for post in posts {
            new_cursor = Some(post.id.as_str().to_string());

            if let Some(floor) = historical_floor {
                if post.created_at < floor {
                    debug!("post {} predates historical_hours floor, skipping", post.id);
                    continue;
                }
            }
            if let Some(floor) = backdate_floor {
                if post.created_at < floor {
                    debug!("post {} is backdated and allow_backdated_posts is off, skipping", post.id);
                    continue;
                }
            }

            let post_id = post.id.clone();
            match self.store.upsert_post(&post).await {
                Ok(true) => {
                    if tokio::time::timeout(ANALYSIS_HINT_SEND_DEADLINE, self.analysis_hint_tx.send(post_id.clone()))
                        .await
                        .is_err()
                    {
                        debug!("analysis hint queue saturated for {}, claim sweep will still find it", post_id);
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("upsert_post failed for {}: {}", post_id, e),
            }
        }

        if let Some(cursor) = new_cursor {
            if let Err(e) = self
                .store
                .advance_account_cursor(account.username.as_str(), &cursor, Utc::now())
                .await
            {
                warn!("advance_account_cursor failed: {}", e);
            }
        }
    }
}
