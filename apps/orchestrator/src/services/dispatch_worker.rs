// [apps/orchestrator/src/services/dispatch_worker.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH WORKER POOL
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L2-APP)
 * RESPONSABILIDAD: RECLAMAR POSTS ANALYZED, RENDERIZAR EL MENSAJE
 *                  SALIENTE Y ENTREGARLO A LA PLATAFORMA DE CHAT BAJO
 *                  DISCIPLINA DE TASA Y REINTENTO CON BACKOFF
 *
 * Misma arquitectura bomba+`Notify` que el pool de análisis — ver
 * `analysis_worker.rs` para la justificación. El backoff de reintento es
 * exponencial por intento, acotado por `dispatch_max_backoff_s`; superado
 * `dispatch_max_retries` el post pasa a FAILED sin `retry_after`.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use courier_core_rate_governor::{AcquireOutcome, QuotaSignal, RateGovernor};
use courier_domain_models::{Classified, DispatchOutcome, DispatchRecord, Post};
use courier_infra_dispatch_client::{render_message, Dispatcher, DispatcherError, RenderInput};
use courier_infra_store::Store;

use crate::config::ConfigSnapshot;
use crate::state::mode::OperationalGate;
use crate::state::{ComponentHealth, DispatchHintReceiver};

const DISPATCH_BUCKET: &str = "dispatch";
const DISPATCH_ACQUIRE_DEADLINE: Duration = Duration::from_secs(15);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct DispatchWorkerDeps {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub governor: Arc<RateGovernor>,
    pub config: Arc<ConfigSnapshot>,
    pub gate: Arc<OperationalGate>,
    pub health: Arc<ComponentHealth>,
}

pub struct DispatchWorkerPool;

impl DispatchWorkerPool {
    pub fn spawn(
        worker_count: usize,
        deps: Arc<DispatchWorkerDeps>,
        dispatch_hint_rx: DispatchHintReceiver,
    ) -> Vec<JoinHandle<()>> {
        let notify = Arc::new(Notify::new());
        let mut handles = Vec::with_capacity(worker_count + 1);

        handles.push(tokio::spawn(pump(dispatch_hint_rx, notify.clone(), deps.gate.clone())));

        for worker_id in 0..worker_count {
            let deps = deps.clone();
            let notify = notify.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, deps, notify).await;
            }));
        }

        handles
    }
}

async fn pump(mut rx: DispatchHintReceiver, notify: Arc<Notify>, gate: Arc<OperationalGate>) {
    loop {
        tokio::select! {
            _ = gate.until_draining() => break,
            item = rx.recv() => match item {
                Some(_) => notify.notify_one(),
                None => break,
            }
        }
    }
}

#[instrument(skip(deps, notify))]
async fn worker_loop(worker_id: usize, deps: Arc<DispatchWorkerDeps>, notify: Arc<Notify>) {
    info!("📤 [DISPATCH_WORKER_{}_ONLINE]", worker_id);

    loop {
        if !deps.gate.accepts_intake() {
            info!("📤 [DISPATCH_WORKER_{}_DRAINING]: stopping new claims", worker_id);
            break;
        }

        if !deps.config.notifications_enabled {
            tokio::select! {
                _ = deps.gate.until_draining() => break,
                _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
            }
            continue;
        }

        let claimed = match deps.store.claim_for_dispatch(1).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!("📤 [DISPATCH_WORKER_{}_CLAIM_FAULT]: {}", worker_id, e);
                Vec::new()
            }
        };

        if claimed.is_empty() {
            tokio::select! {
                _ = deps.gate.until_draining() => break,
                _ = notify.notified() => {}
                _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
            }
            continue;
        }

        for post in claimed {
            deps.health.touch("dispatch_worker");
            let timed_out = tokio::select! {
                _ = process_post(&deps, &post) => false,
                _ = deps.gate.wait_for_drain_deadline(deps.config.shutdown_drain()) => true,
            };

            if timed_out {
                warn!(
                    "📤 [DISPATCH_WORKER_{}_DRAIN_TIMEOUT]: releasing post {} back to ANALYZED",
                    worker_id, post.id
                );
                let record = DispatchRecord {
                    post_id: post.id.clone(),
                    destination: deps.config.default_destination.clone(),
                    attempt_number: 0,
                    outcome: DispatchOutcome::TransientFail,
                    error_detail: Some("shutdown_drain_timeout".to_string()),
                    sent_at: Utc::now(),
                };
                let _ = deps.store.fail_dispatch(&post.id, record, Some(Utc::now())).await;
            }
        }
    }
}

async fn process_post(deps: &Arc<DispatchWorkerDeps>, post: &Post) {
    let destination = deps.config.default_destination.clone();

    let analysis_output = match deps.store.get_latest_analysis(&post.id).await {
        Ok(analysis) => analysis.output_text,
        Err(e) if deps.config.notify_only_analyzed => {
            warn!("📤 [MISSING_ANALYSIS]: post {} has no analysis row: {}", post.id, e);
            let record = DispatchRecord {
                post_id: post.id.clone(),
                destination,
                attempt_number: 0,
                outcome: DispatchOutcome::PermanentFail,
                error_detail: Some("missing analysis row".to_string()),
                sent_at: Utc::now(),
            };
            let _ = deps.store.fail_dispatch(&post.id, record, None).await;
            return;
        }
        Err(e) => {
            debug!(
                "📤 [ANALYSIS_FALLBACK]: post {} has no analysis row ({}), dispatching raw text (notify_only_analyzed=false)",
                post.id, e
            );
            String::new()
        }
    };

    let next_attempt = match deps
        .store
        .latest_dispatch_attempt_number(post.id.as_str(), &destination)
        .await
    {
        Ok(last) => last + 1,
        Err(e) => {
            warn!("latest_dispatch_attempt_number failed, assuming first attempt: {}", e);
            1
        }
    };

    if let AcquireOutcome::Deny { retry_after } = deps
        .governor
        .acquire(DISPATCH_BUCKET, 1, DISPATCH_ACQUIRE_DEADLINE)
        .await
    {
        debug!("📤 [DISPATCH_BUCKET_EXHAUSTED]: releasing post {} with retry_after={:?}", post.id, retry_after);
        let retry_at = Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or(chrono::Duration::seconds(30));
        let record = DispatchRecord {
            post_id: post.id.clone(),
            destination,
            attempt_number: next_attempt,
            outcome: DispatchOutcome::TransientFail,
            error_detail: Some("dispatch_rate_limited".to_string()),
            sent_at: Utc::now(),
        };
        let _ = deps.store.fail_dispatch(&post.id, record, Some(retry_at)).await;
        return;
    }

    let payload = render_message(&RenderInput {
        account: post.account.as_str(),
        original_text: &post.text,
        analysis_output: &analysis_output,
        created_at: post.created_at,
        markup_enabled: false,
    });

    match deps.dispatcher.send(&destination, &payload).await {
        Ok(ack) => {
            debug!("📤 [DISPATCH_OK]: post {} delivered as {}", post.id, ack.message_id);
            let record = DispatchRecord {
                post_id: post.id.clone(),
                destination,
                attempt_number: next_attempt,
                outcome: DispatchOutcome::Ok,
                error_detail: None,
                sent_at: Utc::now(),
            };
            if let Err(e) = deps.store.complete_dispatch(&post.id, record).await {
                warn!("📤 [COMPLETE_DISPATCH_FAULT]: post {}: {}", post.id, e);
            }
        }
        Err(error) => handle_dispatch_error(deps, post, &destination, next_attempt, error).await,
    }
}

async fn handle_dispatch_error(
    deps: &Arc<DispatchWorkerDeps>,
    post: &Post,
    destination: &str,
    attempt_number: u32,
    error: DispatcherError,
) {
    if let DispatcherError::RateLimited { retry_after_s } = &error {
        deps.governor.observe_quota_signal(
            DISPATCH_BUCKET,
            QuotaSignal {
                remaining: Some(0),
                reset_at: Some(Utc::now() + chrono::Duration::seconds(*retry_after_s as i64)),
            },
        );
    }

    let reason = error.to_string();
    let retryable = error.kind().is_retryable() && attempt_number <= deps.config.dispatch_max_retries;

    let retry_after = if retryable {
        let backoff_s = (2u64.saturating_pow(attempt_number)).min(deps.config.dispatch_max_backoff_s);
        Some(Utc::now() + chrono::Duration::seconds(backoff_s as i64))
    } else {
        None
    };

    warn!(
        "📤 [DISPATCH_FAILED]: post {} attempt {}: {} (retryable={})",
        post.id, attempt_number, reason, retryable
    );

    let record = DispatchRecord {
        post_id: post.id.clone(),
        destination: destination.to_string(),
        attempt_number,
        outcome: if retryable {
            DispatchOutcome::TransientFail
        } else {
            DispatchOutcome::PermanentFail
        },
        error_detail: Some(reason),
        sent_at: Utc::now(),
    };

    let _ = deps.store.fail_dispatch(&post.id, record, retry_after).await;
}
