// [apps/orchestrator/src/services/analysis_worker.rs]
/*!
 * =================================================================
 * APARATO: ANALYSIS WORKER POOL
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L2-APP)
 * RESPONSABILIDAD: RECLAMAR POSTS NEW, SOMETERLOS AL MODELO DE ANÁLISIS
 *                  BAJO DISCIPLINA DE TASA Y COSTO, Y TRANSICIONARLOS
 *                  A ANALYZED O DE VUELTA A NEW/FAILED
 *
 * El canal `analysis_hint_rx` no se reparte entre los `N` workers
 * directamente — `mpsc::Receiver` tiene un único consumidor. Una tarea
 * "bomba" dedicada lo drena y despierta a un trabajador dormido vía
 * `Notify`; el trabajador despierto vuelve a reclamar por lotes contra
 * el Store, que es la fuente de verdad. Esto preserva la semántica de
 * "bloquear en una variable de condición" sin violar el tipo del canal.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use courier_core_rate_governor::{AcquireOutcome, QuotaSignal, RateGovernor};
use courier_domain_models::{Analysis, Classified, ErrorKind, Post};
use courier_infra_analyzer_client::{Analyzer, AnalyzerError};
use courier_infra_store::Store;

use crate::config::ConfigSnapshot;
use crate::state::mode::OperationalGate;
use crate::state::{AnalysisHintReceiver, ComponentHealth, DispatchHintSender};

const ANALYZER_BUCKET: &str = "analyzer";
const ANALYZER_ACQUIRE_DEADLINE: Duration = Duration::from_secs(15);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DISPATCH_HINT_SEND_DEADLINE: Duration = Duration::from_millis(500);
const DEFAULT_RETRY_BACKOFF_S: i64 = 60;

pub struct AnalysisWorkerDeps {
    pub store: Arc<dyn Store>,
    pub analyzer: Arc<dyn Analyzer>,
    pub governor: Arc<RateGovernor>,
    pub config: Arc<ConfigSnapshot>,
    pub gate: Arc<OperationalGate>,
    pub health: Arc<ComponentHealth>,
    pub dispatch_hint_tx: DispatchHintSender,
}

pub struct AnalysisWorkerPool;

impl AnalysisWorkerPool {
    /// Lanza `worker_count` tareas consumidoras más una tarea "bomba" que
    /// traduce el canal `analysis_hint_rx` en despertares de `Notify`.
    pub fn spawn(
        worker_count: usize,
        deps: Arc<AnalysisWorkerDeps>,
        analysis_hint_rx: AnalysisHintReceiver,
    ) -> Vec<JoinHandle<()>> {
        let notify = Arc::new(Notify::new());
        let mut handles = Vec::with_capacity(worker_count + 1);

        handles.push(tokio::spawn(pump(analysis_hint_rx, notify.clone(), deps.gate.clone())));

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

async fn pump(mut rx: AnalysisHintReceiver, notify: Arc<Notify>, gate: Arc<OperationalGate>) {
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
async fn worker_loop(worker_id: usize, deps: Arc<AnalysisWorkerDeps>, notify: Arc<Notify>) {
    info!("🧠 [ANALYSIS_WORKER_{}_ONLINE]", worker_id);

    loop {
        if !deps.gate.accepts_intake() {
            info!("🧠 [ANALYSIS_WORKER_{}_DRAINING]: stopping new claims", worker_id);
            break;
        }

        let claimed = match deps.store.claim_for_analysis(deps.config.analysis_batch).await {
            Ok(posts) => posts,
            Err(e) => {
                warn!("🧠 [ANALYSIS_WORKER_{}_CLAIM_FAULT]: {}", worker_id, e);
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
            deps.health.touch("analysis_worker");
            let timed_out = tokio::select! {
                _ = process_post(&deps, &post) => false,
                _ = deps.gate.wait_for_drain_deadline(deps.config.shutdown_drain()) => true,
            };

            if timed_out {
                warn!(
                    "🧠 [ANALYSIS_WORKER_{}_DRAIN_TIMEOUT]: releasing post {} back to NEW",
                    worker_id, post.id
                );
                let _ = deps
                    .store
                    .fail_analysis(&post.id, "shutdown_drain_timeout", Some(Utc::now()))
                    .await;
            }
        }
    }
}

async fn process_post(deps: &Arc<AnalysisWorkerDeps>, post: &Post) {
    if let Some(ceiling_breach) = check_cost_ceiling(deps).await {
        debug!("🧠 [COST_CEILING_DEFER]: {} for post {}", ceiling_breach, post.id);
        let _ = deps
            .store
            .fail_analysis(&post.id, &ceiling_breach, Some(Utc::now() + chrono::Duration::seconds(DEFAULT_RETRY_BACKOFF_S)))
            .await;
        return;
    }

    if let AcquireOutcome::Deny { retry_after } = deps
        .governor
        .acquire(ANALYZER_BUCKET, 1, ANALYZER_ACQUIRE_DEADLINE)
        .await
    {
        debug!("🧠 [ANALYZER_BUCKET_EXHAUSTED]: releasing post {} with retry_after={:?}", post.id, retry_after);
        let retry_at = Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or(chrono::Duration::seconds(DEFAULT_RETRY_BACKOFF_S));
        let _ = deps.store.fail_analysis(&post.id, "analyzer_rate_limited", Some(retry_at)).await;
        return;
    }

    let prompt = render_prompt(&deps.config.analyzer_prompt, post);
    let params = json!({});

    let started_at = std::time::Instant::now();
    let analyzed = tokio::time::timeout(
        deps.config.analyze_timeout(),
        deps.analyzer.analyze(&prompt, &deps.config.analyzer_model, &params),
    )
    .await;

    match analyzed {
        Err(_elapsed) => {
            warn!("🧠 [ANALYZE_TIMEOUT]: post {} exceeded {:?}", post.id, deps.config.analyze_timeout());
            let retry_at = Utc::now() + chrono::Duration::seconds(DEFAULT_RETRY_BACKOFF_S);
            let _ = deps.store.fail_analysis(&post.id, "analyze_timeout", Some(retry_at)).await;
        }
        Ok(Err(e)) => {
            handle_analyzer_error(deps, post, e).await;
        }
        Ok(Ok(outcome)) => {
            let analysis = Analysis {
                post_id: post.id.clone(),
                model: deps.config.analyzer_model.clone(),
                parameters_snapshot: params,
                prompt_snapshot: prompt,
                output_text: outcome.text,
                tokens_used: outcome.tokens_used,
                cost_estimate: outcome.cost_estimate,
                elapsed_ms: started_at.elapsed().as_millis() as u64,
                created_at: Utc::now(),
            };

            match deps.store.complete_analysis(&post.id, analysis).await {
                Ok(()) => {
                    if tokio::time::timeout(DISPATCH_HINT_SEND_DEADLINE, deps.dispatch_hint_tx.send(post.id.clone()))
                        .await
                        .is_err()
                    {
                        debug!("dispatch hint queue saturated for {}, claim sweep will still find it", post.id);
                    }
                }
                Err(e) => warn!("🧠 [COMPLETE_ANALYSIS_FAULT]: post {}: {}", post.id, e),
            }
        }
    }
}

async fn handle_analyzer_error(deps: &Arc<AnalysisWorkerDeps>, post: &Post, error: AnalyzerError) {
    let reason = error.to_string();
    let retryable = error.kind().is_retryable();

    let rate_limit_backoff_s = if let AnalyzerError::RateLimited { retry_after_s } = &error {
        deps.governor.observe_quota_signal(
            ANALYZER_BUCKET,
            QuotaSignal {
                remaining: Some(0),
                reset_at: Some(Utc::now() + chrono::Duration::seconds(*retry_after_s as i64)),
            },
        );
        Some(*retry_after_s as i64)
    } else {
        None
    };

    let retry_after = if retryable {
        let backoff_s = rate_limit_backoff_s.unwrap_or(DEFAULT_RETRY_BACKOFF_S);
        Some(Utc::now() + chrono::Duration::seconds(backoff_s))
    } else {
        None
    };

    warn!("🧠 [ANALYZE_FAILED]: post {}: {} (retryable={})", post.id, reason, retryable);
    let _ = deps.store.fail_analysis(&post.id, &reason, retry_after).await;
}

async fn check_cost_ceiling(deps: &Arc<AnalysisWorkerDeps>) -> Option<String> {
    let start_of_day = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();

    match deps.store.cumulative_analysis_cost_since(start_of_day).await {
        Ok(spent) if spent >= deps.config.daily_cost_ceiling => {
            Some(format!("daily_cost_ceiling_reached: {:.2} >= {:.2}", spent, deps.config.daily_cost_ceiling))
        }
        Ok(_) => None,
        Err(e) => {
            warn!("cumulative_analysis_cost_since failed, proceeding without a ceiling check: {}", e);
            None
        }
    }
}

fn render_prompt(template: &str, post: &Post) -> String {
    template
        .replace("{author}", post.account.as_str())
        .replace("{created_at}", &post.created_at.to_rfc3339())
        .replace("{text}", &post.text)
}
