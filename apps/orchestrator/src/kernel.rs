// [apps/orchestrator/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR KERNEL
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: ARRANQUE EN ORDEN DE DEPENDENCIAS, IGNICIÓN DE
 *                  DAEMONS DE FONDO, Y CICLO DE VIDA DE DRENADO
 *                  ORDENADO HASTA LA SALIDA DEL PROCESO
 *
 * Dos fases, igual que antes de la transformación: `ignite()` conecta
 * el Store y construye el `AppState`; `launch()` levanta los daemons de
 * fondo y el servidor Axum, y bloquea hasta que el proceso recibe una
 * señal de apagado o un daemon supervisado escala. Al recibir cualquiera
 * de las dos, `OperationalGate::begin_draining()` corta el intake y se
 * concede `shutdown_drain_s` para que los workers liberen lo que tenían
 * en mano antes de que el proceso termine.
 * =================================================================
 */

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use courier_core_rate_governor::{RateGovernor, RateLimiterConfig};
use courier_infra_analyzer_client::HttpAnalyzer;
use courier_infra_dispatch_client::HttpDispatcher;
use courier_infra_source_client::HttpSourceClient;
use courier_infra_store::{LibsqlStore, Store};

use crate::config::ConfigSnapshot;
use crate::routes::build_router;
use crate::services::analysis_worker::{AnalysisWorkerDeps, AnalysisWorkerPool};
use crate::services::dispatch_worker::{DispatchWorkerDeps, DispatchWorkerPool};
use crate::services::ingest_pipeline::IngestPipelineService;
use crate::services::source_coordinator::SourceCoordinatorService;
use crate::services::supervisor::{supervise, EscalationSignal};
use crate::services::sweeper::RetentionSweeper;
use crate::state::mode::OperationalGate;
use crate::state::{AppState, ComponentHealth, PipelineQueues};

const DISPATCH_WORKER_COUNT: usize = 2;
const SWEEPER_BACKOFF_CAP: Duration = Duration::from_secs(30);
const SWEEPER_MAX_FAILURES: u32 = 5;

/// Código de salida devuelto por `main` tras un apagado limpio o escalado.
pub type ExitCode = i32;

pub enum IgniteError {
    Store(String),
}

impl std::fmt::Display for IgniteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgniteError::Store(reason) => write!(f, "store connection failed: {}", reason),
        }
    }
}

pub struct OrchestratorKernel {
    state: AppState,
    push_rx: crate::services::source_coordinator::PushReceiver,
    trigger_rx: crate::services::source_coordinator::TriggerReceiver,
    analysis_hint_rx: crate::state::AnalysisHintReceiver,
    dispatch_hint_rx: crate::state::DispatchHintReceiver,
}

impl OrchestratorKernel {
    #[instrument(skip(config))]
    pub async fn ignite(config: ConfigSnapshot) -> Result<Self, IgniteError> {
        let store = LibsqlStore::connect(&config.database_url, config.database_token.clone())
            .await
            .map_err(|e| IgniteError::Store(e.to_string()))?;
        let store: Arc<dyn Store> = Arc::new(store);

        let http_timeout = Duration::from_secs(15);
        let source_client = Arc::new(HttpSourceClient::new(
            config.source_base_url.clone(),
            config.source_bearer_token.clone(),
            http_timeout,
        ));
        let analyzer = Arc::new(HttpAnalyzer::new(
            config.analyzer_base_url.clone(),
            config.analyzer_bearer_token.clone(),
            config.analyze_timeout(),
        ));
        let dispatcher = Arc::new(HttpDispatcher::new(
            config.dispatch_base_url.clone(),
            config.dispatch_bearer_token.clone(),
            http_timeout,
        ));

        // Los tres buckets son de cara a un upstream capaz de devolver 429 con
        // cabeceras de cuota (`observe_quota_signal` en cada worker), así que
        // todos usan Adaptive en vez de TokenBucket para que esa señal tenga
        // algún efecto real sobre la tasa servida.
        let governor = Arc::new(RateGovernor::new());
        governor.configure(
            "analyzer",
            RateLimiterConfig::Adaptive {
                rate_per_second: config.analysis_concurrency as u32,
                burst_capacity: config.analysis_concurrency as u32,
            },
        );
        governor.configure(
            "dispatch",
            RateLimiterConfig::Adaptive {
                rate_per_second: config.dispatch_rate_per_s,
                burst_capacity: config.dispatch_rate_per_s.max(1),
            },
        );
        governor.configure(
            "source",
            RateLimiterConfig::Adaptive {
                rate_per_second: 5,
                burst_capacity: 5,
            },
        );

        let gate = Arc::new(OperationalGate::new());
        let health = Arc::new(ComponentHealth::new());
        let config = Arc::new(config);

        let (push_tx, push_rx) = mpsc::channel(config.push_queue_depth);
        let (trigger_tx, trigger_rx) = mpsc::channel(config.ingest_queue_depth);
        let (analysis_hint_tx, analysis_hint_rx) = mpsc::channel(config.ingest_queue_depth);
        let (dispatch_hint_tx, dispatch_hint_rx) = mpsc::channel(config.ingest_queue_depth);

        let queues = PipelineQueues {
            push_tx,
            trigger_tx,
            analysis_hint_tx,
            dispatch_hint_tx,
        };

        let state = AppState {
            store,
            source_client,
            analyzer,
            dispatcher,
            rate_governor: governor,
            config,
            gate,
            queues,
            health,
        };

        Ok(Self {
            state,
            push_rx,
            trigger_rx,
            analysis_hint_rx,
            dispatch_hint_rx,
        })
    }

    pub async fn launch(self) -> ExitCode {
        let OrchestratorKernel {
            state,
            push_rx,
            trigger_rx,
            analysis_hint_rx,
            dispatch_hint_rx,
        } = self;

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        let coordinator = SourceCoordinatorService::new(
            state.store.clone(),
            state.config.clone(),
            state.gate.clone(),
            state.health.clone(),
            state.queues.trigger_tx.clone(),
        );
        handles.push(tokio::spawn(coordinator.run(push_rx)));

        let ingest = IngestPipelineService::new(
            state.store.clone(),
            state.source_client.clone(),
            state.rate_governor.clone(),
            state.config.clone(),
            state.gate.clone(),
            state.health.clone(),
            state.queues.analysis_hint_tx.clone(),
        );
        handles.push(tokio::spawn(ingest.run(trigger_rx)));

        let analysis_deps = Arc::new(AnalysisWorkerDeps {
            store: state.store.clone(),
            analyzer: state.analyzer.clone(),
            governor: state.rate_governor.clone(),
            config: state.config.clone(),
            gate: state.gate.clone(),
            health: state.health.clone(),
            dispatch_hint_tx: state.queues.dispatch_hint_tx.clone(),
        });
        handles.extend(AnalysisWorkerPool::spawn(
            state.config.analysis_concurrency,
            analysis_deps,
            analysis_hint_rx,
        ));

        let dispatch_deps = Arc::new(DispatchWorkerDeps {
            store: state.store.clone(),
            dispatcher: state.dispatcher.clone(),
            governor: state.rate_governor.clone(),
            config: state.config.clone(),
            gate: state.gate.clone(),
            health: state.health.clone(),
        });
        handles.extend(DispatchWorkerPool::spawn(
            DISPATCH_WORKER_COUNT,
            dispatch_deps,
            dispatch_hint_rx,
        ));

        let (escalate_tx, escalate_rx) = mpsc::channel::<EscalationSignal>(4);

        {
            let store = state.store.clone();
            let gate = state.gate.clone();
            let retention_days = state.config.retention_days;
            handles.push(tokio::spawn(supervise(
                "retention_sweeper",
                SWEEPER_BACKOFF_CAP,
                SWEEPER_MAX_FAILURES,
                gate.clone(),
                escalate_tx,
                move || {
                    let sweeper = RetentionSweeper::new(store.clone(), retention_days, gate.clone());
                    sweeper.run()
                },
            )));
        }

        let bind_address = SocketAddr::new("0.0.0.0".parse::<IpAddr>().unwrap(), state.config.listen_port);
        let listener = match tokio::net::TcpListener::bind(bind_address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("💀 [KERNEL_BIND_FAULT]: could not bind {}: {}", bind_address, e);
                return 2;
            }
        };

        info!("🚀 [KERNEL_ONLINE]: listening at {}", bind_address);

        let escalated = Arc::new(AtomicBool::new(false));
        let router = build_router(state.clone());
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal(state.gate.clone(), escalate_rx, escalated.clone()));

        if let Err(e) = server.await {
            error!("💀 [KERNEL_SERVER_FAULT]: {}", e);
        }

        let drain_window = state.config.shutdown_drain();
        info!("🛑 [KERNEL_DRAINING]: waiting up to {:?} for in-flight work", drain_window);

        let all_handles = futures::future::join_all(handles);
        if tokio::time::timeout(drain_window, all_handles).await.is_err() {
            warn!("🛑 [KERNEL_DRAIN_TIMEOUT]: some workers did not finish within the drain window");
        }

        if escalated.load(Ordering::SeqCst) {
            4
        } else {
            0
        }
    }
}

#[instrument(skip_all)]
async fn shutdown_signal(
    gate: Arc<OperationalGate>,
    mut escalate_rx: mpsc::Receiver<EscalationSignal>,
    escalated: Arc<AtomicBool>,
) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("🛑 [SHUTDOWN_SIGNAL]: SIGINT received"),
        _ = terminate => info!("🛑 [SHUTDOWN_SIGNAL]: SIGTERM received"),
        signal = escalate_rx.recv() => {
            if let Some(signal) = signal {
                error!(
                    "💀 [SUPERVISOR_ESCALATION]: {} failed {} consecutive times",
                    signal.component, signal.consecutive_failures
                );
                escalated.store(true, Ordering::SeqCst);
            }
        }
    }

    gate.begin_draining();
}
