// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION STATE
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ÚNICO PUNTO DE ACCESO A LAS DEPENDENCIAS COMPARTIDAS
 *                  DEL PIPELINE (STORE, ADAPTADORES EXTERNOS, COLAS,
 *                  GOBERNADOR DE TASA) QUE AXUM Y LOS DAEMONS DE FONDO
 *                  NECESITAN POR IGUAL
 *
 * `AppState` solo contiene remitentes de colas (`mpsc::Sender`), nunca
 * receptores: cada receptor tiene exactamente un dueño — el servicio de
 * fondo que lo drena — y vive fuera de este `Clone`able compartido.
 * =================================================================
 */

pub mod mode;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;

use courier_core_rate_governor::RateGovernor;
use courier_domain_models::PostId;
use courier_infra_analyzer_client::Analyzer;
use courier_infra_dispatch_client::Dispatcher;
use courier_infra_source_client::SourceClient;
use courier_infra_store::Store;

use crate::config::ConfigSnapshot;
use crate::services::source_coordinator::{PushSender, TriggerSender};
use crate::state::mode::OperationalGate;

pub type AnalysisHintSender = mpsc::Sender<PostId>;
pub type AnalysisHintReceiver = mpsc::Receiver<PostId>;
pub type DispatchHintSender = mpsc::Sender<PostId>;
pub type DispatchHintReceiver = mpsc::Receiver<PostId>;

/// Contadores y marcas de progreso de bajo costo, consultados por
/// `GET /health` y no persistidos — se reinician en cada arranque.
#[derive(Default)]
pub struct ComponentHealth {
    last_progress: DashMap<String, DateTime<Utc>>,
    push_auth_failures: AtomicU64,
    push_rejected_unmonitored: AtomicU64,
    push_coalesced: AtomicU64,
    scheduled_triggers_dropped: AtomicU64,
}

impl ComponentHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&self, component: &str) {
        self.last_progress.insert(component.to_string(), Utc::now());
    }

    pub fn last_progress(&self, component: &str) -> Option<DateTime<Utc>> {
        self.last_progress.get(component).map(|entry| *entry)
    }

    pub fn record_push_auth_failure(&self) {
        self.push_auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_push_rejected_unmonitored(&self) {
        self.push_rejected_unmonitored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_push_coalesced(&self) {
        self.push_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scheduled_trigger_dropped(&self) {
        self.scheduled_triggers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ComponentHealthSnapshot {
        ComponentHealthSnapshot {
            push_auth_failures: self.push_auth_failures.load(Ordering::Relaxed),
            push_rejected_unmonitored: self.push_rejected_unmonitored.load(Ordering::Relaxed),
            push_coalesced: self.push_coalesced.load(Ordering::Relaxed),
            scheduled_triggers_dropped: self.scheduled_triggers_dropped.load(Ordering::Relaxed),
            components: self
                .last_progress
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComponentHealthSnapshot {
    pub push_auth_failures: u64,
    pub push_rejected_unmonitored: u64,
    pub push_coalesced: u64,
    pub scheduled_triggers_dropped: u64,
    pub components: Vec<(String, DateTime<Utc>)>,
}

/// Remitentes compartidos hacia las colas internas del pipeline. Un único
/// struct para que `AppState` no cargue media docena de campos sueltos.
#[derive(Clone)]
pub struct PipelineQueues {
    pub push_tx: PushSender,
    pub trigger_tx: TriggerSender,
    pub analysis_hint_tx: AnalysisHintSender,
    pub dispatch_hint_tx: DispatchHintSender,
}

/// Estado compartido del proceso. `Clone` es barato: todos los campos son
/// `Arc` o remitentes de canal, nunca datos pesados por valor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub source_client: Arc<dyn SourceClient>,
    pub analyzer: Arc<dyn Analyzer>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub rate_governor: Arc<RateGovernor>,
    pub config: Arc<ConfigSnapshot>,
    pub gate: Arc<OperationalGate>,
    pub queues: PipelineQueues,
    pub health: Arc<ComponentHealth>,
}
