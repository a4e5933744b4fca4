// [apps/orchestrator/src/services/source_coordinator.rs]
/*!
 * =================================================================
 * APARATO: SOURCE COORDINATOR
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L2-APP)
 * RESPONSABILIDAD: TRADUCIR EL CALENDARIO DE POLLING Y LOS EMPUJONES
 *                  DE WEBHOOK EN UN ÚNICO FLUJO DE DISPARADORES DE
 *                  INGESTA, COALESCIENDO RÁFAGAS DE PUSH CONTRA EL
 *                  ESPACIADO MÍNIMO CONFIGURADO
 *
 * No hay un temporizador por cuenta: una única rejilla de verificación
 * barre `monitored_accounts()` cada pocos segundos y decide, cuenta por
 * cuenta, si ya venció su `poll_interval_s`. Los eventos push no llaman
 * a la fuente directamente — solo adelantan el reloj de esa cuenta si
 * ha pasado al menos `min_poll_spacing_s` desde el último disparo; en
 * caso contrario quedan coalescidos en el siguiente barrido.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use courier_domain_models::AccountUsername;
use courier_infra_store::Store;

use crate::config::ConfigSnapshot;
use crate::state::mode::OperationalGate;
use crate::state::ComponentHealth;

/// Motivo que originó un disparador de ingesta. El pipeline de ingesta lo
/// trata de forma uniforme salvo por `Forced`, que se sirve sin pasar por
/// la comprobación de espaciado mínimo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Scheduled,
    Push,
    Forced,
}

/// Señal de disparo de ingesta para una cuenta concreta.
#[derive(Debug, Clone)]
pub struct PollTrigger {
    pub account: AccountUsername,
    pub reason: TriggerReason,
}

/// Evento de push ya verificado y resuelto a una cuenta monitoreada. El
/// handler HTTP hace la verificación de firma y la resolución de cuenta
/// *antes* de encolar esto — este servicio solo decide el coalescing.
#[derive(Debug, Clone)]
pub struct PushSignal {
    pub account: AccountUsername,
    pub received_at: DateTime<Utc>,
}

pub type TriggerSender = mpsc::Sender<PollTrigger>;
pub type TriggerReceiver = mpsc::Receiver<PollTrigger>;
pub type PushSender = mpsc::Sender<PushSignal>;
pub type PushReceiver = mpsc::Receiver<PushSignal>;

#[derive(Debug, Clone, Copy, Default)]
struct CoalesceState {
    last_triggered_at: Option<DateTime<Utc>>,
}

/// Cadencia de la rejilla de verificación del calendario. Más fina que
/// `poll_interval_s` para que cuentas con intervalos distintos no esperen
/// al múltiplo común más lento.
const SCHEDULER_GRANULARITY_S: u64 = 5;

pub struct SourceCoordinatorService {
    store: Arc<dyn Store>,
    config: Arc<ConfigSnapshot>,
    gate: Arc<OperationalGate>,
    health: Arc<ComponentHealth>,
    trigger_tx: TriggerSender,
    coalesce: DashMap<AccountUsername, CoalesceState>,
}

impl SourceCoordinatorService {
    pub fn new(
        store: Arc<dyn Store>,
        config: Arc<ConfigSnapshot>,
        gate: Arc<OperationalGate>,
        health: Arc<ComponentHealth>,
        trigger_tx: TriggerSender,
    ) -> Self {
        Self {
            store,
            config,
            gate,
            health,
            trigger_tx,
            coalesce: DashMap::new(),
        }
    }

    #[instrument(skip(self, push_rx))]
    pub async fn run(self, mut push_rx: PushReceiver) {
        info!("📡 [SOURCE_COORDINATOR_ONLINE]: calendar sweep every {}s", SCHEDULER_GRANULARITY_S);
        let mut sweep = tokio::time::interval(Duration::from_secs(SCHEDULER_GRANULARITY_S));

        loop {
            tokio::select! {
                _ = self.gate.until_draining() => {
                    info!("📡 [SOURCE_COORDINATOR_DRAINING]: intake sweep halted");
                    break;
                }
                _ = sweep.tick() => {
                    self.sweep_calendar().await;
                }
                signal = push_rx.recv() => {
                    match signal {
                        Some(signal) => self.handle_push(signal).await,
                        None => {
                            warn!("📡 [SOURCE_COORDINATOR_STALL]: push channel closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn sweep_calendar(&self) {
        let accounts = match self.store.monitored_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("📡 [CALENDAR_SWEEP_FAULT]: could not list monitored accounts: {}", e);
                return;
            }
        };

        let now = Utc::now();
        for account in accounts {
            let due = self
                .coalesce
                .get(&account.username)
                .map(|state| {
                    state
                        .last_triggered_at
                        .map(|last| now - last >= chrono::Duration::seconds(self.config.poll_interval_s as i64))
                        .unwrap_or(true)
                })
                .unwrap_or(true);

            if due {
                self.emit(account.username, TriggerReason::Scheduled, now);
            }
        }
    }

    async fn handle_push(&self, signal: PushSignal) {
        let spacing_elapsed = self
            .coalesce
            .get(&signal.account)
            .and_then(|state| state.last_triggered_at)
            .map(|last| signal.received_at - last >= self.config.min_poll_spacing())
            .unwrap_or(true);

        if spacing_elapsed {
            self.emit(signal.account, TriggerReason::Push, signal.received_at);
        } else {
            self.health.record_push_coalesced();
            debug!("📡 [PUSH_COALESCED]: account {} within min_poll_spacing_s, folded into next sweep", signal.account);
        }
    }

    fn emit(&self, account: AccountUsername, reason: TriggerReason, at: DateTime<Utc>) {
        self.coalesce.insert(
            account.clone(),
            CoalesceState {
                last_triggered_at: Some(at),
            },
        );

        match self.trigger_tx.try_send(PollTrigger { account: account.clone(), reason }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                if reason == TriggerReason::Scheduled {
                    self.health.record_scheduled_trigger_dropped();
                }
                warn!("📡 [TRIGGER_QUEUE_SATURATED]: dropping {:?} trigger for account {}", reason, account);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("📡 [TRIGGER_QUEUE_CLOSED]: ingest pipeline receiver gone");
            }
        }
    }
}

static HANDLE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([A-Za-z0-9_]{1,32})").unwrap());

/// Extrae el nombre de cuenta de un payload de webhook de forma robusta a
/// las tres formas documentadas del proveedor: campo directo, URL del post,
/// o texto de título con mención `@handle`.
pub fn extract_username(payload: &Value) -> Option<String> {
    if let Some(direct) = payload
        .get("account")
        .or_else(|| payload.get("username"))
        .and_then(Value::as_str)
    {
        let trimmed = direct.trim_start_matches('@');
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    if let Some(link) = payload.get("link").or_else(|| payload.get("url")).and_then(Value::as_str) {
        if let Some(username) = username_from_link(link) {
            return Some(username);
        }
    }

    for field in ["title", "feed_title", "channel_title", "author_name"] {
        if let Some(text) = payload.get(field).and_then(Value::as_str) {
            if let Some(username) = username_from_handle_text(text) {
                return Some(username);
            }
        }
    }

    None
}

fn username_from_link(link: &str) -> Option<String> {
    let without_query = link.split(['?', '#']).next().unwrap_or(link);
    let segments: Vec<&str> = without_query.trim_end_matches('/').split('/').collect();
    let status_index = segments.iter().position(|s| *s == "status" || *s == "statuses")?;
    if status_index == 0 {
        return None;
    }
    let candidate = segments[status_index - 1].trim_start_matches('@');
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

fn username_from_handle_text(text: &str) -> Option<String> {
    HANDLE_PATTERN.captures(text).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_username_prefers_direct_field() {
        let payload = serde_json::json!({"account": "@Foo", "title": "someone else @bar"});
        assert_eq!(extract_username(&payload).as_deref(), Some("Foo"));
    }

    #[test]
    fn extract_username_parses_status_link() {
        let payload = serde_json::json!({"link": "https://source.invalid/alice/status/12345"});
        assert_eq!(extract_username(&payload).as_deref(), Some("alice"));
    }

    #[test]
    fn extract_username_parses_handle_in_title() {
        let payload = serde_json::json!({"title": "New post from @bobby_tables"});
        assert_eq!(extract_username(&payload).as_deref(), Some("bobby_tables"));
    }

    #[test]
    fn extract_username_returns_none_when_nothing_matches() {
        let payload = serde_json::json!({"foo": "bar"});
        assert_eq!(extract_username(&payload), None);
    }
}
