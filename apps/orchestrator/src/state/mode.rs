// [apps/orchestrator/src/state/mode.rs]
/*!
 * =================================================================
 * APARATO: OPERATIONAL GATE
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: SEÑALIZAR EL MODO DE VIDA DEL PROCESO AL RESTO DE
 *                  LOS COMPONENTES, SIN ACOPLARLOS AL KERNEL
 *
 * Dos estados bastan para el pipeline: el proceso acepta intake y
 * reclama trabajo normalmente, o está drenando (dejó de aceptar
 * intake nuevo y los workers se apagan en cuanto agotan lo que ya
 * tenían en mano). No hay un tercer estado "fatal": una escalada de
 * supervisor se comunica aparte, por `EscalationSignal`.
 * =================================================================
 */

use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use tokio::sync::Notify;

const OPERATIONAL: u8 = 0;
const DRAINING: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Operational,
    Draining,
}

pub struct OperationalGate {
    mode: AtomicU8,
    notify: Notify,
    started_at: DateTime<Utc>,
    draining_since: OnceCell<DateTime<Utc>>,
}

impl OperationalGate {
    pub fn new() -> Self {
        Self {
            mode: AtomicU8::new(OPERATIONAL),
            notify: Notify::new(),
            started_at: Utc::now(),
            draining_since: OnceCell::new(),
        }
    }

    pub fn mode(&self) -> SystemMode {
        match self.mode.load(Ordering::SeqCst) {
            DRAINING => SystemMode::Draining,
            _ => SystemMode::Operational,
        }
    }

    pub fn accepts_intake(&self) -> bool {
        self.mode() == SystemMode::Operational
    }

    /// Idempotente: llamadas repetidas tras la primera son no-ops.
    pub fn begin_draining(&self) {
        self.mode.store(DRAINING, Ordering::SeqCst);
        let _ = self.draining_since.set(Utc::now());
        self.notify.notify_waiters();
    }

    /// Se resuelve la primera vez que el modo pasa a `Draining`. Los
    /// bucles de los daemons lo corren dentro de un `tokio::select!`
    /// junto a su temporizador normal de trabajo.
    pub async fn until_draining(&self) {
        if self.mode() == SystemMode::Draining {
            return;
        }
        self.notify.notified().await;
    }

    pub fn uptime(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// Tiempo restante de la ventana de drenado dada, a contar desde que
    /// comenzó el drenado. Devuelve `None` si el proceso todavía está
    /// operacional (sin ventana que respetar) y `Some(Duration::ZERO)` si
    /// la ventana ya se agotó.
    pub fn remaining_drain(&self, drain_window: std::time::Duration) -> Option<std::time::Duration> {
        let since = self.draining_since.get()?;
        let elapsed = (Utc::now() - *since).to_std().unwrap_or(std::time::Duration::ZERO);
        Some(drain_window.saturating_sub(elapsed))
    }

    /// Se resuelve exactamente `drain_window` después de que comience el
    /// drenado, sin importar si ya estaba en curso o si arranca mientras
    /// esta misma llamada está en vuelo — a diferencia de comprobar
    /// `remaining_drain` una sola vez por adelantado, esto reacciona aunque
    /// el drenado empiece a mitad de una operación ya iniciada.
    pub async fn wait_for_drain_deadline(&self, drain_window: std::time::Duration) {
        self.until_draining().await;
        let remaining = self.remaining_drain(drain_window).unwrap_or(std::time::Duration::ZERO);
        tokio::time::sleep(remaining).await;
    }
}

impl Default for OperationalGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_operational() {
        let gate = OperationalGate::new();
        assert_eq!(gate.mode(), SystemMode::Operational);
        assert!(gate.accepts_intake());
    }

    #[tokio::test]
    async fn until_draining_resolves_immediately_once_draining_begins() {
        let gate = OperationalGate::new();
        gate.begin_draining();
        assert_eq!(gate.mode(), SystemMode::Draining);
        assert!(!gate.accepts_intake());
        gate.until_draining().await;
    }

    #[test]
    fn remaining_drain_is_none_while_operational() {
        let gate = OperationalGate::new();
        assert!(gate.remaining_drain(Duration::seconds(30).to_std().unwrap()).is_none());
    }

    #[test]
    fn remaining_drain_counts_down_once_draining() {
        let gate = OperationalGate::new();
        gate.begin_draining();
        let remaining = gate.remaining_drain(std::time::Duration::from_secs(30)).unwrap();
        assert!(remaining <= std::time::Duration::from_secs(30));
    }
}
