// [apps/orchestrator/src/services/supervisor.rs]
/*!
 * =================================================================
 * APARATO: SUPERVISOR
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L2-APP)
 * RESPONSABILIDAD: REINICIAR DAEMONS REINICIABLES CON BACKOFF
 *                  EXPONENCIAL ACOTADO, ESCALANDO AL PROCESO TRAS
 *                  DEMASIADOS FALLOS CONSECUTIVOS
 *
 * Generaliza el patrón que los daemons de mantenimiento del ecosistema
 * repetían cada uno por su cuenta (un bucle con `interval().tick()` sin
 * protección ante pánico) a un único combinador reutilizable. Solo se usa
 * para daemons que no son dueños exclusivos de un recurso no clonable
 * (un `mpsc::Receiver`, por ejemplo) — el coordinador de fuentes y los
 * pools de workers se lanzan directamente desde el kernel porque un
 * reinicio tendría que reconstruir su receptor, que ya se movió; su
 * resiliencia ante fallos vive en el manejo de errores por-ítem dentro
 * de cada bucle, no en reinicio externo.
 * =================================================================
 */

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::state::mode::{OperationalGate, SystemMode};

/// Señal emitida cuando un daemon supervisado agotó sus reintentos. El
/// kernel la traduce en el código de salida de escalada del proceso.
#[derive(Debug, Clone)]
pub struct EscalationSignal {
    pub component: String,
    pub consecutive_failures: u32,
}

const BASE_BACKOFF: Duration = Duration::from_millis(200);

fn compute_backoff(consecutive_failures: u32, backoff_cap: Duration) -> Duration {
    let exponent = consecutive_failures.min(16);
    BASE_BACKOFF
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(backoff_cap)
}

/// Ejecuta `task_fn()` en bucle, reiniciándola con backoff exponencial
/// acotado si termina (limpiamente fuera de drenado, o por pánico). Tras
/// `max_failures` fallos consecutivos, emite una `EscalationSignal` y
/// abandona la supervisión de este daemon.
pub async fn supervise<F, Fut>(
    name: &str,
    backoff_cap: Duration,
    max_failures: u32,
    gate: Arc<OperationalGate>,
    escalate_tx: mpsc::Sender<EscalationSignal>,
    task_fn: F,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut consecutive_failures: u32 = 0;

    loop {
        if gate.mode() == SystemMode::Draining {
            info!("🛡️  [SUPERVISOR]: {} not restarted, process is draining", name);
            return;
        }

        let handle = tokio::spawn(task_fn());

        match handle.await {
            Ok(()) => {
                if gate.mode() == SystemMode::Draining {
                    info!("🛡️  [SUPERVISOR]: {} exited cleanly during drain", name);
                    return;
                }
                warn!("🛡️  [SUPERVISOR]: {} exited unexpectedly, restarting", name);
                consecutive_failures += 1;
            }
            Err(join_error) => {
                warn!("🛡️  [SUPERVISOR]: {} panicked: {}", name, join_error);
                consecutive_failures += 1;
            }
        }

        if consecutive_failures >= max_failures {
            error!(
                "🛡️  [SUPERVISOR_ESCALATION]: {} failed {} consecutive times, escalating to process",
                name, consecutive_failures
            );
            let _ = escalate_tx
                .send(EscalationSignal {
                    component: name.to_string(),
                    consecutive_failures,
                })
                .await;
            return;
        }

        let backoff = compute_backoff(consecutive_failures, backoff_cap);
        tokio::select! {
            _ = gate.until_draining() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_respects_cap() {
        let cap = Duration::from_secs(60);
        assert_eq!(compute_backoff(0, cap), Duration::from_millis(200));
        assert_eq!(compute_backoff(1, cap), Duration::from_millis(400));
        assert_eq!(compute_backoff(10, cap), cap);
    }

    #[tokio::test]
    async fn escalates_after_max_failures() {
        let gate = Arc::new(OperationalGate::new());
        let (tx, mut rx) = mpsc::channel(1);

        supervise("flaky", Duration::from_millis(1), 2, gate, tx, || async {
            panic!("always fails");
        })
        .await;

        let signal = rx.recv().await.expect("escalation signal expected");
        assert_eq!(signal.component, "flaky");
        assert_eq!(signal.consecutive_failures, 2);
    }
}
