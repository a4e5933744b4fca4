// [apps/orchestrator/src/services/sweeper.rs]
/*!
 * =================================================================
 * APARATO: RETENTION SWEEPER
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L2-APP)
 * RESPONSABILIDAD: PURGAR POSTS EN ESTADO TERMINAL MÁS ANTIGUOS QUE
 *                  `retention_days`, UNA VEZ POR DÍA
 *
 * No hay un daemon separado de "reintentos vencidos": `claim_for_analysis`
 * y `claim_for_dispatch` ya seleccionan filas con `retry_after` cumplido
 * en cada barrido de los propios pools de workers, así que un reintento
 * vencido se recoge en el próximo ciclo de reclamo sin intervención
 * adicional. Este sweeper existe solo para la poda de retención, que
 * ningún otro componente del pipeline tiene motivo para hacer.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use courier_infra_store::Store;

use crate::state::mode::OperationalGate;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub struct RetentionSweeper {
    store: Arc<dyn Store>,
    retention_days: i64,
    gate: Arc<OperationalGate>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn Store>, retention_days: i64, gate: Arc<OperationalGate>) -> Self {
        Self {
            store,
            retention_days,
            gate,
        }
    }

    pub async fn run(self) {
        info!("🧹 [RETENTION_SWEEPER_ONLINE]: retention_days={}", self.retention_days);

        loop {
            tokio::select! {
                _ = self.gate.until_draining() => {
                    info!("🧹 [RETENTION_SWEEPER_DRAINING]");
                    break;
                }
                _ = tokio::time::sleep(SWEEP_INTERVAL) => {
                    self.sweep_once().await;
                }
            }
        }
    }

    async fn sweep_once(&self) {
        match self.store.delete_terminal_posts_older_than(self.retention_days).await {
            Ok(deleted) if deleted > 0 => {
                info!("🧹 [RETENTION_SWEEP]: purged {} terminal post(s)", deleted);
            }
            Ok(_) => {}
            Err(e) => warn!("🧹 [RETENTION_SWEEP_FAULT]: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_infra_store::LibsqlStore;

    #[tokio::test]
    async fn sweep_once_delegates_to_the_store() {
        let store: Arc<dyn Store> = Arc::new(
            LibsqlStore::connect(":memory:", None)
                .await
                .expect("in-memory store should bootstrap"),
        );
        let gate = Arc::new(OperationalGate::new());
        let sweeper = RetentionSweeper::new(store, 30, gate);
        sweeper.sweep_once().await;
    }
}
