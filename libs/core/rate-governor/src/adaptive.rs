// [libs/core/rate-governor/src/adaptive.rs]
/*!
 * =================================================================
 * APARATO: ADAPTIVE LIMITER
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L2)
 * RESPONSABILIDAD: AUTO-AJUSTE DE TASA A PARTIR DE SEÑALES DE CUOTA
 *                  OBSERVADAS DEL PROVEEDOR EXTERNO
 *
 * Envuelve otro `RateLimiter` (ventana deslizante o token bucket) y lo
 * complementa con una compuerta preventiva: cuando el proveedor anuncia
 * cuota casi agotada vía `rate_limit_remaining`/`rate_limit_reset`, el
 * gobernador suprime nuevas solicitudes hasta el instante de reinicio en
 * vez de esperar a que el límite local también las rechace.
 * =================================================================
 */

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::limiter::{AcquireOutcome, QuotaSignal, RateLimiter};

/// Bajo este umbral de solicitudes restantes, el gobernador se auto-suprime
/// hasta el instante de reinicio anunciado por el proveedor.
const LOW_QUOTA_THRESHOLD: u32 = 5;

pub struct AdaptiveLimiter {
    inner: Arc<dyn RateLimiter>,
    /// Epoch millis hasta el cual las nuevas solicitudes se deniegan
    /// preventivamente. `0` significa "sin supresión activa".
    suppressed_until_epoch_ms: AtomicI64,
}

impl AdaptiveLimiter {
    pub fn wrapping(inner: Arc<dyn RateLimiter>) -> Self {
        Self {
            inner,
            suppressed_until_epoch_ms: AtomicI64::new(0),
        }
    }
}

#[async_trait]
impl RateLimiter for AdaptiveLimiter {
    async fn acquire(&self, cost: u32, deadline: Duration) -> AcquireOutcome {
        let suppressed_until = self.suppressed_until_epoch_ms.load(Ordering::Relaxed);
        if suppressed_until > 0 {
            let now_ms = Utc::now().timestamp_millis();
            if now_ms < suppressed_until {
                let retry_after = Duration::from_millis((suppressed_until - now_ms) as u64);
                return AcquireOutcome::Deny { retry_after };
            }
            self.suppressed_until_epoch_ms.store(0, Ordering::Relaxed);
        }

        self.inner.acquire(cost, deadline).await
    }

    fn observe_quota_signal(&self, signal: QuotaSignal) {
        if let (Some(remaining), Some(reset_at)) = (signal.remaining, signal.reset_at) {
            if remaining <= LOW_QUOTA_THRESHOLD {
                self.suppressed_until_epoch_ms
                    .store(reset_at.timestamp_millis(), Ordering::Relaxed);
            }
        }
        self.inner.observe_quota_signal(signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_bucket::TokenBucketLimiter;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn suppresses_preemptively_on_low_remaining_quota() {
        let adaptive = AdaptiveLimiter::wrapping(Arc::new(TokenBucketLimiter::new(100, 100)));

        adaptive.observe_quota_signal(QuotaSignal {
            remaining: Some(1),
            reset_at: Some(Utc::now() + ChronoDuration::seconds(30)),
        });

        match adaptive.acquire(1, Duration::from_millis(0)).await {
            AcquireOutcome::Deny { .. } => {}
            AcquireOutcome::Permit => panic!("expected suppression to deny the request"),
        }
    }
}
