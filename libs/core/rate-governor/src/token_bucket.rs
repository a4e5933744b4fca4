// [libs/core/rate-governor/src/token_bucket.rs]
/*!
 * =================================================================
 * APARATO: TOKEN BUCKET LIMITER
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L2)
 * RESPONSABILIDAD: TASA REPUESTA A R, CAPACIDAD C, SOBRE LA CRATE `governor`
 *
 * Envuelve `governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>`
 * en vez de re-implementar el algoritmo de cubeta de fichas a mano — la
 * crate es mantenida activamente y cubre exactamente este contrato.
 * =================================================================
 */

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use tokio::time::sleep;

use crate::limiter::{AcquireOutcome, RateLimiter};

pub struct TokenBucketLimiter {
    inner: GovernorRateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TokenBucketLimiter {
    /// `rate_per_second` repone el bucket; `burst_capacity` es el máximo de
    /// fichas acumulables (ráfaga permitida).
    pub fn new(rate_per_second: u32, burst_capacity: u32) -> Self {
        let rate = NonZeroU32::new(rate_per_second.max(1)).expect("rate must be non-zero");
        let burst = NonZeroU32::new(burst_capacity.max(1)).expect("burst must be non-zero");
        let quota = Quota::per_second(rate).allow_burst(burst);

        Self {
            inner: GovernorRateLimiter::direct(quota),
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn acquire(&self, cost: u32, deadline: Duration) -> AcquireOutcome {
        let Some(cells) = NonZeroU32::new(cost.max(1)) else {
            return AcquireOutcome::Permit;
        };

        let started_waiting_at = std::time::Instant::now();

        loop {
            match self.inner.check_n(cells) {
                Ok(Ok(())) => return AcquireOutcome::Permit,
                Ok(Err(not_until)) => {
                    let wait = not_until.wait_time_from(self.inner.clock().now());

                    if started_waiting_at.elapsed() + wait > deadline {
                        return AcquireOutcome::Deny { retry_after: wait };
                    }
                    sleep(wait).await;
                }
                Err(_insufficient_capacity) => {
                    return AcquireOutcome::Deny {
                        retry_after: deadline,
                    };
                }
            }
        }
    }
}
