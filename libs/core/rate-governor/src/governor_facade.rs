// [libs/core/rate-governor/src/governor_facade.rs]
/*!
 * =================================================================
 * APARATO: RATE GOVERNOR (FACHADA)
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * RESPONSABILIDAD: MANTENER UN BUCKET NOMBRADO POR API EXTERNA
 *
 * `DashMap` en vez de `Mutex<HashMap<_>>`: el camino caliente de
 * `acquire` es leído/escrito concurrentemente por todos los workers de
 * análisis y despacho, exactamente el patrón que `dashmap` evita
 * serializar detrás de un único candado global.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::adaptive::AdaptiveLimiter;
use crate::config::RateLimiterConfig;
use crate::limiter::{AcquireOutcome, QuotaSignal, RateLimiter};
use crate::sliding_window::SlidingWindowLimiter;
use crate::token_bucket::TokenBucketLimiter;

pub type BucketName = String;

pub struct RateGovernor {
    buckets: DashMap<BucketName, Arc<dyn RateLimiter>>,
    configs: DashMap<BucketName, RateLimiterConfig>,
}

impl RateGovernor {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            configs: DashMap::new(),
        }
    }

    /// Registra (o reemplaza) la configuración de un bucket. El limitador
    /// concreto se construye perezosamente en el primer `acquire`.
    pub fn configure(&self, bucket: impl Into<BucketName>, config: RateLimiterConfig) {
        self.configs.insert(bucket.into(), config);
    }

    pub async fn acquire(&self, bucket: &str, cost: u32, deadline: Duration) -> AcquireOutcome {
        let limiter = self.limiter_for(bucket);
        limiter.acquire(cost, deadline).await
    }

    pub fn observe_quota_signal(&self, bucket: &str, signal: QuotaSignal) {
        self.limiter_for(bucket).observe_quota_signal(signal);
    }

    fn limiter_for(&self, bucket: &str) -> Arc<dyn RateLimiter> {
        if let Some(existing) = self.buckets.get(bucket) {
            return existing.clone();
        }

        let config = self
            .configs
            .get(bucket)
            .map(|c| *c)
            .unwrap_or(RateLimiterConfig::TokenBucket {
                rate_per_second: 1,
                burst_capacity: 1,
            });

        let built: Arc<dyn RateLimiter> = match config {
            RateLimiterConfig::SlidingWindow { max_requests, window_secs } => Arc::new(
                SlidingWindowLimiter::new(max_requests, Duration::from_secs(window_secs)),
            ),
            RateLimiterConfig::TokenBucket { rate_per_second, burst_capacity } => {
                Arc::new(TokenBucketLimiter::new(rate_per_second, burst_capacity))
            }
            RateLimiterConfig::Adaptive { rate_per_second, burst_capacity } => {
                Arc::new(AdaptiveLimiter::wrapping(Arc::new(TokenBucketLimiter::new(
                    rate_per_second,
                    burst_capacity,
                ))))
            }
        };

        self.buckets.insert(bucket.to_string(), built.clone());
        built
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_builds_and_reuses_the_same_bucket() {
        let governor = RateGovernor::new();
        governor.configure(
            "llm",
            RateLimiterConfig::TokenBucket {
                rate_per_second: 10,
                burst_capacity: 10,
            },
        );

        let first = governor.acquire("llm", 1, Duration::from_millis(0)).await;
        assert_eq!(first, AcquireOutcome::Permit);
        assert_eq!(governor.buckets.len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_bucket_falls_back_to_a_conservative_default() {
        let governor = RateGovernor::new();
        let outcome = governor.acquire("unknown", 1, Duration::from_millis(0)).await;
        assert_eq!(outcome, AcquireOutcome::Permit);
    }
}
