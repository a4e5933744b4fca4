// [libs/core/rate-governor/src/config.rs]
/*!
 * =================================================================
 * APARATO: CONFIGURACIÓN DE BUCKETS
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * =================================================================
 */

/// Forma de limitación elegida para un bucket nombrado, leída de
/// `Setting`/`ConfigSnapshot` al construir el `RateGovernor`.
#[derive(Debug, Clone, Copy)]
pub enum RateLimiterConfig {
    SlidingWindow { max_requests: u32, window_secs: u64 },
    TokenBucket { rate_per_second: u32, burst_capacity: u32 },
    Adaptive { rate_per_second: u32, burst_capacity: u32 },
}
