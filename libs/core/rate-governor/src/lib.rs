// [libs/core/rate-governor/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COURIER CORE RATE GOVERNOR
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * RESPONSABILIDAD: LIMITACIÓN DE TASA POR API EXTERNA CON VARIANTES
 *                  DE VENTANA DESLIZANTE, TOKEN BUCKET Y ADAPTATIVA
 * =================================================================
 */

pub mod adaptive;
pub mod config;
pub mod governor_facade;
pub mod limiter;
pub mod sliding_window;
pub mod token_bucket;

pub use adaptive::AdaptiveLimiter;
pub use config::RateLimiterConfig;
pub use governor_facade::{BucketName, RateGovernor};
pub use limiter::{AcquireOutcome, QuotaSignal, RateLimiter};
pub use sliding_window::SlidingWindowLimiter;
pub use token_bucket::TokenBucketLimiter;
