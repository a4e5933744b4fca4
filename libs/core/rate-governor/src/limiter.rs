// [libs/core/rate-governor/src/limiter.rs]
/*!
 * =================================================================
 * APARATO: CONTRATO RATE LIMITER
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L2)
 * RESPONSABILIDAD: INTERFAZ COMÚN PARA LAS VARIANTES DE LIMITACIÓN
 * =================================================================
 */

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Resultado de una solicitud de permiso ante un bucket de tasa.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcquireOutcome {
    Permit,
    Deny { retry_after: Duration },
}

/// Señal de cuota observada en la respuesta de un proveedor externo
/// (p.ej. cabeceras `X-RateLimit-Remaining` / `X-RateLimit-Reset`), usada
/// por el modo adaptativo para autoajustar su tasa efectiva.
#[derive(Debug, Clone, Copy)]
pub struct QuotaSignal {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Solicita permiso para consumir `cost` unidades del bucket, esperando
    /// hasta `deadline` como máximo antes de denegar.
    async fn acquire(&self, cost: u32, deadline: Duration) -> AcquireOutcome;

    /// Incorpora una señal de cuota observada del proveedor externo. Las
    /// implementaciones no adaptativas ignoran la llamada.
    fn observe_quota_signal(&self, _signal: QuotaSignal) {}
}
