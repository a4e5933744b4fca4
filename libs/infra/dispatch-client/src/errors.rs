// [libs/infra/dispatch-client/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH CLIENT — CATÁLOGO DE ERRORES
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * =================================================================
 */

use courier_domain_models::errors::{Classified, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("network fault reaching chat platform: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("chat platform rate-limited us, retry after {retry_after_s}s")]
    RateLimited { retry_after_s: u64 },

    #[error("chat platform rejected delivery: {0}")]
    Rejected(String),

    /// 5xx from the chat platform itself — treated as transient, same as a
    /// network fault, not as a permanent rejection.
    #[error("chat platform unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("malformed response from chat platform: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl Classified for DispatcherError {
    fn kind(&self) -> ErrorKind {
        match self {
            DispatcherError::NetworkFault(_) => ErrorKind::TransientNetwork,
            DispatcherError::RateLimited { .. } => ErrorKind::UpstreamRateLimit,
            DispatcherError::Rejected(_) => ErrorKind::UpstreamRejected,
            DispatcherError::ServiceUnavailable(_) => ErrorKind::TransientNetwork,
            DispatcherError::MalformedResponse(_) => ErrorKind::InternalTransient,
        }
    }
}
