// [libs/infra/analyzer-client/src/errors.rs]
/*!
 * =================================================================
 * APARATO: ANALYZER CLIENT ERRORS
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * =================================================================
 */

use thiserror::Error;

use courier_domain_models::{Classified, ErrorKind};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("TRANSIENT_NETWORK: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("UPSTREAM_RATE_LIMIT: retry after {retry_after_s}s")]
    RateLimited { retry_after_s: u64 },

    /// Modelo rechazó la solicitud de forma permanente (tokens excedidos,
    /// contenido bloqueado, parámetros inválidos). No debe reintentarse.
    #[error("UPSTREAM_REJECTED: {0}")]
    ModelRejected(String),

    /// 5xx from the LLM provider itself — transient, same as a network
    /// fault, not a permanent model rejection.
    #[error("TRANSIENT_NETWORK: provider unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("MALFORMED_RESPONSE: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl Classified for AnalyzerError {
    fn kind(&self) -> ErrorKind {
        match self {
            AnalyzerError::NetworkFault(_) => ErrorKind::TransientNetwork,
            AnalyzerError::RateLimited { .. } => ErrorKind::UpstreamRateLimit,
            AnalyzerError::ModelRejected(_) => ErrorKind::UpstreamRejected,
            AnalyzerError::ServiceUnavailable(_) => ErrorKind::TransientNetwork,
            AnalyzerError::MalformedResponse(_) => ErrorKind::InputInvalid,
        }
    }
}
