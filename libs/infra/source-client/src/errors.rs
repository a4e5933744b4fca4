// [libs/infra/source-client/src/errors.rs]
/*!
 * =================================================================
 * APARATO: SOURCE CLIENT ERRORS
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * =================================================================
 */

use thiserror::Error;

use courier_domain_models::{Classified, ErrorKind};

#[derive(Error, Debug)]
pub enum SourceClientError {
    #[error("TRANSIENT_NETWORK: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("UPSTREAM_RATE_LIMIT: retry after {retry_after_s}s")]
    RateLimited { retry_after_s: u64 },

    #[error("UPSTREAM_REJECTED: {0}")]
    Rejected(String),

    /// 5xx from the source API itself — transient, same as a network
    /// fault, not a permanent rejection.
    #[error("TRANSIENT_NETWORK: source unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("MALFORMED_RESPONSE: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl Classified for SourceClientError {
    fn kind(&self) -> ErrorKind {
        match self {
            SourceClientError::NetworkFault(_) => ErrorKind::TransientNetwork,
            SourceClientError::RateLimited { .. } => ErrorKind::UpstreamRateLimit,
            SourceClientError::Rejected(_) => ErrorKind::UpstreamRejected,
            SourceClientError::ServiceUnavailable(_) => ErrorKind::TransientNetwork,
            SourceClientError::MalformedResponse(_) => ErrorKind::InputInvalid,
        }
    }
}
