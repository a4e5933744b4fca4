// [libs/domain/models/src/errors.rs]
/*!
 * =================================================================
 * APARATO: VOCABULARIO COMÚN DE ERRORES (ESTRATO L1)
 * CLASIFICACIÓN: DOMAIN CORE
 * RESPONSABILIDAD: TAXONOMÍA DE FALLOS COMPARTIDA ENTRE CRATES
 *
 * Cada crate mantiene su propio enum `thiserror` concreto (p.ej.
 * `StoreError`, `SourceClientError`); todos convergen aquí mediante
 * `fn kind(&self) -> ErrorKind` para que la capa de frontera (handlers
 * HTTP, el bucle de supervisión) razone sobre un único vocabulario sin
 * conocer los detalles internos de cada adaptador.
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Clasificación transversal de fallos, independiente del crate de origen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Fallo de red/transporte que probablemente se resuelva reintentando.
    TransientNetwork,
    /// El proveedor externo rechazó la solicitud por cuota agotada.
    UpstreamRateLimit,
    /// El proveedor externo rechazó la solicitud de forma permanente.
    UpstreamRejected,
    /// Fallo interno que puede resolverse reintentando (p.ej. DB momentáneamente inalcanzable).
    InternalTransient,
    /// Fallo interno que no debe reintentarse automáticamente.
    InternalFatal,
    /// La entrada recibida es inválida y no debe reintentarse sin corrección.
    InputInvalid,
}

impl ErrorKind {
    /// Indica si un fallo de esta clase justifica un reintento automático.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::TransientNetwork
                | ErrorKind::UpstreamRateLimit
                | ErrorKind::InternalTransient
        )
    }
}

/// Contrato que cada enum de error concreto del ecosistema implementa
/// para anunciar su clasificación en el vocabulario común.
pub trait Classified {
    fn kind(&self) -> ErrorKind;
}
