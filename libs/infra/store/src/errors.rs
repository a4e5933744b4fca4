// [libs/infra/store/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (ESTRATO L3)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * Cuatro variantes exactamente, tal como exige el contrato del Store:
 * NotFound, Conflict, Unavailable, InvariantViolation. `Unavailable`
 * absorbe los fallos crudos de `libsql::Error` vía `From`, inspeccionando
 * el mensaje para distinguir una violación de restricción (que en
 * realidad es `Conflict`) de un fallo de enlace genuino.
 * =================================================================
 */

use thiserror::Error;

use courier_domain_models::{Classified, ErrorKind};

#[derive(Error, Debug)]
pub enum StoreError {
    /// La entidad solicitada no existe en las tablas activas.
    #[error("[L3_STORE_FAULT]: IDENTIFIER_NOT_FOUND -> {0}")]
    NotFound(String),

    /// Conflicto de estado: transición inválida o candado de otro worker.
    #[error("[L3_STORE_FAULT]: STATE_CONFLICT -> {0}")]
    Conflict(String),

    /// Fallo de enlace físico, de red, o de configuración con el cluster.
    #[error("[L3_STORE_FAULT]: STORE_UNAVAILABLE -> {0}")]
    Unavailable(String),

    /// Un invariante de dominio se habría violado de completarse la operación.
    #[error("[L3_STORE_FAULT]: INVARIANT_VIOLATION -> {0}")]
    InvariantViolation(String),
}

impl Classified for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::InputInvalid,
            StoreError::Conflict(_) => ErrorKind::InternalTransient,
            StoreError::Unavailable(_) => ErrorKind::InternalTransient,
            StoreError::InvariantViolation(_) => ErrorKind::InternalFatal,
        }
    }
}

impl From<libsql::Error> for StoreError {
    fn from(source: libsql::Error) -> Self {
        let message = source.to_string();
        if message.contains("UNIQUE constraint") || message.contains("constraint failed") {
            StoreError::Conflict(message)
        } else {
            StoreError::Unavailable(message)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
