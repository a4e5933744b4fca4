// [libs/infra/source-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COURIER INFRA SOURCE CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod testing;

pub use client::{HttpSourceClient, SourceClient};
pub use errors::SourceClientError;
