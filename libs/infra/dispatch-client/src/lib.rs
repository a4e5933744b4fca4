// [libs/infra/dispatch-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COURIER INFRA DISPATCH CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod render;
pub mod testing;

pub use client::{DispatchAck, Dispatcher, HttpDispatcher};
pub use errors::DispatcherError;
pub use render::{render_message, RenderInput, MESSAGE_LENGTH_CAP};
