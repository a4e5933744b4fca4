// [libs/infra/dispatch-client/src/testing.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH CLIENT — DOBLE DE PRUEBA
 * CLASIFICACIÓN: TEST SUPPORT (ESTRATO L3)
 * =================================================================
 */

use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{DispatchAck, Dispatcher};
use crate::errors::DispatcherError;

/// Registra cada intento de envío y responde con un resultado escriptado,
/// sin tocar una plataforma de chat real.
pub struct FakeDispatcher {
    outcome: Result<DispatchAck, String>,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeDispatcher {
    pub fn always_acking() -> Self {
        Self {
            outcome: Ok(DispatchAck {
                message_id: "fake-message-id".to_string(),
            }),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn always_rejecting(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Todos los envíos observados hasta ahora, en orden.
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("fake dispatcher mutex poisoned").clone()
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn send(&self, channel: &str, payload: &str) -> Result<DispatchAck, DispatcherError> {
        self.sent
            .lock()
            .expect("fake dispatcher mutex poisoned")
            .push((channel.to_string(), payload.to_string()));

        self.outcome.clone().map_err(DispatcherError::Rejected)
    }
}
