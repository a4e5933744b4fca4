// [libs/infra/source-client/src/testing.rs]
/*!
 * =================================================================
 * APARATO: SOURCE CLIENT — DOBLE DE PRUEBA
 * CLASIFICACIÓN: TEST SUPPORT (ESTRATO L3)
 * RESPONSABILIDAD: IMPLEMENTACIÓN SCRIPTADA DE `SourceClient` PARA LOS
 *                  TESTS DE ESCENARIO DEL ORQUESTADOR
 * =================================================================
 */

use std::sync::Mutex;

use async_trait::async_trait;

use courier_domain_models::{AccountUsername, Post};

use crate::client::SourceClient;
use crate::errors::SourceClientError;

/// Devuelve una secuencia de posts fijada de antemano, sin tocar la red.
/// Cada llamada a `fetch_since` drena hasta `max_fetch` elementos de la
/// cola interna, en orden.
pub struct FakeSourceClient {
    scripted: Mutex<Vec<Post>>,
}

impl FakeSourceClient {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            scripted: Mutex::new(posts),
        }
    }
}

#[async_trait]
impl SourceClient for FakeSourceClient {
    async fn fetch_since(
        &self,
        _account: &AccountUsername,
        _since_id: Option<&str>,
        max_fetch: usize,
    ) -> Result<Vec<Post>, SourceClientError> {
        let mut scripted = self.scripted.lock().unwrap();
        let take = scripted.len().min(max_fetch);
        Ok(scripted.drain(0..take).collect())
    }
}
