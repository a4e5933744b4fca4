// [libs/infra/dispatch-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: INTERFAZ ESTRECHA SOBRE LA PLATAFORMA DE CHAT
 * =================================================================
 */

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::errors::DispatcherError;

/// Confirmación de entrega emitida por la plataforma de chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchAck {
    pub message_id: String,
}

/// Interfaz estrecha sobre la plataforma de chat de destino.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, channel: &str, payload: &str) -> Result<DispatchAck, DispatcherError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    message_id: String,
}

pub struct HttpDispatcher {
    http: Client,
    base_url: String,
}

impl HttpDispatcher {
    pub fn new(base_url: String, bearer_token: String, timeout: std::time::Duration) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth_value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", bearer_token))
            .expect("invalid dispatch platform token format");
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        Self {
            http: Client::builder()
                .default_headers(headers)
                .user_agent("Courier-DispatchClient/1.0")
                .timeout(timeout)
                .build()
                .expect("failed to initialize dispatch HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    #[instrument(skip(self, payload))]
    async fn send(&self, channel: &str, payload: &str) -> Result<DispatchAck, DispatcherError> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .json(&SendRequest {
                channel,
                text: payload,
            })
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_s = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30);
            warn!("chat platform rate-limited dispatch to channel {}", channel);
            return Err(DispatcherError::RateLimited { retry_after_s });
        }

        if response.status().is_server_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DispatcherError::ServiceUnavailable(format!(
                "HTTP_{}: {}",
                response.status(),
                detail
            )));
        }

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DispatcherError::Rejected(format!(
                "HTTP_{}: {}",
                response.status(),
                detail
            )));
        }

        let body_text = response.text().await?;
        let parsed: SendResponse = serde_json::from_str(&body_text)?;

        Ok(DispatchAck {
            message_id: parsed.message_id,
        })
    }
}
