// [libs/infra/analyzer-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: ANALYZER CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: INTERFAZ ESTRECHA SOBRE EL SERVICIO LLM
 * =================================================================
 */

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::errors::AnalyzerError;

/// Resultado de un intento de análisis exitoso.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub text: String,
    pub tokens_used: u64,
    pub cost_estimate: f64,
}

/// Interfaz estrecha sobre el proveedor LLM.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        prompt: &str,
        model: &str,
        params: &Value,
    ) -> Result<AnalysisOutcome, AnalyzerError>;
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    text: String,
    #[serde(default)]
    tokens_used: u64,
    #[serde(default)]
    cost_estimate: f64,
}

pub struct HttpAnalyzer {
    http: Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: String, bearer_token: String, timeout: std::time::Duration) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth_value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", bearer_token))
            .expect("invalid analyzer API token format");
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        Self {
            http: Client::builder()
                .default_headers(headers)
                .user_agent("Courier-AnalyzerClient/1.0")
                .timeout(timeout)
                .build()
                .expect("failed to initialize analyzer HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    #[instrument(skip(self, prompt, params))]
    async fn analyze(
        &self,
        prompt: &str,
        model: &str,
        params: &Value,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        let response = self
            .http
            .post(format!("{}/v1/analyze", self.base_url))
            .json(&AnalyzeRequest { model, prompt, params })
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_s = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30);
            warn!("LLM provider rate-limited model {}", model);
            return Err(AnalyzerError::RateLimited { retry_after_s });
        }

        if response.status() == StatusCode::BAD_REQUEST || response.status() == StatusCode::PAYLOAD_TOO_LARGE {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::ModelRejected(detail));
        }

        if response.status().is_server_error() {
            return Err(AnalyzerError::ServiceUnavailable(format!(
                "HTTP_{}",
                response.status()
            )));
        }

        if !response.status().is_success() {
            return Err(AnalyzerError::ModelRejected(format!(
                "HTTP_{}",
                response.status()
            )));
        }

        let body_text = response.text().await?;
        let parsed: AnalyzeResponse = serde_json::from_str(&body_text)?;

        Ok(AnalysisOutcome {
            text: parsed.text,
            tokens_used: parsed.tokens_used,
            cost_estimate: parsed.cost_estimate,
        })
    }
}
