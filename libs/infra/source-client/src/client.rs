// [libs/infra/source-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: SOURCE CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: INTERFAZ ESTRECHA SOBRE LA API DE OBTENCIÓN DE POSTS
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use courier_domain_models::{AccountUsername, Engagement, MediaItem, MediaKind, Post, PostStatus};

use crate::errors::SourceClientError;

/// Interfaz estrecha sobre el proveedor de posts. Cualquier adaptador
/// concreto (HTTP real, doble de prueba) implementa este contrato; el
/// resto del pipeline solo conoce esta forma.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_since(
        &self,
        account: &AccountUsername,
        since_id: Option<&str>,
        max_fetch: usize,
    ) -> Result<Vec<Post>, SourceClientError>;
}

#[derive(Deserialize)]
struct RawPostPage {
    posts: Vec<RawPost>,
}

#[derive(Deserialize)]
struct RawPost {
    id: String,
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    reshares: u64,
    #[serde(default)]
    replies: u64,
    #[serde(default)]
    media: Vec<RawMediaItem>,
}

#[derive(Deserialize)]
struct RawMediaItem {
    kind: MediaKind,
    url: String,
}

pub struct HttpSourceClient {
    http: Client,
    base_url: String,
}

impl HttpSourceClient {
    pub fn new(base_url: String, bearer_token: String, timeout: std::time::Duration) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth_value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", bearer_token))
            .expect("invalid source API token format");
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        Self {
            http: Client::builder()
                .default_headers(headers)
                .user_agent("Courier-SourceClient/1.0")
                .timeout(timeout)
                .build()
                .expect("failed to initialize source HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    #[instrument(skip(self))]
    async fn fetch_since(
        &self,
        account: &AccountUsername,
        since_id: Option<&str>,
        max_fetch: usize,
    ) -> Result<Vec<Post>, SourceClientError> {
        let mut request = self
            .http
            .get(format!("{}/v1/accounts/{}/posts", self.base_url, account.as_str()))
            .query(&[("max_results", max_fetch.to_string())]);

        if let Some(since) = since_id {
            request = request.query(&[("since_id", since)]);
        }

        let response = request.send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_s = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            warn!("source API rate-limited account {}", account);
            return Err(SourceClientError::RateLimited { retry_after_s });
        }

        if response.status().is_server_error() {
            return Err(SourceClientError::ServiceUnavailable(format!(
                "HTTP_{}",
                response.status()
            )));
        }

        if !response.status().is_success() {
            return Err(SourceClientError::Rejected(format!(
                "HTTP_{}",
                response.status()
            )));
        }

        let body_text = response.text().await?;
        let page: RawPostPage = serde_json::from_str(&body_text)?;

        let ingested_at = Utc::now();
        let posts = page
            .posts
            .into_iter()
            .map(|raw| map_raw_post(raw, account, ingested_at))
            .collect::<Vec<_>>();

        info!("fetched {} post(s) for account {}", posts.len(), account);
        Ok(posts)
    }
}

fn map_raw_post(raw: RawPost, account: &AccountUsername, ingested_at: DateTime<Utc>) -> Post {
    Post {
        id: raw.id.into(),
        account: account.clone(),
        text: raw.text,
        created_at: raw.created_at,
        ingested_at,
        engagement: Engagement {
            likes: raw.likes,
            reshares: raw.reshares,
            replies: raw.replies,
        },
        media: raw
            .media
            .into_iter()
            .map(|m| MediaItem {
                kind: m.kind,
                url: m.url,
                local_ref: None,
            })
            .collect(),
        status: PostStatus::New,
    }
}
