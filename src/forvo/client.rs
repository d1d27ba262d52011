use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::ForvoConfig;

/// Statuses worth another attempt: rate limiting and transient server errors.
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid client configuration: {0}")]
    Client(String),
}

/// Outbound access to Forvo.
#[async_trait]
pub trait ForvoClient: Send + Sync {
    /// GET an HTML page by its path on the Forvo host, e.g. `/word/猫/`.
    async fn fetch_page(&self, path: &str) -> Result<String, FetchError>;
    /// GET an audio file by absolute URL.
    async fn fetch_audio(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// reqwest-backed Forvo client with status retries and session reset.
pub struct HttpForvoClient {
    config: ForvoConfig,
    client: RwLock<Client>,
}

fn build_client(config: &ForvoConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|e| FetchError::Client(format!("invalid user agent: {e}")))?,
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Ok(Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?)
}

impl HttpForvoClient {
    pub fn new(config: &ForvoConfig) -> Result<Self, FetchError> {
        let client = build_client(config)?;
        Ok(Self {
            config: config.clone(),
            client: RwLock::new(client),
        })
    }

    /// Replace the underlying client, dropping its connection pool.
    async fn reset_session(&self) -> Result<(), FetchError> {
        let fresh = build_client(&self.config)?;
        *self.client.write().await = fresh;
        tracing::info!("Reset Forvo HTTP session");
        Ok(())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(factor))
    }

    async fn get_with_retry(&self, url: &str) -> Result<Response, FetchError> {
        let client = self.client.read().await.clone();
        let mut attempt = 1;
        loop {
            let response = client.get(url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if !RETRY_STATUSES.contains(&status.as_u16()) || attempt >= self.config.max_attempts {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                url,
                status = status.as_u16(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Forvo request failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET with the retry policy; a transport failure gets one more try on a fresh session.
    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        match self.get_with_retry(url).await {
            Err(FetchError::Http(e)) => {
                tracing::warn!(url, error = %e, "Forvo request errored, retrying with a fresh session");
                self.reset_session().await?;
                self.get_with_retry(url).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl ForvoClient for HttpForvoClient {
    async fn fetch_page(&self, path: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.config.host, path);
        Ok(self.get(&url).await?.text().await?)
    }

    async fn fetch_audio(&self, url: &str) -> Result<Bytes, FetchError> {
        Ok(self.get(url).await?.bytes().await?)
    }
}
