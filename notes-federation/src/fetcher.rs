use crate::traits::Transport;
use crate::types::{FederationError, FetchConfig, FetchResponse, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Envelope returned by the proxy indirection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyEnvelope {
    data: serde_json::Value,
    #[serde(default)]
    content_type: Option<String>,
}

/// Two-tier HTTP transport: a direct GET, then the proxy indirection when the
/// direct request could not be made at all.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(|e| FederationError::General(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn fetch_direct(&self, url: &str, accept: &str) -> std::result::Result<FetchResponse, reqwest::Error> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(self.config.retry_delay_ms),
            initial_interval: Duration::from_millis(self.config.retry_delay_ms),
            max_interval: Duration::from_millis(self.config.retry_delay_ms * 8),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_seconds)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.send_once(url, accept).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    match backoff.next_backoff() {
                        Some(delay) => {
                            debug!("Attempt {} failed for {}, retrying in {:?}: {}", attempt, url, delay, e);
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, url: &str, accept: &str) -> std::result::Result<FetchResponse, reqwest::Error> {
        let response = self.client.get(url).header(ACCEPT, accept).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        Ok(FetchResponse { status, body, content_type })
    }

    async fn fetch_via_proxy(&self, proxy_base: &str, url: &str) -> Result<FetchResponse> {
        let mut proxy_url = Url::parse(proxy_base)?.join("/api/proxy")?;
        proxy_url.query_pairs_mut().append_pair("url", url);

        debug!("Fetching {} through proxy {}", url, proxy_url);

        let network_error = |message: String| FederationError::Network {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(proxy_url)
            .send()
            .await
            .map_err(|e| network_error(format!("proxy request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(network_error(format!("proxy fetch failed: {}", response.status().as_u16())));
        }

        let envelope: ProxyEnvelope = response
            .json()
            .await
            .map_err(|e| network_error(format!("proxy returned an unreadable envelope: {}", e)))?;

        let body = match envelope.data {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        };

        Ok(FetchResponse {
            status: 200,
            body,
            content_type: Some(envelope.content_type.unwrap_or_else(|| "application/json".to_string())),
        })
    }
}

#[async_trait]
impl Transport for Fetcher {
    async fn fetch(&self, url: &str, accept: &str) -> Result<FetchResponse> {
        debug!("Fetching {} (Accept: {})", url, accept);

        let direct_error = match self.fetch_direct(url, accept).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        match &self.config.proxy_url {
            Some(proxy_base) => {
                warn!("Direct fetch of {} failed ({}), falling back to proxy", url, direct_error);
                self.fetch_via_proxy(proxy_base, url).await
            }
            None => Err(FederationError::Network {
                url: url.to_string(),
                message: direct_error.to_string(),
            }),
        }
    }
}
