//! HTTP fetcher with per-source proxy settings and retry logic

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use burrow_cache::{CacheKey, FetchError, Fetcher};
use burrow_core::error::{BoxedSource, BurrowError};
use burrow_core::types::{ProxySetting, SourceSpec};

use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// HTTP settings shared by every source
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("burrow/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Production [`Fetcher`] speaking HTTP to package sources
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Client for sources inheriting the environment proxy
    default_client: Client,
    /// Clients for sources with their own proxy setting, keyed by base URL
    source_clients: HashMap<String, Client>,
    retry_config: RetryConfig,
}

impl HttpFetcher {
    /// Create a fetcher for the given sources
    pub fn new(config: ClientConfig, sources: &[SourceSpec]) -> RegistryResult<Self> {
        let default_client = build_client(&config, &ProxySetting::Inherit)?;
        let mut source_clients = HashMap::new();

        for source in sources {
            url::Url::parse(&source.url).map_err(|e| BurrowError::ConfigValidation {
                field: format!("source.{}.url", source.name),
                reason: e.to_string(),
            })?;
            if source.proxy != ProxySetting::Inherit {
                source_clients.insert(
                    normalize(&source.url).to_string(),
                    build_client(&config, &source.proxy)?,
                );
            }
        }

        Ok(Self {
            default_client,
            source_clients,
            retry_config: config.retry,
        })
    }

    fn client_for(&self, source: &str) -> &Client {
        self.source_clients
            .get(normalize(source))
            .unwrap_or(&self.default_client)
    }

    /// Execute a request with exponential backoff retry logic
    async fn with_retry<F, Fut>(&self, url: &str, operation: F) -> Result<Vec<u8>, FetchError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<u8>, FetchError>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(bytes) => return Ok(bytes),
                // A missing resource will not appear by asking again
                Err(error @ FetchError::NotFound { .. }) => return Err(error),
                Err(error) if attempt >= self.retry_config.max_retries => return Err(error),
                Err(error) => {
                    attempt += 1;
                    warn!("attempt {} for {} failed: {}", attempt, url, error);
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
            }
        }
    }

    async fn get_once(&self, client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
        let failed = |message: String, source: Option<reqwest::Error>| FetchError::Failed {
            url: url.to_string(),
            message,
            source: source.map(|e| Box::new(e) as BoxedSource),
        };

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}"), Some(e)))?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                url: url.to_string(),
            }),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| failed(format!("failed to read body: {e}"), Some(e)))?;
                Ok(bytes.to_vec())
            },
            status => Err(failed(format!("server returned status {status}"), None)),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>, FetchError> {
        let url = key.url();
        let client = self.client_for(&key.source);
        debug!("GET {}", url);
        self.with_retry(&url, || self.get_once(client, &url)).await
    }
}

fn normalize(url: &str) -> &str {
    url.trim_end_matches('/')
}

fn build_client(config: &ClientConfig, proxy: &ProxySetting) -> RegistryResult<Client> {
    let mut builder = ClientBuilder::new()
        // Connection pooling configuration
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(config.timeout)
        .gzip(true)
        .user_agent(config.user_agent.clone());

    match proxy {
        ProxySetting::Inherit => {},
        ProxySetting::Disabled => builder = builder.no_proxy(),
        ProxySetting::Url(proxy_url) => {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| BurrowError::ConfigValidation {
                field: "proxy".to_string(),
                reason: format!("invalid proxy URL '{proxy_url}': {e}"),
            })?;
            builder = builder.proxy(proxy);
        },
    }

    builder
        .build()
        .map_err(|e| BurrowError::network(format!("Failed to create HTTP client: {}", e), e))
}

#[cfg(test)]
mod tests;
