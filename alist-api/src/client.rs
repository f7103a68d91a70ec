//! AList Rust API Client
//!
//! # Creating new api client
//!
//! - [new](AlistClient::new) - create new client with default configuration
//! - [with_config](AlistClient::with_config) - create client with custom configuration
//! - [with_client](AlistClient::with_client) - create client with configuration and custom reqwest client
//!
//! One client owns one `reqwest::Client`, reused for every request of a run.
//! Call [close](AlistClient::close) when done to log request metrics and release the connection pool.

use std::time::Duration;

use tracing::{debug, info};

use crate::{
    ALIST_LOCAL_URL, Result,
    config::{ALIST_URL_ENV, MAX_RETRIES},
    http_client::HttpClient,
    prelude::*,
};

/// Configuration for the AList client.
///
/// ```rust
/// use alist::prelude::*;
/// let config = ClientConfig::default()
///     .base_url("http://nas.local:5244")
///     .max_retries(1);
/// assert_eq!(config.base_url, "http://nas.local:5244");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base url for all api requests.
    /// If not provided in config, url is determined by:
    /// * The environment variable `ALIST_URL`, if defined, or
    /// * "http://127.0.0.1:5244" `alist::ALIST_LOCAL_URL`
    pub base_url: String,

    /// Maximum retries of idempotent requests after a connection error or timeout.
    pub max_retries: u32,

    /// Per-request timeout. None uses the reqwest default (no timeout).
    pub timeout: Option<Duration>,

    /// Ignore proxies from the environment (`HTTP_PROXY`, `HTTPS_PROXY`, `ALL_PROXY`).
    /// Off by default: system proxies are used.
    pub no_proxy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: std::env::var(ALIST_URL_ENV).unwrap_or_else(|_| ALIST_LOCAL_URL.to_string()),
            max_retries: MAX_RETRIES,
            timeout: None,
            no_proxy: false,
        }
    }
}

impl ClientConfig {
    /// Sets the base url.
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..self
        }
    }

    pub fn max_retries(self, max_retries: u32) -> Self {
        ClientConfig {
            max_retries,
            ..self
        }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        ClientConfig {
            timeout: Some(timeout),
            ..self
        }
    }

    /// Connects directly, ignoring proxy environment variables.
    pub fn no_proxy(self, no_proxy: bool) -> Self {
        ClientConfig { no_proxy, ..self }
    }
}

/// Client for the AList admin api.
pub struct AlistClient {
    pub(crate) client: HttpClient,
    pub(crate) config: ClientConfig,
    pub(crate) credentials: Credentials,
}

impl std::fmt::Debug for AlistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlistClient")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl AlistClient {
    /// Creates a new client with default configuration.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_config(ClientConfig::default(), credentials)
    }

    /// Creates a new client with the provided configuration.
    pub fn with_config(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Self::with_client(builder, config, credentials)
    }

    /// Creates a client from a `reqwest::ClientBuilder` and configuration.
    /// ClientBuilder can be customized with timeouts, proxies, dns servers, user_agent, etc.
    pub fn with_client(
        builder: reqwest::ClientBuilder,
        config: ClientConfig,
        credentials: Credentials,
    ) -> Result<Self> {
        debug!(url=?config.base_url, "new client");
        let client = HttpClient::new(builder, &config.base_url, config.max_retries)?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    /// Returns the configuration.
    pub fn get_config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the base url, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    /// Returns a snapshot of current HTTP metrics.
    pub fn http_metrics(&self) -> HttpMetricsSnapshot {
        self.client.metrics_snapshot()
    }

    /// Releases the client. The session token is discarded.
    pub fn close(self) {
        info!(metrics = %self.http_metrics(), "closing client");
        self.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_use_system_proxy() {
        let config = ClientConfig::default();
        assert!(!config.no_proxy);
        assert_eq!(config.max_retries, MAX_RETRIES);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn config_setters() {
        let config = ClientConfig::default()
            .base_url("http://nas:5244")
            .no_proxy(true)
            .timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "http://nas:5244");
        assert!(config.no_proxy);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
