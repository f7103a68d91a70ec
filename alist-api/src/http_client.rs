//! HttpClient middleware used by AlistClient
//!
//! Responsible for
//!  - handling all HTTP api requests
//!  - attaching the session token
//!  - logging/tracing
//!  - retries and backoff (for timeouts and connection errors on idempotent requests)
//!  - decoding the response envelope

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::{ClientBuilder, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use snafu::prelude::*;
use tracing::{debug, error, trace, warn};

use crate::{Result, prelude::*};

/// HTTP metrics tracked using atomic counters.
/// These counters are cumulative and never reset during the client's lifetime.
#[derive(Debug, Default)]
pub struct HttpMetrics {
    /// Total number of HTTP requests sent to the server
    total_requests: AtomicU64,
    /// Total number of successful responses (2xx status codes)
    successful_responses: AtomicU64,
    /// Total number of error responses and transport failures
    errors: AtomicU64,
    /// Total number of retry attempts
    retries: AtomicU64,
    /// Total bytes sent in request bodies
    bytes_sent: AtomicU64,
    /// Total bytes received in response bodies
    bytes_received: AtomicU64,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of current metrics as plain u64 values
    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_responses: self.successful_responses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }

    fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_success(&self) {
        self.successful_responses.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of HTTP metrics with plain u64 values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpMetricsSnapshot {
    /// Total number of HTTP requests sent to the server
    pub total_requests: u64,
    /// Total number of successful responses (2xx status codes)
    pub successful_responses: u64,
    /// Total number of error responses and transport failures
    pub errors: u64,
    /// Total number of retry attempts
    pub retries: u64,
    /// Total bytes sent in request bodies
    pub bytes_sent: u64,
    /// Total bytes received in response bodies
    pub bytes_received: u64,
}

impl std::fmt::Display for HttpMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "requests={} success={} errors={} retries={} sent={} recv={}",
            self.total_requests,
            self.successful_responses,
            self.errors,
            self.retries,
            format_bytes(self.bytes_sent),
            format_bytes(self.bytes_received),
        )
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// status codes where it's ok to retry and backoff
fn retry_for_status(code: StatusCode) -> bool {
    match code {
      StatusCode::TOO_MANY_REQUESTS /* 429 */ |
      StatusCode::GATEWAY_TIMEOUT /* 504 */ |
      StatusCode::REQUEST_TIMEOUT /* 408 */ => true,
      _ => false,
    }
}

/// Whether a request carries the session token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    Public,
    Token,
}

#[derive(Clone)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Bytes>,
    pub access: Access,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body.as_ref().map_or(0, Bytes::len))
            .field("access", &self.access)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct HttpClient {
    pub client: reqwest::Client,

    /// Base URL for API requests, without trailing slash (e.g., "http://127.0.0.1:5244")
    pub base_url: String,

    token: Mutex<Option<SessionToken>>,

    // Max retries for connection errors and timeouts on idempotent requests
    max_retries: u32,

    /// HTTP request/response metrics
    pub metrics: Arc<HttpMetrics>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder, base_url: &str, max_retries: u32) -> Result<Self> {
        let client = builder.build().context(HttpSnafu {
            method: "client-init",
            url: "",
        })?;
        Ok(HttpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
            max_retries,
            metrics: Arc::new(HttpMetrics::new()),
        })
    }

    /// Returns a snapshot of current HTTP metrics
    pub fn metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns true if a session token has been set.
    pub fn has_token(&self) -> bool {
        self.token.lock().is_some()
    }

    /// Sets the session token for authenticated requests.
    pub fn set_token(&self, token: &SessionToken) {
        *self.token.lock() = Some(token.clone());
    }

    /// Clears the session token if set.
    pub fn clear_token(&self) {
        *self.token.lock() = None;
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Makes an authenticated GET request.
    pub(crate) async fn get_request<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        let req = HttpRequest {
            method: Method::GET,
            path: path.into(),
            body: None,
            access: Access::Token,
        };
        self.send(req).await
    }

    /// Makes an unauthenticated GET request (for public endpoints).
    /// Returns the raw response body.
    pub(crate) async fn get_unauthenticated(&self, path: &str) -> Result<Bytes> {
        let req = HttpRequest {
            method: Method::GET,
            path: path.into(),
            body: None,
            access: Access::Public,
        };
        self.send_raw(req).await
    }

    /// Makes an authenticated POST request with JSON body.
    /// Returns the raw response body, which may or may not be an envelope.
    pub(crate) async fn post_request<B: Serialize>(&self, path: &str, body: &B) -> Result<Bytes> {
        let req = HttpRequest {
            method: Method::POST,
            path: path.into(),
            body: Some(Bytes::from(
                serde_json::to_vec(body).context(SerializationSnafu)?,
            )),
            access: Access::Token,
        };
        self.send_raw(req).await
    }

    /// Makes an unauthenticated POST request (for the login endpoint).
    pub(crate) async fn post_unauthenticated<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        let req = HttpRequest {
            method: Method::POST,
            path: path.into(),
            body: Some(Bytes::from(
                serde_json::to_vec(body).context(SerializationSnafu)?,
            )),
            access: Access::Public,
        };
        self.send(req).await
    }

    /// Sends a request and deserializes the json response envelope.
    ///
    /// The envelope's application `code` is not checked here; callers decide
    /// whether a non-200 code is an error.
    pub(crate) async fn send<T: DeserializeOwned>(&self, req: HttpRequest) -> Result<Envelope<T>> {
        let body = self.send_raw(req).await?;
        // deserialization failure should not be retried
        deserialize_json(&body)
    }

    /// This function handles all alist api requests
    /// - attaches the session token for `Access::Token` requests
    /// - retries up to `max_retries` times for connection failures or server timeout,
    ///   for idempotent methods only
    /// - maps http error codes into AlistErrors
    ///
    /// Returns the body of a 2xx response, undecoded.
    pub(crate) async fn send_raw(&self, req: HttpRequest) -> Result<Bytes> {
        let mut attempt = 0u32;

        let full_url = self.url(&req.path);
        let mut req_builder = self
            .client
            .request(req.method.clone(), &full_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if req.access == Access::Token {
            let token = self.token.lock().clone().ok_or(AlistError::Unauthorized)?;
            req_builder = token.set_auth_header(req_builder);
        }

        // debug log (if tracing enabled)
        log_request(&req_builder, req.body.as_ref());

        let body_size = req.body.as_ref().map_or(0, |b| b.len() as u64);

        loop {
            let request = req_builder
                .try_clone()
                .ok_or_else(|| {
                    // try_clone with no body should never return None
                    AlistError::Other {
                        message: "reqwest::RequestBuilder internal error".into(),
                    }
                })?
                .body(req.body.clone().unwrap_or_default());

            self.metrics.increment_requests();
            self.metrics.add_bytes_sent(body_size);

            match request.send().await {
                Ok(response) => {
                    let code = response.status();
                    match code {
                        ok if ok.is_success() => {
                            // If we fail to fully read the response, don't retry. The server might
                            // believe the request succeeded, and the request may not be idempotent.
                            let body = response.bytes().await.context(HttpSnafu {
                                method: req.method.to_string(),
                                url: req.path.clone(),
                            })?;
                            self.metrics.increment_success();
                            self.metrics.add_bytes_received(body.len() as u64);

                            log_response(&req.path, &body);
                            return Ok(body);
                        }
                        StatusCode::UNAUTHORIZED /* 401 */ => {
                            self.metrics.increment_errors();
                            let message = response.text().await.unwrap_or_default();
                            error!(?code, ?message, ?req, "http");
                            return Err(AlistError::Unauthorized);
                        }
                        _ => {
                            let message = response.text().await.unwrap_or_default();
                            error!(?code, ?req, message, attempt, "http");
                            self.metrics.increment_errors();
                            if attempt < self.max_retries
                                && retry_for_status(code)
                                && is_idempotent_method(&req.method)
                            {
                                log_and_backoff(attempt, code.to_string()).await;
                                self.metrics.increment_retries();
                                attempt += 1;
                                continue;
                            }
                            return Err(AlistError::ApiError {
                                code: i64::from(code.as_u16()),
                                method: req.method.to_string(),
                                url: req.path,
                                message,
                            });
                        }
                    }
                }
                Err(e) => {
                    error!(source=?e, ?req, "http");
                    if (e.is_connect() || e.is_timeout())
                        && is_idempotent_method(&req.method)
                        && attempt < self.max_retries
                    {
                        log_and_backoff(attempt, e.to_string()).await;
                        self.metrics.increment_retries();
                        attempt += 1;
                        continue;
                    }
                    // non-recoverable (DNS error, invalid URL, etc.), or out of retries
                    self.metrics.increment_errors();
                    return Err(AlistError::Http {
                        method: req.method.to_string(),
                        url: full_url,
                        source: e,
                    });
                }
            }
        }
    }
}

// dump request
// requires RUST_LOG=alist::http_json=trace
fn log_request(builder: &reqwest::RequestBuilder, body: Option<&Bytes>) {
    if tracing::enabled!(target: "alist::http_json", tracing::Level::TRACE)
        && let Some(req) = builder.try_clone().and_then(|b| b.build().ok())
    {
        let method = req.method().as_str();
        let url = req.url();
        let body = body
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default();
        // don't log headers so we don't leak the session token
        trace!(target: "alist::http_json", "{method} url={url} body={body}");
    }
}

// dump json response, for debugging
fn log_response(path: &str, body: &Bytes) {
    if tracing::enabled!(target: "alist::http_json", tracing::Level::TRACE) {
        trace!(target: "alist::http_json", "Response path={path} body={}",
            String::from_utf8_lossy(body)
        );
    }
}

// deserialize, reporting errors with 'serde_path_to_error', which provides
// detailed json path to the error
fn deserialize_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("Deserialization failed at {}: {}", err.path(), err);
            Err(AlistError::Deserialization {
                source: err.into_inner(),
            })
        }
    }
}

// log attempt and sleep for exponential backoff
async fn log_and_backoff(attempt: u32, err: String) {
    // exponential backoff: 1s, 2s, 4s, with jitter
    let base_delay = 2u64.pow(attempt);
    let jitter = f64::from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos(),
    ) / 1_000_000_000.0;
    let jittered_delay = ((base_delay as f64) * (0.5 + jitter)).round() as u64;
    let delay = jittered_delay.max(1);
    warn!("Recoverable error {err}. Attempt {attempt}. Waiting {delay}s before retry");
    tokio::time::sleep(Duration::from_secs(delay)).await;
}

fn is_idempotent_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        debug!(url = %self.base_url, metrics = %self.metrics.snapshot(), "http client closed");
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn test_retry_for_status() {
        assert!(retry_for_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(retry_for_status(StatusCode::REQUEST_TIMEOUT));
        assert!(retry_for_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!retry_for_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn only_idempotent_methods_retry() {
        assert!(is_idempotent_method(&Method::GET));
        assert!(!is_idempotent_method(&Method::POST));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpClient::new(reqwest::Client::builder(), "http://127.0.0.1:5244/", 0)
            .expect("client");
        assert_eq!(
            client.url("/api/auth/login"),
            "http://127.0.0.1:5244/api/auth/login"
        );
    }

    #[test]
    fn metrics_display() {
        let snapshot = HttpMetricsSnapshot {
            total_requests: 3,
            successful_responses: 2,
            errors: 1,
            retries: 0,
            bytes_sent: 512,
            bytes_received: 4096,
        };
        assert_eq!(
            snapshot.to_string(),
            "requests=3 success=2 errors=1 retries=0 sent=512B recv=4.0KB"
        );
    }

    #[tokio::test]
    async fn token_request_without_login_is_unauthorized() {
        let client =
            HttpClient::new(reqwest::Client::builder(), "http://127.0.0.1:9", 0).expect("client");
        let err = client
            .get_request::<serde_json::Value>("/api/admin/storage/list")
            .await
            .unwrap_err();
        assert!(matches!(err, AlistError::Unauthorized));
        assert_eq!(client.metrics_snapshot().total_requests, 0);
    }
}
