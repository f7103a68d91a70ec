//! Errors returned by `AlistClient`
//!
use snafu::prelude::*;

/// Errors returned by alist crate
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AlistError {
    // Http connection or timeout error
    #[snafu(display("HTTP error {method} url:{url}: {source}"))]
    Http {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    /// Server responded with an error, either as a non-success http status
    /// or as a non-200 `code` in the response envelope.
    #[snafu(display("Api Server reported error ({code}) {method} {url}: {message}"))]
    ApiError {
        code: i64,
        method: String,
        url: String,
        message: String,
    },

    /// Login failed: bad credentials, or the server could not be reached.
    #[snafu(display("Authentication failed: {message}"))]
    Auth { message: String },

    /// Reading a collection failed.
    #[snafu(display("Fetch {endpoint} failed: {message}"))]
    Fetch { endpoint: String, message: String },

    /// A create or update request failed in transport or was rejected with an http error status.
    #[snafu(display("Write {endpoint} failed: {message}"))]
    Write { endpoint: String, message: String },

    /// A raw record could not be projected onto its field whitelist.
    #[snafu(display("Invalid {kind} record: {message}"))]
    InvalidRecord { kind: String, message: String },

    /// Client is not authenticated.
    #[snafu(display("Client is not authenticated. Log in first."))]
    Unauthorized,

    /// Deserialization error. This means we didn't deserialize a server response correctly.
    #[snafu(display("Deserialization: {source}"))]
    Deserialization { source: serde_json::Error },

    /// Serialization error. unlikely to occur. If you see this error, please report it as a bug.
    #[snafu(display("Serialization: {source}"))]
    Serialization { source: serde_json::Error },

    /// Some other error occurred
    #[snafu(display("{message}"))]
    Other { message: String },
}

impl AlistError {
    /// Returns true for errors caused by missing or rejected credentials
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Unauthorized)
    }

    /// Message for wrapping this error into a `Fetch`, `Write`, or `Auth` error.
    /// Api errors keep only the server message, since the endpoint is reported by the wrapper.
    pub(crate) fn summary(&self) -> String {
        match self {
            Self::ApiError { code, message, .. } => format!("({code}) {message}"),
            other => other.to_string(),
        }
    }
}
