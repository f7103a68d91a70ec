//! AList client authentication
//!
//! # Methods
//!
//! - [login](AlistClient::login) - exchange username and password for a session token
//! - [logout](AlistClient::logout) - discard session token
//! - [is_authenticated](AlistClient::is_authenticated) - true if a token is held
//!
//! The token is kept in memory only, and is discarded when the client is dropped.
//! There is no refresh: a run that outlives the server's token lifetime must log in again.

use std::fmt;

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Result, config::LOGIN_PATH, prelude::*};

/// Username and password used to log in.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"MASKED")
            .finish()
    }
}

/// Bearer token returned by login. Sent verbatim in the `Authorization` header.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn set_auth_header(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(reqwest::header::AUTHORIZATION, self.0.as_str())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(MASKED)")
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl AlistClient {
    /// Logs in with the client credentials and stores the session token for subsequent requests.
    ///
    /// Calling again replaces the stored token.
    /// Any failure, including an unreachable server, is reported as [`AlistError::Auth`].
    pub async fn login(&self) -> Result<SessionToken> {
        let request = LoginRequest {
            username: self.credentials.username(),
            password: self.credentials.password(),
        };
        debug!(username = self.credentials.username(), "login");
        let envelope: Envelope<LoginResponse> = self
            .client
            .post_unauthenticated(LOGIN_PATH, &request)
            .await
            .and_then(|env| env.ensure_ok("POST", LOGIN_PATH))
            .map_err(|e| AlistError::Auth {
                message: e.summary(),
            })?;
        let token = envelope
            .data
            .map(|data| SessionToken::new(data.token))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AlistError::Auth {
                message: "login response did not include a token".to_string(),
            })?;
        self.client.set_token(&token);
        debug!("login ok");
        Ok(token)
    }

    /// Discards the session token.
    pub fn logout(&self) {
        self.client.clear_token();
    }

    /// Returns true if the client holds a session token.
    /// The token is not validated with the server.
    pub fn is_authenticated(&self) -> bool {
        self.client.has_token()
    }

    /// Uses a token obtained elsewhere, instead of calling `login`.
    pub fn set_token(&self, token: &SessionToken) {
        self.client.set_token(token);
    }
}
