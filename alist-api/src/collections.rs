//! # Collections
//!
//! Generic read and write access to the admin api.
//!
//! - [fetch](AlistClient::fetch) - GET a listing endpoint, unwrap the envelope
//! - [fetch_collection](AlistClient::fetch_collection) - fetch one of the known collections
//! - [create](AlistClient::create) - POST a record to a creation endpoint
//! - [server_version](AlistClient::server_version) - version reported by the public settings
//!
//! ```rust,no_run
//! use alist::prelude::*;
//! # async fn example(client: &AlistClient) -> Result<(), AlistError> {
//! client.login().await?;
//! for collection in Collection::all() {
//!     let records = client.fetch_collection(collection).await?;
//!     println!("{collection}: {records}");
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::{Result, config::PUBLIC_SETTINGS_PATH, prelude::*};

/// Version string recorded when the server version can't be determined
pub const UNKNOWN_VERSION: &str = "unknown";

/// A named group of records, fetched as a unit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    Storages,
    Settings,
    Users,
    Metas,
}

impl Collection {
    /// All collections, in backup order
    pub fn all() -> impl Iterator<Item = Collection> {
        Self::iter()
    }

    /// Path of the listing endpoint
    pub fn list_path(self) -> &'static str {
        match self {
            Self::Storages => "/api/admin/storage/list",
            Self::Settings => "/api/admin/setting/list",
            Self::Users => "/api/admin/user/list",
            Self::Metas => "/api/admin/meta/list",
        }
    }
}

impl AlistClient {
    /// Fetches a listing endpoint and unwraps the response envelope.
    ///
    /// Returns `data.content` for paged listings, otherwise `data`.
    /// Requires a prior `login()`; otherwise fails with `Unauthorized`.
    /// Any other failure, including a non-200 application code, is reported as [`AlistError::Fetch`].
    pub async fn fetch(&self, path: &str) -> Result<Value> {
        let envelope: Envelope<Value> = match self.client.get_request(path).await {
            Ok(envelope) => envelope,
            Err(AlistError::Unauthorized) => return Err(AlistError::Unauthorized),
            Err(e) => {
                return Err(AlistError::Fetch {
                    endpoint: path.to_string(),
                    message: e.summary(),
                });
            }
        };
        let envelope = envelope
            .ensure_ok("GET", path)
            .map_err(|e| AlistError::Fetch {
                endpoint: path.to_string(),
                message: e.summary(),
            })?;
        debug!(path, "fetched");
        Ok(envelope.into_records())
    }

    /// Fetches one collection.
    pub async fn fetch_collection(&self, collection: Collection) -> Result<Value> {
        self.fetch(collection.list_path()).await
    }

    /// Posts a record to a creation or update endpoint.
    ///
    /// A transport failure or an http error status fails with [`AlistError::Write`].
    /// Any application code is accepted: the returned [`ApiReply`] carries it, and
    /// a non-200 code is logged as a warning. A 2xx body that is not an envelope is
    /// also accepted, with a warning (see [`ApiReply::from_body`]).
    pub async fn create<B: Serialize>(&self, path: &str, payload: &B) -> Result<ApiReply> {
        let body = match self.client.post_request(path, payload).await {
            Ok(body) => body,
            Err(AlistError::Unauthorized) => return Err(AlistError::Unauthorized),
            Err(e) => {
                return Err(AlistError::Write {
                    endpoint: path.to_string(),
                    message: e.summary(),
                });
            }
        };
        let reply = ApiReply::from_body(&body);
        if reply.is_unrecognized() {
            warn!(path, message = %reply.message, "reply is not an api envelope, assuming accepted");
        } else if !reply.is_ok() {
            warn!(path, code = reply.code, message = %reply.message, "server reported error");
        }
        Ok(reply)
    }

    /// Returns the server version from the public settings endpoint, or "unknown".
    /// Only `data.version` is read; the application code is ignored.
    /// Does not require login, and never fails.
    pub async fn server_version(&self) -> String {
        match self.client.get_unauthenticated(PUBLIC_SETTINGS_PATH).await {
            Ok(body) => version_from_settings(&body).unwrap_or_else(|| {
                debug!("public settings carry no version");
                UNKNOWN_VERSION.to_string()
            }),
            Err(e) => {
                debug!("server version unavailable: {e}");
                UNKNOWN_VERSION.to_string()
            }
        }
    }
}

/// Reads `data.version` from a public settings reply
fn version_from_settings(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .pointer("/data/version")
        .and_then(Value::as_str)
        .map(str::to_string)
}
