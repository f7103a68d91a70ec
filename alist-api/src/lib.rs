/*
 * AList admin api client
 *
 * SPDX-FileCopyrightText: 2025-2026 Steve Schoettler
 * SPDX-License-Identifier: Apache-2.0
 */
//! # AList Admin API Client
//!
//! A small async client for the administrative api of an [AList](https://alist.nn.ci)
//! file-management server, covering what is needed to back up and restore
//! server configuration.
//!
//! ## Features
//!
//! - password login with bearer token
//! - response envelope (`{code, message, data}`) handling
//! - collection listing: storages, settings, users, metas
//! - storage and user creation, admin profile update
//! - http pipeline with retries for idempotent requests, tracing, and metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alist::prelude::*;
//! # async fn example() -> Result<(), AlistError> {
//! let config = ClientConfig::default().base_url("http://127.0.0.1:5244");
//! let client = AlistClient::with_config(config, Credentials::new("admin", "secret"))?;
//! client.login().await?;
//!
//! let storages = client.fetch_collection(Collection::Storages).await?;
//! println!("{storages:#}");
//! client.close();
//! # Ok(())
//! # }
//! ```
//!
//! Login is an explicit step: fetch and create calls made before `login()`
//! fail with [`AlistError::Unauthorized`].
#![allow(clippy::missing_errors_doc)] // pedantic
#![allow(clippy::missing_const_for_fn)] //  nursery function
#![allow(clippy::must_use_candidate)] // pedantic
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unused_async)]

pub mod auth;
pub mod client;
pub mod collections;
pub mod envelope;
pub mod error;
mod http_client;
#[cfg(feature = "mock")]
#[doc(hidden)]
pub mod mock;
pub mod records;
pub mod storages;
pub mod users;

/// Result type alias using `AlistError` as the default error.
pub type Result<T, E = crate::error::AlistError> = std::result::Result<T, E>;

/// Prelude module - import the common types with `use alist::prelude::*;`
pub mod prelude {
    pub use super::ALIST_LOCAL_URL;
    pub use crate::error::*;
    pub use crate::{
        auth::{Credentials, SessionToken},
        client::{AlistClient, ClientConfig},
        collections::Collection,
        envelope::{ApiReply, Envelope},
        http_client::HttpMetricsSnapshot,
        records::{Projection, Record},
        storages::StorageRecord,
        users::{AdminProfile, UserRecord},
    };
}

// ============================================================================
// CONSTANTS
// ============================================================================

/// Address of a server running on the local host with its default port
pub const ALIST_LOCAL_URL: &str = "http://127.0.0.1:5244";

pub(crate) mod config {
    /// Environment variable for default endpoint URL
    pub const ALIST_URL_ENV: &str = "ALIST_URL";

    /// Application status code for a successful request
    pub const API_CODE_OK: i64 = 200;

    /// Max retries for idempotent requests
    pub const MAX_RETRIES: u32 = 3;

    /// Login endpoint
    pub const LOGIN_PATH: &str = "/api/auth/login";

    /// Unauthenticated settings endpoint, used to read the server version
    pub const PUBLIC_SETTINGS_PATH: &str = "/api/public/settings";
}
