//! # Storages
//!
//! A storage is a mounted backend (local disk, cloud drive, webdav, ...).
//! `mount_path` is its natural identifier. The server, not this client, decides whether
//! two storages with the same mount path may coexist.

use serde::{Deserialize, Serialize};

use crate::{Result, prelude::*};

/// Storage fields accepted by `/api/admin/storage/create`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageRecord {
    /// Path where the storage is mounted, e.g. "/aliyun"
    pub mount_path: String,
    pub order: i64,
    /// Driver name, e.g. "Local", "AliyundriveOpen"
    pub driver: String,
    /// Directory cache lifetime in minutes
    pub cache_expiration: i64,
    pub status: String,
    /// Driver-specific settings, a JSON document encoded as a string
    pub addition: String,
    pub remark: String,
    pub disabled: bool,
    pub enable_sign: bool,
    pub order_by: String,
    pub order_direction: String,
    pub extract_folder: String,
    pub web_proxy: bool,
    pub webdav_policy: String,
    pub proxy_range: bool,
    pub down_proxy_url: String,
}

impl Record for StorageRecord {
    const KIND: &'static str = "storage";
    const CREATE_PATH: &'static str = "/api/admin/storage/create";
    const ID_FIELD: &'static str = "mount_path";
    const FIELDS: &'static [&'static str] = &[
        "mount_path",
        "order",
        "driver",
        "cache_expiration",
        "status",
        "addition",
        "remark",
        "disabled",
        "enable_sign",
        "order_by",
        "order_direction",
        "extract_folder",
        "web_proxy",
        "webdav_policy",
        "proxy_range",
        "down_proxy_url",
    ];

    fn id(&self) -> &str {
        &self.mount_path
    }
}

impl AlistClient {
    /// Creates a storage.
    pub async fn create_storage(&self, storage: &StorageRecord) -> Result<ApiReply> {
        self.create_record(storage).await
    }
}
