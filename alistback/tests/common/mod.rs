//! Shared test utilities for alistback integration tests
//!
//! Starts a mock server, builds clients for it, and writes snapshot files.
#![allow(dead_code)]

use std::path::Path;

use alist::mock::{MockAlistHandle, MockAlistServer, MockState};
use alist::prelude::*;
use alistback::{restore::RestoreOptions, snapshot::Snapshot};
use serde_json::{Value, json};

/// Starts a mock server with the given state
pub async fn start_server(state: MockState) -> MockAlistHandle {
    MockAlistServer::new(state)
        .start()
        .await
        .expect("start mock server")
}

/// Client logging in as "admin", with retries disabled so failures are immediate
pub fn client_for(server: &MockAlistHandle, password: &str) -> AlistClient {
    let config = ClientConfig::default().base_url(server.url()).max_retries(0);
    AlistClient::with_config(config, Credentials::new("admin", password)).expect("client")
}

/// A storage as returned by the storage listing endpoint
pub fn storage(id: i64, mount_path: &str) -> Value {
    json!({
        "id": id,
        "mount_path": mount_path,
        "order": 0,
        "driver": "Local",
        "cache_expiration": 30,
        "status": "work",
        "addition": "{\"root_folder_path\":\"/data\"}",
        "remark": "",
        "modified": "2024-05-01T10:00:00+08:00",
        "disabled": false,
        "enable_sign": false,
        "order_by": "name",
        "order_direction": "asc",
        "extract_folder": "front",
        "web_proxy": false,
        "webdav_policy": "native_proxy",
        "proxy_range": false,
        "down_proxy_url": ""
    })
}

/// A user as returned by the user listing endpoint
pub fn user(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "password": "",
        "base_path": "/",
        "role": 0,
        "disabled": false,
        "permission": 0,
        "sso_id": ""
    })
}

/// Restore options for `input_file`, without password reset
pub fn options(input_file: &Path) -> RestoreOptions {
    RestoreOptions {
        input_file: input_file.to_path_buf(),
        reset: None,
        admin_username: "admin".to_string(),
    }
}

/// Writes a snapshot holding the given storages and users
pub fn write_snapshot(path: &Path, storages: Value, users: Value) {
    let snapshot = Snapshot {
        storages: Some(storages),
        users: Some(users),
        ..Snapshot::new("v3.35.0")
    };
    snapshot.save(path).expect("save snapshot");
}
