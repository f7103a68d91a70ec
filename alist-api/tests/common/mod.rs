//! Shared test utilities for alist integration tests
//!
//! Starts a mock server and builds a client pointed at it.
#![allow(dead_code)]

use alist::mock::{MockAlistHandle, MockAlistServer, MockState};
use alist::prelude::*;
use serde_json::{Value, json};

/// Starts a mock server with the given state
pub async fn start_server(state: MockState) -> MockAlistHandle {
    MockAlistServer::new(state)
        .start()
        .await
        .expect("start mock server")
}

/// Client for the mock server, with retries disabled so failures are immediate
pub fn client_for(server: &MockAlistHandle, username: &str, password: &str) -> AlistClient {
    let config = ClientConfig::default().base_url(server.url()).max_retries(0);
    AlistClient::with_config(config, Credentials::new(username, password)).expect("client")
}

/// A storage as returned by the storage listing endpoint
pub fn listed_storage(id: i64, mount_path: &str) -> Value {
    json!({
        "id": id,
        "mount_path": mount_path,
        "order": id,
        "driver": "Local",
        "cache_expiration": 30,
        "status": "work",
        "addition": "{\"root_folder_path\":\"/srv\"}",
        "remark": "",
        "modified": "2024-05-01T10:00:00+08:00",
        "disabled": false,
        "enable_sign": false,
        "order_by": "name",
        "order_direction": "asc",
        "extract_folder": "front",
        "web_proxy": false,
        "webdav_policy": "302_redirect",
        "proxy_range": false,
        "down_proxy_url": ""
    })
}

/// A user as returned by the user listing endpoint
pub fn listed_user(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "password": "",
        "base_path": "/",
        "role": 0,
        "disabled": false,
        "permission": 256,
        "sso_id": "",
        "otp": false
    })
}
