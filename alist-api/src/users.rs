//! # Users
//!
//! - [create_user](AlistClient::create_user) - create a user
//! - [update_admin](AlistClient::update_admin) - reset the administrator profile (user id 1)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, prelude::*};

/// User fields accepted by `/api/admin/user/create`.
///
/// Listings report the password as an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    /// 0 = general, 1 = guest, 2 = admin
    pub role: i64,
    /// Permission bitmask
    pub permission: i64,
    pub base_path: String,
    pub disabled: bool,
}

impl Record for UserRecord {
    const KIND: &'static str = "user";
    const CREATE_PATH: &'static str = "/api/admin/user/create";
    const ID_FIELD: &'static str = "username";
    const FIELDS: &'static [&'static str] = &[
        "username",
        "password",
        "role",
        "permission",
        "base_path",
        "disabled",
    ];

    fn id(&self) -> &str {
        &self.username
    }
}

/// Id of the built-in administrator account
pub const ADMIN_USER_ID: i64 = 1;

/// Admin role
pub const ADMIN_ROLE: i64 = 2;

/// All permission bits set
pub const ADMIN_PERMISSION: i64 = 16383;

/// Update payload for the built-in administrator account.
///
/// The password is sent empty, which leaves the current password unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminProfile {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub base_path: String,
    pub role: i64,
    pub permission: i64,
    pub disabled: bool,
    pub sso_id: String,
}

impl AdminProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: ADMIN_USER_ID,
            username: username.into(),
            password: String::new(),
            base_path: "/".to_string(),
            role: ADMIN_ROLE,
            permission: ADMIN_PERMISSION,
            disabled: false,
            sso_id: String::new(),
        }
    }
}

const USER_UPDATE_PATH: &str = "/api/admin/user/update";

impl AlistClient {
    /// Creates a user.
    pub async fn create_user(&self, user: &UserRecord) -> Result<ApiReply> {
        self.create_record(user).await
    }

    /// Updates the administrator account (id 1) to `username`, with full permissions
    /// and the root base path.
    pub async fn update_admin(&self, username: &str) -> Result<ApiReply> {
        debug!(username, "update admin profile");
        self.create(USER_UPDATE_PATH, &AdminProfile::new(username))
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn admin_profile_payload() {
        let payload = serde_json::to_value(AdminProfile::new("root")).unwrap();
        assert_eq!(
            payload,
            json!({
                "id": 1,
                "username": "root",
                "password": "",
                "base_path": "/",
                "role": 2,
                "permission": 16383,
                "disabled": false,
                "sso_id": ""
            })
        );
    }

    #[test]
    fn user_projection_keeps_whitelist() {
        let projection = UserRecord::project(&json!({
            "id": 2,
            "username": "guest",
            "password": "",
            "role": 1,
            "permission": 0,
            "base_path": "/",
            "disabled": true,
            "sso_id": "",
            "otp": false
        }))
        .expect("project");
        assert_eq!(projection.id, "guest");
        assert_eq!(
            projection.payload,
            json!({
                "username": "guest",
                "password": "",
                "role": 1,
                "permission": 0,
                "base_path": "/",
                "disabled": true
            })
        );
    }

    #[test]
    fn user_projection_accepts_any_value_type() {
        let projection = UserRecord::project(&json!({
            "username": "ops",
            "password": null,
            "role": [2],
            "permission": "all",
            "base_path": "/",
            "disabled": 0
        }))
        .expect("project");
        assert_eq!(projection.payload["role"], json!([2]));
        assert_eq!(projection.payload["password"], json!(null));
    }

    #[test]
    fn user_projection_requires_password_field() {
        let err = UserRecord::project(&json!({
            "username": "guest",
            "role": 1,
            "permission": 0,
            "base_path": "/",
            "disabled": true
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid user record: missing field `password`");
    }
}
