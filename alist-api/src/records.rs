//! Records that can be created through the admin api
//!
//! A record type is a fixed whitelist of fields. Projecting a server record
//! (as returned by a listing endpoint) copies the whitelisted fields, values
//! untouched, and drops everything else, such as `id` or `modified`.
//! Values are not type checked: a null remark or a float order is sent as is,
//! and the server decides what it accepts.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Result, prelude::*};

/// A record that has a creation endpoint and a natural identifier.
///
/// The typed struct is a convenience for building payloads by hand.
/// Restoring raw records goes through [`Record::project`], which never
/// deserializes into the struct.
pub trait Record: Serialize + DeserializeOwned {
    /// Singular name used in log and summary messages, e.g. "storage"
    const KIND: &'static str;

    /// Path of the creation endpoint
    const CREATE_PATH: &'static str;

    /// Field holding the natural identifier
    const ID_FIELD: &'static str;

    /// Fields accepted by the creation endpoint, in payload order
    const FIELDS: &'static [&'static str];

    /// Natural identifier: mount path for storages, username for users
    fn id(&self) -> &str;

    /// Copies the whitelisted fields of a raw server record into a new payload.
    /// Fails if the record is not an object or a whitelisted field is missing.
    fn project(value: &Value) -> Result<Projection> {
        let kind = Self::KIND;
        let Some(source) = value.as_object() else {
            return Err(AlistError::InvalidRecord {
                kind: kind.to_string(),
                message: "not a json object".to_string(),
            });
        };
        let mut payload = Map::with_capacity(Self::FIELDS.len());
        for field in Self::FIELDS {
            let Some(value) = source.get(*field) else {
                return Err(AlistError::InvalidRecord {
                    kind: kind.to_string(),
                    message: format!("missing field `{field}`"),
                });
            };
            payload.insert((*field).to_string(), value.clone());
        }
        Ok(Projection {
            kind,
            create_path: Self::CREATE_PATH,
            id: raw_id(value, Self::ID_FIELD),
            payload: Value::Object(payload),
        })
    }
}

/// Whitelisted copy of a raw record, ready to post to its creation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub kind: &'static str,
    pub create_path: &'static str,
    pub id: String,
    pub payload: Value,
}

/// Best-effort identifier of a raw record, for log and summary messages.
///
/// Non-string identifiers are rendered as json.
pub fn raw_id(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => "(unknown)".to_string(),
        Some(other) => other.to_string(),
    }
}

impl AlistClient {
    /// Creates a record via its creation endpoint.
    pub async fn create_record<R: Record>(&self, record: &R) -> Result<ApiReply> {
        self.create(R::CREATE_PATH, record).await
    }

    /// Posts a projected raw record to its creation endpoint.
    pub async fn create_projection(&self, projection: &Projection) -> Result<ApiReply> {
        self.create(projection.create_path, &projection.payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn raw_id_renders_non_strings() {
        assert_eq!(raw_id(&json!({"username": "alice"}), "username"), "alice");
        assert_eq!(raw_id(&json!({"username": 7}), "username"), "7");
        assert_eq!(raw_id(&json!({"username": null}), "username"), "(unknown)");
        assert_eq!(raw_id(&json!({}), "username"), "(unknown)");
    }

    #[test]
    fn projection_of_non_object_fails() {
        let err = UserRecord::project(&json!(["alice"])).unwrap_err();
        assert!(matches!(err, AlistError::InvalidRecord { .. }));
        assert_eq!(err.to_string(), "Invalid user record: not a json object");
    }
}
