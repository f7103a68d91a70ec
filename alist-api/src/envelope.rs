//! Response envelope
//!
//! Every AList api response is wrapped as `{ "code": 200, "message": "success", "data": ... }`.
//! The http status is normally 200 even for failed requests; the application status is `code`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, config::API_CODE_OK, prelude::*};

/// Outer wrapper of every api response.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Envelope<T> {
    /// Application status code. 200 on success.
    pub code: i64,

    /// Server message, "success" or a description of the failure
    #[serde(default)]
    pub message: String,

    /// Payload. Missing or null for requests that return no data.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Returns true if the application status code is 200
    pub fn is_ok(&self) -> bool {
        self.code == API_CODE_OK
    }

    /// Converts a non-200 application code into an `ApiError`.
    pub(crate) fn ensure_ok(self, method: &str, url: &str) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(AlistError::ApiError {
                code: self.code,
                method: method.to_string(),
                url: url.to_string(),
                message: self.message,
            })
        }
    }

    /// Status portion of the envelope, without the payload
    pub fn reply(&self) -> ApiReply {
        ApiReply {
            code: self.code,
            message: self.message.clone(),
        }
    }
}

impl Envelope<Value> {
    /// Unwraps the listing layer: returns `data.content` if `data` is an object
    /// containing `content`, otherwise all of `data` (null if absent).
    pub fn into_records(self) -> Value {
        match self.data {
            Some(Value::Object(mut map)) if map.contains_key("content") => {
                map.remove("content").unwrap_or(Value::Null)
            }
            Some(data) => data,
            None => Value::Null,
        }
    }
}

/// Application status returned by create and update requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiReply {
    pub code: i64,
    pub message: String,
}

/// Longest body excerpt kept in a synthetic reply
const BODY_EXCERPT_LEN: usize = 80;

impl ApiReply {
    /// Returns true if the server accepted the request
    pub fn is_ok(&self) -> bool {
        self.code == API_CODE_OK
    }

    /// Decodes the reply of a successful (2xx) create or update request.
    ///
    /// A body that is not an envelope (empty, plain text, a proxy page) is taken as
    /// accepted: the reply gets code 200 and a message quoting the start of the body.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Envelope<Value>>(body) {
            Ok(envelope) => envelope.reply(),
            Err(_) => {
                let text = String::from_utf8_lossy(body);
                let excerpt: String = text.trim().chars().take(BODY_EXCERPT_LEN).collect();
                ApiReply {
                    code: API_CODE_OK,
                    message: format!("unrecognized reply: {excerpt:?}"),
                }
            }
        }
    }

    /// True if this reply was synthesized from a body that was not an envelope
    pub fn is_unrecognized(&self) -> bool {
        self.message.starts_with("unrecognized reply: ")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: Value) -> Envelope<Value> {
        serde_json::from_value(value).expect("envelope")
    }

    #[test]
    fn listing_returns_content() {
        let env = parse(json!({
            "code": 200,
            "message": "success",
            "data": {"content": [{"mount_path": "/a"}], "total": 1}
        }));
        assert_eq!(env.into_records(), json!([{"mount_path": "/a"}]));
    }

    #[test]
    fn non_listing_returns_data() {
        let env = parse(json!({
            "code": 200,
            "message": "success",
            "data": [{"key": "site_title", "value": "网盘"}]
        }));
        assert_eq!(env.into_records(), json!([{"key": "site_title", "value": "网盘"}]));
    }

    #[test]
    fn missing_data_is_null() {
        let env = parse(json!({"code": 200, "message": "success"}));
        assert_eq!(env.clone().into_records(), Value::Null);
        let env = parse(json!({"code": 200, "message": "success", "data": null}));
        assert_eq!(env.into_records(), Value::Null);
    }

    #[test]
    fn reply_from_envelope_body() {
        let reply = ApiReply::from_body(br#"{"code":500,"message":"storage already exists"}"#);
        assert_eq!(reply.code, 500);
        assert_eq!(reply.message, "storage already exists");
        assert!(!reply.is_unrecognized());
    }

    #[test]
    fn reply_from_plain_body_is_accepted() {
        let reply = ApiReply::from_body(b"ok");
        assert!(reply.is_ok());
        assert!(reply.is_unrecognized());
        assert_eq!(reply.message, "unrecognized reply: \"ok\"");

        let reply = ApiReply::from_body(b"");
        assert!(reply.is_ok());
        assert!(reply.is_unrecognized());

        // valid json, but no code
        let reply = ApiReply::from_body(br#"{"data":null}"#);
        assert!(reply.is_ok());
        assert!(reply.is_unrecognized());
    }

    #[test]
    fn ensure_ok_reports_server_message() {
        let env = parse(json!({"code": 400, "message": "password is incorrect"}));
        assert!(!env.is_ok());
        let err = env.ensure_ok("POST", "/api/auth/login").unwrap_err();
        match err {
            AlistError::ApiError { code, message, .. } => {
                assert_eq!(code, 400);
                assert_eq!(message, "password is incorrect");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
