//! Request and response values exchanged with the edit endpoint.
//!
//! Transport-agnostic: a web framework maps its own request onto an
//! [`EditRequest`] and writes the [`EditResponse`] back as JSON.

use std::collections::BTreeMap;

use http::{Method, StatusCode};
use serde_json::{json, Value as JsonValue};

use fedit_core::{Caller, Kwargs};

/// One inbound call.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub method: Method,
    /// URL path, including the configured prefix.
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Submitted form data (POST only).
    pub data: Kwargs,
    pub caller: Caller,
}

impl EditRequest {
    pub fn get(path: impl Into<String>, caller: Caller) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: BTreeMap::new(),
            data: Kwargs::new(),
            caller,
        }
    }

    pub fn post(path: impl Into<String>, caller: Caller) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(path, caller)
        }
    }

    /// Parse `path?query` as produced by the URL builders.
    pub fn from_url(method: Method, url: &str, caller: Caller) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            method,
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            data: Kwargs::new(),
            caller,
        }
    }

    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Kwargs) -> Self {
        self.data = data;
        self
    }

    /// Non-object values are ignored.
    #[must_use]
    pub fn with_json_data(mut self, data: JsonValue) -> Self {
        if let JsonValue::Object(map) = data {
            self.data = map;
        }
        self
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Outcome of one call: a status and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResponse {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl EditResponse {
    pub fn json(status: StatusCode, body: JsonValue) -> Self {
        Self { status, body }
    }

    pub fn ok(body: JsonValue) -> Self {
        Self::json(StatusCode::OK, body)
    }

    /// `{"success": true}` plus `data`.
    pub fn success(data: Kwargs) -> Self {
        let mut body = data;
        body.insert("success".into(), JsonValue::Bool(true));
        Self::ok(JsonValue::Object(body))
    }

    /// A failure carrying only a message.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(
            status,
            json!({
                "success": false,
                "error": message.into(),
            }),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::error(StatusCode::FORBIDDEN, message)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.body.get("success") == Some(&JsonValue::Bool(true))
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.body.get(key)
    }
}
