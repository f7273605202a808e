//! ARM error envelope and operation status payloads

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error detail as returned inside `{"error": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_info: Vec<Value>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Decode an error payload from a response body.
    ///
    /// Accepts the standard envelope (`{"error": {...}}`) as well as a bare
    /// `{"code": ..., "message": ...}` object, which some resource providers
    /// still return. Returns `None` when neither carries a code or message.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }

        if let Ok(ErrorEnvelope { error: Some(detail) }) = serde_json::from_slice(body) {
            if detail.code.is_some() || detail.message.is_some() {
                return Some(detail);
            }
        }

        serde_json::from_slice::<ErrorDetail>(body)
            .ok()
            .filter(|d| d.code.is_some() || d.message.is_some())
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(message)) => write!(f, "{}", message),
            (None, None) => write!(f, "unknown error"),
        }
    }
}

/// Body of an `Azure-AsyncOperation` status resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl OperationStatus {
    /// Field names that make up a bare status envelope
    pub const ENVELOPE_FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "status",
        "startTime",
        "endTime",
        "percentComplete",
        "error",
    ];

    /// True when `value` is an object holding nothing but status-envelope fields
    pub fn is_envelope(value: &Value) -> bool {
        match value.as_object() {
            Some(map) => {
                map.contains_key("status")
                    && map.keys().all(|k| Self::ENVELOPE_FIELDS.contains(&k.as_str()))
            }
            None => false,
        }
    }
}
