//! Legacy wire envelope written for every v2 request
//!
//! Success: `{"result": true, "data": ...}`.
//! Failure: `{"result": false, "code": <int>, "message": <string>}`.
//! Field names are part of the legacy contract and must not change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BridgeError, Language};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyEnvelope {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,
}

impl LegacyEnvelope {
    /// Success envelope carrying `data`
    pub fn success(data: Value) -> Self {
        Self {
            result: true,
            code: None,
            message: None,
            data: Some(data),
        }
    }

    /// Failure envelope
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            result: false,
            code: Some(code),
            message: Some(message.into()),
            data: None,
        }
    }

    /// Failure envelope for `error`, message rendered in `language`
    pub fn from_error(error: &BridgeError, language: Language) -> Self {
        Self::failure(error.code(), error.message(language))
    }
}
