//! Public action vocabulary shared by the runtime, the generators and
//! locally authored action files.

use crate::consts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Public view of a single action parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionParameter {
    /// Semantic type shown to the caller (`string`, `integer`, `bool`,
    /// `array`, `code:json`, `dropdown`, ...)
    #[serde(rename = "type", default)]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: String,
    /// Optional regex validated by input components.
    #[serde(default)]
    pub pattern: String,
    /// Enumeration options; a non-empty list implies type `dropdown`.
    #[serde(default)]
    pub options: Vec<String>,
    /// Ordinal position in the parameter list, lowest first.
    #[serde(default = "default_param_index")]
    pub index: i64,
    /// Free-form format hint, e.g. `date_epoch`.
    #[serde(default)]
    pub format: String,
    /// Whether the field is a multi-select.
    #[serde(default)]
    pub is_multi: bool,
}

fn default_param_index() -> i64 {
    consts::DEFAULT_PARAM_INDEX
}

impl Default for ActionParameter {
    fn default() -> Self {
        Self {
            param_type: String::new(),
            description: String::new(),
            placeholder: String::new(),
            required: false,
            default: String::new(),
            pattern: String::new(),
            options: Vec::new(),
            index: consts::DEFAULT_PARAM_INDEX,
            format: String::new(),
            is_multi: false,
        }
    }
}

/// A named, described, enabled operation exposed by a plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "entry_point", default)]
    pub entry_point: String,
    #[serde(default)]
    pub parameters: HashMap<String, ActionParameter>,
}

/// Connection type a plugin advertises in its description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    pub name: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// Top-level plugin description returned by `describe`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub connections: HashMap<String, Connection>,
}

/// A single invocation of an action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteActionRequest {
    pub name: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    /// Total request deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    30
}

/// The `{error_code, result}` envelope every invocation resolves to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteActionResponse {
    pub error_code: i64,
    #[serde(default)]
    pub result: Vec<u8>,
}

impl ExecuteActionResponse {
    pub fn ok(result: Vec<u8>) -> Self {
        Self {
            error_code: consts::OK_CODE,
            result,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_code: consts::ERROR_CODE,
            result: message.into().into_bytes(),
        }
    }
}

/// Raw HTTP outcome handed to response validators.
#[derive(Debug, Clone, Default)]
pub struct CallResult {
    pub status_code: u16,
    pub body: Vec<u8>,
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Outcome of a credential test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsValidationResponse {
    pub valid: bool,
    #[serde(default)]
    pub message: String,
}
