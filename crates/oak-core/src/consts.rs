//! Shared constants for parameter typing, wire formats and environment keys.

pub const TYPE_ARRAY: &str = "array";
pub const TYPE_INTEGER: &str = "integer";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_BOOL: &str = "bool";
pub const TYPE_OBJECT: &str = "object";
pub const TYPE_JSON: &str = "code:json";
pub const TYPE_DROPDOWN: &str = "dropdown";

pub const BODY_PARAM_DELIMITER: &str = ".";
pub const REQUEST_BODY_TYPE: &str = "application/json";
pub const URL_ENCODED: &str = "application/x-www-form-urlencoded";
pub const PARAM_PREFIX: &str = "{";
pub const PARAM_SUFFIX: &str = "}";
pub const REQUEST_URL_KEY: &str = "REQUEST_URL";
pub const ARRAY_DELIMITER: &str = ",";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const CONTENT_LENGTH_HEADER: &str = "Content-Length";

pub const BEARER_AUTH: &str = "Bearer ";
pub const BASIC_AUTH: &str = "Basic ";
pub const BASIC_AUTH_USERNAME: &str = "USERNAME";
pub const BASIC_AUTH_PASSWORD: &str = "PASSWORD";

pub const PARAM_PLACEHOLDER_PREFIX: &str = "Example: ";

pub const ERROR_CODE: i64 = 1;
pub const OK_CODE: i64 = 0;

pub const GZIP_SUFFIX: &str = ".gz";
pub const ENV_PROD: &str = "PROD";
pub const ENV_CONNECTION_NOT_MANDATORY: &str = "CONNECTION_IS_NOT_MANDATORY";

/// Mask parameter types whose leading `_`-separated token names a high-level
/// type rather than a plain format (e.g. `date_epoch` -> type `date`).
pub const FORMAT_DELIMITER: &str = "_";
pub const FORMAT_PREFIXES: &[&str] = &["date"];

/// The default parameter ordering index: parameters are ordered from lowest
/// to highest, so 999 places a parameter at the tail of the list.
pub const DEFAULT_PARAM_INDEX: i64 = 999;

/// Filename suffix of locally authored action definitions.
pub const ACTION_FILE_SUFFIX: &str = ".action.yaml";

/// True when the process runs in gzip-bundled ("prod") mode.
pub fn prod_enabled() -> bool {
    std::env::var(ENV_PROD).map(|v| !v.is_empty()).unwrap_or(false)
}

/// True when a missing credential bag should downgrade to a warning.
pub fn connection_not_mandatory() -> bool {
    std::env::var(ENV_CONNECTION_NOT_MANDATORY)
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}
