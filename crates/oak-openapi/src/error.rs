//! Error types for spec ingestion, projection and dispatch.

use thiserror::Error;

/// Result type for OpenAPI plugin operations.
pub type Result<T> = std::result::Result<T, OpenApiError>;

/// Errors that can occur while building a plugin or executing an action.
#[derive(Error, Debug)]
pub enum OpenApiError {
    /// OpenAPI spec parsing error
    #[error("failed to parse OpenAPI spec: {0}")]
    ParseError(String),

    /// Invalid OpenAPI specification
    #[error("invalid OpenAPI spec: {0}")]
    InvalidSpec(String),

    /// A path template and its declared path parameters disagree
    #[error("path '{path}': {detail}")]
    PathParamMismatch { path: String, detail: String },

    /// Action name collision between projected and custom actions
    #[error("duplicate action name '{0}' between spec and custom actions")]
    DuplicateAction(String),

    /// Requested action is not exposed
    #[error("no such action: {0}")]
    UnknownAction(String),

    /// Credential bag is required but absent
    #[error("no credentials provided for provider '{0}'")]
    MissingCredentials(String),

    /// Custom auth hook failure
    #[error("failed to set custom headers: {0}")]
    AuthError(String),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Mask overlay error
    #[error(transparent)]
    Mask(#[from] oak_mask::MaskError),

    /// Core SDK error
    #[error(transparent)]
    Core(#[from] oak_core::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
