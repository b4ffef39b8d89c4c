//! Data structures describing one callable operation from the spec.

use oak_core::consts;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Location where a parameter appears in the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// Path parameter (e.g. /users/{id})
    Path,
    /// Query parameter (e.g. ?search=value)
    Query,
    /// Header parameter
    Header,
    /// Cookie parameter
    Cookie,
}

impl std::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamLocation::Path => write!(f, "path"),
            ParamLocation::Query => write!(f, "query"),
            ParamLocation::Header => write!(f, "header"),
            ParamLocation::Cookie => write!(f, "cookie"),
        }
    }
}

/// One declared request parameter.
///
/// Path, query, header and cookie parameters share this shape and are
/// discriminated by `location` only.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    /// Original name from the spec
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    /// Resolved JSON schema of the parameter
    pub schema: Value,
    /// Parameter-level description; the schema's own description wins when
    /// both are present.
    pub description: Option<String>,
}

/// One request body variant.
#[derive(Debug, Clone)]
pub struct BodyDefinition {
    /// Content type, e.g. `application/json`
    pub content_type: String,
    pub required: bool,
    /// Whether this is the preferred variant (the JSON one).
    pub default_body: bool,
    /// Reference name of the schema, or a synthesized
    /// `<operationId><Tag>Body` name when the schema is anonymous.
    pub type_name: String,
    /// Raw body schema; may still contain `$ref` nodes.
    pub schema: Value,
}

/// Security requirement attached to an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRequirement {
    pub scheme_name: String,
    pub scopes: Vec<String>,
}

/// One callable endpoint, indexed by its operation id.
#[derive(Debug, Clone)]
pub struct OperationDefinition {
    pub operation_id: String,
    pub summary: String,
    /// GET, POST, DELETE, ...
    pub method: String,
    /// Path template with `{name}` placeholders
    pub path: String,
    /// Ordered to match the placeholders in `path`, left to right.
    pub path_params: Vec<ParameterDefinition>,
    pub query_params: Vec<ParameterDefinition>,
    pub header_params: Vec<ParameterDefinition>,
    pub cookie_params: Vec<ParameterDefinition>,
    /// Accepted body variants, deduplicated by content type.
    pub bodies: Vec<BodyDefinition>,
    pub body_required: bool,
    pub security: Vec<SecurityRequirement>,
}

impl OperationDefinition {
    /// All parameters regardless of location.
    pub fn all_params(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.query_params
            .iter()
            .chain(self.header_params.iter())
            .chain(self.cookie_params.iter())
            .chain(self.path_params.iter())
    }

    /// The preferred body: the `application/json` variant when present,
    /// otherwise the first accepted one.
    pub fn default_body(&self) -> Option<&BodyDefinition> {
        self.bodies
            .iter()
            .find(|b| b.default_body)
            .or_else(|| self.bodies.first())
    }

    /// Content type of the preferred body, if any body is accepted.
    pub fn default_body_type(&self) -> Option<&str> {
        self.default_body().map(|b| b.content_type.as_str())
    }

    pub fn is_form_encoded(&self) -> bool {
        self.default_body_type() == Some(consts::URL_ENCODED)
    }
}
