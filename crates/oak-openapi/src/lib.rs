//! # OAK OpenAPI Action Plugin
//!
//! Turns an OpenAPI v3 document plus a mask overlay into an action plugin:
//!
//! - Spec ingestion into an indexed operation catalog
//! - Mask-driven projection of public actions and typed parameters
//! - Request assembly from flat, dotted parameter bags
//! - Credential-derived authentication and HTTP dispatch
//! - Locally authored custom actions that extend the catalog
//!
//! ## Example
//!
//! ```no_run
//! use oak_openapi::{Callbacks, CustomActions, OpenApiPlugin, PluginMetadata};
//! use std::collections::HashMap;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let plugin = OpenApiPlugin::new(
//!     HashMap::new(),
//!     PluginMetadata {
//!         name: "grafana".to_string(),
//!         provider: "grafana".to_string(),
//!         openapi_file: "./api/grafana-openapi.yaml".to_string(),
//!         mask_file: "./mask.yaml".to_string(),
//!         ..Default::default()
//!     },
//!     Callbacks::default(),
//!     CustomActions::default(),
//! )
//! .await?;
//!
//! use oak_core::ActionRuntime;
//! println!("exposing {} actions", plugin.get_actions().len());
//! # Ok(())
//! # }
//! ```

mod custom;
mod definer;
mod definition;
mod dispatch;
mod error;
mod plugin;
mod project;
mod request;
mod schema;

pub use custom::{ActionHandler, CustomActions};
pub use definer::{define_operations, ordered_params_from_path};
pub use definition::{
    BodyDefinition, OperationDefinition, ParamLocation, ParameterDefinition, SecurityRequirement,
};
pub use dispatch::{
    execute_with_credentials, normalize_url, set_authentication_headers, HeaderAlias,
    HeaderValuePrefixes, SetCustomAuthHeaders,
};
pub use error::{OpenApiError, Result};
pub use plugin::{
    default_validate_response, execute_request, load_openapi, Callbacks, OpenApiPlugin,
    PluginMetadata, TestCredentialsFn, ValidateResponseFn,
};
pub use project::{MaskPolicy, Projector};
pub use request::{build_request, resolve_base_url, ApiRequest};
pub use schema::SchemaIndex;
