//! Plugin facade composing the mask store, the operation catalog, the
//! projector, the custom action registry and the dispatcher.

use crate::custom::CustomActions;
use crate::definer::define_operations;
use crate::definition::OperationDefinition;
use crate::dispatch::{
    execute_with_credentials, HeaderAlias, HeaderValuePrefixes, SetCustomAuthHeaders,
};
use crate::error::{OpenApiError, Result};
use crate::project::{MaskPolicy, Projector};
use crate::request::{build_request, resolve_base_url, ApiRequest};
use crate::schema::SchemaIndex;
use async_trait::async_trait;
use oak_core::{
    consts, gzip, Action, ActionContext, ActionRuntime, CallResult, Connection, Credentials,
    CredentialsValidationResponse, Description, ExecuteActionRequest, ExecuteActionResponse,
};
use oak_mask::Mask;
use openapiv3::OpenAPI;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Hook validating a connection, typically with a cheap authenticated call.
pub type TestCredentialsFn = Arc<
    dyn Fn(&ActionContext) -> anyhow::Result<CredentialsValidationResponse> + Send + Sync,
>;

/// Hook judging a raw HTTP outcome; returns whether it is acceptable and
/// the payload to surface when it is not.
pub type ValidateResponseFn = Arc<dyn Fn(&CallResult) -> (bool, Vec<u8>) + Send + Sync>;

/// User-supplied callbacks wired into the facade.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub test_credentials: Option<TestCredentialsFn>,
    pub validate_response: Option<ValidateResponseFn>,
    pub set_custom_auth_headers: Option<SetCustomAuthHeaders>,
}

/// Static configuration of a plugin instance.
#[derive(Debug, Clone, Default)]
pub struct PluginMetadata {
    pub name: String,
    pub provider: String,
    /// Mask overlay path; empty means "no mask, expose everything".
    pub mask_file: String,
    /// OpenAPI document: a file path or an HTTP(S) URL.
    pub openapi_file: String,
    pub tags: Vec<String>,
    pub header_value_prefixes: HeaderValuePrefixes,
    pub header_alias: HeaderAlias,
    /// Credential keys that may satisfy path parameters.
    pub connection_path_params: Vec<String>,
    /// What to do with parameters missing from a configured mask.
    pub mask_policy: MaskPolicy,
}

/// An OpenAPI-driven action plugin.
///
/// The mask, operation catalog and action list are built once at
/// construction and read-only afterwards; per-call state (credentials,
/// base URL, request) stays on the stack of the call.
pub struct OpenApiPlugin {
    description: Description,
    actions: Vec<Action>,
    request_url: String,
    operations: HashMap<String, OperationDefinition>,
    schema_index: SchemaIndex,
    mask: Mask,
    custom: CustomActions,
    callbacks: Callbacks,
    header_value_prefixes: HeaderValuePrefixes,
    header_alias: HeaderAlias,
    connection_path_params: Vec<String>,
}

impl std::fmt::Debug for OpenApiPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Callbacks and custom actions hold closures that are not `Debug`;
        // expose the inspectable, data-only fields.
        f.debug_struct("OpenApiPlugin")
            .field("description", &self.description)
            .field("actions", &self.actions)
            .field("request_url", &self.request_url)
            .field("operations", &self.operations)
            .field("header_value_prefixes", &self.header_value_prefixes)
            .field("header_alias", &self.header_alias)
            .field("connection_path_params", &self.connection_path_params)
            .finish_non_exhaustive()
    }
}

impl OpenApiPlugin {
    /// Build a plugin: parse the mask, ingest the spec, project the action
    /// list and merge the custom registry.
    pub async fn new(
        connection_types: HashMap<String, Connection>,
        meta: PluginMetadata,
        callbacks: Callbacks,
        custom: CustomActions,
    ) -> Result<Self> {
        let spec = load_openapi(&meta.openapi_file).await?;
        Self::from_spec(spec, connection_types, meta, callbacks, custom)
    }

    /// Build a plugin from an already-loaded OpenAPI document.
    pub fn from_spec(
        spec: OpenAPI,
        connection_types: HashMap<String, Connection>,
        meta: PluginMetadata,
        callbacks: Callbacks,
        custom: CustomActions,
    ) -> Result<Self> {
        let mask = Mask::parse(&meta.mask_file)?;

        let request_url = resolve_server_url(&spec);
        let schema_index = SchemaIndex::from_spec(&spec);
        let operations = define_operations(&spec, &schema_index)?;
        let actions =
            Projector::new(&mask, &schema_index, meta.mask_policy).project(&operations);

        // A custom action shadowing a projected one is a configuration
        // mistake, caught at startup.
        for name in custom.action_names() {
            if actions.iter().any(|action| action.name == name) {
                return Err(OpenApiError::DuplicateAction(name.to_string()));
            }
        }

        let description = Description {
            name: meta.name,
            description: spec.info.description.clone().unwrap_or_default(),
            tags: meta.tags,
            provider: meta.provider,
            connections: connection_types,
        };

        debug!(
            plugin = %description.name,
            actions = actions.len(),
            operations = operations.len(),
            "constructed OpenAPI plugin"
        );

        Ok(Self {
            description,
            actions,
            request_url,
            operations,
            schema_index,
            mask,
            custom,
            callbacks,
            header_value_prefixes: meta.header_value_prefixes,
            header_alias: meta.header_alias,
            connection_path_params: meta.connection_path_params,
        })
    }

    /// Parse a plugin from an inline OpenAPI document (JSON or YAML).
    pub fn from_spec_str(
        content: &str,
        connection_types: HashMap<String, Connection>,
        meta: PluginMetadata,
        callbacks: Callbacks,
        custom: CustomActions,
    ) -> Result<Self> {
        let spec = parse_spec(content)?;
        Self::from_spec(spec, connection_types, meta, callbacks, custom)
    }

    pub fn action_exists(&self, action_name: &str) -> bool {
        self.actions.iter().any(|action| action.name == action_name)
            || self.custom.has_action(action_name)
    }

    /// Credential bag for this plugin's provider; in non-mandatory mode a
    /// missing connection degrades to an empty bag.
    fn fetch_credentials(&self, ctx: &ActionContext) -> Result<Credentials> {
        match ctx.get_credentials(&self.description.provider) {
            Ok(credentials) => Ok(credentials),
            Err(_) if consts::connection_not_mandatory() => {
                warn!(provider = %self.description.provider, "no credentials provided");
                Ok(Credentials::new())
            }
            Err(_) => Err(OpenApiError::MissingCredentials(
                self.description.provider.clone(),
            )),
        }
    }

    /// Resolve aliases and assemble the HTTP request for one invocation.
    fn parse_action_request(
        &self,
        credentials: &Credentials,
        request: &ExecuteActionRequest,
        request_url: &str,
    ) -> Result<ApiRequest> {
        if !self.action_exists(&request.name) {
            return Err(OpenApiError::UnknownAction(request.name.clone()));
        }

        let original = self.mask.replace_action_alias(&request.name).to_string();
        let operation = self
            .operations
            .get(&original)
            .ok_or_else(|| OpenApiError::UnknownAction(request.name.clone()))?;

        let mut parameters = self
            .mask
            .replace_action_parameters_aliases(&original, request.parameters.clone());

        // Some connections carry values (an account id, a region) that
        // satisfy path parameters directly.
        for (key, value) in credentials {
            if self
                .connection_path_params
                .iter()
                .any(|declared| declared.eq_ignore_ascii_case(key))
            {
                parameters.insert(key.clone(), value.clone());
            }
        }

        build_request(operation, &parameters, request_url, &self.schema_index)
    }

    async fn dispatch(
        &self,
        ctx: Arc<ActionContext>,
        request: &ExecuteActionRequest,
    ) -> Result<ExecuteActionResponse> {
        let mut credentials = self.fetch_credentials(&ctx)?;

        // The base URL for this call only; the stored default is immutable.
        let request_url = resolve_base_url(&self.request_url, &credentials);
        credentials.remove(consts::REQUEST_URL_KEY);

        let api_request = self.parse_action_request(&credentials, request, &request_url)?;

        let result = execute_with_credentials(
            &credentials,
            api_request,
            &self.header_value_prefixes,
            &self.header_alias,
            self.callbacks.set_custom_auth_headers.as_ref(),
            request.timeout,
        )
        .await?;

        let (valid, message) = match &self.callbacks.validate_response {
            Some(validator) => validator(&result),
            None => default_validate_response(&result),
        };

        if valid {
            Ok(ExecuteActionResponse::ok(result.body))
        } else {
            Ok(ExecuteActionResponse {
                error_code: consts::ERROR_CODE,
                result: message,
            })
        }
    }
}

#[async_trait]
impl ActionRuntime for OpenApiPlugin {
    fn describe(&self) -> Description {
        debug!("handling describe request");
        self.description.clone()
    }

    fn get_actions(&self) -> Vec<Action> {
        debug!("handling get-actions request");
        let mut actions = self.actions.clone();
        actions.extend(self.custom.load_actions());
        actions
    }

    async fn test_credentials(
        &self,
        ctx: Arc<ActionContext>,
    ) -> oak_core::Result<CredentialsValidationResponse> {
        let Some(hook) = &self.callbacks.test_credentials else {
            return Err(oak_core::Error::message(
                "no test-credentials hook configured",
            ));
        };

        hook(&ctx).map_err(oak_core::Error::Other)
    }

    async fn execute_action(
        &self,
        ctx: Arc<ActionContext>,
        request: &ExecuteActionRequest,
    ) -> oak_core::Result<ExecuteActionResponse> {
        // Custom actions bypass the OpenAPI pipeline entirely.
        if self.custom.has_action(&request.name) {
            return Ok(self
                .custom
                .execute(ctx, request)
                .await
                .unwrap_or_else(|err| ExecuteActionResponse::failed(err.to_string())));
        }

        // Invocation failures are flattened into the response envelope.
        Ok(self
            .dispatch(ctx, request)
            .await
            .unwrap_or_else(|err| ExecuteActionResponse::failed(err.to_string())))
    }
}

/// The stock validator: any 2xx status is acceptable, anything else fails
/// the call with the response body as the result.
pub fn default_validate_response(result: &CallResult) -> (bool, Vec<u8>) {
    if result.is_success() {
        (true, Vec::new())
    } else {
        (false, result.body.clone())
    }
}

/// Dispatch an externally built request through the credential pipeline.
/// Used by test-credentials hooks that probe an endpoint directly.
pub async fn execute_request(
    ctx: &ActionContext,
    request: ApiRequest,
    provider: &str,
    prefixes: &HeaderValuePrefixes,
    aliases: &HeaderAlias,
    custom_auth: Option<&SetCustomAuthHeaders>,
    timeout_secs: u64,
) -> Result<CallResult> {
    let mut credentials = match ctx.get_credentials(provider) {
        Ok(credentials) => credentials,
        Err(_) if consts::connection_not_mandatory() => {
            warn!(provider = %provider, "no credentials provided");
            Credentials::new()
        }
        Err(_) => return Err(OpenApiError::MissingCredentials(provider.to_string())),
    };
    credentials.remove(consts::REQUEST_URL_KEY);

    execute_with_credentials(&credentials, request, prefixes, aliases, custom_auth, timeout_secs)
        .await
}

/// Load an OpenAPI document from a URL or a (possibly gzip-bundled) file.
pub async fn load_openapi(file_path: &str) -> Result<OpenAPI> {
    if let Ok(url) = Url::parse(file_path) {
        if url.has_host() {
            debug!(url = %file_path, "loading OpenAPI spec from URL");
            let content = reqwest::get(url).await?.text().await?;
            return parse_spec(&content);
        }
    }

    debug!(path = %file_path, "loading OpenAPI spec from file");
    let data = gzip::read_maybe_gzipped(file_path)?;
    parse_spec(&String::from_utf8_lossy(&data))
}

fn parse_spec(content: &str) -> Result<OpenAPI> {
    serde_json::from_str(content)
        .or_else(|_| serde_yaml::from_str(content))
        .map_err(|err: serde_yaml::Error| OpenApiError::ParseError(err.to_string()))
}

/// The spec's default base URL: the first server, with `{var}` tokens
/// substituted from the server's declared variable defaults.
fn resolve_server_url(spec: &OpenAPI) -> String {
    let Some(server) = spec.servers.first() else {
        warn!("spec declares no servers; relying on the REQUEST_URL credential");
        return String::new();
    };

    let mut url = server.url.clone();
    if let Some(variables) = &server.variables {
        for (name, variable) in variables {
            url = url.replace(
                &format!("{}{name}{}", consts::PARAM_PREFIX, consts::PARAM_SUFFIX),
                &variable.default,
            );
        }
    }

    url
}
