//! Spec ingestion: walk an OpenAPI document and emit the operation catalog.
//!
//! Paths and methods are visited in sorted order so the resulting catalog
//! is deterministic for a given document.

use crate::definition::{
    BodyDefinition, OperationDefinition, ParamLocation, ParameterDefinition, SecurityRequirement,
};
use crate::error::{OpenApiError, Result};
use crate::schema::{ref_name, SchemaIndex};
use oak_core::consts;
use once_cell::sync::Lazy;
use openapiv3::{OpenAPI, Operation, Parameter, ParameterSchemaOrContent, ReferenceOr, RequestBody};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

static PATH_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[.;?]?([^{}*]+)\*?\}").expect("path parameter regex"));

/// Build the operation catalog for an OpenAPI document.
pub fn define_operations(
    spec: &OpenAPI,
    index: &SchemaIndex,
) -> Result<HashMap<String, OperationDefinition>> {
    let mut operations = HashMap::new();

    let mut paths: Vec<_> = spec.paths.paths.iter().collect();
    paths.sort_by(|a, b| a.0.cmp(b.0));

    for (request_path, path_item_ref) in paths {
        let path_item = match path_item_ref {
            ReferenceOr::Item(item) => item,
            ReferenceOr::Reference { .. } => {
                warn!(path = %request_path, "path references are not supported");
                continue;
            }
        };

        // Parameters defined at path level are shared by all methods.
        let global_params = describe_parameters(&path_item.parameters, spec, index);

        let methods = [
            ("delete", &path_item.delete),
            ("get", &path_item.get),
            ("head", &path_item.head),
            ("options", &path_item.options),
            ("patch", &path_item.patch),
            ("post", &path_item.post),
            ("put", &path_item.put),
            ("trace", &path_item.trace),
        ];

        for (method_name, operation_opt) in methods {
            let Some(operation) = operation_opt else {
                continue;
            };

            let op_def =
                define_operation(operation, spec, index, request_path, method_name, &global_params)?;

            if operations.contains_key(&op_def.operation_id) {
                warn!(operation = %op_def.operation_id, "duplicate operation id, keeping the last definition");
            }
            operations.insert(op_def.operation_id.clone(), op_def);
        }
    }

    debug!(operations = operations.len(), "defined operation catalog");
    Ok(operations)
}

fn define_operation(
    operation: &Operation,
    spec: &OpenAPI,
    index: &SchemaIndex,
    request_path: &str,
    method: &str,
    global_params: &[ParameterDefinition],
) -> Result<OperationDefinition> {
    let operation_id = operation
        .operation_id
        .clone()
        .unwrap_or_else(|| generate_operation_id(request_path, method));

    let summary = operation
        .summary
        .as_ref()
        .or(operation.description.as_ref())
        .cloned()
        .unwrap_or_default();

    // The parameters of an operation are the union of the path-level and
    // the method-level declarations.
    let mut all_params = global_params.to_vec();
    all_params.extend(describe_parameters(&operation.parameters, spec, index));

    let by_location = |location: ParamLocation| -> Vec<ParameterDefinition> {
        all_params
            .iter()
            .filter(|p| p.location == location)
            .cloned()
            .collect()
    };

    // Path parameters are reordered to match the placeholders in the path
    // template; downstream substitution depends on that order.
    let path_params = sort_params_by_path(request_path, by_location(ParamLocation::Path))?;

    let (bodies, body_required) = define_bodies(&operation_id, operation.request_body.as_ref());

    // Operation-level security overrides the document default.
    let security = operation
        .security
        .as_ref()
        .or(spec.security.as_ref())
        .map(|requirements| describe_security(requirements))
        .unwrap_or_default();

    Ok(OperationDefinition {
        operation_id,
        summary,
        method: method.to_uppercase(),
        path: request_path.to_string(),
        path_params,
        query_params: by_location(ParamLocation::Query),
        header_params: by_location(ParamLocation::Header),
        cookie_params: by_location(ParamLocation::Cookie),
        bodies,
        body_required,
        security,
    })
}

/// Flatten a parameter list, resolving `#/components/parameters` references.
fn describe_parameters(
    params: &[ReferenceOr<Parameter>],
    spec: &OpenAPI,
    index: &SchemaIndex,
) -> Vec<ParameterDefinition> {
    let mut out = Vec::new();

    for param_ref in params {
        let param = match param_ref {
            ReferenceOr::Item(param) => param,
            ReferenceOr::Reference { reference } => {
                match lookup_component_parameter(spec, reference) {
                    Some(param) => param,
                    None => {
                        warn!(reference = %reference, "unresolvable parameter reference");
                        continue;
                    }
                }
            }
        };

        if let Some(definition) = describe_parameter(param, index) {
            out.push(definition);
        }
    }

    out
}

fn lookup_component_parameter<'a>(spec: &'a OpenAPI, reference: &str) -> Option<&'a Parameter> {
    let name = reference.rsplit('/').next()?;
    match spec.components.as_ref()?.parameters.get(name)? {
        ReferenceOr::Item(param) => Some(param),
        ReferenceOr::Reference { .. } => None,
    }
}

fn describe_parameter(param: &Parameter, index: &SchemaIndex) -> Option<ParameterDefinition> {
    let (data, location) = match param {
        Parameter::Query { parameter_data, .. } => (parameter_data, ParamLocation::Query),
        Parameter::Header { parameter_data, .. } => (parameter_data, ParamLocation::Header),
        Parameter::Path { parameter_data, .. } => (parameter_data, ParamLocation::Path),
        Parameter::Cookie { parameter_data, .. } => (parameter_data, ParamLocation::Cookie),
    };

    let schema = match &data.format {
        ParameterSchemaOrContent::Schema(schema_ref) => {
            let raw = serde_json::to_value(schema_ref).unwrap_or(Value::Object(Default::default()));
            let (resolved, _) = index.resolve(&raw);
            resolved.clone()
        }
        ParameterSchemaOrContent::Content(_) => {
            warn!(parameter = %data.name, "content-style parameters are not supported");
            return None;
        }
    };

    Some(ParameterDefinition {
        name: data.name.clone(),
        location,
        required: data.required,
        schema,
        description: data.description.clone(),
    })
}

/// Build the accepted body variants for an operation, deduplicated by
/// content type; only JSON and form-urlencoded bodies are retained.
fn define_bodies(
    operation_id: &str,
    body_ref: Option<&ReferenceOr<RequestBody>>,
) -> (Vec<BodyDefinition>, bool) {
    let Some(body_ref) = body_ref else {
        return (Vec::new(), false);
    };

    let body = match body_ref {
        ReferenceOr::Item(body) => body,
        ReferenceOr::Reference { .. } => {
            warn!(operation = %operation_id, "request body references are not supported");
            return (Vec::new(), false);
        }
    };

    let mut bodies: Vec<BodyDefinition> = Vec::new();

    for (content_type, media_type) in &body.content {
        let (tag, default_body) = match content_type.as_str() {
            consts::REQUEST_BODY_TYPE => ("JSON", true),
            consts::URL_ENCODED => ("Form", false),
            other => {
                debug!(operation = %operation_id, content_type = %other, "discarding body variant");
                continue;
            }
        };

        if bodies.iter().any(|b| b.content_type == *content_type) {
            continue;
        }

        let schema = media_type
            .schema
            .as_ref()
            .and_then(|s| serde_json::to_value(s).ok())
            .unwrap_or(Value::Object(Default::default()));

        // Anonymous body schemas get a synthesized type name so they can
        // still be referred to downstream.
        let type_name = ref_name(&schema)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{operation_id}{tag}Body"));

        bodies.push(BodyDefinition {
            content_type: content_type.clone(),
            required: body.required,
            default_body,
            type_name,
            schema,
        });
    }

    (bodies, body.required)
}

fn describe_security(requirements: &[openapiv3::SecurityRequirement]) -> Vec<SecurityRequirement> {
    let mut out = Vec::new();

    for requirement in requirements {
        let mut keys: Vec<_> = requirement.keys().collect();
        keys.sort();
        for key in keys {
            out.push(SecurityRequirement {
                scheme_name: key.clone(),
                scopes: requirement.get(key).cloned().unwrap_or_default(),
            });
        }
    }

    out
}

/// Reorder path parameter definitions to match the placeholder order of the
/// path template. A count or name mismatch is a definition-time error.
fn sort_params_by_path(
    path: &str,
    params: Vec<ParameterDefinition>,
) -> Result<Vec<ParameterDefinition>> {
    let placeholders = ordered_params_from_path(path);

    if placeholders.len() != params.len() {
        return Err(OpenApiError::PathParamMismatch {
            path: path.to_string(),
            detail: format!(
                "has {} positional parameters, but {} are declared",
                placeholders.len(),
                params.len()
            ),
        });
    }

    let mut out = Vec::with_capacity(params.len());
    for name in &placeholders {
        let param = params
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| OpenApiError::PathParamMismatch {
                path: path.to_string(),
                detail: format!("refers to parameter '{name}', which is not declared"),
            })?;
        out.push(param.clone());
    }

    Ok(out)
}

/// Placeholder names in a path template, left to right; matcher modifiers
/// (`{.name}`, `{;name}`, `{?name}`, `{name*}`) are stripped.
pub fn ordered_params_from_path(path: &str) -> Vec<String> {
    PATH_PARAM_RE
        .captures_iter(path)
        .map(|captures| captures[1].to_string())
        .collect()
}

fn generate_operation_id(path: &str, method: &str) -> String {
    let path_parts: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with(consts::PARAM_PREFIX))
        .collect();

    let path_str = if path_parts.is_empty() {
        "root".to_string()
    } else {
        path_parts.join("_")
    };

    format!("{method}_{path_str}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Test API
  version: 1.0.0
servers:
  - url: https://api.example.com
security:
  - apiKey: []
paths:
  /api/teams/{teamId}/members/{userId}:
    parameters:
      - name: userId
        in: path
        required: true
        schema:
          type: integer
      - name: teamId
        in: path
        required: true
        schema:
          type: integer
    put:
      operationId: UpdateTeamMember
      summary: Update a member
      security:
        - basicAuth: ["admin"]
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              properties:
                role:
                  type: string
          application/x-www-form-urlencoded:
            schema:
              type: object
              properties:
                role:
                  type: string
          text/plain:
            schema:
              type: string
      responses:
        '200':
          description: Success
  /api/org/invites:
    post:
      operationId: InviteOrgMember
      summary: Invite a member
      parameters:
        - name: dryRun
          in: query
          schema:
            type: boolean
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Invite'
      responses:
        '200':
          description: Success
components:
  schemas:
    Invite:
      type: object
      properties:
        name:
          type: string
"#;

    fn catalog() -> HashMap<String, OperationDefinition> {
        let spec: OpenAPI = serde_yaml::from_str(TEST_SPEC).unwrap();
        let index = SchemaIndex::from_spec(&spec);
        define_operations(&spec, &index).unwrap()
    }

    #[test]
    fn path_params_follow_template_order() {
        let ops = catalog();
        let op = &ops["UpdateTeamMember"];
        let names: Vec<_> = op.path_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["teamId", "userId"]);
        assert_eq!(names, ordered_params_from_path(&op.path));
    }

    #[test]
    fn bodies_keep_only_recognized_content_types() {
        let ops = catalog();
        let op = &ops["UpdateTeamMember"];
        assert_eq!(op.bodies.len(), 2);
        assert_eq!(op.default_body_type(), Some("application/json"));
        assert!(op.body_required);
    }

    #[test]
    fn anonymous_body_gets_synthesized_type_name() {
        let ops = catalog();
        let body = ops["UpdateTeamMember"].default_body().unwrap();
        assert_eq!(body.type_name, "UpdateTeamMemberJSONBody");

        let named = ops["InviteOrgMember"].default_body().unwrap();
        assert_eq!(named.type_name, "Invite");
    }

    #[test]
    fn operation_security_overrides_global() {
        let ops = catalog();
        let op = &ops["UpdateTeamMember"];
        assert_eq!(op.security.len(), 1);
        assert_eq!(op.security[0].scheme_name, "basicAuth");
        assert_eq!(op.security[0].scopes, vec!["admin"]);

        let inherited = &ops["InviteOrgMember"];
        assert_eq!(inherited.security[0].scheme_name, "apiKey");
    }

    #[test]
    fn query_params_are_classified() {
        let ops = catalog();
        let op = &ops["InviteOrgMember"];
        assert_eq!(op.query_params.len(), 1);
        assert_eq!(op.query_params[0].name, "dryRun");
        assert!(op.path_params.is_empty());
    }

    #[test]
    fn placeholder_scan_handles_modifiers() {
        assert_eq!(
            ordered_params_from_path("/path/{param1}/{.param2*}/{?param3}"),
            vec!["param1", "param2", "param3"]
        );
    }

    #[test]
    fn missing_path_param_is_fatal() {
        let spec_yaml = r#"
openapi: 3.0.0
info:
  title: Bad API
  version: 1.0.0
paths:
  /things/{id}:
    get:
      operationId: GetThing
      responses:
        '200':
          description: Success
"#;
        let spec: OpenAPI = serde_yaml::from_str(spec_yaml).unwrap();
        let index = SchemaIndex::from_spec(&spec);
        let err = define_operations(&spec, &index).unwrap_err();
        assert!(matches!(err, OpenApiError::PathParamMismatch { .. }));
    }
}
