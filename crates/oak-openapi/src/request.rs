//! Request assembly: turn a flat parameter bag back into a structured
//! HTTP request for one operation.

use crate::definition::OperationDefinition;
use crate::error::Result;
use crate::schema::{schema_type, value_to_string, SchemaIndex};
use oak_core::{consts, Credentials};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::collections::HashMap;
use tracing::warn;

/// An assembled request, ready for authentication and dispatch.
///
/// Headers are keyed upper-case; the query is kept apart from the URL so
/// the dispatcher can append it after normalization.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_uppercase(), value.into());
    }
}

/// The per-call base URL: the `REQUEST_URL` credential overrides the
/// spec-derived default.
pub fn resolve_base_url(default_url: &str, credentials: &Credentials) -> String {
    credentials
        .get(consts::REQUEST_URL_KEY)
        .cloned()
        .unwrap_or_else(|| default_url.to_string())
}

/// Build the request for `operation` from an alias-resolved parameter bag.
pub fn build_request(
    operation: &OperationDefinition,
    parameters: &HashMap<String, String>,
    base_url: &str,
    index: &SchemaIndex,
) -> Result<ApiRequest> {
    // Sorted iteration keeps request assembly deterministic for a given bag.
    let parameters: BTreeMap<&str, &str> = parameters
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let request_path = substitute_path_params(&parameters, operation);

    let mut request = ApiRequest {
        method: operation.method.clone(),
        url: format!("{base_url}{request_path}"),
        ..Default::default()
    };

    if operation.method != "GET" {
        compose_body(&parameters, operation, index, &mut request)?;
    }

    if matches!(operation.method.as_str(), "POST" | "PUT" | "PATCH") {
        if let Some(body_type) = operation.default_body_type() {
            request.set_header(consts::CONTENT_TYPE_HEADER, body_type);
        }
    }

    for (name, value) in &parameters {
        if operation.header_params.iter().any(|p| p.name == *name) {
            request.set_header(name, *value);
        }
        if operation.cookie_params.iter().any(|p| p.name == *name) {
            request.cookies.push((name.to_string(), value.to_string()));
        }
        if operation.query_params.iter().any(|p| p.name == *name) {
            request.query.push((name.to_string(), value.to_string()));
        }
    }

    Ok(request)
}

/// Replace `{name}` placeholders with their URL-escaped values; parameter
/// names match case-insensitively.
fn substitute_path_params(
    parameters: &BTreeMap<&str, &str>,
    operation: &OperationDefinition,
) -> String {
    let mut request_path = operation.path.clone();

    for (name, value) in parameters {
        for path_param in &operation.path_params {
            if name.eq_ignore_ascii_case(&path_param.name) {
                let placeholder = format!(
                    "{}{}{}",
                    consts::PARAM_PREFIX,
                    path_param.name,
                    consts::PARAM_SUFFIX
                );
                request_path = request_path.replace(&placeholder, &query_escape(value));
            }
        }
    }

    request_path
}

fn query_escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Rehydrate the dotted parameter bag into the operation's default body and
/// serialize it onto the request.
fn compose_body(
    parameters: &BTreeMap<&str, &str>,
    operation: &OperationDefinition,
    index: &SchemaIndex,
    request: &mut ApiRequest,
) -> Result<()> {
    let Some(default_body) = operation.default_body() else {
        return Ok(());
    };

    let mut body = Map::new();
    for (name, value) in parameters {
        let segments: Vec<&str> = name.split(consts::BODY_PARAM_DELIMITER).collect();
        insert_body_value(&segments, &default_body.schema, value, &mut body, index);
    }

    let bytes = if default_body.content_type == consts::URL_ENCODED {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &body {
            serializer.append_pair(name, &value_to_string(value));
        }
        serializer.finish().into_bytes()
    } else {
        serde_json::to_vec(&Value::Object(body))?
    };

    request.set_header(consts::CONTENT_LENGTH_HEADER, bytes.len().to_string());
    request.body = Some(bytes);

    Ok(())
}

/// Walk/construct the nested body object addressed by the dotted segments.
/// Keys with no matching schema property are logged and dropped.
fn insert_body_value(
    segments: &[&str],
    schema: &Value,
    value: &str,
    body: &mut Map<String, Value>,
    index: &SchemaIndex,
) {
    let [key, rest @ ..] = segments else {
        return;
    };

    let Some(property) = index.property(schema, key) else {
        warn!(param = %key, "invalid request body parameter passed");
        return;
    };

    if rest.is_empty() {
        let (resolved, _) = index.resolve(property);
        body.insert(key.to_string(), coerce_body_value(value, schema_type(resolved)));
        return;
    }

    let entry = body
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match entry.as_object_mut() {
        Some(child) => insert_body_value(rest, property, value, child, index),
        None => warn!(param = %key, "body parameter is both a leaf and an object"),
    }
}

/// Coerce a leaf value by its schema type; values that fail to parse pass
/// through as strings.
fn coerce_body_value(value: &str, param_type: &str) -> Value {
    match param_type {
        consts::TYPE_INTEGER => value
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value)),
        consts::TYPE_BOOLEAN | consts::TYPE_BOOL => value
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(value)),
        consts::TYPE_ARRAY => Value::from(
            value
                .split(consts::ARRAY_DELIMITER)
                .map(str::to_string)
                .collect::<Vec<_>>(),
        ),
        consts::TYPE_OBJECT | consts::TYPE_JSON => {
            let value = if value.is_empty() { "{}" } else { value };
            match serde_json::from_str::<Map<String, Value>>(value) {
                Ok(object) => Value::Object(object),
                Err(_) => Value::from(value),
            }
        }
        _ => Value::from(value),
    }
}
