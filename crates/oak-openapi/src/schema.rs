//! Schema access helpers.
//!
//! Schemas are carried as raw `serde_json::Value` trees exactly as they
//! appear in the document; `$ref` nodes are resolved on demand against the
//! index built from `components.schemas`. Callers keep their own descent
//! history to cut recursive types.

use openapiv3::OpenAPI;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Index of named schemas under `#/components/schemas`.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    schemas: HashMap<String, Value>,
}

impl SchemaIndex {
    pub fn from_spec(spec: &OpenAPI) -> Self {
        let mut schemas = HashMap::new();

        if let Some(components) = &spec.components {
            for (name, schema) in &components.schemas {
                match serde_json::to_value(schema) {
                    Ok(value) => {
                        schemas.insert(name.clone(), value);
                    }
                    Err(err) => warn!(schema = %name, "cannot index schema: {err}"),
                }
            }
        }

        Self { schemas }
    }

    /// Build an index from already-materialized schema values.
    pub fn from_schemas(schemas: HashMap<String, Value>) -> Self {
        Self { schemas }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Follow `$ref` chains until a concrete schema is reached. Returns the
    /// resolved schema and the last reference name on the chain. Unknown
    /// (e.g. external) references resolve to the node itself.
    pub fn resolve<'a>(&'a self, mut schema: &'a Value) -> (&'a Value, Option<&'a str>) {
        let mut name = None;

        for _ in 0..16 {
            match ref_name(schema) {
                Some(tail) => match self.schemas.get(tail) {
                    Some(target) => {
                        name = Some(tail);
                        schema = target;
                    }
                    None => {
                        warn!(reference = tail, "unresolvable schema reference");
                        break;
                    }
                },
                None => break,
            }
        }

        (schema, name)
    }

    /// Resolved sub-schema of a named property, when the schema is an
    /// object declaring it.
    pub fn property<'a>(&'a self, schema: &'a Value, name: &str) -> Option<&'a Value> {
        let (resolved, _) = self.resolve(schema);
        properties(resolved).and_then(|props| props.get(name))
    }
}

/// Tail of a `$ref` string, i.e. the referenced type name.
pub fn ref_name(schema: &Value) -> Option<&str> {
    schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.rsplit('/').next())
}

pub fn schema_type(schema: &Value) -> &str {
    schema.get("type").and_then(Value::as_str).unwrap_or("")
}

pub fn schema_format(schema: &Value) -> &str {
    schema.get("format").and_then(Value::as_str).unwrap_or("")
}

pub fn schema_description(schema: &Value) -> &str {
    schema
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
}

pub fn schema_example(schema: &Value) -> Option<&Value> {
    schema.get("example")
}

pub fn schema_default(schema: &Value) -> Option<&Value> {
    schema.get("default")
}

pub fn schema_enum(schema: &Value) -> Option<&Vec<Value>> {
    schema.get("enum").and_then(Value::as_array)
}

pub fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

/// Names listed in the schema's `required` array.
pub fn required_list(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Branches of `allOf`/`anyOf`/`oneOf` composition, in that order.
pub fn composed_branches(schema: &Value) -> Vec<&Value> {
    ["allOf", "anyOf", "oneOf"]
        .iter()
        .filter_map(|key| schema.get(*key).and_then(Value::as_array))
        .flatten()
        .collect()
}

/// Render a JSON value the way `%v` formatting would: scalars without
/// quotes, everything else as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
