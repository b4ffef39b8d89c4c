//! Action projection: combine the operation catalog with the mask overlay
//! to produce the public action list.

use crate::definition::OperationDefinition;
use crate::schema::{
    composed_branches, properties, required_list, schema_default, schema_description, schema_enum,
    schema_example, schema_format, schema_type, value_to_string, SchemaIndex,
};
use oak_core::{consts, Action, ActionParameter};
use oak_mask::Mask;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// What to do with a parameter (or action) that has no mask entry while a
/// mask is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaskPolicy {
    /// Drop it from the public surface. This is how a mask filters.
    #[default]
    Suppress,
    /// Expose it under its original name.
    PassThrough,
}

/// Projects operations into public actions.
pub struct Projector<'a> {
    mask: &'a Mask,
    index: &'a SchemaIndex,
    policy: MaskPolicy,
}

impl<'a> Projector<'a> {
    pub fn new(mask: &'a Mask, index: &'a SchemaIndex, policy: MaskPolicy) -> Self {
        Self {
            mask,
            index,
            policy,
        }
    }

    /// Produce the action list, sorted by name for deterministic listings.
    pub fn project(&self, operations: &HashMap<String, OperationDefinition>) -> Vec<Action> {
        let mut ids: Vec<_> = operations.keys().collect();
        ids.sort();

        let mut actions = Vec::new();
        for id in ids {
            if let Some(action) = self.project_operation(&operations[id]) {
                actions.push(action);
            }
        }

        actions.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(actions = actions.len(), "projected action list");
        actions
    }

    fn project_operation(&self, operation: &OperationDefinition) -> Option<Action> {
        let mut action_name = operation.operation_id.clone();

        if !self.mask.is_empty() {
            match self.mask.get_action(&operation.operation_id) {
                Some(masked) => {
                    if !masked.alias.is_empty() {
                        action_name = masked.alias.clone();
                    }
                }
                None if self.policy == MaskPolicy::Suppress => return None,
                None => {}
            }
        }

        let mut parameters = HashMap::new();

        for param in operation.all_params() {
            let description = match schema_description(&param.schema) {
                "" => param.description.clone().unwrap_or_default(),
                desc => desc.to_string(),
            };

            if let Some((public_name, descriptor)) = self.parse_action_param(
                &action_name,
                &param.name,
                &param.schema,
                param.required,
                &description,
            ) {
                parameters.insert(public_name, descriptor);
            }
        }

        if let Some(body) = operation.default_body() {
            let mut collected = Vec::new();
            let mut history = Vec::new();
            self.walk_body(
                &action_name,
                &body.schema,
                "",
                &mut history,
                body.required,
                &mut collected,
            );

            for (_, public_name, descriptor) in suppress_prefixes(collected) {
                parameters.insert(public_name, descriptor);
            }
        }

        Some(Action {
            name: action_name,
            description: operation.summary.clone(),
            enabled: true,
            entry_point: operation.path.clone(),
            parameters,
        })
    }

    /// Recurse over a body schema, collecting one descriptor per leaf under
    /// its dotted path. Collected entries are `(raw_path, public_name,
    /// descriptor)`; prefix suppression runs on the raw paths afterwards.
    fn walk_body(
        &self,
        action_name: &str,
        schema: &Value,
        parent_path: &str,
        ref_history: &mut Vec<String>,
        parents_required: bool,
        out: &mut Vec<(String, String, ActionParameter)>,
    ) {
        let (resolved, ref_tail) = self.index.resolve(schema);

        let entered = match ref_tail {
            Some(name) if ref_history.iter().any(|seen| seen == name) => return,
            Some(name) => {
                ref_history.push(name.to_string());
                true
            }
            None => false,
        };

        // Composed schemas contribute their branches at the current path.
        for branch in composed_branches(resolved) {
            self.walk_body(action_name, branch, parent_path, ref_history, parents_required, out);
        }

        if let Some(props) = properties(resolved) {
            for (property_name, property_schema) in props {
                let full_path = if parent_path.is_empty() {
                    property_name.clone()
                } else {
                    format!("{parent_path}{}{property_name}", consts::BODY_PARAM_DELIMITER)
                };

                // A repeated segment in the dotted path means the schema
                // recursed into itself.
                if has_duplicate_segments(&full_path) {
                    continue;
                }

                let (property_resolved, property_ref) = self.index.resolve(property_schema);
                if let Some(name) = property_ref {
                    if ref_history.iter().any(|seen| seen == name) {
                        continue;
                    }
                }

                if properties(property_resolved).is_some() {
                    self.walk_body(
                        action_name,
                        property_schema,
                        &full_path,
                        ref_history,
                        parents_required
                            && required_list(resolved).contains(&property_name.as_str()),
                        out,
                    );
                } else {
                    for branch in composed_branches(property_resolved) {
                        self.walk_body(
                            action_name,
                            branch,
                            &full_path,
                            ref_history,
                            parents_required,
                            out,
                        );
                    }

                    let required = parents_required
                        && required_list(resolved).contains(&property_name.as_str());

                    if let Some((public_name, descriptor)) = self.parse_action_param(
                        action_name,
                        &full_path,
                        property_resolved,
                        required,
                        schema_description(property_resolved),
                    ) {
                        out.push((full_path, public_name, descriptor));
                    }
                }
            }
        }

        if entered {
            ref_history.pop();
        }
    }

    /// Build the public descriptor for one parameter, applying the mask
    /// overlay and type normalization.
    fn parse_action_param(
        &self,
        action_name: &str,
        param_name: &str,
        schema: &Value,
        required: bool,
        description: &str,
    ) -> Option<(String, ActionParameter)> {
        let mut public_name = param_name.to_string();
        let mut param_type = schema_type(schema).to_string();
        let mut format = schema_format(schema).to_string();
        let mut required = required;
        let mut index = consts::DEFAULT_PARAM_INDEX;
        let mut is_multi = false;

        let options = param_options(schema_enum(schema), &mut param_type);
        let placeholder = param_placeholder(schema_example(schema), &param_type);
        let mut default = param_default(schema_default(schema), &param_type);

        if !self.mask.is_empty() {
            let Some(masked) = self.mask.get_parameter(action_name, param_name) else {
                return match self.policy {
                    MaskPolicy::Suppress => None,
                    MaskPolicy::PassThrough => Some((
                        public_name,
                        finish_param(param_type, description, placeholder, required, default,
                                     options, index, format, is_multi),
                    )),
                };
            };

            if !masked.alias.is_empty() {
                public_name = masked.alias.clone();
            }

            // The spec-declared required flag can only be strengthened.
            required = required || masked.required;

            if !masked.param_type.is_empty() {
                match extract_type_from_format(&masked.param_type) {
                    Some(prefix) => {
                        param_type = prefix.to_string();
                        format = masked.param_type.clone();
                    }
                    None => param_type = masked.param_type.clone(),
                }
            }

            if masked.index != 0 {
                index = masked.index;
            }

            if masked.is_multi {
                is_multi = true;
            }

            if !masked.default.is_empty() {
                default = masked.default.clone();

                if param_type == consts::TYPE_JSON {
                    match serde_json::from_str::<Value>(&default) {
                        Ok(parsed) => {
                            default = serde_json::to_string_pretty(&parsed)
                                .unwrap_or(default);
                        }
                        Err(err) => {
                            debug!(default = %default, "cannot pretty-print default value: {err}");
                        }
                    }
                }
            }
        }

        Some((
            public_name,
            finish_param(param_type, description, placeholder, required, default, options,
                         index, format, is_multi),
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn finish_param(
    mut param_type: String,
    description: &str,
    placeholder: String,
    required: bool,
    default: String,
    options: Vec<String>,
    index: i64,
    format: String,
    is_multi: bool,
) -> ActionParameter {
    // Objects become editable JSON blocks, booleans become checkboxes.
    match param_type.as_str() {
        consts::TYPE_OBJECT => param_type = consts::TYPE_JSON.to_string(),
        consts::TYPE_BOOLEAN => param_type = consts::TYPE_BOOL.to_string(),
        _ => {}
    }

    ActionParameter {
        param_type,
        description: description.to_string(),
        placeholder,
        required,
        default,
        pattern: String::new(),
        options,
        index,
        format,
        is_multi,
    }
}

/// String enumeration values; a non-empty list turns the parameter into a
/// dropdown.
fn param_options(parsed_options: Option<&Vec<Value>>, param_type: &mut String) -> Vec<String> {
    let Some(parsed_options) = parsed_options else {
        return Vec::new();
    };

    let options: Vec<String> = parsed_options
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    if !options.is_empty() {
        *param_type = consts::TYPE_DROPDOWN.to_string();
    }

    options
}

fn param_placeholder(example: Option<&Value>, param_type: &str) -> String {
    let placeholder = example.and_then(Value::as_str).unwrap_or("");

    if param_type != consts::TYPE_OBJECT && !placeholder.is_empty() {
        return format!("{}{placeholder}", consts::PARAM_PLACEHOLDER_PREFIX);
    }

    placeholder.to_string()
}

fn param_default(default: Option<&Value>, param_type: &str) -> String {
    if param_type != consts::TYPE_ARRAY {
        return default.map(value_to_string).unwrap_or_default();
    }

    match default.and_then(Value::as_array) {
        Some(values) => values
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(consts::ARRAY_DELIMITER),
        None => String::new(),
    }
}

/// A mask type like `date_epoch` names the high-level type `date`; the full
/// string is kept as the format.
fn extract_type_from_format(mask_type: &str) -> Option<&str> {
    let prefix = mask_type.split(consts::FORMAT_DELIMITER).next()?;
    consts::FORMAT_PREFIXES
        .iter()
        .find(|known| **known == prefix)
        .copied()
}

fn has_duplicate_segments(path: &str) -> bool {
    let segments: Vec<_> = path.split(consts::BODY_PARAM_DELIMITER).collect();
    for (i, segment) in segments.iter().enumerate() {
        if segments[..i].contains(segment) {
            return true;
        }
    }
    false
}

/// Drop collected entries whose raw path is a strict prefix of another
/// entry's raw path; those are intermediate nodes, not leaves.
fn suppress_prefixes(
    collected: Vec<(String, String, ActionParameter)>,
) -> Vec<(String, String, ActionParameter)> {
    let paths: Vec<String> = collected.iter().map(|(path, _, _)| path.clone()).collect();

    collected
        .into_iter()
        .filter(|(path, _, _)| {
            !paths
                .iter()
                .any(|other| other != path && other.starts_with(path.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dashboard_schema() -> Value {
        json!({
            "description": "Folder details",
            "type": "object",
            "required": ["dashboard", "folderId", "folderUid", "message", "overwrite"],
            "properties": {
                "dashboard": {
                    "description": "dashboard description",
                    "type": "object",
                    "required": ["title", "tags", "timezone", "schemaVersion", "version", "refresh"],
                    "properties": {
                        "id": {},
                        "refresh": {"type": "string"},
                        "schemaVersion": {"type": "number"},
                        "tags": {"type": "array", "items": {}},
                        "timezone": {"type": "string", "description": "my test description"},
                        "title": {"type": "string"},
                        "uid": {},
                        "version": {"type": "number"}
                    }
                },
                "folderId": {"type": "number"},
                "folderUid": {"type": "string"},
                "message": {"type": "string"},
                "overwrite": {"type": "boolean"}
            }
        })
    }

    fn empty_mask() -> Mask {
        Mask::default()
    }

    fn project_body(mask: &Mask, schema: &Value) -> HashMap<String, ActionParameter> {
        let index = SchemaIndex::default();
        let projector = Projector::new(mask, &index, MaskPolicy::Suppress);
        let mut collected = Vec::new();
        let mut history = Vec::new();
        projector.walk_body("CreateDashboard", schema, "", &mut history, true, &mut collected);

        suppress_prefixes(collected)
            .into_iter()
            .map(|(_, name, param)| (name, param))
            .collect()
    }

    #[test]
    fn body_walk_emits_dotted_leaves() {
        let params = project_body(&empty_mask(), &dashboard_schema());

        assert_eq!(params.len(), 12);
        assert!(params.contains_key("dashboard.id"));
        assert!(params.contains_key("dashboard.timezone"));
        assert!(params.contains_key("folderUid"));
        assert_eq!(params["dashboard.timezone"].description, "my test description");
        assert!(params["dashboard.timezone"].required);
        // folderId is required at top level
        assert!(params["folderId"].required);
        // uid is not listed in dashboard.required
        assert!(!params["dashboard.uid"].required);
    }

    #[test]
    fn type_normalization_applies() {
        let params = project_body(&empty_mask(), &dashboard_schema());

        assert_eq!(params["overwrite"].param_type, "bool");
        assert_eq!(params["dashboard.tags"].param_type, "array");
        for param in params.values() {
            assert_ne!(param.param_type, "object");
            assert_ne!(param.param_type, "boolean");
        }
    }

    #[test]
    fn enum_forces_dropdown() {
        let mask = empty_mask();
        let index = SchemaIndex::default();
        let projector = Projector::new(&mask, &index, MaskPolicy::Suppress);

        let schema = json!({"type": "string", "enum": ["editor", "viewer"]});
        let (_, param) = projector
            .parse_action_param("Invite", "role", &schema, false, "")
            .unwrap();

        assert_eq!(param.param_type, "dropdown");
        assert_eq!(param.options, vec!["editor", "viewer"]);
    }

    #[test]
    fn example_becomes_placeholder() {
        let mask = empty_mask();
        let index = SchemaIndex::default();
        let projector = Projector::new(&mask, &index, MaskPolicy::Suppress);

        let schema = json!({"type": "string", "example": "nErXDvfCkzz"});
        let (_, param) = projector
            .parse_action_param("CreateFolder", "uid", &schema, false, "")
            .unwrap();

        assert_eq!(param.placeholder, "Example: nErXDvfCkzz");
    }

    #[test]
    fn array_default_joins_with_comma() {
        let mask = empty_mask();
        let index = SchemaIndex::default();
        let projector = Projector::new(&mask, &index, MaskPolicy::Suppress);

        let schema = json!({"type": "array", "default": ["a", "b", 3]});
        let (_, param) = projector
            .parse_action_param("Tag", "tags", &schema, false, "")
            .unwrap();

        assert_eq!(param.default, "a,b,3");
    }

    #[test]
    fn mask_miss_suppresses_parameter() {
        let mask = Mask::from_yaml(
            r#"
actions:
  CreateDashboard:
    parameters:
      dashboard.title:
        alias: "Dashboard Title"
        index: 1
"#,
        )
        .unwrap();

        let params = project_body(&mask, &dashboard_schema());

        assert_eq!(params.len(), 1);
        let title = &params["Dashboard Title"];
        assert_eq!(title.index, 1);
        assert!(title.required);
    }

    #[test]
    fn mask_overrides_type_and_format() {
        let mask = Mask::from_yaml(
            r#"
actions:
  Report:
    parameters:
      since:
        type: date_epoch
      payload:
        type: code:json
        default: '{"a":1}'
"#,
        )
        .unwrap();
        let index = SchemaIndex::default();
        let projector = Projector::new(&mask, &index, MaskPolicy::Suppress);

        let schema = json!({"type": "string"});
        let (_, since) = projector
            .parse_action_param("Report", "since", &schema, false, "")
            .unwrap();
        assert_eq!(since.param_type, "date");
        assert_eq!(since.format, "date_epoch");

        let (_, payload) = projector
            .parse_action_param("Report", "payload", &schema, false, "")
            .unwrap();
        assert_eq!(payload.param_type, "code:json");
        assert_eq!(payload.default, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn prefix_suppression_keeps_leaves_only() {
        let entries = vec![
            ("a".to_string(), "a".to_string(), ActionParameter::default()),
            ("a.b".to_string(), "a.b".to_string(), ActionParameter::default()),
            ("a.c".to_string(), "a.c".to_string(), ActionParameter::default()),
            ("b".to_string(), "b".to_string(), ActionParameter::default()),
        ];

        let kept: Vec<String> = suppress_prefixes(entries)
            .into_iter()
            .map(|(path, _, _)| path)
            .collect();

        assert_eq!(kept, vec!["a.b", "a.c", "b"]);
    }

    #[test]
    fn composed_leaf_produces_both_levels_then_suppresses() {
        let schema = json!({
            "type": "object",
            "properties": {
                "service": {
                    "type": "string",
                    "allOf": [{
                        "type": "object",
                        "properties": {
                            "timeout": {"type": "integer"}
                        }
                    }]
                }
            }
        });

        let params = project_body(&empty_mask(), &schema);
        assert!(params.contains_key("service.timeout"));
        assert!(!params.contains_key("service"));
    }

    #[test]
    fn recursive_schema_terminates() {
        let node = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "child": {"$ref": "#/components/schemas/Node"}
            }
        });

        // Node refers to itself through $ref.
        let mask = empty_mask();
        let mut schemas = HashMap::new();
        schemas.insert("Node".to_string(), node);
        let index = SchemaIndex::from_schemas(schemas);
        let projector = Projector::new(&mask, &index, MaskPolicy::Suppress);

        let mut collected = Vec::new();
        let mut history = Vec::new();
        let root = json!({"$ref": "#/components/schemas/Node"});
        projector.walk_body("Tree", &root, "", &mut history, false, &mut collected);

        let names: Vec<_> = collected.iter().map(|(path, _, _)| path.clone()).collect();
        assert!(names.contains(&"name".to_string()));
        assert!(!names.iter().any(|n| n.contains("child.child")));
    }

    #[test]
    fn duplicate_segment_guard() {
        assert!(has_duplicate_segments("foo.bar.foo"));
        assert!(!has_duplicate_segments("foo.bar.baz"));
    }
}
