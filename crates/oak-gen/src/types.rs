//! Flattened action records consumed by the mask and README emitters.

use crate::gen_alias;
use oak_core::{Action, ActionParameter};

/// One parameter as it will be rendered.
#[derive(Debug, Clone, Default)]
pub struct GeneratedParameter {
    pub name: String,
    pub alias: String,
    pub param_type: String,
    pub description: String,
    pub placeholder: String,
    pub required: bool,
    pub default: String,
    pub pattern: String,
    pub options: Vec<String>,
    /// Stored positional override from the mask; rendering uses its own
    /// per-action ordinal counter, not this value.
    pub index: i64,
    pub format: String,
    pub is_multi: bool,
}

impl GeneratedParameter {
    pub fn from_action_parameter(name: &str, param: &ActionParameter) -> Self {
        Self {
            name: name.to_string(),
            alias: gen_alias(name),
            param_type: param.param_type.clone(),
            description: param.description.clone(),
            placeholder: param.placeholder.clone(),
            required: param.required,
            default: param.default.clone(),
            pattern: param.pattern.clone(),
            options: param.options.clone(),
            index: param.index,
            format: param.format.clone(),
            is_multi: param.is_multi,
        }
    }
}

/// One action as it will be rendered.
#[derive(Debug, Clone, Default)]
pub struct GeneratedAction {
    pub alias: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub entry_point: String,
    pub parameters: Vec<GeneratedParameter>,
}

impl GeneratedAction {
    pub fn from_action(action: &Action) -> Self {
        // Parameter maps are unordered; sort by name so output is stable.
        let mut names: Vec<&String> = action.parameters.keys().collect();
        names.sort();

        let parameters = names
            .into_iter()
            .map(|name| GeneratedParameter::from_action_parameter(name, &action.parameters[name]))
            .collect();

        Self {
            alias: gen_alias(&action.name),
            name: action.name.clone(),
            description: action.description.clone(),
            enabled: action.enabled,
            entry_point: action.entry_point.clone(),
            parameters,
        }
    }
}

/// Input of the README emitter.
#[derive(Debug, Clone, Default)]
pub struct GeneratedReadme {
    pub name: String,
    pub description: String,
    pub actions: Vec<GeneratedAction>,
}
