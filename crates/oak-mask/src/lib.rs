//! Mask overlay for projected actions.
//!
//! A mask file renames, retypes, reorders and filters the actions and
//! parameters projected from an OpenAPI document before they are exposed.
//! The store parses the YAML overlay and answers alias <-> original
//! lookups in both directions.

use oak_core::gzip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub type Result<T> = std::result::Result<T, MaskError>;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("cannot parse mask file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("duplicate action alias '{alias}' (used by '{first}' and '{second}')")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Core(#[from] oak_core::Error),
}

/// Overlay entry for one parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskedParameter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Positional override; 0 means "not set" and keeps the projector's
    /// tail default.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub index: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_multi: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Overlay entry for one action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskedAction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, MaskedParameter>,
}

/// The parsed overlay plus its derived reverse indices.
///
/// Indices are built once at parse time and owned by the value; the store
/// is read-only afterwards and safe to share.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mask {
    #[serde(default)]
    pub actions: HashMap<String, MaskedAction>,

    #[serde(skip)]
    reverse_actions: HashMap<String, String>,
    #[serde(skip)]
    reverse_parameters: HashMap<String, HashMap<String, String>>,
}

impl Mask {
    /// Parse a mask file. An empty path yields an empty mask, which passes
    /// every action and parameter through untouched. In prod mode the gzip
    /// sibling of the path is read instead.
    pub fn parse(mask_file: &str) -> Result<Mask> {
        if mask_file.is_empty() {
            return Ok(Mask::default());
        }

        let data = gzip::read_maybe_gzipped(mask_file)?;
        let mut mask: Mask =
            serde_yaml::from_slice(&data).map_err(|source| MaskError::Parse {
                path: mask_file.to_string(),
                source,
            })?;
        mask.build_indices()?;

        debug!(actions = mask.actions.len(), "parsed mask overlay");
        Ok(mask)
    }

    /// Parse an overlay from a YAML string.
    pub fn from_yaml(data: &str) -> Result<Mask> {
        let mut mask: Mask = serde_yaml::from_str(data)?;
        mask.build_indices()?;
        Ok(mask)
    }

    fn build_indices(&mut self) -> Result<()> {
        self.reverse_actions.clear();
        self.reverse_parameters.clear();

        for (original_name, action) in &self.actions {
            if !action.alias.is_empty() {
                if let Some(first) = self
                    .reverse_actions
                    .insert(action.alias.clone(), original_name.clone())
                {
                    return Err(MaskError::DuplicateAlias {
                        alias: action.alias.clone(),
                        first,
                        second: original_name.clone(),
                    });
                }
            }

            let params = self
                .reverse_parameters
                .entry(original_name.clone())
                .or_default();
            for (param_name, parameter) in &action.parameters {
                if !parameter.alias.is_empty() {
                    params.insert(parameter.alias.clone(), param_name.clone());
                }
            }
        }

        Ok(())
    }

    /// Whether the overlay is a no-op (no mask file was configured).
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Resolve an action alias back to its original operation id; names
    /// that are not aliases pass through unchanged.
    pub fn replace_action_alias<'a>(&'a self, action_name: &'a str) -> &'a str {
        self.reverse_actions
            .get(action_name)
            .map(String::as_str)
            .unwrap_or(action_name)
    }

    /// Look up the overlay entry for an action, resolving its alias first.
    pub fn get_action(&self, action_name: &str) -> Option<&MaskedAction> {
        self.actions.get(self.replace_action_alias(action_name))
    }

    /// Look up the overlay entry for a parameter, resolving both the action
    /// and the parameter alias.
    pub fn get_parameter(&self, action_name: &str, param_name: &str) -> Option<&MaskedParameter> {
        let original_action = self.replace_action_alias(action_name);
        let action = self.actions.get(original_action)?;

        if let Some(parameter) = action.parameters.get(param_name) {
            return Some(parameter);
        }

        let original_param = self
            .reverse_parameters
            .get(original_action)?
            .get(param_name)?;
        action.parameters.get(original_param)
    }

    /// Rewrite a parameter bag's keys from aliases back to original ids;
    /// keys with no alias mapping pass through.
    pub fn replace_action_parameters_aliases(
        &self,
        original_action_name: &str,
        raw_parameters: HashMap<String, String>,
    ) -> HashMap<String, String> {
        let aliases = self.reverse_parameters.get(original_action_name);

        raw_parameters
            .into_iter()
            .map(|(name, value)| {
                let original = aliases
                    .and_then(|m| m.get(&name))
                    .cloned()
                    .unwrap_or(name);
                (original, value)
            })
            .collect()
    }
}
