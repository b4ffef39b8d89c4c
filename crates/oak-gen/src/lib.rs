//! Generator commands: starter mask files, per-action mask entries and a
//! README, all derived from the same projected action list the runtime
//! exposes.

mod render;
mod types;

pub use render::{render_mask_yaml, render_readme};
pub use types::{GeneratedAction, GeneratedParameter, GeneratedReadme};

use oak_core::{consts, Action, ActionRuntime};
use oak_mask::Mask;
use oak_openapi::{Callbacks, CustomActions, OpenApiPlugin, PluginMetadata};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub type Result<T> = std::result::Result<T, GenError>;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("no such action: {0}")]
    NoSuchAction(String),

    #[error("aborted")]
    Aborted,

    #[error(transparent)]
    OpenApi(#[from] oak_openapi::OpenApiError),

    #[error(transparent)]
    Mask(#[from] oak_mask::MaskError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hook used by `--interactive` flows to let the operator choose
/// parameters; the terminal UI lives with the caller.
pub trait ParameterPicker {
    /// Return the subset of `options` the operator selected.
    fn pick(&self, prompt: &str, options: &[String]) -> Vec<String>;
}

/// Confirmation hook for destructive flows; returning false aborts.
pub type ConfirmFn = dyn Fn(&str) -> bool;

const README_FILE: &str = "README.md";

const UPPER_CASE_WORDS: &[&str] = &["url", "id", "ids", "ip", "ssl"];

/// Derive a human alias from a raw name: underscores and dots become
/// spaces, `[]` is dropped, well-known acronyms are upper-cased and every
/// word is title-cased.
pub fn gen_alias(name: &str) -> String {
    let cleaned = name.replace('_', " ").replace('.', " ").replace("[]", "");

    let words: Vec<String> = cleaned
        .split(' ')
        .map(|word| {
            if UPPER_CASE_WORDS.contains(&word) {
                word.to_uppercase()
            } else {
                word.to_string()
            }
        })
        .collect();

    let joined = words.join(" ").replace("IDS", "IDs");

    joined
        .split_whitespace()
        .map(title_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// A heavier variant of [`gen_alias`] used for display names: also splits
/// camelCase words and drops stuttering word pairs.
pub fn display_name(name: &str) -> String {
    let mut cleaned = name
        .replace(['_', '.', ':'], " ")
        .replace("[]", "");

    cleaned = split_camel_case(&cleaned);

    let mut words: Vec<String> = cleaned
        .split_whitespace()
        .map(|word| {
            if UPPER_CASE_WORDS.contains(&word) {
                word.to_uppercase()
            } else {
                word.to_string()
            }
        })
        .collect();

    words = remove_duplicate_words(words);

    let joined = words.join(" ").replace("IDS", "IDs");

    joined
        .split_whitespace()
        .map(title_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() && chars[i - 1].is_lowercase() {
            out.push(' ');
        }
        out.push(*c);
    }

    out
}

/// Drop word pairs that repeat the preceding words, e.g.
/// `Get User GetUser` stutters after camel splitting.
fn remove_duplicate_words(mut words: Vec<String>) -> Vec<String> {
    if words.len() > 3 && words[0].to_lowercase() + &words[1].to_lowercase() == words[2].to_lowercase()
    {
        words.remove(2);
    }

    if words.len() > 4 {
        let mut to_delete = std::collections::HashSet::new();
        for i in 0..words.len() - 3 {
            let head = words[i].to_lowercase() + &words[i + 1].to_lowercase();
            let tail = words[i + 2].to_lowercase() + &words[i + 3].to_lowercase();
            if head == tail {
                to_delete.insert(i);
                to_delete.insert(i + 1);
            }
        }

        words = words
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !to_delete.contains(i))
            .map(|(_, word)| word)
            .collect();
    }

    words
}

/// Whether `name` is a strict prefix of another parameter of the action;
/// such intermediate names are not rendered into mask files.
pub fn is_prefix(action: &Action, name: &str) -> bool {
    action
        .parameters
        .keys()
        .any(|param_name| param_name != name && param_name.starts_with(name))
}

/// Find an action by its operation name.
pub fn filter_actions_by_operation_name<'a>(
    operation_name: &str,
    actions: &'a [Action],
) -> Option<&'a Action> {
    actions.iter().find(|action| action.name == operation_name)
}

/// Build the list of actions a generator command will render: prefix and
/// blacklisted parameters are pruned, and when a mask file is given only
/// the actions it lists survive, with their parameters filtered through it.
pub fn get_masked_actions(
    mask_file: &str,
    mut actions: Vec<Action>,
    blacklist_params: &[String],
    filter_parameters: bool,
) -> Result<Vec<GeneratedAction>> {
    for action in &mut actions {
        let pruned: Vec<String> = action
            .parameters
            .keys()
            .filter(|name| is_prefix(action, name.as_str()) || blacklist_params.contains(name))
            .cloned()
            .collect();

        for name in pruned {
            action.parameters.remove(&name);
        }
    }

    if mask_file.is_empty() {
        return Ok(actions.iter().map(GeneratedAction::from_action).collect());
    }

    let mask = Mask::parse(mask_file)?;
    let mut generated = Vec::new();

    for (name, masked_action) in &mask.actions {
        let original_name = mask.replace_action_alias(name);
        if let Some(action) = actions.iter().find(|a| a.name == original_name) {
            generated.push(filter_masked_parameters(
                masked_action,
                action,
                filter_parameters,
            ));
        }
    }

    Ok(generated)
}

/// Reduce an action to the parameters its mask entry lists, carrying the
/// mask's aliases, types and ordering.
pub fn filter_masked_parameters(
    masked_action: &oak_mask::MaskedAction,
    action: &Action,
    filter_parameters: bool,
) -> GeneratedAction {
    let mut generated = GeneratedAction::from_action(action);

    if !filter_parameters {
        return generated;
    }

    let mut parameters = Vec::new();

    for (param_name, masked_param) in &masked_action.parameters {
        let Some(parameter) = action.parameters.get(param_name) else {
            continue;
        };

        // An enum parameter with no explicit default gets its first option.
        let default = if masked_param.default.is_empty() && !parameter.options.is_empty() {
            parameter.options[0].clone()
        } else {
            masked_param.default.clone()
        };

        let description = if masked_param.description.is_empty() {
            parameter.description.clone()
        } else {
            masked_param.description.clone()
        };

        parameters.push(GeneratedParameter {
            name: param_name.clone(),
            alias: masked_param.alias.clone(),
            param_type: masked_param.param_type.clone(),
            description,
            placeholder: parameter.placeholder.clone(),
            required: masked_param.required,
            default,
            pattern: parameter.pattern.clone(),
            options: parameter.options.clone(),
            index: masked_param.index,
            format: parameter.format.clone(),
            is_multi: masked_param.is_multi,
        });
    }

    parameters.sort_by_key(|p| p.index);

    generated.parameters = parameters;
    generated.alias = if masked_action.alias.is_empty() {
        gen_alias(&generated.name)
    } else {
        masked_action.alias.clone()
    };

    generated
}

/// Sort and write a rendered mask file.
pub fn write_actions(mut actions: Vec<GeneratedAction>, output: &str) -> Result<()> {
    actions.sort_by(|a, b| a.name.cmp(&b.name));
    std::fs::write(output, render_mask_yaml(&actions))?;
    Ok(())
}

/// `generate mask`: emit a starter mask file for every exposed action.
pub async fn generate_mask_file(
    openapi_file: &str,
    mask_file: &str,
    blacklist_params: &[String],
    output: &str,
    filter_parameters: bool,
    confirm: Option<&ConfirmFn>,
) -> Result<()> {
    let plugin = plugin_for_generation(openapi_file, "").await?;
    let actions = get_masked_actions(
        mask_file,
        plugin.get_actions(),
        blacklist_params,
        filter_parameters,
    )?;

    if let Some(confirm) = confirm {
        let summary = format!(
            "You are about to generate [{}] actions\nwith blacklist of {:?}\nand mask original parameters set to [{}]",
            actions.len(),
            blacklist_params,
            filter_parameters
        );
        if !confirm(&summary) {
            return Err(GenError::Aborted);
        }
    }

    info!(actions = actions.len(), output = %output, "generating mask file");
    write_actions(actions, output)
}

/// `generate readme`: emit a README from the projected action list plus any
/// custom action files.
pub async fn generate_readme(
    plugin_name: &str,
    mask_file: &str,
    openapi_file: &str,
    custom_actions_path: &str,
) -> Result<()> {
    let plugin = plugin_for_generation(openapi_file, plugin_name).await?;

    let mut actions = get_masked_actions(mask_file, plugin.get_actions(), &[], true)?;
    actions.sort_by(|a, b| a.name.cmp(&b.name));

    if !custom_actions_path.is_empty() {
        actions.extend(custom_actions_readme(custom_actions_path));
    }

    let description = plugin.describe();
    let readme = GeneratedReadme {
        name: description.name,
        description: description.description,
        actions,
    };

    std::fs::write(README_FILE, render_readme(&readme))?;
    Ok(())
}

fn custom_actions_readme(path: &str) -> Vec<GeneratedAction> {
    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %path, "cannot read custom actions: {err}");
            return Vec::new();
        }
    };

    let mut actions = Vec::new();
    for entry in entries.flatten() {
        let file_path = entry.path();
        if !file_path
            .to_string_lossy()
            .ends_with(consts::ACTION_FILE_SUFFIX)
        {
            continue;
        }

        match read_action_file(&file_path) {
            Ok(action) => actions.push(GeneratedAction::from_action(&action)),
            Err(err) => warn!(file = %file_path.display(), "skipping custom action: {err}"),
        }
    }

    actions
}

fn read_action_file(path: &Path) -> Result<Action> {
    let data = std::fs::read(path)?;
    Ok(serde_yaml::from_slice(&data)?)
}

/// `generate action`: append one action's mask entry to an existing mask
/// file, optionally narrowing its parameters through a picker.
pub async fn generate_action(
    action_name: &str,
    openapi_file: &str,
    output: &str,
    blacklist_params: &[String],
    picker: Option<&dyn ParameterPicker>,
) -> Result<()> {
    let plugin = plugin_for_generation(openapi_file, "").await?;
    let actions = plugin.get_actions();

    // A fresh output file starts empty; an existing one keeps its entries.
    let masked_actions = if Path::new(output).exists() {
        get_masked_actions(output, actions.clone(), blacklist_params, true)?
    } else {
        Vec::new()
    };

    let action = filter_actions_by_operation_name(action_name, &actions)
        .ok_or_else(|| GenError::NoSuchAction(action_name.to_string()))?;

    let mut new_action = GeneratedAction::from_action(action);

    if let Some(picker) = picker {
        interactively_filter_parameters(&mut new_action, picker);
    }

    info!(action = %action_name, output = %output, "appending action to mask file");
    write_actions(replace_old_action_with_new(masked_actions, new_action), output)
}

/// Narrow an action's parameters to the picker's selection and mark the
/// required subset.
pub fn interactively_filter_parameters(action: &mut GeneratedAction, picker: &dyn ParameterPicker) {
    let names: Vec<String> = action.parameters.iter().map(|p| p.name.clone()).collect();

    let selected = picker.pick("Select Parameters", &names);
    let required = picker.pick("Select required Parameters", &selected);

    action.parameters.retain(|p| selected.contains(&p.name));
    for parameter in &mut action.parameters {
        if required.contains(&parameter.name) {
            parameter.required = true;
        }
    }
}

/// Replace an action in the list by name, appending it at the end.
pub fn replace_old_action_with_new(
    actions: Vec<GeneratedAction>,
    new_action: GeneratedAction,
) -> Vec<GeneratedAction> {
    let mut out: Vec<GeneratedAction> = actions
        .into_iter()
        .filter(|action| action.name != new_action.name)
        .collect();
    out.push(new_action);
    out
}

/// `fix-mask`: parameter ids containing `.` collide with the dotted body
/// addressing; rewrite them to `__` in place.
pub fn fix_mask(path: &str) -> Result<()> {
    let mut mask = Mask::parse(path)?;

    for (action_name, action) in &mut mask.actions {
        if action.display_name.is_none() {
            info!(action = %action_name, display_name = %display_name(action_name), "derived display name");
        }

        let dotted: Vec<String> = action
            .parameters
            .keys()
            .filter(|name| name.contains('.'))
            .cloned()
            .collect();

        for name in dotted {
            if let Some(parameter) = action.parameters.remove(&name) {
                action.parameters.insert(name.replace('.', "__"), parameter);
            }
        }
    }

    std::fs::write(path, serde_yaml::to_string(&mask)?)?;
    Ok(())
}

async fn plugin_for_generation(openapi_file: &str, name: &str) -> Result<OpenApiPlugin> {
    Ok(OpenApiPlugin::new(
        Default::default(),
        PluginMetadata {
            name: name.to_string(),
            openapi_file: openapi_file.to_string(),
            ..Default::default()
        },
        Callbacks::default(),
        CustomActions::default(),
    )
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oak_core::ActionParameter;
    use std::collections::HashMap;

    fn action_with_params(name: &str, params: &[&str]) -> Action {
        let parameters: HashMap<String, ActionParameter> = params
            .iter()
            .map(|p| (p.to_string(), ActionParameter::default()))
            .collect();
        Action {
            name: name.to_string(),
            enabled: true,
            parameters,
            ..Default::default()
        }
    }

    #[test]
    fn alias_suite() {
        assert_eq!(gen_alias("team_slug"), "Team Slug");
        assert_eq!(gen_alias("user_id"), "User ID");
        assert_eq!(gen_alias("channel_ids"), "Channel IDs");
        assert_eq!(gen_alias("url_id_ids ip_ssl"), "URL ID IDs IP SSL");
        assert_eq!(gen_alias("amogus[]"), "Amogus");
    }

    #[test]
    fn display_name_splits_camel_case() {
        assert_eq!(display_name("createDashboard"), "Create Dashboard");
        assert_eq!(display_name("team_id"), "Team ID");
    }

    #[test]
    fn prefix_detection() {
        let action = action_with_params("act", &["A", "A.B", "A.C"]);
        assert!(is_prefix(&action, "A"));

        let action = action_with_params("act", &["A", "B", "C"]);
        assert!(!is_prefix(&action, "A"));
    }

    #[test]
    fn filter_by_operation_name() {
        let actions = vec![
            action_with_params("AddTeamMember", &[]),
            action_with_params("InviteOrgMember", &[]),
        ];

        let found = filter_actions_by_operation_name("InviteOrgMember", &actions).unwrap();
        assert_eq!(found.name, "InviteOrgMember");
        assert!(filter_actions_by_operation_name("Bruh", &actions).is_none());
    }

    #[test]
    fn masked_actions_prune_prefixes_and_blacklist() {
        let actions = vec![action_with_params(
            "CreateService",
            &["service", "service.timeout", "internal_token"],
        )];

        let generated = get_masked_actions(
            "",
            actions,
            &["internal_token".to_string()],
            false,
        )
        .unwrap();

        let names: Vec<_> = generated[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["service.timeout"]);
    }

    #[test]
    fn masked_parameters_sort_by_index_and_inherit() {
        let mut action = action_with_params("Invite", &[]);
        action.parameters.insert(
            "role".to_string(),
            ActionParameter {
                options: vec!["Admin".to_string(), "Viewer".to_string()],
                description: "Role in the org".to_string(),
                ..Default::default()
            },
        );
        action
            .parameters
            .insert("name".to_string(), ActionParameter::default());

        let masked = oak_mask::Mask::from_yaml(
            r#"
actions:
  Invite:
    parameters:
      role:
        alias: "Role"
        index: 2
      name:
        alias: "Name"
        index: 1
"#,
        )
        .unwrap();

        let generated =
            filter_masked_parameters(&masked.actions["Invite"], &action, true);

        let names: Vec<_> = generated.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "role"]);
        // enum default falls back to the first option
        assert_eq!(generated.parameters[1].default, "Admin");
        // description falls back to the action's
        assert_eq!(generated.parameters[1].description, "Role in the org");
        // missing alias falls back to the generated one
        assert_eq!(generated.alias, "Invite");
    }

    #[test]
    fn replace_appends_new_action() {
        let actions = vec![
            GeneratedAction {
                name: "a".to_string(),
                ..Default::default()
            },
            GeneratedAction {
                name: "b".to_string(),
                ..Default::default()
            },
        ];
        let replacement = GeneratedAction {
            name: "a".to_string(),
            alias: "A2".to_string(),
            ..Default::default()
        };

        let out = replace_old_action_with_new(actions, replacement);
        assert_eq!(out.len(), 2);
        assert_eq!(out.last().unwrap().alias, "A2");
    }

    #[test]
    fn fix_mask_rewrites_dotted_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.yaml");
        std::fs::write(
            &path,
            r#"
actions:
  CreateDashboard:
    alias: "Create Dashboard"
    parameters:
      dashboard.title:
        alias: "Dashboard Title"
"#,
        )
        .unwrap();

        fix_mask(path.to_str().unwrap()).unwrap();

        let rewritten = oak_mask::Mask::parse(path.to_str().unwrap()).unwrap();
        let action = &rewritten.actions["CreateDashboard"];
        assert!(action.parameters.contains_key("dashboard__title"));
        assert!(!action.parameters.contains_key("dashboard.title"));
    }

    struct FixedPicker(Vec<String>);

    impl ParameterPicker for FixedPicker {
        fn pick(&self, _prompt: &str, options: &[String]) -> Vec<String> {
            self.0
                .iter()
                .filter(|choice| options.contains(choice))
                .cloned()
                .collect()
        }
    }

    #[test]
    fn interactive_filter_narrows_and_requires() {
        let mut action = GeneratedAction {
            name: "Invite".to_string(),
            parameters: vec![
                GeneratedParameter {
                    name: "name".to_string(),
                    ..Default::default()
                },
                GeneratedParameter {
                    name: "role".to_string(),
                    ..Default::default()
                },
                GeneratedParameter {
                    name: "sendEmail".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let picker = FixedPicker(vec!["name".to_string(), "role".to_string()]);
        interactively_filter_parameters(&mut action, &picker);

        assert_eq!(action.parameters.len(), 2);
        assert!(action.parameters.iter().all(|p| p.required));
    }
}
