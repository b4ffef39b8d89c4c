//! Emitters for mask YAML and README markdown.
//!
//! The output layout is a fixed contract consumed by downstream tooling;
//! both emitters assemble it directly rather than going through a YAML
//! serializer, so quoting and field order stay exactly as expected.

use crate::gen_alias;
use crate::types::{GeneratedAction, GeneratedReadme};
use std::fmt::Write as _;

/// Render the mask file for a list of actions.
///
/// Each action's parameters carry a rendered `index` that is a per-action
/// ordinal starting at 1; it is unrelated to the stored positional
/// override.
pub fn render_mask_yaml(actions: &[GeneratedAction]) -> String {
    let mut out = String::from("actions:");

    for action in actions {
        let _ = write!(out, "\n  {}:\n    alias: {}\n    parameters:", action.name, action.alias);

        let mut ordinal = 0;
        for param in &action.parameters {
            ordinal += 1;

            if bad_prefix(&param.name) {
                let _ = write!(out, "\n      \"{}\":", param.name);
            } else {
                let _ = write!(out, "\n      {}:", param.name);
            }

            let _ = write!(out, "\n        alias: \"{}\"", param_alias(&param.alias));

            if param.required {
                out.push_str("\n        required: true");
            }
            if !param.default.is_empty() {
                let _ = write!(out, "\n        default: {}", param.default);
            }
            if !param.description.is_empty() {
                let _ = write!(out, "\n        description: \"{}\"", param.description);
            }
            if !param.format.is_empty() {
                let _ = write!(out, "\n        type: {}", fix_type(&param.format));
            }
            let _ = write!(out, "\n        index: {ordinal}");
        }
    }

    out
}

/// Render the README for a plugin and its actions.
pub fn render_readme(readme: &GeneratedReadme) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "## {}", readme.name);
    let _ = writeln!(out, "> {}", readme.description);

    for action in &readme.actions {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", action.alias);
        let _ = writeln!(out, "* {}", action.description);
        out.push_str("<table>\n<caption>Action Parameters</caption>\n");
        out.push_str("  <thead>\n    <tr>\n        <th>Param Name</th>\n        <th>Param Description</th>\n    </tr>\n  </thead>\n  <tbody>\n");
        for param in &action.parameters {
            let _ = write!(
                out,
                "    <tr>\n        <td>{}</td>\n        <td>{}</td>\n    </tr>\n",
                param.alias, param.description
            );
        }
        out.push_str("  </tbody>\n</table>\n");
    }

    out
}

/// The rendered alias of a parameter: the tail segment of its generated
/// alias.
fn param_alias(alias: &str) -> String {
    let alias = gen_alias(alias);
    alias
        .rsplit('.')
        .next()
        .unwrap_or(alias.as_str())
        .to_string()
}

/// Names starting with `@` need quoting to stay valid YAML keys.
fn bad_prefix(name: &str) -> bool {
    name.starts_with('@')
}

/// YAML mask types cannot carry dashes.
fn fix_type(format: &str) -> String {
    format.replace('-', "_")
}
