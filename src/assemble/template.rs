//! `{name}` placeholder rendering.
//!
//! Placeholders are literal `{identifier}` spans; `{{` and `}}` render as
//! single braces. Substituted values are never scanned again.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::TemplateError;

// Escaped braces, or a placeholder with its name captured
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").unwrap());

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").unwrap());

/// Placeholder name -> substituted text.
pub type TemplateVariables = BTreeMap<&'static str, String>;

/// Substitute every placeholder in `template`.
///
/// Fails on the first placeholder with no value.
pub fn render(template: &str, variables: &TemplateVariables) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() * 2);
    let mut last = 0;

    for caps in TOKEN.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        match whole.as_str() {
            "{{" => out.push('{'),
            "}}" => out.push('}'),
            _ => {
                let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                let value = variables
                    .get(name)
                    .ok_or_else(|| TemplateError::MissingPlaceholder(name.to_string()))?;
                out.push_str(value);
            }
        }
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Names of the `{name}`-style placeholders still present in `text`.
pub fn remaining_placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}
