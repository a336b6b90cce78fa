//! Stage prompt composition.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::context::PRODUCT_IDEA_PREFIX;
use crate::tokens::clip_with_ellipsis;

/// Caller-supplied key/value context folded into every stage prompt.
pub type ConversationContext = BTreeMap<String, Value>;

/// Characters kept from each conversation-context value.
pub const CONTEXT_VALUE_MAX_CHARS: usize = 200;

/// Closing instruction appended to every stage prompt.
pub const FORMATTING_GUIDANCE: &str = "Please provide a focused, comprehensive analysis for this step. Use clear formatting with:
- **Bold headers** for main sections
- Bullet points (-) for lists
- Numbered lists (1., 2., 3.) for sequential items
- Clear, structured content that can be easily parsed

Your response should be detailed but concise, focusing on actionable insights.";

/// Product idea followed by the non-empty conversation-context entries.
///
/// Each value is clipped to [`CONTEXT_VALUE_MAX_CHARS`] characters plus `...`.
pub fn base_context(product_idea: &str, context: &ConversationContext) -> String {
    let mut base = format!("{} {}\n\n", PRODUCT_IDEA_PREFIX, product_idea);

    if context.is_empty() {
        return base;
    }
    base.push_str("Additional Context:\n");
    for (key, value) in context {
        let Some(text) = value_text(value) else {
            continue;
        };
        base.push_str(&format!(
            "- {}: {}\n",
            display_key(key),
            clip_with_ellipsis(&text, CONTEXT_VALUE_MAX_CHARS)
        ));
    }
    base.push('\n');
    base
}

/// Full prompt for one stage.
pub fn compose_stage_prompt(base: &str, insights: &str, stage_instructions: &str) -> String {
    format!(
        "{}{}\n\n{}\n\n{}",
        base,
        insights,
        stage_instructions.trim(),
        FORMATTING_GUIDANCE
    )
}

/// Text of a context value, or `None` for empty values.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Bool(false) => return None,
        Value::String(s) => s.clone(),
        Value::Array(items) if items.is_empty() => return None,
        Value::Object(map) if map.is_empty() => return None,
        Value::Number(n) if n.as_f64() == Some(0.0) => return None,
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// `target_market` -> `Target Market`.
fn display_key(key: &str) -> String {
    key.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
