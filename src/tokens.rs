//! Approximate token accounting.
//!
//! The completion service bills in model tokens, which we never count exactly.
//! Every size decision in the pipeline goes through [`estimate_tokens`], which
//! treats one whitespace-delimited word as 1.3 tokens.

/// Estimated tokens per whitespace-delimited word.
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Estimate the token cost of a text blob from its word count.
///
/// Callers must treat the result as an approximation.
pub fn estimate_tokens(text: &str) -> f64 {
    word_count(text) as f64 * TOKENS_PER_WORD
}

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Largest word count whose estimate stays within `budget` tokens.
pub fn words_within(budget: usize) -> usize {
    let budget = budget as f64;
    let mut words = (budget / TOKENS_PER_WORD).floor() as usize;
    // Guard against float rounding pushing the estimate just past the budget.
    while words > 0 && words as f64 * TOKENS_PER_WORD > budget {
        words -= 1;
    }
    words
}

/// Whether `text` fits within `budget` estimated tokens.
pub fn fits(text: &str, budget: usize) -> bool {
    estimate_tokens(text) <= budget as f64
}

/// First `max_chars` characters of `text`, respecting char boundaries.
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The last `max_chars` characters of `text`.
pub fn last_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    match text.char_indices().nth(total - max_chars) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Clip to `max_chars` characters and append `...` when anything was cut.
pub fn clip_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", clip_chars(text, max_chars))
    } else {
        text.to_string()
    }
}

/// First `n` whitespace-delimited words joined by single spaces.
pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Last `n` whitespace-delimited words joined by single spaces.
pub fn last_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.len().saturating_sub(n);
    words[start..].join(" ")
}
