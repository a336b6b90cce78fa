//! Whole-prompt truncation.
//!
//! Two tiers:
//! - [`soft_truncate`] keeps essential blank-line sections and fills the rest
//!   of the budget with optional sections.
//! - [`hard_truncate`] keeps the head and tail lines and squeezes the middle.
//!
//! Both return text whose estimated size fits the requested budget and keep
//! the `Product Idea:` statement when the input carried one.

use tracing::warn;

use crate::tokens::{first_words, fits, word_count, words_within};

/// Leading marker of the product-idea statement.
pub const PRODUCT_IDEA_PREFIX: &str = "Product Idea:";

/// Phrase opening the closing instruction of every stage prompt.
pub const CLOSING_INSTRUCTION_MARKER: &str = "Please provide";

/// Suffix appended to a partially included section.
pub const TRUNCATION_SUFFIX: &str = "... [truncated]";

/// Instruction appended when only a clipped prefix of the prompt survives.
pub const CONTINUATION_INSTRUCTION: &str =
    "Please provide a focused analysis based on the above context.";

/// Words held back when partially including a section.
const PARTIAL_SECTION_SLACK: usize = 10;

/// Lines kept verbatim from the start of the prompt.
const HEAD_LINES: usize = 5;

/// Lines kept verbatim from the end of the prompt.
const TAIL_LINES: usize = 3;

/// Minimum spare words before middle content is worth adding back.
const MIN_MIDDLE_WORDS: usize = 100;

fn is_essential_section(section: &str) -> bool {
    section.contains(PRODUCT_IDEA_PREFIX)
        || section.contains(CLOSING_INSTRUCTION_MARKER)
        || section.contains("CIRCLES framework")
}

/// Pre-emptive truncation on blank-line section boundaries.
pub fn soft_truncate(prompt: &str, budget: usize) -> String {
    if fits(prompt, budget) {
        return prompt.to_string();
    }
    let word_budget = words_within(budget);

    let mut essential = Vec::new();
    let mut optional = Vec::new();
    for section in prompt.split("\n\n").map(str::trim) {
        if section.is_empty() {
            continue;
        }
        if is_essential_section(section) {
            essential.push(section);
        } else {
            optional.push(section);
        }
    }

    let essential_words: usize = essential.iter().map(|s| word_count(s)).sum();
    if essential_words > word_budget {
        warn!(
            essential_words,
            word_budget, "Essential sections alone exceed budget, clipping"
        );
        return clip_keeping_product_idea(&essential.join("\n\n"), word_budget);
    }

    let mut kept: Vec<String> = essential.iter().map(|s| s.to_string()).collect();
    let mut remaining = word_budget - essential_words;
    for section in optional {
        let words = word_count(section);
        if words < remaining {
            kept.push(section.to_string());
            remaining -= words;
        } else {
            let partial = first_words(section, remaining.saturating_sub(PARTIAL_SECTION_SLACK));
            if !partial.is_empty() {
                kept.push(format!("{}{}", partial, TRUNCATION_SUFFIX));
            }
            break;
        }
    }

    kept.join("\n\n")
}

/// Emergency truncation used after the service rejected a request as too large.
pub fn hard_truncate(prompt: &str, budget: usize) -> String {
    if fits(prompt, budget) {
        return prompt.to_string();
    }
    let word_budget = words_within(budget);
    let lines: Vec<&str> = prompt.split('\n').collect();

    let (mut head, middle, tail): (Vec<&str>, Vec<&str>, Vec<&str>) =
        if lines.len() <= HEAD_LINES + TAIL_LINES {
            (lines.clone(), Vec::new(), Vec::new())
        } else {
            let tail_start = lines.len() - TAIL_LINES;
            (
                lines[..HEAD_LINES].to_vec(),
                lines[HEAD_LINES..tail_start].to_vec(),
                lines[tail_start..].to_vec(),
            )
        };

    // The product idea must survive even when it sits in the middle.
    let mut middle = middle;
    if !head.iter().any(|l| l.contains(PRODUCT_IDEA_PREFIX))
        && !tail.iter().any(|l| l.contains(PRODUCT_IDEA_PREFIX))
        && let Some(pos) = middle.iter().position(|l| l.contains(PRODUCT_IDEA_PREFIX))
    {
        head.push(middle.remove(pos));
    }

    let mut essential_lines = head.clone();
    essential_lines.extend(tail.iter().copied());
    let essential_text = essential_lines.join("\n");
    let essential_words = word_count(&essential_text);

    if essential_words > word_budget {
        let continuation_words = word_count(CONTINUATION_INSTRUCTION);
        if word_budget > continuation_words {
            let clipped =
                clip_keeping_product_idea(&essential_text, word_budget - continuation_words);
            return format!("{}\n\n{}", clipped, CONTINUATION_INSTRUCTION);
        }
        return clip_keeping_product_idea(&essential_text, word_budget);
    }

    let remaining = word_budget - essential_words;
    if remaining > MIN_MIDDLE_WORDS && !middle.is_empty() {
        let middle_text = middle.join("\n");
        let middle_text = if word_count(&middle_text) > remaining {
            format!(
                "{}{}",
                first_words(&middle_text, remaining - PARTIAL_SECTION_SLACK),
                TRUNCATION_SUFFIX
            )
        } else {
            middle_text
        };
        return format!(
            "{}\n\n{}\n\n{}",
            head.join("\n"),
            middle_text,
            tail.join("\n")
        );
    }

    essential_text
}

/// First `max_words` words, starting from the product-idea statement when the
/// plain prefix would lose it.
fn clip_keeping_product_idea(text: &str, max_words: usize) -> String {
    let clipped = first_words(text, max_words);
    if !text.contains(PRODUCT_IDEA_PREFIX) || clipped.contains(PRODUCT_IDEA_PREFIX) {
        return clipped;
    }
    match text.find(PRODUCT_IDEA_PREFIX) {
        Some(idx) => first_words(&text[idx..], max_words),
        None => clipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::estimate_tokens;

    fn filler(words: usize, tag: &str) -> String {
        (0..words)
            .map(|i| format!("{}{}", tag, i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn stage_prompt(context_words: usize) -> String {
        format!(
            "Product Idea: A subscription meal-kit delivery app\n\nAdditional Context:\n- Audience: busy parents\n\n{}\n\nDescribe the situation.\n\nPlease provide a focused, comprehensive analysis for this step.",
            filler(context_words, "ctx")
        )
    }

    #[test]
    fn test_soft_within_budget_is_unchanged() {
        let prompt = stage_prompt(10);
        assert_eq!(soft_truncate(&prompt, 4000), prompt);
    }

    #[test]
    fn test_soft_keeps_essentials_and_marks_partial() {
        let prompt = stage_prompt(5000);
        let out = soft_truncate(&prompt, 4000);
        assert!(estimate_tokens(&out) <= 4000.0);
        assert!(out.contains("Product Idea: A subscription meal-kit delivery app"));
        assert!(out.contains("Please provide a focused"));
        assert!(out.contains(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_soft_clips_when_essentials_overflow() {
        let prompt = format!(
            "Product Idea: {}\n\nPlease provide {}",
            filler(50, "idea"),
            filler(500, "ask")
        );
        let out = soft_truncate(&prompt, 100);
        assert!(estimate_tokens(&out) <= 100.0);
        assert!(out.starts_with(PRODUCT_IDEA_PREFIX));
    }

    #[test]
    fn test_hard_keeps_head_and_tail() {
        let mut lines = vec![
            "Product Idea: Meal kits".to_string(),
            "".to_string(),
            "Additional Context:".to_string(),
            "- Budget: small".to_string(),
            "".to_string(),
        ];
        for i in 0..400 {
            lines.push(filler(10, &format!("m{}x", i)));
        }
        lines.push("".to_string());
        lines.push("Closing instruction line".to_string());
        lines.push("Respond now.".to_string());
        let prompt = lines.join("\n");

        let out = hard_truncate(&prompt, 2000);
        assert!(estimate_tokens(&out) <= 2000.0);
        assert!(out.starts_with("Product Idea: Meal kits"));
        assert!(out.ends_with("Closing instruction line\nRespond now."));
        assert!(out.contains(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_hard_clips_when_head_alone_is_too_big() {
        let prompt = format!(
            "Product Idea: {}\nline2\nline3\nline4\nline5\n{}\nt1\nt2\nt3",
            filler(3000, "huge"),
            filler(100, "mid")
        );
        let out = hard_truncate(&prompt, 2000);
        assert!(estimate_tokens(&out) <= 2000.0);
        assert!(out.starts_with(PRODUCT_IDEA_PREFIX));
        assert!(out.ends_with(CONTINUATION_INSTRUCTION));
    }

    #[test]
    fn test_hard_rescues_product_idea_from_middle() {
        let mut lines: Vec<String> = (0..5).map(|i| format!("header {}", i)).collect();
        lines.push(filler(2000, "pre"));
        lines.push("Product Idea: Rescue me".to_string());
        lines.push(filler(2000, "post"));
        lines.extend((0..3).map(|i| format!("tail {}", i)));
        let out = hard_truncate(&lines.join("\n"), 500);
        assert!(estimate_tokens(&out) <= 500.0);
        assert!(out.contains("Product Idea: Rescue me"));
    }

    #[test]
    fn test_both_tiers_respect_small_budgets() {
        let prompt = stage_prompt(3000);
        for budget in [1, 13, 50, 130, 999] {
            assert!(estimate_tokens(&soft_truncate(&prompt, budget)) <= budget as f64);
            assert!(estimate_tokens(&hard_truncate(&prompt, budget)) <= budget as f64);
        }
    }
}
