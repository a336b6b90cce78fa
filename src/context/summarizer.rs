//! Digest of a single stage response.

use std::sync::LazyLock;

use regex::Regex;

use crate::tokens::{clip_chars, last_chars};

/// Characters kept from each salient line.
const MAX_POINT_CHARS: usize = 100;

/// Stop collecting salient lines once this close to the budget.
const BUDGET_SLACK: usize = 50;

/// Marker placed between the head and tail of the fallback digest.
pub const KEY_FINDINGS_MARKER: &str = "... [key findings]...";

const SALIENCE_KEYWORDS: [&str; 5] = ["key", "important", "primary", "main", "critical"];

// "1." through "19." at the start of a line
static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[1-9]|1[0-9])\.").unwrap());

/// Whether a trimmed line is a bullet or numbered list item.
pub(crate) fn is_list_item(line: &str) -> bool {
    line.starts_with("- ")
        || line.starts_with("* ")
        || line.starts_with('•')
        || NUMBERED_ITEM.is_match(line)
}

fn is_salient(line: &str) -> bool {
    if is_list_item(line) {
        return true;
    }
    let lower = line.to_lowercase();
    SALIENCE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Compress a stage response into a digest of at most `max_chars` characters.
///
/// Text that already fits is returned unchanged. Otherwise list items and
/// lines mentioning salience keywords are concatenated until the digest nears
/// the budget; with no salient lines, a head and a tail of the text are kept
/// around a marker, sized so both fit. The result never exceeds `max_chars`.
pub fn summarize_response(response: &str, max_chars: usize) -> String {
    if response.chars().count() <= max_chars {
        return response.to_string();
    }

    let mut points: Vec<&str> = Vec::new();
    let mut joined_len = 0usize;
    for line in response.lines().map(str::trim) {
        if line.is_empty() || !is_salient(line) {
            continue;
        }
        let point = clip_chars(line, MAX_POINT_CHARS);
        joined_len += point.chars().count() + usize::from(!points.is_empty());
        points.push(point);
        if joined_len > max_chars.saturating_sub(BUDGET_SLACK) {
            break;
        }
    }

    if points.is_empty() {
        return head_and_tail(response.trim(), max_chars);
    }
    clamp(&points.join(" "), max_chars)
}

/// `head... [key findings]... tail`, split evenly around the marker.
fn head_and_tail(text: &str, max_chars: usize) -> String {
    // marker plus the space before the tail
    let overhead = KEY_FINDINGS_MARKER.chars().count() + 1;
    if max_chars <= overhead + 1 {
        return clamp(text, max_chars);
    }
    let available = max_chars - overhead;
    let head_chars = available / 2;
    let head = clip_chars(text, head_chars).trim_end();
    let tail = last_chars(text, available - head_chars).trim_start();
    format!("{}{} {}", head, KEY_FINDINGS_MARKER, tail)
}

/// Hard clamp to `max_chars`, marking the cut with `...` when there is room.
fn clamp(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return clip_chars(text, max_chars).to_string();
    }
    format!("{}...", clip_chars(text, max_chars - 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(summarize_response("short answer", 300), "short answer");
    }

    #[test]
    fn test_prefers_list_items_and_keywords() {
        let mut text = String::from("Intro paragraph that rambles on without structure.\n");
        text.push_str("- First bullet about delivery\n");
        text.push_str("Some filler sentence.\n");
        text.push_str("2. Numbered step two\n");
        text.push_str("The key insight is freshness.\n");
        text.push_str(&"padding ".repeat(100));

        let summary = summarize_response(&text, 300);
        assert!(summary.contains("- First bullet about delivery"));
        assert!(summary.contains("2. Numbered step two"));
        assert!(summary.contains("key insight"));
        assert!(!summary.contains("Intro paragraph"));
        assert!(summary.chars().count() <= 300);
    }

    #[test]
    fn test_fallback_keeps_head_and_tail() {
        let words: Vec<String> = (0..400).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");
        let summary = summarize_response(&text, 300);
        assert!(summary.starts_with("w0 w1"));
        assert!(summary.contains(KEY_FINDINGS_MARKER));
        assert!(summary.ends_with("w398 w399"));
        assert!(summary.chars().count() <= 300);

        let short = summarize_response(&text, 40);
        assert!(short.contains(KEY_FINDINGS_MARKER));
        assert!(short.ends_with("w399"));
        assert!(short.chars().count() <= 40);
    }

    #[test]
    fn test_output_never_exceeds_budget() {
        let text = "- item with the key idea\n".repeat(200);
        for max in [1, 3, 10, 60, 150, 300] {
            let summary = summarize_response(&text, max);
            assert!(summary.chars().count() <= max, "max={} got {}", max, summary);
        }
    }

    #[test]
    fn test_list_item_detection() {
        assert!(is_list_item("- dash"));
        assert!(is_list_item("* star"));
        assert!(is_list_item("• glyph"));
        assert!(is_list_item("12. twelve"));
        assert!(!is_list_item("20. twenty"));
        assert!(!is_list_item("-nospace"));
    }
}
