//! Keyword-driven section extraction from free-form stage text.
//!
//! Stage responses have no grammar, so extraction is an ordered chain of
//! best-effort strategies. The first strategy that yields text wins; when all
//! of them miss, a placeholder naming the keywords is returned.

use crate::context::is_list_item;
use crate::tokens::{clip_with_ellipsis, first_words, last_words, word_count};

/// Characters kept from a header-delimited section.
const SECTION_MAX_CHARS: usize = 300;

/// Sections shorter than this are treated as misses.
const SECTION_MIN_CHARS: usize = 20;

/// Stop collecting keyword sentences past this many characters.
const SENTENCES_MAX_CHARS: usize = 200;

/// Sentences this short are ignored.
const SENTENCE_MIN_CHARS: usize = 10;

/// Words kept by the leading-words strategy.
const LEADING_WORDS: usize = 50;

/// Texts with this few words are too thin for the leading-words strategy.
const LEADING_MIN_WORDS: usize = 10;

/// Summary returned for empty text.
pub const SUMMARY_PENDING: &str = "Analysis pending";

/// Marker between head and tail of a summary with no salient lines.
const SUMMARY_CONTINUES_MARKER: &str = "... [analysis continues]...";

type Strategy = fn(&str, &[&str]) -> Option<String>;

/// Strategies in the order they are tried.
const STRATEGIES: &[Strategy] = &[header_section, keyword_sentences, leading_words];

/// Extract the part of `text` that discusses any of `keywords`.
///
/// Never fails: empty input yields `Analysis needed for ...` and a total miss
/// yields `Analysis available but specific ... details need refinement`.
pub fn extract_section(text: &str, keywords: &[&str]) -> String {
    if text.trim().is_empty() {
        return format!("Analysis needed for {}", keywords.join(", "));
    }
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(text, keywords))
        .unwrap_or_else(|| {
            format!(
                "Analysis available but specific {} details need refinement",
                keywords.join(", ")
            )
        })
}

/// Whether a line containing a keyword opens a section.
fn looks_like_header(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("**")
        || trimmed.starts_with('#')
        || trimmed.starts_with('-')
        || trimmed.starts_with('*')
        || trimmed.starts_with('•')
        || trimmed.ends_with(':')
        || line.contains("**")
        || line.contains("##")
}

/// Whether a line closes the section being collected.
fn ends_section(line: &str) -> bool {
    let trimmed = line.trim();
    line.starts_with("**")
        || line.starts_with('#')
        || (trimmed.ends_with(':') && trimmed.chars().count() < 50)
}

/// Lines following a keyword header, up to the next header.
fn header_section(text: &str, keywords: &[&str]) -> Option<String> {
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        let mut content: Vec<&str> = Vec::new();
        let mut in_section = false;

        for line in text.lines() {
            if line.to_lowercase().contains(&keyword) && looks_like_header(line) {
                in_section = true;
                continue;
            }
            if !in_section || line.trim().is_empty() {
                continue;
            }
            if ends_section(line) {
                break;
            }
            content.push(line.trim());
        }

        let joined = content.join(" ");
        if joined.chars().count() > SECTION_MIN_CHARS {
            return Some(clip_with_ellipsis(&joined, SECTION_MAX_CHARS));
        }
    }
    None
}

/// Sentences mentioning a keyword, up to about 200 characters.
fn keyword_sentences(text: &str, keywords: &[&str]) -> Option<String> {
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        let mut picked: Vec<&str> = Vec::new();
        let mut joined_len = 0usize;

        for sentence in text.split('.') {
            let sentence = sentence.trim();
            if sentence.chars().count() <= SENTENCE_MIN_CHARS
                || !sentence.to_lowercase().contains(&keyword)
            {
                continue;
            }
            joined_len += sentence.chars().count() + usize::from(!picked.is_empty());
            picked.push(sentence);
            if joined_len > SENTENCES_MAX_CHARS {
                break;
            }
        }

        if !picked.is_empty() {
            return Some(picked.join(" "));
        }
    }
    None
}

/// The opening words of the text.
fn leading_words(text: &str, _keywords: &[&str]) -> Option<String> {
    let words = word_count(text);
    if words <= LEADING_MIN_WORDS {
        return None;
    }
    let head = first_words(text, LEADING_WORDS);
    if words > LEADING_WORDS {
        Some(format!("{}...", head))
    } else {
        Some(head)
    }
}

/// Structured summary of a whole response, about `max_chars` long.
///
/// Prefers list items and lines flagged as key or important; otherwise keeps
/// the opening third and closing quarter of the words.
pub fn create_summary(text: &str, max_chars: usize) -> String {
    if text.trim().is_empty() {
        return SUMMARY_PENDING.to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut points: Vec<&str> = Vec::new();
    let mut joined_len = 0usize;
    for line in text.lines().map(str::trim) {
        let lower = line.to_lowercase();
        let salient = is_list_item(line)
            || line.starts_with('-')
            || line.starts_with('*')
            || lower.contains("key")
            || lower.contains("important");
        if !salient || line.is_empty() {
            continue;
        }
        joined_len += line.chars().count() + usize::from(!points.is_empty());
        points.push(line);
        if joined_len > max_chars.saturating_sub(50) {
            break;
        }
    }
    if !points.is_empty() {
        return points.join(" ");
    }

    if word_count(text) > max_chars / 4 {
        return format!(
            "{}{} {}",
            first_words(text, max_chars / 3),
            SUMMARY_CONTINUES_MARKER,
            last_words(text, max_chars / 4)
        );
    }
    clip_with_ellipsis(text, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPREHEND: &str = "**Current State**
Families spend hours planning meals and shopping each week.
Food waste is high because ingredients are bought in bulk.

**Market Context:**
- The meal-kit segment is growing roughly 12% a year
- Competitors include HelloFresh and Blue Apron

**Technical Context**
Mobile app plus a logistics backend.";

    #[test]
    fn test_header_section_collects_until_next_header() {
        let out = extract_section(COMPREHEND, &["market", "competitive"]);
        assert!(out.contains("growing roughly 12%"));
        assert!(out.contains("HelloFresh"));
        assert!(!out.contains("logistics backend"));
    }

    #[test]
    fn test_keyword_bullet_restarts_section() {
        // A bullet mentioning the keyword is read as a new header, not content.
        let text = "**Market**\n- market share is tiny today\n- Competitors include HelloFresh and Blue Apron";
        let out = extract_section(text, &["market"]);
        assert_eq!(out, "- Competitors include HelloFresh and Blue Apron");
    }

    #[test]
    fn test_header_section_is_clipped() {
        let body = "detail ".repeat(100);
        let text = format!("## Risks\n{}\n## Next", body);
        let out = extract_section(&text, &["risk"]);
        assert_eq!(out.chars().count(), 303);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_falls_back_to_keyword_sentences() {
        let text = "We looked at many things. The security posture must include SSO and audit logs. Nothing else matters here";
        let out = extract_section(text, &["security"]);
        assert_eq!(out, "The security posture must include SSO and audit logs");
    }

    #[test]
    fn test_falls_back_to_leading_words() {
        let text = (0..80).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let out = extract_section(&text, &["absent"]);
        assert!(out.starts_with("w0 w1"));
        assert!(out.ends_with("w49..."));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            extract_section("", &["mvp", "core"]),
            "Analysis needed for mvp, core"
        );
        assert_eq!(
            extract_section("tiny text", &["mvp"]),
            "Analysis available but specific mvp details need refinement"
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let a = extract_section(COMPREHEND, &["technical", "platform"]);
        let b = extract_section(COMPREHEND, &["technical", "platform"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_create_summary() {
        assert_eq!(create_summary("", 400), SUMMARY_PENDING);
        assert_eq!(create_summary("short", 400), "short");

        let listed = format!("Intro.\n- first point\n- second point\n{}", "filler ".repeat(100));
        assert_eq!(create_summary(&listed, 400), "- first point - second point");

        let plain = (0..300).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let summary = create_summary(&plain, 400);
        assert!(summary.contains("[analysis continues]"));
        assert!(summary.ends_with("w299"));
    }
}
