//! Header-based section parsing.

use std::sync::LazyLock;

use regex::Regex;

/// Name of the section holding text before the first header.
pub const LEADING_SECTION: &str = "Introduction";

/// A header and the non-empty lines under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub content: String,
}

// Markdown headers, numbered lines, ALL-CAPS lines, bold lines
static HEADER_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"^#+\s*(.+?)$").unwrap(),
        Regex::new(r"^(\d+\.?\s*.+?)$").unwrap(),
        Regex::new(r"^([A-Z][^a-z\n]{5,})$").unwrap(),
        Regex::new(r"^\*\*(.+?)\*\*$").unwrap(),
    ]
});

fn header_name(line: &str) -> Option<String> {
    HEADER_PATTERNS.iter().find_map(|pattern| {
        pattern.captures(line).and_then(|caps| {
            caps.get(1).map(|m| {
                m.as_str()
                    .trim_matches(|c| c == '*' || c == '#' || c == ' ')
                    .to_string()
            })
        })
    })
}

fn flush(name: &str, body: &mut Vec<&str>, sections: &mut Vec<Section>) {
    if body.is_empty() {
        return;
    }
    let content = body.join("\n");
    body.clear();
    match sections.iter_mut().find(|s| s.name == name) {
        Some(existing) => existing.content = content,
        None => sections.push(Section {
            name: name.to_string(),
            content,
        }),
    }
}

/// Split `document` into sections in order of first appearance.
///
/// Sections with no body are dropped. A repeated header replaces the earlier
/// body but keeps its position.
pub fn parse_sections(document: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current = LEADING_SECTION.to_string();
    let mut body: Vec<&str> = Vec::new();

    for line in document.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        match header_name(line) {
            Some(name) => {
                flush(&current, &mut body, &mut sections);
                current = name;
            }
            None => body.push(line),
        }
    }
    flush(&current, &mut body, &mut sections);
    sections
}
