//! Document quality evaluation
//!
//! Scores a finished document on six weighted criteria, scores each parsed
//! section, checks framework coverage at the section level and derives
//! recommendations, strengths and weaknesses. Everything is lexical; no
//! completion calls are made.

mod report;
mod sections;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub use report::render_report;
pub use sections::{Section, parse_sections};

/// One weighted evaluation criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Completeness,
    Clarity,
    Specificity,
    Feasibility,
    CirclesAlignment,
    Structure,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::Completeness,
        Criterion::Clarity,
        Criterion::Specificity,
        Criterion::Feasibility,
        Criterion::CirclesAlignment,
        Criterion::Structure,
    ];

    /// Weights sum to 1.
    pub fn weight(self) -> f64 {
        match self {
            Criterion::Completeness => 0.25,
            Criterion::Clarity => 0.20,
            Criterion::Specificity
            | Criterion::Feasibility
            | Criterion::CirclesAlignment => 0.15,
            Criterion::Structure => 0.10,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Criterion::Completeness => "Completeness",
            Criterion::Clarity => "Clarity",
            Criterion::Specificity => "Specificity",
            Criterion::Feasibility => "Feasibility",
            Criterion::CirclesAlignment => "Circles Alignment",
            Criterion::Structure => "Structure",
        }
    }
}

/// Scores for one parsed section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionScore {
    pub content_score: f64,
    pub length_score: f64,
    pub detail_score: f64,
    pub overall_score: f64,
    pub word_count: usize,
    pub recommendations: Vec<String>,
}

/// Section-level coverage of one framework element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementCoverage {
    pub key: &'static str,
    pub name: &'static str,
    pub covered: bool,
    pub score: f64,
    pub found_elements: Vec<&'static str>,
    pub missing_elements: Vec<&'static str>,
    pub section_matches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub word_count: usize,
    pub section_count: usize,
    pub has_user_stories: bool,
    pub has_acceptance_criteria: bool,
    pub has_metrics: bool,
}

/// Full evaluation of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Weighted criteria mean, rounded to two decimals
    pub overall_score: f64,
    pub criteria_scores: BTreeMap<Criterion, f64>,
    pub section_scores: Vec<(String, SectionScore)>,
    pub circles_coverage: Vec<ElementCoverage>,
    pub recommendations: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub metadata: DocumentMetadata,
}

impl Evaluation {
    pub fn criterion(&self, criterion: Criterion) -> f64 {
        self.criteria_scores.get(&criterion).copied().unwrap_or(0.0)
    }
}

struct FrameworkElement {
    key: &'static str,
    name: &'static str,
    keywords: &'static [&'static str],
    required: &'static [&'static str],
}

const FRAMEWORK_ELEMENTS: [FrameworkElement; 7] = [
    FrameworkElement {
        key: "C",
        name: "Comprehend the Situation",
        keywords: &["situation", "context", "background", "current state", "problem space"],
        required: &["problem statement", "business context"],
    },
    FrameworkElement {
        key: "I",
        name: "Identify the Customer",
        keywords: &["user", "customer", "persona", "target audience", "stakeholder"],
        required: &["user personas", "target users"],
    },
    FrameworkElement {
        key: "R",
        name: "Report Customer Needs",
        keywords: &["needs", "pain points", "requirements", "user story", "goals"],
        required: &["user needs", "user stories"],
    },
    FrameworkElement {
        key: "C2",
        name: "Cut Through Prioritization",
        keywords: &[
            "priority",
            "must have",
            "should have",
            "nice to have",
            "mvp",
            "prioritiz",
            "critical",
            "important",
            "urgent",
            "high priority",
            "low priority",
        ],
        required: &["prioritization", "feature priority"],
    },
    FrameworkElement {
        key: "L",
        name: "List Solutions",
        keywords: &["solution", "approach", "feature", "functionality", "implementation"],
        required: &["proposed solution", "features"],
    },
    FrameworkElement {
        key: "E",
        name: "Evaluate Trade-offs",
        keywords: &["trade-off", "pros and cons", "alternative", "comparison", "evaluation"],
        required: &["trade-offs", "alternatives"],
    },
    FrameworkElement {
        key: "S",
        name: "Summarize Recommendations",
        keywords: &[
            "recommendation",
            "conclusion",
            "next steps",
            "summary",
            "decision",
            "recommend",
            "suggest",
            "propose",
            "action items",
            "follow up",
        ],
        required: &["recommendations", "next steps"],
    },
];

/// Essential document elements and their completeness weight.
const ESSENTIAL_ELEMENTS: [(&str, f64); 10] = [
    ("product overview", 15.0),
    ("user", 10.0),
    ("problem", 15.0),
    ("solution", 15.0),
    ("requirement", 15.0),
    ("success metric", 10.0),
    ("timeline", 5.0),
    ("stakeholder", 5.0),
    ("assumption", 5.0),
    ("risk", 5.0),
];

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\d+\.").unwrap());

static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+%|\d+\s*(seconds?|minutes?|hours?|days?|weeks?|months?)").unwrap()
});

static USER_STORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)as a.*I want.*so that").unwrap());

static MARKDOWN_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#+\s").unwrap());

static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

fn count_present(content_lower: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| content_lower.contains(*w)).count()
}

fn any_present(content_lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| content_lower.contains(w))
}

/// Rule-based document quality evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityEvaluator;

impl QualityEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, document: &str) -> Evaluation {
        let lower = document.to_lowercase();
        let sections = parse_sections(document);
        let circles_coverage = section_coverage(&sections);

        let mut criteria_scores = BTreeMap::new();
        criteria_scores.insert(Criterion::Completeness, completeness(&lower, &sections));
        criteria_scores.insert(Criterion::Clarity, clarity(document, &lower, &sections));
        criteria_scores.insert(Criterion::Specificity, specificity(document, &lower));
        criteria_scores.insert(Criterion::Feasibility, feasibility(&lower));
        criteria_scores.insert(
            Criterion::CirclesAlignment,
            circles_alignment(&circles_coverage),
        );
        criteria_scores.insert(Criterion::Structure, structure(document, &lower, &sections));

        let weighted: f64 = criteria_scores
            .iter()
            .map(|(criterion, score)| score * criterion.weight())
            .sum();
        let overall_score = (weighted * 100.0).round() / 100.0;

        let section_scores = sections
            .iter()
            .map(|s| (s.name.clone(), score_section(&s.name, &s.content)))
            .collect();

        let metadata = DocumentMetadata {
            word_count: document.split_whitespace().count(),
            section_count: sections.len(),
            has_user_stories: lower.contains("user story") || lower.contains("as a"),
            has_acceptance_criteria: lower.contains("acceptance criteria")
                || lower.contains("given"),
            has_metrics: any_present(&lower, &["kpi", "metric", "measure", "target", "goal"]),
        };

        let mut evaluation = Evaluation {
            overall_score,
            criteria_scores,
            section_scores,
            circles_coverage,
            recommendations: Vec::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            metadata,
        };
        evaluation.recommendations = recommendations(&evaluation);
        evaluation.strengths = strengths(&evaluation);
        evaluation.weaknesses = weaknesses(&evaluation);
        evaluation
    }
}

fn completeness(lower: &str, sections: &[Section]) -> f64 {
    let mut score: f64 = 0.0;
    for (element, weight) in ESSENTIAL_ELEMENTS {
        let head = element.split_whitespace().next().unwrap_or(element);
        if lower.contains(element) {
            score += weight;
        } else if sections.iter().any(|s| s.name.to_lowercase().contains(head)) {
            score += weight * 0.8;
        }
    }
    score.min(100.0)
}

fn clarity(document: &str, lower: &str, sections: &[Section]) -> f64 {
    let mut score: f64 = 0.0;
    if sections.len() >= 5 {
        score += 20.0;
    }
    if document.contains('•') || document.contains('-') || NUMBERED_LINE.is_match(document) {
        score += 15.0;
    }

    let indicators = ["clearly", "specifically", "precisely", "exactly", "defined as"];
    score += (count_present(lower, &indicators) as f64 * 5.0).min(25.0);

    let sentences: Vec<&str> = SENTENCE_BREAK.split(document).collect();
    let words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    let average = words as f64 / sentences.len().max(1) as f64;
    if average < 25.0 {
        score += 20.0;
    } else if average < 35.0 {
        score += 10.0;
    }

    if any_present(lower, &["defined as", "means", "refers to", "glossary"]) {
        score += 20.0;
    }
    score.min(100.0)
}

fn specificity(document: &str, lower: &str) -> f64 {
    let mut score: f64 = 0.0;
    if MEASUREMENT.is_match(document) {
        score += 25.0;
    }
    if any_present(lower, &["persona", "user type", "target user"]) {
        score += 20.0;
    }
    if lower.contains("acceptance criteria") && lower.contains("given") {
        score += 20.0;
    }
    let tech_terms = ["api", "database", "ui", "ux", "endpoint", "framework", "algorithm"];
    score += (count_present(lower, &tech_terms) as f64 * 3.0).min(15.0);
    if USER_STORY.is_match(document) {
        score += 20.0;
    }
    score.min(100.0)
}

fn feasibility(lower: &str) -> f64 {
    let mut score: f64 = 0.0;
    let constraints = [
        "constraint",
        "limitation",
        "dependency",
        "resource",
        "timeline",
        "budget",
    ];
    score += (count_present(lower, &constraints) as f64 * 10.0).min(40.0);
    if any_present(lower, &["risk", "challenge", "mitigation"]) {
        score += 20.0;
    }
    if any_present(lower, &["scalability", "performance", "security", "integration"]) {
        score += 20.0;
    }
    if any_present(lower, &["alternative", "option", "approach", "solution"]) {
        score += 20.0;
    }
    score.min(100.0)
}

fn circles_alignment(coverage: &[ElementCoverage]) -> f64 {
    let covered = coverage.iter().filter(|c| c.covered).count();
    covered as f64 / FRAMEWORK_ELEMENTS.len() as f64 * 100.0
}

fn structure(document: &str, lower: &str, sections: &[Section]) -> f64 {
    let mut score: f64 = 0.0;
    let early = ["overview", "introduction", "summary", "problem"];
    let late = ["implementation", "timeline", "conclusion", "next steps"];
    let names: Vec<String> = sections.iter().map(|s| s.name.to_lowercase()).collect();

    if names.iter().take(3).any(|n| any_present(n, &early)) {
        score += 15.0;
    }
    let tail_start = names.len().saturating_sub(3);
    if names[tail_start..].iter().any(|n| any_present(n, &late)) {
        score += 15.0;
    }

    match sections.len() {
        6..=15 => score += 30.0,
        4..=20 => score += 20.0,
        _ => {}
    }

    if any_present(lower, &["table of contents", "overview", "sections"]) {
        score += 20.0;
    }
    if MARKDOWN_HEADER.is_match(document) {
        score += 20.0;
    }
    score.min(100.0)
}

/// Score one section's length, content and detail.
pub fn score_section(name: &str, content: &str) -> SectionScore {
    let lower_name = name.to_lowercase();
    let word_count = content.split_whitespace().count();

    let (low, high) = if lower_name.contains("overview") || lower_name.contains("summary") {
        (50, 200)
    } else if lower_name.contains("requirement") {
        (100, 500)
    } else {
        (30, 300)
    };
    let length_score = if (low..=high).contains(&word_count) {
        100.0
    } else if word_count < low {
        word_count as f64 / low as f64 * 100.0
    } else {
        (100.0 - (word_count - high) as f64 / high as f64 * 50.0).max(0.0)
    };

    let mut content_score: f64 = 0.0;
    if !content.trim().is_empty() {
        content_score = 70.0;
        if ["•", "-", "1.", "2."].iter().any(|m| content.contains(m)) {
            content_score += 15.0;
        }
        if content.matches('.').count() >= 2 {
            content_score += 15.0;
        }
    }

    let mut detail_score: f64 = 0.0;
    if DIGIT.is_match(content) {
        detail_score += 30.0;
    }
    if word_count > 50 {
        detail_score += 40.0;
    }
    if any_present(&content.to_lowercase(), &["specific", "detailed", "example"]) {
        detail_score += 30.0;
    }

    let mut recommendations = Vec::new();
    if length_score < 50.0 {
        recommendations.push(format!(
            "Consider adding more detail to the {} section",
            name
        ));
    }
    if detail_score < 50.0 {
        recommendations.push(format!("Add specific examples or metrics to {}", name));
    }

    SectionScore {
        content_score,
        length_score,
        detail_score,
        overall_score: content_score * 0.5 + length_score * 0.3 + detail_score * 0.2,
        word_count,
        recommendations,
    }
}

/// Framework coverage judged from section names and section bodies.
pub fn section_coverage(sections: &[Section]) -> Vec<ElementCoverage> {
    let names: Vec<String> = sections.iter().map(|s| s.name.to_lowercase()).collect();
    let combined = sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    FRAMEWORK_ELEMENTS
        .iter()
        .map(|element| {
            let found: Vec<&'static str> = element
                .keywords
                .iter()
                .copied()
                .filter(|kw| combined.contains(kw))
                .collect();
            let section_matches: Vec<String> = names
                .iter()
                .filter(|name| any_present(name, element.keywords))
                .cloned()
                .collect();

            let covered = !found.is_empty() || !section_matches.is_empty();
            let score = if covered {
                (found.len() as f64 * 15.0 + section_matches.len() as f64 * 30.0).min(100.0)
            } else {
                0.0
            };
            let missing_elements = element
                .required
                .iter()
                .copied()
                .filter(|req| !found.iter().any(|word| req.contains(word)))
                .collect();

            ElementCoverage {
                key: element.key,
                name: element.name,
                covered,
                score,
                found_elements: found,
                missing_elements,
                section_matches,
            }
        })
        .collect()
}

fn recommendations(evaluation: &Evaluation) -> Vec<String> {
    let mut recs = Vec::new();
    if evaluation.overall_score < 60.0 {
        recs.push(
            "🔴 Consider a major revision - overall quality needs significant improvement".into(),
        );
    } else if evaluation.overall_score < 80.0 {
        recs.push("🟡 Good foundation - focus on addressing specific weaknesses".into());
    }

    if evaluation.criterion(Criterion::Completeness) < 70.0 {
        recs.push(
            "📝 Add missing essential sections: problem statement, solution overview, success metrics"
                .into(),
        );
    }
    if evaluation.criterion(Criterion::Clarity) < 70.0 {
        recs.push(
            "✨ Improve clarity: use bullet points, shorter sentences, and define technical terms"
                .into(),
        );
    }
    if evaluation.criterion(Criterion::Specificity) < 70.0 {
        recs.push("🎯 Add more specificity: include concrete numbers, detailed user stories, and specific acceptance criteria".into());
    }
    if evaluation.criterion(Criterion::CirclesAlignment) < 60.0 {
        recs.push(
            "🔄 Better align with CIRCLES framework - see coverage analysis for missing elements"
                .into(),
        );
    }

    let missing: Vec<&str> = evaluation
        .circles_coverage
        .iter()
        .filter(|c| !c.covered)
        .map(|c| c.name)
        .take(3)
        .collect();
    if !missing.is_empty() {
        recs.push(format!(
            "🎯 Address missing CIRCLES elements: {}",
            missing.join(", ")
        ));
    }
    recs
}

fn strengths(evaluation: &Evaluation) -> Vec<String> {
    let mut out = Vec::new();
    let checks = [
        (Criterion::Completeness, "✅ Comprehensive coverage of essential PRD elements"),
        (Criterion::Clarity, "✅ Clear and well-structured content"),
        (Criterion::Specificity, "✅ Specific and detailed requirements"),
        (Criterion::CirclesAlignment, "✅ Strong alignment with CIRCLES framework"),
    ];
    for (criterion, text) in checks {
        if evaluation.criterion(criterion) >= 80.0 {
            out.push(text.to_string());
        }
    }
    if evaluation.metadata.has_user_stories {
        out.push("✅ Includes user stories for clear requirement definition".into());
    }
    if evaluation.metadata.has_metrics {
        out.push("✅ Includes success metrics and measurable goals".into());
    }
    out
}

fn weaknesses(evaluation: &Evaluation) -> Vec<String> {
    let mut out = Vec::new();
    let checks = [
        (Criterion::Completeness, "❌ Missing critical PRD sections"),
        (Criterion::Clarity, "❌ Content lacks clarity and structure"),
        (Criterion::Specificity, "❌ Requirements are too vague or high-level"),
        (Criterion::Feasibility, "❌ Insufficient consideration of constraints and risks"),
    ];
    for (criterion, text) in checks {
        if evaluation.criterion(criterion) < 60.0 {
            out.push(text.to_string());
        }
    }
    if !evaluation.metadata.has_user_stories {
        out.push("❌ Missing user stories for requirement clarity".into());
    }
    if !evaluation.metadata.has_acceptance_criteria {
        out.push("❌ Missing acceptance criteria for features".into());
    }
    out
}
