//! Framework coverage scoring for finished documents.
//!
//! Purely lexical: each of the seven framework dimensions has a fixed keyword
//! list matched against the lower-cased document. Documents that name the
//! framework stages get boosted dimension scores and a structure bonus.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::stage::StageResponses;

/// Id, display name and keywords of each dimension.
const DIMENSIONS: [(&str, &str, &[&str]); 7] = [
    (
        "C1_Comprehend",
        "Comprehend the Situation",
        &["problem", "context", "background", "situation", "challenge", "current state", "market"],
    ),
    (
        "I_Identify",
        "Identify the Customer",
        &["user", "customer", "persona", "stakeholder", "target", "demographics", "segment"],
    ),
    (
        "R_Report",
        "Report Customer Needs",
        &[
            "requirement",
            "need",
            "feature",
            "functionality",
            "specification",
            "acceptance criteria",
            "user story",
        ],
    ),
    (
        "C2_Cut",
        "Cut Through Prioritization",
        &["priority", "must have", "should have", "could have", "prioritization", "mvp", "essential"],
    ),
    (
        "L_List",
        "List Solutions",
        &["solution", "approach", "option", "alternative", "implementation", "design", "architecture"],
    ),
    (
        "E_Evaluate",
        "Evaluate Trade-offs",
        &["trade-off", "pros", "cons", "comparison", "evaluation", "risk", "benefit", "cost"],
    ),
    (
        "S_Summarize",
        "Summarize Recommendations",
        &["recommendation", "conclusion", "next steps", "summary", "decision", "action plan", "timeline"],
    ),
];

/// Phrases showing the framework stages were run.
const EXECUTION_INDICATORS: [&str; 9] = [
    "circles framework",
    "circles analysis",
    "comprehend the situation",
    "identify the customer",
    "report customer needs",
    "cut through prioritization",
    "list solutions",
    "evaluate trade-offs",
    "summarize recommendations",
];

/// Phrases showing a comprehensively structured document.
const STRUCTURE_INDICATORS: [&str; 9] = [
    "requirements table",
    "personas table",
    "stakeholder matrix",
    "success metrics",
    "implementation plan",
    "acceptance criteria",
    "user stories",
    "functional requirements",
    "non-functional requirements",
];

/// Structure indicators needed for the full structure bonus.
const COMPREHENSIVE_MIN_INDICATORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityLabel {
    Excellent,
    Good,
    Basic,
}

impl QualityLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            QualityLabel::Excellent
        } else if score >= 60.0 {
            QualityLabel::Good
        } else {
            QualityLabel::Basic
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityLabel::Excellent => "Excellent",
            QualityLabel::Good => "Good",
            QualityLabel::Basic => "Basic",
        };
        f.write_str(s)
    }
}

/// Coverage of one framework dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionCoverage {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub covered: bool,
    pub coverage_percentage: f64,
    pub found_keywords: Vec<&'static str>,
}

/// Coverage of a whole document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub steps: BTreeMap<&'static str, DimensionCoverage>,
    /// Always within `[0, 100]`
    pub overall_coverage: f64,
    pub circles_framework_executed: bool,
    pub comprehensive_structure: bool,
    pub analysis_quality: QualityLabel,
    /// Raw stage responses the document was built from
    pub circles_responses: StageResponses,
}

impl CoverageReport {
    pub fn covered_dimensions(&self) -> usize {
        self.steps.values().filter(|d| d.covered).count()
    }
}

/// Score one dimension. `executed` applies the framework boost.
fn score_dimension(
    name: &'static str,
    keywords: &'static [&'static str],
    content_lower: &str,
    executed: bool,
) -> DimensionCoverage {
    let found_keywords: Vec<&'static str> = keywords
        .iter()
        .copied()
        .filter(|kw| content_lower.contains(kw))
        .collect();
    let base = found_keywords.len() as f64 / keywords.len() as f64 * 100.0;

    let (coverage_percentage, covered) = if executed {
        let boost = if found_keywords.is_empty() { 1.2 } else { 1.5 };
        let boosted = (base * boost).min(100.0);
        (boosted, boosted > 20.0)
    } else {
        (base, !found_keywords.is_empty())
    };

    DimensionCoverage {
        name,
        keywords,
        covered,
        coverage_percentage,
        found_keywords,
    }
}

/// Score `document` against the seven framework dimensions.
///
/// The overall score is the mean dimension score, adjusted in three tiers:
/// with stage markers and at least five structure indicators the structure
/// bonus is added and capped at 95; with stage markers alone a flat 15 is
/// added and capped at 85; without markers the mean is used as is.
pub fn analyze_coverage(document: &str) -> CoverageReport {
    let content = document.to_lowercase();
    let executed = EXECUTION_INDICATORS.iter().any(|i| content.contains(i));

    let steps: BTreeMap<&'static str, DimensionCoverage> = DIMENSIONS
        .iter()
        .map(|&(id, name, keywords)| (id, score_dimension(name, keywords, &content, executed)))
        .collect();

    let structure_hits = STRUCTURE_INDICATORS
        .iter()
        .filter(|i| content.contains(*i))
        .count();
    let structure_bonus = (structure_hits as f64 * 2.0).min(20.0);

    let base_overall =
        steps.values().map(|d| d.coverage_percentage).sum::<f64>() / steps.len() as f64;
    let overall_coverage = if executed && structure_hits >= COMPREHENSIVE_MIN_INDICATORS {
        (base_overall + structure_bonus).min(95.0)
    } else if executed {
        (base_overall + 15.0).min(85.0)
    } else {
        base_overall
    };

    CoverageReport {
        steps,
        overall_coverage,
        circles_framework_executed: executed,
        comprehensive_structure: structure_hits >= COMPREHENSIVE_MIN_INDICATORS,
        analysis_quality: QualityLabel::from_score(overall_coverage),
        circles_responses: StageResponses::new(),
    }
}
