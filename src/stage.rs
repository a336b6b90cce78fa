//! Stage definitions for the CIRCLES analysis.
//!
//! This module provides:
//! - `Stage`, the fixed ordered list of seven analysis stages
//! - The static relevance table used to pick which earlier outputs feed a stage
//! - `StageResponses`, the ordered stage-id -> response text mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One step of the CIRCLES framework.
///
/// Declaration order is execution order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "circles_comprehend_the_situation")]
    Comprehend,
    #[serde(rename = "circles_identify_the_customer")]
    Identify,
    #[serde(rename = "circles_report_the_customers_needs")]
    Report,
    #[serde(rename = "circles_cut_through_prioritization")]
    Cut,
    #[serde(rename = "circles_list_solutions")]
    List,
    #[serde(rename = "circles_evaluate_trade_offs")]
    Evaluate,
    #[serde(rename = "circles_summarize_recommendations")]
    Summarize,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Comprehend,
        Stage::Identify,
        Stage::Report,
        Stage::Cut,
        Stage::List,
        Stage::Evaluate,
        Stage::Summarize,
    ];

    /// Stable identifier, also the prompt file stem.
    pub fn id(self) -> &'static str {
        match self {
            Stage::Comprehend => "circles_comprehend_the_situation",
            Stage::Identify => "circles_identify_the_customer",
            Stage::Report => "circles_report_the_customers_needs",
            Stage::Cut => "circles_cut_through_prioritization",
            Stage::List => "circles_list_solutions",
            Stage::Evaluate => "circles_evaluate_trade_offs",
            Stage::Summarize => "circles_summarize_recommendations",
        }
    }

    /// Name of the prompt file holding this stage's instructions.
    pub fn prompt_name(self) -> String {
        format!("{}.prompt", self.id())
    }

    /// Human-readable label used in context digests ("Comprehend The Situation").
    pub fn label(self) -> String {
        self.id()
            .trim_start_matches("circles_")
            .split('_')
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Framework title, as written in documents and the appendix.
    pub fn title(self) -> &'static str {
        match self {
            Stage::Comprehend => "Comprehend the Situation",
            Stage::Identify => "Identify the Customer",
            Stage::Report => "Report Customer Needs",
            Stage::Cut => "Cut Through Prioritization",
            Stage::List => "List Solutions",
            Stage::Evaluate => "Evaluate Trade-offs",
            Stage::Summarize => "Summarize Recommendations",
        }
    }

    /// Single-letter framework initial.
    pub fn initial(self) -> char {
        match self {
            Stage::Comprehend | Stage::Cut => 'C',
            Stage::Identify => 'I',
            Stage::Report => 'R',
            Stage::List => 'L',
            Stage::Evaluate => 'E',
            Stage::Summarize => 'S',
        }
    }

    /// 1-based position in the sequence.
    pub fn position(self) -> usize {
        self as usize + 1
    }

    /// Earlier stages whose output is relevant context for this stage.
    ///
    /// `None` for stages outside the static table; callers fall back to the
    /// most recently completed stages.
    pub fn relevant_stages(self) -> Option<&'static [Stage]> {
        match self {
            Stage::Comprehend => None,
            Stage::Identify => Some(&[Stage::Comprehend]),
            Stage::Report => Some(&[Stage::Comprehend, Stage::Identify]),
            Stage::Cut => Some(&[Stage::Report]),
            Stage::List => Some(&[Stage::Report, Stage::Cut]),
            Stage::Evaluate => Some(&[Stage::Cut, Stage::List]),
            Stage::Summarize => Some(&[Stage::Cut, Stage::List, Stage::Evaluate]),
        }
    }

    /// Look up a stage by its identifier.
    pub fn from_id(id: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.id() == id)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered mapping of stage -> response text.
pub type StageResponses = BTreeMap<Stage, String>;

/// Prefix of the marker recorded when a stage fails.
pub const FAILURE_MARKER_PREFIX: &str = "Analysis step failed:";

/// Build the failure marker recorded in place of a failed stage's response.
pub fn failure_marker(error: &str) -> String {
    format!("{} {}", FAILURE_MARKER_PREFIX, error)
}

/// Whether a recorded response is a failure marker.
pub fn is_failure_marker(response: &str) -> bool {
    response.starts_with(FAILURE_MARKER_PREFIX)
}
