//! Prior-stage context assembly under a word budget.

use tracing::debug;

use super::summarizer::summarize_response;
use crate::stage::{Stage, StageResponses};
use crate::tokens::{last_words, word_count};

/// Header line opening every context block.
pub const CONTEXT_HEADER: &str = "--- Key Insights from Previous Analysis ---";

/// Marker prefixed when the digest had to be cut from the front.
pub const CONTEXT_ELISION_MARKER: &str = "...[truncated]...";

/// Number of recent stages used when a stage has no relevance entry.
const FALLBACK_RECENT_STAGES: usize = 2;

/// Builds the digest of earlier stages injected into the next stage's prompt.
#[derive(Debug, Clone)]
pub struct ContextBudgeter {
    /// Word budget for the whole digest.
    budget_words: usize,
    /// Character budget for each stage's digest.
    summary_chars: usize,
}

impl ContextBudgeter {
    pub fn new(budget_words: usize, summary_chars: usize) -> Self {
        Self {
            budget_words,
            summary_chars,
        }
    }

    /// Stages whose responses feed `current`.
    ///
    /// Uses the static relevance table, falling back to the two most recently
    /// completed stages.
    pub fn relevant_stages(&self, responses: &StageResponses, current: Stage) -> Vec<Stage> {
        match current.relevant_stages() {
            Some(stages) => stages.to_vec(),
            None => {
                let completed: Vec<Stage> = responses.keys().copied().collect();
                let start = completed.len().saturating_sub(FALLBACK_RECENT_STAGES);
                completed[start..].to_vec()
            }
        }
    }

    /// Assemble the labelled digest of relevant earlier stages.
    ///
    /// When the digest exceeds the word budget only the last `budget_words`
    /// words are kept, prefixed with [`CONTEXT_ELISION_MARKER`].
    pub fn build(&self, responses: &StageResponses, current: Stage) -> String {
        let mut parts = vec![CONTEXT_HEADER.to_string()];

        for stage in self.relevant_stages(responses, current) {
            if let Some(response) = responses.get(&stage) {
                let summary = summarize_response(response, self.summary_chars);
                parts.push(format!("\n{}: {}", stage.label(), summary));
            }
        }

        let context = parts.join("\n");
        let words = word_count(&context);
        if words <= self.budget_words {
            return context;
        }

        debug!(
            stage = %current,
            words,
            budget = self.budget_words,
            "Context digest over budget, keeping most recent words"
        );
        format!(
            "{} {}",
            CONTEXT_ELISION_MARKER,
            last_words(&context, self.budget_words)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses(stages: &[(Stage, &str)]) -> StageResponses {
        stages
            .iter()
            .map(|(stage, text)| (*stage, text.to_string()))
            .collect()
    }

    #[test]
    fn test_uses_static_relevance() {
        let budgeter = ContextBudgeter::new(1500, 300);
        let r = responses(&[
            (Stage::Comprehend, "Situation text"),
            (Stage::Identify, "Customer text"),
            (Stage::Report, "Needs text"),
        ]);
        let context = budgeter.build(&r, Stage::Cut);
        assert!(context.starts_with(CONTEXT_HEADER));
        assert!(context.contains("Report The Customers Needs: Needs text"));
        assert!(!context.contains("Situation text"));
        assert!(!context.contains("Customer text"));
    }

    #[test]
    fn test_fallback_to_two_most_recent() {
        let budgeter = ContextBudgeter::new(1500, 300);
        let r = responses(&[
            (Stage::Comprehend, "one"),
            (Stage::Identify, "two"),
            (Stage::Report, "three"),
        ]);
        assert_eq!(
            budgeter.relevant_stages(&r, Stage::Comprehend),
            vec![Stage::Identify, Stage::Report]
        );
    }

    #[test]
    fn test_missing_relevant_responses_are_skipped() {
        let budgeter = ContextBudgeter::new(1500, 300);
        let context = budgeter.build(&StageResponses::new(), Stage::Summarize);
        assert_eq!(context, CONTEXT_HEADER);
    }

    #[test]
    fn test_over_budget_keeps_tail_with_marker() {
        let budgeter = ContextBudgeter::new(20, 10_000);
        let long = (0..200).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let r = responses(&[(Stage::Comprehend, long.as_str())]);
        let context = budgeter.build(&r, Stage::Identify);
        assert!(context.starts_with(CONTEXT_ELISION_MARKER));
        assert!(context.ends_with("w199"));
        assert_eq!(word_count(&context), 20 + 1);
    }

    #[test]
    fn test_word_count_bounded_for_any_budget() {
        let big = "- key point about the market\n".repeat(300);
        let r = responses(&[
            (Stage::Cut, big.as_str()),
            (Stage::List, big.as_str()),
            (Stage::Evaluate, big.as_str()),
        ]);
        for budget in [1, 5, 50, 200, 1500] {
            let budgeter = ContextBudgeter::new(budget, 2000);
            let context = budgeter.build(&r, Stage::Summarize);
            let marker_words = word_count(CONTEXT_ELISION_MARKER);
            assert!(word_count(&context) <= budget + marker_words);
        }
    }
}
