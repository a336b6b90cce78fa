//! Named insights pulled from the stage responses.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::sections::{create_summary, extract_section};
use crate::stage::{Stage, StageResponses, is_failure_marker};

/// Characters targeted by whole-response summaries.
const SUMMARY_MAX_CHARS: usize = 400;

/// Every insight the document assembler can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKey {
    SituationAnalysis,
    MarketContext,
    BusinessContext,
    TechnicalContext,
    CustomerIdentification,
    CustomerSegments,
    CustomerContext,
    FunctionalNeeds,
    NonFunctionalNeeds,
    BusinessGoals,
    CustomerNeedsSummary,
    MvpDefinition,
    PriorityFeatures,
    OptionalFeatures,
    SolutionOptions,
    RiskMitigation,
    PerformanceTargets,
    RecommendationsSummary,
    SuccessMetrics,
    ImplementationPhases,
    PerformanceNeeds,
    SecurityNeeds,
    ScalabilityNeeds,
    OutOfScope,
    AcceptanceCriteria,
    Timeline,
    ResourceRequirements,
    MonitoringStrategy,
    FeedbackMechanisms,
    FutureEnhancements,
    SuccessReview,
    Attachments,
}

impl InsightKey {
    pub const ALL: [InsightKey; 32] = [
        InsightKey::SituationAnalysis,
        InsightKey::MarketContext,
        InsightKey::BusinessContext,
        InsightKey::TechnicalContext,
        InsightKey::CustomerIdentification,
        InsightKey::CustomerSegments,
        InsightKey::CustomerContext,
        InsightKey::FunctionalNeeds,
        InsightKey::NonFunctionalNeeds,
        InsightKey::BusinessGoals,
        InsightKey::CustomerNeedsSummary,
        InsightKey::MvpDefinition,
        InsightKey::PriorityFeatures,
        InsightKey::OptionalFeatures,
        InsightKey::SolutionOptions,
        InsightKey::RiskMitigation,
        InsightKey::PerformanceTargets,
        InsightKey::RecommendationsSummary,
        InsightKey::SuccessMetrics,
        InsightKey::ImplementationPhases,
        InsightKey::PerformanceNeeds,
        InsightKey::SecurityNeeds,
        InsightKey::ScalabilityNeeds,
        InsightKey::OutOfScope,
        InsightKey::AcceptanceCriteria,
        InsightKey::Timeline,
        InsightKey::ResourceRequirements,
        InsightKey::MonitoringStrategy,
        InsightKey::FeedbackMechanisms,
        InsightKey::FutureEnhancements,
        InsightKey::SuccessReview,
        InsightKey::Attachments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InsightKey::SituationAnalysis => "situation_analysis",
            InsightKey::MarketContext => "market_context",
            InsightKey::BusinessContext => "business_context",
            InsightKey::TechnicalContext => "technical_context",
            InsightKey::CustomerIdentification => "customer_identification",
            InsightKey::CustomerSegments => "customer_segments",
            InsightKey::CustomerContext => "customer_context",
            InsightKey::FunctionalNeeds => "functional_needs",
            InsightKey::NonFunctionalNeeds => "non_functional_needs",
            InsightKey::BusinessGoals => "business_goals",
            InsightKey::CustomerNeedsSummary => "customer_needs_summary",
            InsightKey::MvpDefinition => "mvp_definition",
            InsightKey::PriorityFeatures => "priority_features",
            InsightKey::OptionalFeatures => "optional_features",
            InsightKey::SolutionOptions => "solution_options",
            InsightKey::RiskMitigation => "risk_mitigation",
            InsightKey::PerformanceTargets => "performance_targets",
            InsightKey::RecommendationsSummary => "recommendations_summary",
            InsightKey::SuccessMetrics => "success_metrics",
            InsightKey::ImplementationPhases => "implementation_phases",
            InsightKey::PerformanceNeeds => "performance_needs",
            InsightKey::SecurityNeeds => "security_needs",
            InsightKey::ScalabilityNeeds => "scalability_needs",
            InsightKey::OutOfScope => "out_of_scope",
            InsightKey::AcceptanceCriteria => "acceptance_criteria",
            InsightKey::Timeline => "timeline",
            InsightKey::ResourceRequirements => "resource_requirements",
            InsightKey::MonitoringStrategy => "monitoring_strategy",
            InsightKey::FeedbackMechanisms => "feedback_mechanisms",
            InsightKey::FutureEnhancements => "future_enhancements",
            InsightKey::SuccessReview => "success_review",
            InsightKey::Attachments => "attachments",
        }
    }

    /// Human-readable placeholder used until extraction fills the key.
    pub fn default_text(self) -> &'static str {
        match self {
            InsightKey::SituationAnalysis => "To be analyzed based on product description",
            InsightKey::MarketContext => "Market and competitive analysis needed",
            InsightKey::BusinessContext => "Business objectives and goals",
            InsightKey::TechnicalContext => "Technical requirements and constraints",
            InsightKey::CustomerIdentification => "Target customer segments and personas",
            InsightKey::CustomerSegments => "Primary and secondary user groups",
            InsightKey::CustomerContext => "User scenarios and use cases",
            InsightKey::FunctionalNeeds => "Core product functionality",
            InsightKey::NonFunctionalNeeds => "Performance, security, and scalability needs",
            InsightKey::BusinessGoals => "Key business objectives and success metrics",
            InsightKey::CustomerNeedsSummary => "Primary business objectives and user needs",
            InsightKey::MvpDefinition => "Minimum viable product scope",
            InsightKey::PriorityFeatures => "High priority features to be confirmed",
            InsightKey::OptionalFeatures => "Future enhancements and nice-to-have features",
            InsightKey::SolutionOptions => "Solution options to be explored",
            InsightKey::RiskMitigation => "Identified risks and mitigation strategies",
            InsightKey::PerformanceTargets => "Quantifiable performance goals",
            InsightKey::RecommendationsSummary => "Long-term vision and outcomes",
            InsightKey::SuccessMetrics => "Key performance indicators and measurement criteria",
            InsightKey::ImplementationPhases => "Development timeline and milestones",
            InsightKey::PerformanceNeeds => "Speed, reliability, and capacity requirements",
            InsightKey::SecurityNeeds => "Data protection and access control",
            InsightKey::ScalabilityNeeds => "Growth and expansion capabilities",
            InsightKey::OutOfScope => "Features explicitly not included in current version",
            InsightKey::AcceptanceCriteria => "Specific testable requirements",
            InsightKey::Timeline => "Project schedule and key dates",
            InsightKey::ResourceRequirements => "Team and infrastructure needs",
            InsightKey::MonitoringStrategy => "Success tracking and performance monitoring",
            InsightKey::FeedbackMechanisms => "User feedback collection and analysis",
            InsightKey::FutureEnhancements => "Planned future improvements and features",
            InsightKey::SuccessReview => "Success criteria evaluation process",
            InsightKey::Attachments => "Supporting documents and references",
        }
    }
}

impl fmt::Display for InsightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an insight is derived from its source stage.
#[derive(Debug, Clone, Copy)]
enum Method {
    Section(&'static [&'static str]),
    Summary,
}

/// Extraction table: key, source stage, method.
const EXTRACTIONS: &[(InsightKey, Stage, Method)] = &[
    (
        InsightKey::SituationAnalysis,
        Stage::Comprehend,
        Method::Section(&["current state", "situation", "problem", "challenge"]),
    ),
    (
        InsightKey::MarketContext,
        Stage::Comprehend,
        Method::Section(&["market", "competitive", "industry", "external"]),
    ),
    (
        InsightKey::BusinessContext,
        Stage::Comprehend,
        Method::Section(&["business", "strategic", "goals", "objectives"]),
    ),
    (
        InsightKey::TechnicalContext,
        Stage::Comprehend,
        Method::Section(&["technical", "technology", "system", "platform"]),
    ),
    (
        InsightKey::CustomerIdentification,
        Stage::Identify,
        Method::Section(&["primary customer", "main user", "target user", "customer"]),
    ),
    (
        InsightKey::CustomerSegments,
        Stage::Identify,
        Method::Section(&["segment", "persona", "user type", "customer type"]),
    ),
    (
        InsightKey::CustomerContext,
        Stage::Identify,
        Method::Section(&["context", "workflow", "process", "environment"]),
    ),
    (
        InsightKey::FunctionalNeeds,
        Stage::Report,
        Method::Section(&["functional", "feature", "capability", "requirement"]),
    ),
    (
        InsightKey::NonFunctionalNeeds,
        Stage::Report,
        Method::Section(&["non-functional", "performance", "security", "scalability"]),
    ),
    (
        InsightKey::BusinessGoals,
        Stage::Report,
        Method::Section(&["business need", "business goal", "outcome", "value"]),
    ),
    (InsightKey::CustomerNeedsSummary, Stage::Report, Method::Summary),
    (
        InsightKey::MvpDefinition,
        Stage::Cut,
        Method::Section(&["mvp", "minimum viable", "core", "essential"]),
    ),
    (
        InsightKey::PriorityFeatures,
        Stage::Cut,
        Method::Section(&["must have", "high priority", "critical", "essential"]),
    ),
    (
        InsightKey::OptionalFeatures,
        Stage::Cut,
        Method::Section(&["nice to have", "optional", "future", "enhancement"]),
    ),
    (InsightKey::SolutionOptions, Stage::List, Method::Summary),
    (
        InsightKey::RiskMitigation,
        Stage::Evaluate,
        Method::Section(&["risk", "mitigation", "challenge", "concern"]),
    ),
    (
        InsightKey::PerformanceTargets,
        Stage::Evaluate,
        Method::Section(&["performance", "speed", "target", "metric"]),
    ),
    (InsightKey::RecommendationsSummary, Stage::Summarize, Method::Summary),
    (
        InsightKey::SuccessMetrics,
        Stage::Summarize,
        Method::Section(&["success", "metric", "measurement", "kpi"]),
    ),
    (
        InsightKey::ImplementationPhases,
        Stage::Summarize,
        Method::Section(&["implementation", "phase", "timeline", "roadmap"]),
    ),
];

/// Every [`InsightKey`] mapped to text. No key is ever missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightBundle {
    values: BTreeMap<InsightKey, String>,
}

impl Default for InsightBundle {
    fn default() -> Self {
        Self {
            values: InsightKey::ALL
                .iter()
                .map(|key| (*key, key.default_text().to_string()))
                .collect(),
        }
    }
}

impl InsightBundle {
    pub fn get(&self, key: InsightKey) -> &str {
        self.values
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text())
    }

    pub fn set(&mut self, key: InsightKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.values.len()
    }
}

/// Source text for a stage. Missing stages and failure markers read as empty.
fn stage_text(responses: &StageResponses, stage: Stage) -> &str {
    match responses.get(&stage) {
        Some(text) if !is_failure_marker(text) => text,
        _ => "",
    }
}

/// Build the insight bundle from the stage responses.
pub fn extract_insights(responses: &StageResponses) -> InsightBundle {
    let mut bundle = InsightBundle::default();
    for (key, stage, method) in EXTRACTIONS {
        let text = stage_text(responses, *stage);
        let value = match method {
            Method::Section(keywords) => extract_section(text, keywords),
            Method::Summary => create_summary(text, SUMMARY_MAX_CHARS),
        };
        bundle.set(*key, value);
    }
    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::failure_marker;

    #[test]
    fn test_empty_responses_still_fill_every_key() {
        let bundle = extract_insights(&StageResponses::new());
        assert_eq!(bundle.len(), InsightKey::ALL.len());
        for key in InsightKey::ALL {
            assert!(!bundle.get(key).is_empty(), "{} empty", key);
        }
        assert_eq!(
            bundle.get(InsightKey::MvpDefinition),
            "Analysis needed for mvp, minimum viable, core, essential"
        );
        assert_eq!(bundle.get(InsightKey::SolutionOptions), "Analysis pending");
        assert_eq!(
            bundle.get(InsightKey::Timeline),
            InsightKey::Timeline.default_text()
        );
    }

    #[test]
    fn test_failure_markers_are_not_mined() {
        let mut responses = StageResponses::new();
        responses.insert(Stage::Cut, failure_marker("Rate limited: essential core mvp"));
        let bundle = extract_insights(&responses);
        assert!(
            bundle
                .get(InsightKey::MvpDefinition)
                .starts_with("Analysis needed for")
        );
    }

    #[test]
    fn test_extracts_from_the_right_stage() {
        let mut responses = StageResponses::new();
        responses.insert(
            Stage::Evaluate,
            "**Risks and Mitigation**\nSupplier delays could break delivery promises; keep two suppliers per region.\n**Next**".to_string(),
        );
        let bundle = extract_insights(&responses);
        assert!(bundle.get(InsightKey::RiskMitigation).contains("two suppliers"));
        assert!(!bundle.get(InsightKey::MarketContext).contains("two suppliers"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let mut responses = StageResponses::new();
        for stage in Stage::ALL {
            responses.insert(stage, format!("**{}**\n- point about {} and the core market", stage.title(), stage));
        }
        assert_eq!(extract_insights(&responses), extract_insights(&responses));
    }

    #[test]
    fn test_names_are_snake_case() {
        assert_eq!(InsightKey::NonFunctionalNeeds.name(), "non_functional_needs");
        let json = serde_json::to_string(&InsightKey::OutOfScope).unwrap();
        assert_eq!(json, "\"out_of_scope\"");
    }
}
