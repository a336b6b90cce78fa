//! Document assembly
//!
//! Turns the seven stage responses into the final document. Modes are tried
//! in order until one produces text:
//!
//! 1. **Direct**: one completion call fills the template from the capped
//!    stage analysis. Skipped when the prompt estimate is over the threshold.
//! 2. **Substitution**: insights and synthesized tables are substituted into
//!    the template locally.
//! 3. **Simple**: the completion service writes a plain seven-section
//!    document from the raw responses (template missing or incomplete).
//! 4. **Local**: the raw responses stitched together without a model call.

mod appendix;
mod template;

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{error, info, warn};

pub use appendix::{APPENDIX_STAGE_CHARS, render_appendix};
pub use template::{TemplateVariables, remaining_placeholders, render};

use crate::catalog::{DOCUMENT_TEMPLATE_PROMPT, PromptCatalog};
use crate::completion::ResilientInvoker;
use crate::context::PRODUCT_IDEA_PREFIX;
use crate::errors::TemplateError;
use crate::extract::{
    InsightBundle, InsightKey, extract_insights, personas_table, prioritization_table,
    requirements_table, stakeholder_table,
};
use crate::stage::{Stage, StageResponses};
use crate::tokens::{clip_with_ellipsis, estimate_tokens};

/// Heading of the template section the appendix is placed under.
pub const ATTACHMENTS_HEADING: &str = "## 📎 Attachments";

/// Heading used when the document has no attachments section.
pub const APPENDIX_HEADING: &str = "## 📚 CIRCLES Framework Analysis";

pub const DOCUMENT_VERSION: &str = "1.0";
pub const DOCUMENT_STATUS: &str = "Draft - In Review";

/// Everything assembly needs from one generation run.
#[derive(Debug, Clone)]
pub struct AssemblyInput<'a> {
    pub product_idea: &'a str,
    pub responses: &'a StageResponses,
    /// Template description, empty when the template is unknown
    pub template_meta: &'a str,
    pub session_id: &'a str,
    pub include_appendix: bool,
    pub generated_at: DateTime<Local>,
}

impl AssemblyInput<'_> {
    fn generation_date(&self) -> String {
        self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Which mode produced the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyMode {
    Direct,
    Substitution,
    Simple,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub text: String,
    pub mode: AssemblyMode,
}

/// Builds the final document from stage responses.
#[derive(Clone)]
pub struct DocumentAssembler {
    invoker: ResilientInvoker,
    prompts: Arc<dyn PromptCatalog>,
    /// Direct prompts estimated above this go straight to substitution
    direct_threshold: usize,
}

impl DocumentAssembler {
    pub fn new(
        invoker: ResilientInvoker,
        prompts: Arc<dyn PromptCatalog>,
        direct_threshold: usize,
    ) -> Self {
        Self {
            invoker,
            prompts,
            direct_threshold,
        }
    }

    /// Assemble the document. Always yields text; every failure falls through
    /// to the next mode.
    pub async fn assemble(&self, input: &AssemblyInput<'_>) -> AssembledDocument {
        let template = match self.prompts.load_prompt(DOCUMENT_TEMPLATE_PROMPT) {
            Ok(template) => template,
            Err(e) => {
                error!(error = %e, "Could not load document template");
                return self.simple(input).await;
            }
        };

        let prompt = direct_prompt(input.product_idea, input.responses, &template);
        let estimated = estimate_tokens(&prompt);
        if estimated > self.direct_threshold as f64 {
            info!(
                estimated = estimated as u64,
                threshold = self.direct_threshold,
                "Direct prompt too large, using template substitution"
            );
            return self.substitute(input, &template).await;
        }

        match self.invoker.invoke(&prompt).await {
            Ok(text) if !text.is_empty() => {
                info!(mode = "direct", "Document assembled");
                AssembledDocument {
                    text: self.finish_direct(input, text),
                    mode: AssemblyMode::Direct,
                }
            }
            Ok(_) => {
                warn!("Direct generation returned no text, using template substitution");
                self.substitute(input, &template).await
            }
            Err(e) => {
                error!(error = %e, "Direct generation failed, using template substitution");
                self.substitute(input, &template).await
            }
        }
    }

    /// Fill stale metadata placeholders and attach the appendix.
    fn finish_direct(&self, input: &AssemblyInput<'_>, text: String) -> String {
        let mut document = text
            .replace("{generation_date}", &input.generation_date())
            .replace("{session_id}", input.session_id)
            .replace("{document_version}", DOCUMENT_VERSION);

        if input.include_appendix {
            let appendix = render_appendix(input.responses, self.invoker.model(), input.template_meta);
            if document.contains(ATTACHMENTS_HEADING) {
                document = document.replacen(
                    ATTACHMENTS_HEADING,
                    &format!("{}\n\n{}", ATTACHMENTS_HEADING, appendix),
                    1,
                );
            } else {
                document.push_str(&format!("\n\n---\n\n{}\n\n{}", APPENDIX_HEADING, appendix));
            }
        }
        document
    }

    async fn substitute(&self, input: &AssemblyInput<'_>, template: &str) -> AssembledDocument {
        let insights = extract_insights(input.responses);
        let appendix = input
            .include_appendix
            .then(|| render_appendix(input.responses, self.invoker.model(), input.template_meta));
        let variables = template_variables(input, &insights, appendix);

        match render(template, &variables) {
            Ok(text) => {
                info!(mode = "substitution", "Document assembled");
                AssembledDocument {
                    text,
                    mode: AssemblyMode::Substitution,
                }
            }
            Err(TemplateError::MissingPlaceholder(name)) => {
                warn!(placeholder = %name, "Template variable missing, using simple document");
                self.simple(input).await
            }
        }
    }

    async fn simple(&self, input: &AssemblyInput<'_>) -> AssembledDocument {
        let prompt = simple_prompt(input.product_idea, input.responses);
        match self.invoker.invoke(&prompt).await {
            Ok(text) if !text.is_empty() => {
                info!(mode = "simple", "Document assembled");
                AssembledDocument {
                    text,
                    mode: AssemblyMode::Simple,
                }
            }
            Ok(_) | Err(_) => {
                error!("Simple generation failed, composing document locally");
                AssembledDocument {
                    text: local_document(input.product_idea, input.responses),
                    mode: AssemblyMode::Local,
                }
            }
        }
    }
}

/// Stage heading used in the direct prompt.
fn stage_heading(stage: Stage) -> String {
    let icon = match stage {
        Stage::Comprehend => "🔍",
        Stage::Identify => "👥",
        Stage::Report => "📋",
        Stage::Cut => "🎯",
        Stage::List => "💡",
        Stage::Evaluate => "⚖️",
        Stage::Summarize => "🏆",
    };
    format!("{} {}. {}", icon, stage.position(), stage.title())
}

/// Stage responses capped to [`APPENDIX_STAGE_CHARS`] each, under stage headings.
pub fn format_analysis(responses: &StageResponses) -> String {
    responses
        .iter()
        .map(|(stage, text)| {
            format!(
                "\n### {}\n{}\n\n",
                stage_heading(*stage),
                clip_with_ellipsis(text, APPENDIX_STAGE_CHARS)
            )
        })
        .collect()
}

/// Single-call prompt asking the model to populate the whole template.
pub fn direct_prompt(product_idea: &str, responses: &StageResponses, template: &str) -> String {
    format!(
        "{prefix} {idea}

Based on the comprehensive CIRCLES framework analysis below, generate a complete, professional Product Requirements Document using the provided template structure.

=== CIRCLES FRAMEWORK ANALYSIS ===
{analysis}

=== PRD TEMPLATE TO POPULATE ===
{template}

=== INSTRUCTIONS ===
Please provide a complete, professional PRD by:

1. **Populate ALL template placeholders** with relevant content from the CIRCLES analysis
2. **Generate professional tables** with real, business-relevant data (not placeholder text)
3. **Use structured formatting** with proper headers, bullets, and professional presentation
4. **Create comprehensive content** that reflects enterprise-grade business analysis
5. **Include realistic data** in all tables (requirements, personas, stakeholders, metrics, etc.)

**Table Requirements:**
- Requirements table: Include 8-12 realistic requirements with proper REQ-IDs, user stories, acceptance criteria
- Personas table: Create 3-5 detailed customer personas with demographics, goals, pain points
- Stakeholder matrix: Include 5-8 key stakeholders with roles, influence levels, concerns
- Success metrics: Define measurable KPIs with targets and measurement methods
- All other tables: Populate with realistic, professional content

**Formatting Standards:**
- Use proper markdown formatting with headers, tables, lists
- Professional business language throughout
- Clear, actionable content in all sections
- Comprehensive but concise descriptions

Generate the complete PRD document now:",
        prefix = PRODUCT_IDEA_PREFIX,
        idea = product_idea,
        analysis = format_analysis(responses),
        template = template,
    )
}

/// Prompt for a plain seven-section document built from the raw responses.
pub fn simple_prompt(product_idea: &str, responses: &StageResponses) -> String {
    let analysis = serde_json::to_string_pretty(responses).unwrap_or_else(|_| {
        responses
            .iter()
            .map(|(stage, text)| format!("{}: {}", stage, text))
            .collect::<Vec<_>>()
            .join("\n\n")
    });
    format!(
        "Based on the product idea: {}

And the following CIRCLES framework analysis:

{}

Generate a comprehensive Product Requirements Document with the following structure:

1. Executive Summary
2. Problem Statement
3. Target Customers
4. Requirements (Functional & Non-functional)
5. Success Metrics
6. Implementation Plan
7. Risks and Mitigation

Please provide a detailed, professional PRD document.",
        product_idea, analysis
    )
}

/// Document composed without any model call.
pub fn local_document(product_idea: &str, responses: &StageResponses) -> String {
    let mut doc = format!(
        "# Product Requirements Document\n\n**{}** {}\n\n",
        PRODUCT_IDEA_PREFIX, product_idea
    );
    for stage in Stage::ALL {
        let text = responses
            .get(&stage)
            .map(String::as_str)
            .unwrap_or("Analysis not available");
        doc.push_str(&format!(
            "## {}. {}\n\n{}\n\n",
            stage.position(),
            stage.title(),
            text
        ));
    }
    doc
}

/// Values for every placeholder in the document template.
pub fn template_variables(
    input: &AssemblyInput<'_>,
    insights: &InsightBundle,
    appendix: Option<String>,
) -> TemplateVariables {
    let get = |key: InsightKey| insights.get(key).to_string();
    let template_id = if input.template_meta.trim().is_empty() {
        "standard".to_string()
    } else {
        input.template_meta.to_string()
    };

    let mut vars = TemplateVariables::new();
    vars.insert("product_name", input.product_idea.to_string());
    vars.insert("product_idea", input.product_idea.to_string());
    vars.insert("situation_context", get(InsightKey::SituationAnalysis));
    vars.insert("background_analysis", get(InsightKey::MarketContext));
    vars.insert("market_context", get(InsightKey::MarketContext));
    vars.insert("business_context", get(InsightKey::BusinessContext));
    vars.insert("technical_context", get(InsightKey::TechnicalContext));
    vars.insert("intent_statement", get(InsightKey::CustomerNeedsSummary));
    vars.insert("customer_description", get(InsightKey::CustomerIdentification));
    vars.insert("customer_segments", get(InsightKey::CustomerSegments));
    vars.insert("customer_context", get(InsightKey::CustomerContext));
    vars.insert("business_goals", get(InsightKey::BusinessGoals));
    vars.insert("success_vision", get(InsightKey::RecommendationsSummary));
    vars.insert("functional_requirements", get(InsightKey::FunctionalNeeds));
    vars.insert("requirements_table_rows", requirements_table(insights));
    vars.insert("customer_personas_table", personas_table(insights));
    vars.insert("stakeholder_matrix_table", stakeholder_table(insights));
    vars.insert("feature_prioritization_table", prioritization_table(insights));
    vars.insert("non_functional_requirements", get(InsightKey::NonFunctionalNeeds));
    vars.insert("performance_requirements", get(InsightKey::PerformanceNeeds));
    vars.insert("security_requirements", get(InsightKey::SecurityNeeds));
    vars.insert("scalability_requirements", get(InsightKey::ScalabilityNeeds));
    vars.insert("optional_features", get(InsightKey::OptionalFeatures));
    vars.insert("out_of_scope", get(InsightKey::OutOfScope));
    vars.insert("success_metrics", get(InsightKey::SuccessMetrics));
    vars.insert("acceptance_criteria", get(InsightKey::AcceptanceCriteria));
    vars.insert("performance_targets", get(InsightKey::PerformanceTargets));
    vars.insert("implementation_phases", get(InsightKey::ImplementationPhases));
    vars.insert("mvp_definition", get(InsightKey::MvpDefinition));
    vars.insert("timeline", get(InsightKey::Timeline));
    vars.insert("resource_requirements", get(InsightKey::ResourceRequirements));
    vars.insert("risk_mitigation", get(InsightKey::RiskMitigation));
    vars.insert("monitoring_strategy", get(InsightKey::MonitoringStrategy));
    vars.insert("feedback_mechanisms", get(InsightKey::FeedbackMechanisms));
    vars.insert("future_enhancements", get(InsightKey::FutureEnhancements));
    vars.insert("success_review", get(InsightKey::SuccessReview));
    vars.insert("attachments", get(InsightKey::Attachments));
    vars.insert("generation_date", input.generation_date());
    vars.insert("session_id", input.session_id.to_string());
    vars.insert("document_status", DOCUMENT_STATUS.to_string());
    vars.insert("document_version", DOCUMENT_VERSION.to_string());
    vars.insert(
        "edit_history_rows",
        format!(
            "| {} | {} | Initial Draft | PRD Agent - CIRCLES Framework |",
            DOCUMENT_VERSION,
            input.generated_at.format("%Y-%m-%d")
        ),
    );
    vars.insert(
        "reference_documents_rows",
        format!(
            "| {} | Product Specification | TBD | Generated from CIRCLES analysis |",
            DOCUMENT_VERSION
        ),
    );
    vars.insert("template_id", template_id);
    vars.insert("appendix_section", appendix.unwrap_or_default());
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EmbeddedCatalog;
    use crate::completion::{CompletionRequest, CompletionService, RetryPolicy};
    use crate::config::CompletionSection;
    use crate::errors::{CatalogError, CompletionError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(request.prompt);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Transport("script exhausted".into())))
        }
    }

    fn failing() -> Result<String, CompletionError> {
        Err(CompletionError::Service {
            status: 500,
            message: "down".into(),
        })
    }

    fn assembler(service: Arc<Scripted>, prompts: Arc<dyn PromptCatalog>) -> DocumentAssembler {
        let policy = RetryPolicy {
            max_attempts: 1,
            backoff_unit: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let invoker = ResilientInvoker::new(service, &CompletionSection::default(), policy);
        DocumentAssembler::new(invoker, prompts, 5500)
    }

    fn responses() -> StageResponses {
        Stage::ALL
            .into_iter()
            .map(|stage| (stage, format!("- Finding for {}", stage.title())))
            .collect()
    }

    fn input<'a>(responses: &'a StageResponses, include_appendix: bool) -> AssemblyInput<'a> {
        AssemblyInput {
            product_idea: "A subscription meal-kit delivery app",
            responses,
            template_meta: "",
            session_id: "session-1",
            include_appendix,
            generated_at: Local::now(),
        }
    }

    #[tokio::test]
    async fn test_direct_mode_post_processes() {
        let service = Scripted::new(vec![Ok(
            "# PRD\nSession {session_id} v{document_version}\n## 📎 Attachments\nnone".into(),
        )]);
        let responses = responses();
        let doc = assembler(service.clone(), Arc::new(EmbeddedCatalog))
            .assemble(&input(&responses, true))
            .await;

        assert_eq!(doc.mode, AssemblyMode::Direct);
        assert!(doc.text.contains("Session session-1 v1.0"));
        assert!(doc.text.contains("## 📎 Attachments\n\n\n---\n\n## 📋 Appendix"));
        let prompt = &service.prompts.lock().unwrap()[0];
        assert!(prompt.starts_with("Product Idea: A subscription meal-kit delivery app"));
        assert!(prompt.contains("### 🎯 4. Cut Through Prioritization"));
    }

    #[tokio::test]
    async fn test_direct_appendix_appended_without_attachments_heading() {
        let service = Scripted::new(vec![Ok("# PRD".into())]);
        let responses = responses();
        let doc = assembler(service, Arc::new(EmbeddedCatalog))
            .assemble(&input(&responses, true))
            .await;
        assert!(doc.text.starts_with("# PRD\n\n---\n\n## 📚 CIRCLES Framework Analysis"));
    }

    #[tokio::test]
    async fn test_failed_direct_call_falls_back_to_substitution() {
        let service = Scripted::new(vec![failing()]);
        let responses = responses();
        let doc = assembler(service, Arc::new(EmbeddedCatalog))
            .assemble(&input(&responses, false))
            .await;

        assert_eq!(doc.mode, AssemblyMode::Substitution);
        assert!(remaining_placeholders(&doc.text).is_empty());
        assert!(doc.text.contains("A subscription meal-kit delivery app"));
        assert!(doc.text.contains("| Product Owner | Business Lead |"));
    }

    #[tokio::test]
    async fn test_oversized_direct_prompt_skips_the_call() {
        let service = Scripted::new(vec![]);
        let responses = responses();
        let invoker = ResilientInvoker::new(
            service.clone(),
            &CompletionSection::default(),
            RetryPolicy::default(),
        );
        let doc = DocumentAssembler::new(invoker, Arc::new(EmbeddedCatalog), 10)
            .assemble(&input(&responses, false))
            .await;
        assert_eq!(doc.mode, AssemblyMode::Substitution);
        assert!(service.prompts.lock().unwrap().is_empty());
    }

    struct NoTemplate;

    impl PromptCatalog for NoTemplate {
        fn load_prompt(&self, name: &str) -> Result<String, CatalogError> {
            Err(CatalogError::PromptNotFound {
                name: name.to_string(),
            })
        }
    }

    struct Fixed(&'static str);

    impl PromptCatalog for Fixed {
        fn load_prompt(&self, _name: &str) -> Result<String, CatalogError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_missing_template_uses_simple_document() {
        let service = Scripted::new(vec![Ok("# Simple PRD".into())]);
        let responses = responses();
        let doc = assembler(service.clone(), Arc::new(NoTemplate))
            .assemble(&input(&responses, false))
            .await;

        assert_eq!(doc.mode, AssemblyMode::Simple);
        assert_eq!(doc.text, "# Simple PRD");
        let prompt = &service.prompts.lock().unwrap()[0];
        assert!(prompt.contains("\"circles_list_solutions\": \"- Finding for List Solutions\""));
    }

    #[tokio::test]
    async fn test_missing_placeholder_falls_back_to_simple_then_local() {
        let service = Scripted::new(vec![failing(), failing()]);
        let responses = responses();
        let doc = assembler(service, Arc::new(Fixed("# {product_name} {unknown_field}")))
            .assemble(&input(&responses, false))
            .await;

        assert_eq!(doc.mode, AssemblyMode::Local);
        assert!(doc.text.contains("## 7. Summarize Recommendations"));
        assert!(doc.text.contains("- Finding for Evaluate Trade-offs"));
    }

    #[test]
    fn test_substitution_leaves_no_placeholders() {
        let template = EmbeddedCatalog.load_prompt(DOCUMENT_TEMPLATE_PROMPT).unwrap();
        let responses = StageResponses::new();
        let input = input(&responses, true);
        let vars = template_variables(&input, &InsightBundle::default(), Some("APPENDIX".into()));
        let out = render(&template, &vars).unwrap();
        assert!(remaining_placeholders(&out).is_empty());
        assert!(out.contains("APPENDIX"));
        assert!(out.contains("Draft - In Review"));
    }

    #[test]
    fn test_format_analysis_caps_each_stage() {
        let mut responses = StageResponses::new();
        responses.insert(Stage::Report, "y".repeat(900));
        let formatted = format_analysis(&responses);
        assert!(formatted.starts_with("\n### 📋 3. Report Customer Needs\n"));
        assert!(formatted.contains(&format!("{}...", "y".repeat(800))));
        assert!(!formatted.contains(&"y".repeat(801)));
    }
}
