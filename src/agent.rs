//! Generation entry point.
//!
//! [`PrdAgent`] is constructed once by the process entry point and owns every
//! collaborator: the stage runner, the document assembler, the catalogs and
//! the session registry. Concurrent generations are bounded by
//! `sessions.max_concurrent`.

use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assemble::{AssemblyInput, AssemblyMode, DocumentAssembler};
use crate::catalog::{
    DEFAULT_TEMPLATE_ID, LayeredCatalog, PromptCatalog, Question, Template, TemplateCatalog,
};
use crate::completion::{CompletionService, GroqClient, ResilientInvoker, RetryPolicy};
use crate::config::PrdConfig;
use crate::coverage::{CoverageReport, analyze_coverage};
use crate::errors::{AgentError, CatalogError};
use crate::evaluate::{Evaluation, QualityEvaluator};
use crate::orchestrator::{ConversationContext, StageRunner};
use crate::session::{Session, SessionStore};

/// Parameters of one generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub product_idea: String,
    pub template_id: String,
    pub conversation_context: ConversationContext,
    /// Generated when absent
    pub session_id: Option<String>,
    pub include_appendix: bool,
}

impl GenerationRequest {
    pub fn new(product_idea: impl Into<String>) -> Self {
        Self {
            product_idea: product_idea.into(),
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            conversation_context: ConversationContext::new(),
            session_id: None,
            include_appendix: false,
        }
    }

    pub fn template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = template_id.into();
        self
    }

    pub fn context(mut self, context: ConversationContext) -> Self {
        self.conversation_context = context;
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_appendix(mut self, include: bool) -> Self {
        self.include_appendix = include;
        self
    }
}

/// Immutable outcome of one generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub prd_document: String,
    pub circles_analysis: CoverageReport,
    /// RFC 3339 local time
    pub generation_timestamp: String,
    pub session_id: String,
    pub assembly_mode: AssemblyMode,
}

pub struct PrdAgent {
    config: PrdConfig,
    runner: StageRunner,
    assembler: DocumentAssembler,
    templates: TemplateCatalog,
    sessions: SessionStore,
    limiter: Semaphore,
    evaluator: QualityEvaluator,
}

impl PrdAgent {
    /// Build an agent around an existing completion service and catalogs.
    pub fn new(
        config: PrdConfig,
        service: Arc<dyn CompletionService>,
        prompts: Arc<dyn PromptCatalog>,
        templates: TemplateCatalog,
    ) -> Self {
        let invoker = ResilientInvoker::new(
            service,
            &config.completion,
            RetryPolicy::from_budget(&config.budget),
        );
        let runner = StageRunner::new(invoker.clone(), prompts.clone(), &config.budget);
        let assembler =
            DocumentAssembler::new(invoker, prompts, config.budget.direct_assembly_threshold);
        let permits = config.sessions.max_concurrent.clamp(1, Semaphore::MAX_PERMITS);
        if permits != config.sessions.max_concurrent {
            warn!(
                configured = config.sessions.max_concurrent,
                permits, "Concurrency limit out of range, clamping"
            );
        }
        let limiter = Semaphore::new(permits);

        Self {
            config,
            runner,
            assembler,
            templates,
            sessions: SessionStore::new(),
            limiter,
            evaluator: QualityEvaluator::new(),
        }
    }

    /// Build an agent talking to the configured HTTP completion service.
    ///
    /// Fails immediately when the credential is missing.
    pub fn from_config(config: PrdConfig) -> Result<Self, AgentError> {
        config.validate()?;
        let client = GroqClient::from_env(&config.completion)?;
        let prompts = LayeredCatalog::new(config.paths.prompts_dir.clone());
        let templates = TemplateCatalog::load(config.paths.templates_dir.as_deref())?;
        info!(model = %config.completion.model, "Completion client ready");
        Ok(Self::new(
            config,
            Arc::new(client),
            Arc::new(prompts),
            templates,
        ))
    }

    pub fn config(&self) -> &PrdConfig {
        &self.config
    }

    /// Run the seven stages, assemble the document and score its coverage.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, AgentError> {
        if request.product_idea.trim().is_empty() {
            return Err(AgentError::EmptyProductIdea);
        }
        match self.run_generation(request).await {
            Ok(result) => Ok(result),
            Err(e) => {
                error!(error = %e, "Error generating document");
                Err(e)
            }
        }
    }

    async fn run_generation(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, AgentError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| AgentError::LimiterClosed)?;

        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.sessions.insert_if_absent(Session::new(
            &session_id,
            &request.product_idea,
            &request.template_id,
            request.conversation_context.clone(),
        ));

        info!(session_id = %session_id, "Starting CIRCLES framework analysis");
        let responses = self
            .runner
            .run_all(
                &request.product_idea,
                &request.conversation_context,
                |stage, text| self.sessions.record_stage(&session_id, stage, text),
            )
            .await;
        self.sessions.set_responses(&session_id, &responses);

        let template_meta = match self.templates.get_template(&request.template_id) {
            Some(template) => template.description.clone(),
            None => {
                warn!(template_id = %request.template_id, "Unknown template, using standard metadata");
                String::new()
            }
        };

        let generated_at = Local::now();
        let assembled = self
            .assembler
            .assemble(&AssemblyInput {
                product_idea: &request.product_idea,
                responses: &responses,
                template_meta: &template_meta,
                session_id: &session_id,
                include_appendix: request.include_appendix,
                generated_at,
            })
            .await;

        let mut analysis = analyze_coverage(&assembled.text);
        analysis.circles_responses = responses;
        self.sessions.set_analysis(&session_id, analysis.clone());
        info!(
            session_id = %session_id,
            mode = ?assembled.mode,
            overall_coverage = analysis.overall_coverage,
            quality = %analysis.analysis_quality,
            "Generation complete"
        );

        Ok(GenerationResult {
            prd_document: assembled.text,
            circles_analysis: analysis,
            generation_timestamp: Local::now().to_rfc3339(),
            session_id,
            assembly_mode: assembled.mode,
        })
    }

    pub fn get_session(&self, id: &str) -> Option<Session> {
        self.sessions.get(id)
    }

    pub fn list_session_ids(&self) -> Vec<String> {
        self.sessions.list_ids()
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn template(&self, id: &str) -> Result<&Template, CatalogError> {
        self.templates
            .get_template(id)
            .ok_or_else(|| CatalogError::TemplateNotFound { id: id.to_string() })
    }

    pub fn questions(&self, template_id: &str) -> Vec<Question> {
        self.templates.generate_questions(template_id)
    }

    pub fn evaluate_document(&self, document: &str) -> Evaluation {
        self.evaluator.evaluate(document)
    }
}
