use std::sync::Arc;

use tracing::{error, info, warn};

use super::prompt::{ConversationContext, base_context, compose_stage_prompt};
use crate::catalog::PromptCatalog;
use crate::completion::ResilientInvoker;
use crate::config::BudgetSection;
use crate::context::{ContextBudgeter, soft_truncate};
use crate::errors::StageError;
use crate::stage::{Stage, StageResponses, failure_marker};
use crate::tokens::{estimate_tokens, word_count};

/// Runs the seven stages in order, feeding each one a digest of the earlier
/// stages it depends on.
#[derive(Clone)]
pub struct StageRunner {
    invoker: ResilientInvoker,
    prompts: Arc<dyn PromptCatalog>,
    budgeter: ContextBudgeter,
    /// Stage prompts above this estimate are soft-truncated
    prompt_threshold: usize,
    /// Soft truncation target
    soft_budget: usize,
}

impl StageRunner {
    pub fn new(
        invoker: ResilientInvoker,
        prompts: Arc<dyn PromptCatalog>,
        budget: &BudgetSection,
    ) -> Self {
        Self {
            invoker,
            prompts,
            budgeter: ContextBudgeter::new(budget.context_budget, budget.summary_length),
            prompt_threshold: budget.stage_prompt_threshold,
            soft_budget: budget.soft_budget,
        }
    }

    /// Run every stage and return the complete response bundle.
    ///
    /// A failing stage records a failure marker and the run moves on, so the
    /// result always holds an entry for each of the seven stages.
    /// `on_stage_complete` is called after each stage with its recorded text.
    pub async fn run_all<F>(
        &self,
        product_idea: &str,
        context: &ConversationContext,
        mut on_stage_complete: F,
    ) -> StageResponses
    where
        F: FnMut(Stage, &str),
    {
        let base = base_context(product_idea, context);
        let mut responses = StageResponses::new();

        info!("Starting CIRCLES stage execution");
        for stage in Stage::ALL {
            let response = match self.run_stage(stage, &base, &responses).await {
                Ok(text) => text,
                Err(e) => {
                    error!(stage = %stage, error = %e, "Stage failed, continuing");
                    failure_marker(&e.to_string())
                }
            };
            on_stage_complete(stage, &response);
            responses.insert(stage, response);
        }
        responses
    }

    /// Build the prompt for `stage` and invoke the completion service.
    pub async fn run_stage(
        &self,
        stage: Stage,
        base: &str,
        responses: &StageResponses,
    ) -> Result<String, StageError> {
        let prompt = self.build_prompt(stage, base, responses)?;
        let response = self.invoker.invoke(&prompt).await?;
        if response.is_empty() {
            return Err(StageError::EmptyResponse);
        }
        info!(
            stage = %stage,
            position = stage.position(),
            context_words = word_count(&prompt),
            "Completed stage"
        );
        Ok(response)
    }

    /// Compose the stage prompt, soft-truncating it when it runs over the
    /// stage threshold.
    pub fn build_prompt(
        &self,
        stage: Stage,
        base: &str,
        responses: &StageResponses,
    ) -> Result<String, StageError> {
        let instructions = self.prompts.load_prompt(&stage.prompt_name())?;
        let insights = if stage == Stage::Comprehend {
            String::new()
        } else {
            self.budgeter.build(responses, stage)
        };

        let prompt = compose_stage_prompt(base, &insights, &instructions);
        let estimated = estimate_tokens(&prompt);
        if estimated > self.prompt_threshold as f64 {
            warn!(
                stage = %stage,
                estimated = estimated as u64,
                "Stage prompt too large, applying soft truncation"
            );
            return Ok(soft_truncate(&prompt, self.soft_budget));
        }
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EmbeddedCatalog;
    use crate::completion::{CompletionRequest, CompletionService, RetryPolicy};
    use crate::config::CompletionSection;
    use crate::context::CONTEXT_HEADER;
    use crate::errors::{CatalogError, CompletionError};
    use crate::stage::is_failure_marker;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes a per-stage reply and fails whenever the prompt mentions `fail_on`.
    struct StageEcho {
        fail_on: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionService for StageEcho {
        async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if let Some(marker) = self.fail_on
                && request.prompt.contains(marker)
            {
                return Err(CompletionError::Service {
                    status: 500,
                    message: "stage exploded".into(),
                });
            }
            let n = self.prompts.lock().unwrap().len();
            Ok(format!("- Key finding number {} for this step", n))
        }
    }

    fn runner(service: Arc<StageEcho>) -> StageRunner {
        let policy = RetryPolicy {
            backoff_unit: std::time::Duration::ZERO,
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let invoker = ResilientInvoker::new(service, &CompletionSection::default(), policy);
        StageRunner::new(invoker, Arc::new(EmbeddedCatalog), &BudgetSection::default())
    }

    #[tokio::test]
    async fn test_all_stages_recorded_in_order() {
        let service = Arc::new(StageEcho {
            fail_on: None,
            prompts: Mutex::new(Vec::new()),
        });
        let mut seen = Vec::new();
        let responses = runner(service.clone())
            .run_all("Meal kits", &ConversationContext::new(), |stage, _| {
                seen.push(stage)
            })
            .await;

        assert_eq!(responses.len(), 7);
        assert_eq!(seen, Stage::ALL.to_vec());
        let prompts = service.prompts.lock().unwrap();
        assert!(!prompts[0].contains(CONTEXT_HEADER));
        assert!(prompts[1].contains(CONTEXT_HEADER));
        assert!(prompts[1].contains("Key finding number 1"));
        for prompt in prompts.iter() {
            assert!(prompt.starts_with("Product Idea: Meal kits"));
        }
    }

    #[tokio::test]
    async fn test_stage_failure_is_recorded_and_run_continues() {
        let service = Arc::new(StageEcho {
            fail_on: Some("step 3 of 7"),
            prompts: Mutex::new(Vec::new()),
        });
        let responses = runner(service)
            .run_all("Meal kits", &ConversationContext::new(), |_, _| {})
            .await;

        assert_eq!(responses.len(), 7);
        let report = &responses[&Stage::Report];
        assert!(is_failure_marker(report));
        assert!(report.contains("stage exploded"));
        assert!(!is_failure_marker(&responses[&Stage::Summarize]));
    }

    struct NoPrompts;

    impl PromptCatalog for NoPrompts {
        fn load_prompt(&self, name: &str) -> Result<String, CatalogError> {
            Err(CatalogError::PromptNotFound {
                name: name.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_missing_prompt_becomes_failure_marker() {
        let service = Arc::new(StageEcho {
            fail_on: None,
            prompts: Mutex::new(Vec::new()),
        });
        let invoker = ResilientInvoker::new(
            service.clone(),
            &CompletionSection::default(),
            RetryPolicy::default(),
        );
        let runner = StageRunner::new(invoker, Arc::new(NoPrompts), &BudgetSection::default());
        let responses = runner
            .run_all("Idea", &ConversationContext::new(), |_, _| {})
            .await;
        assert_eq!(responses.len(), 7);
        assert!(responses.values().all(|r| is_failure_marker(r)));
        assert!(service.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_oversized_prompt_is_soft_truncated() {
        let service = Arc::new(StageEcho {
            fail_on: None,
            prompts: Mutex::new(Vec::new()),
        });
        let runner = runner(service);
        let huge = "word ".repeat(6000);
        let base = format!("Product Idea: Big\n\nAdditional Context:\n- Notes: {}\n\n", huge);
        let prompt = runner
            .build_prompt(Stage::Comprehend, &base, &StageResponses::new())
            .unwrap();
        assert!(estimate_tokens(&prompt) <= 4000.0);
        assert!(prompt.contains("Product Idea: Big"));
    }
}
