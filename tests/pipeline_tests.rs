//! End-to-end generation scenarios against in-process completion services.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use prd_forge::assemble::AssemblyMode;
use prd_forge::catalog::{EmbeddedCatalog, TemplateCatalog};
use prd_forge::completion::{CompletionRequest, CompletionService, DEGRADED_RESPONSE_PREFIX};
use prd_forge::config::PrdConfig;
use prd_forge::errors::CompletionError;
use prd_forge::orchestrator::ConversationContext;
use prd_forge::stage::{Stage, is_failure_marker};
use prd_forge::{GenerationRequest, PrdAgent};

const STAGE_RESPONSE: &str = "**Key Points**
- Busy parents need fast, healthy dinners
- Target market: dual-income households with children
- Must have weekly menu planning
- Success metric: 40% weekly retention
1. Launch in three cities
2. Partner with local farms
3. Measure churn every month";

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    AlwaysTooLarge,
    AlwaysFail,
    RateLimitedOnce,
}

struct FakeService {
    behavior: Behavior,
    prompts: Mutex<Vec<String>>,
}

impl FakeService {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeService {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt);
            prompts.len()
        };
        match self.behavior {
            Behavior::Succeed => Ok(STAGE_RESPONSE.to_string()),
            Behavior::AlwaysTooLarge => Err(CompletionError::RequestTooLarge {
                message: "Request too large for model".into(),
            }),
            Behavior::AlwaysFail => Err(CompletionError::Service {
                status: 500,
                message: "internal error".into(),
            }),
            Behavior::RateLimitedOnce if call == 1 => Err(CompletionError::RateLimited {
                message: "slow down".into(),
            }),
            Behavior::RateLimitedOnce => Ok(STAGE_RESPONSE.to_string()),
        }
    }
}

fn agent_with(service: Arc<FakeService>) -> PrdAgent {
    let mut config = PrdConfig::default();
    config.budget.backoff_unit_ms = 0;
    PrdAgent::new(
        config,
        service,
        Arc::new(EmbeddedCatalog),
        TemplateCatalog::builtin(),
    )
}

#[tokio::test]
async fn test_meal_kit_generation() {
    let service = FakeService::new(Behavior::Succeed);
    let agent = agent_with(service.clone());

    let result = agent
        .generate(GenerationRequest::new("Meal-kit subscription for busy parents").with_appendix(true))
        .await
        .unwrap();

    assert!(!result.prd_document.trim().is_empty());
    assert_eq!(result.assembly_mode, AssemblyMode::Direct);

    let analysis = &result.circles_analysis;
    assert_eq!(analysis.steps.len(), 7);
    assert!((0.0..=100.0).contains(&analysis.overall_coverage));
    assert_eq!(analysis.circles_responses.len(), 7);

    // Seven stage calls plus one assembly call
    let prompts = service.prompts();
    assert_eq!(prompts.len(), 8);
    assert!(prompts[0].starts_with("Product Idea: Meal-kit subscription for busy parents"));
    assert!(
        prompts
            .iter()
            .all(|p| p.contains("Meal-kit subscription for busy parents"))
    );
}

#[tokio::test]
async fn test_always_too_large_degrades_every_stage() {
    let service = FakeService::new(Behavior::AlwaysTooLarge);
    let agent = agent_with(service);

    let result = agent
        .generate(GenerationRequest::new("Meal kits").session_id("degraded"))
        .await
        .unwrap();

    let responses = &result.circles_analysis.circles_responses;
    assert_eq!(responses.len(), 7);
    for stage in Stage::ALL {
        assert!(
            responses[&stage].starts_with(DEGRADED_RESPONSE_PREFIX),
            "stage {} was not degraded",
            stage
        );
    }
    assert!(!result.prd_document.is_empty());
}

#[tokio::test]
async fn test_failing_service_still_produces_document() {
    let service = FakeService::new(Behavior::AlwaysFail);
    let agent = agent_with(service);

    let result = agent.generate(GenerationRequest::new("Meal kits")).await.unwrap();

    let responses = &result.circles_analysis.circles_responses;
    assert_eq!(responses.len(), 7);
    assert!(responses.values().all(|r| is_failure_marker(r)));
    assert_ne!(result.assembly_mode, AssemblyMode::Direct);
    assert!(result.prd_document.contains("Meal kits"));
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let service = FakeService::new(Behavior::RateLimitedOnce);
    let agent = agent_with(service.clone());

    let result = agent.generate(GenerationRequest::new("Meal kits")).await.unwrap();

    let responses = &result.circles_analysis.circles_responses;
    assert!(!responses.values().any(|r| is_failure_marker(r)));
    // The first stage needed a second attempt
    assert_eq!(service.prompts().len(), 9);
}

#[tokio::test]
async fn test_long_context_values_are_clipped_in_prompts() {
    let service = FakeService::new(Behavior::Succeed);
    let agent = agent_with(service.clone());

    let mut context = ConversationContext::new();
    context.insert("target_users".into(), json!("y".repeat(500)));
    context.insert("budget".into(), json!(25000));

    agent
        .generate(GenerationRequest::new("Meal kits").context(context))
        .await
        .unwrap();

    let first = &service.prompts()[0];
    assert!(first.contains(&format!("{}...", "y".repeat(200))));
    assert!(!first.contains(&"y".repeat(201)));
    assert!(first.contains("25000"));
}

#[tokio::test]
async fn test_concurrent_generations_get_separate_sessions() {
    let agent = Arc::new(agent_with(FakeService::new(Behavior::Succeed)));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let agent = agent.clone();
            tokio::spawn(async move {
                agent
                    .generate(GenerationRequest::new(format!("Idea {}", i)))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().session_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    for id in &ids {
        let session = agent.get_session(id).unwrap();
        assert!(session.is_complete());
        assert!(session.circles_analysis.is_some());
    }
}

#[tokio::test]
async fn test_generated_document_can_be_evaluated() {
    let agent = agent_with(FakeService::new(Behavior::Succeed));
    let result = agent.generate(GenerationRequest::new("Meal kits")).await.unwrap();

    let evaluation = agent.evaluate_document(&result.prd_document);
    assert!((0.0..=100.0).contains(&evaluation.overall_score));
    assert_eq!(evaluation.circles_coverage.len(), 7);
}
