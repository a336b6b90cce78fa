//! Resilient completion invocation.
//!
//! One policy object owns the three escalation tiers applied around every
//! completion call:
//!
//! 1. Pre-flight: prompts near the request ceiling are soft-truncated and the
//!    output budget is capped.
//! 2. Size-limit failures: the prompt is hard-truncated and retried; once the
//!    attempts run out a degraded placeholder is returned instead of an error.
//! 3. Rate limiting: linear backoff, then the failure propagates.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::{CompletionRequest, CompletionService};
use crate::config::{BudgetSection, CompletionSection};
use crate::context::{hard_truncate, soft_truncate};
use crate::errors::{CompletionError, FailureKind};
use crate::tokens::{clip_chars, estimate_tokens};

/// Opening sentence of the placeholder returned after exhausted size retries.
pub const DEGRADED_RESPONSE_PREFIX: &str =
    "Analysis incomplete due to context size limitations.";

/// Characters of the prompt quoted in a degraded response.
const DEGRADED_EXCERPT_CHARS: usize = 200;

/// Thresholds and attempt limits for [`ResilientInvoker`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Prompts above this estimate are soft-truncated before sending
    pub preflight_threshold: usize,
    /// Soft truncation target
    pub soft_budget: usize,
    /// Hard truncation target after a size-limit failure
    pub emergency_budget: usize,
    /// Combined request + response ceiling
    pub request_ceiling: usize,
    pub min_output_tokens: u32,
    /// Output cap after pre-flight truncation
    pub degraded_output_tokens: u32,
    /// Unit of the linear rate-limit backoff
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn from_budget(budget: &BudgetSection) -> Self {
        Self {
            max_attempts: budget.max_attempts,
            preflight_threshold: budget.preflight_threshold,
            soft_budget: budget.soft_budget,
            emergency_budget: budget.emergency_budget,
            request_ceiling: budget.request_ceiling,
            min_output_tokens: budget.min_output_tokens,
            degraded_output_tokens: budget.degraded_output_tokens,
            backoff_unit: budget.backoff_unit(),
        }
    }

    /// Sleep before the retry that follows the 0-based `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * ((attempt + 1) * 2)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_budget(&BudgetSection::default())
    }
}

/// Wraps a [`CompletionService`] with the retry and truncation policy.
#[derive(Clone)]
pub struct ResilientInvoker {
    service: Arc<dyn CompletionService>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    policy: RetryPolicy,
}

impl ResilientInvoker {
    pub fn new(
        service: Arc<dyn CompletionService>,
        settings: &CompletionSection,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            policy,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Output budget for a prompt of `estimated` tokens:
    /// `min(max_tokens, max(min_output, ceiling - estimated))`.
    pub fn output_budget(&self, estimated: f64) -> u32 {
        let headroom = (self.policy.request_ceiling as f64 - estimated).max(0.0) as u32;
        self.max_tokens
            .min(headroom.max(self.policy.min_output_tokens))
    }

    /// Send `prompt`, escalating through the policy tiers on failure.
    ///
    /// Returns the trimmed response text, a degraded placeholder when the
    /// prompt stayed too large on every attempt, or the last error for rate
    /// limiting and other failures.
    pub async fn invoke(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut prompt = prompt.to_string();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let is_last = attempt + 1 == max_attempts;

            let mut estimated = estimate_tokens(&prompt);
            let mut max_tokens = self.output_budget(estimated);
            if estimated > self.policy.preflight_threshold as f64 {
                warn!(
                    estimated = estimated as u64,
                    budget = self.policy.soft_budget,
                    "Large prompt detected, truncating before send"
                );
                prompt = soft_truncate(&prompt, self.policy.soft_budget);
                estimated = estimate_tokens(&prompt);
                max_tokens = self
                    .output_budget(estimated)
                    .min(self.policy.degraded_output_tokens);
            }

            let request = CompletionRequest {
                model: self.model.clone(),
                temperature: self.temperature,
                max_tokens,
                prompt: prompt.clone(),
            };
            debug!(
                attempt = attempt + 1,
                estimated = estimated as u64,
                max_tokens,
                "Sending completion request"
            );

            let err = match self.service.complete(request).await {
                Ok(text) => return Ok(text.trim().to_string()),
                Err(err) => err,
            };

            match err.kind() {
                FailureKind::RequestTooLarge if !is_last => {
                    warn!(
                        attempt = attempt + 1,
                        budget = self.policy.emergency_budget,
                        "Request too large, retrying with emergency truncation"
                    );
                    prompt = hard_truncate(&prompt, self.policy.emergency_budget);
                }
                FailureKind::RequestTooLarge => {
                    error!(
                        attempts = max_attempts,
                        "Final attempt failed due to size limits, returning degraded response"
                    );
                    return Ok(degraded_response(&prompt));
                }
                FailureKind::RateLimited if !is_last => {
                    let wait = self.policy.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                FailureKind::Other if !is_last => {
                    warn!(attempt = attempt + 1, error = %err, "Completion failed, retrying");
                }
                _ => {
                    error!(attempt = attempt + 1, error = %err, "Completion failed");
                    return Err(err);
                }
            }
        }

        // The final iteration always returns.
        Err(CompletionError::Transport("no completion attempts were made".into()))
    }
}

/// Placeholder used when every attempt was rejected as too large.
pub fn degraded_response(prompt: &str) -> String {
    format!(
        "{} Key points: {}...",
        DEGRADED_RESPONSE_PREFIX,
        clip_chars(prompt, DEGRADED_EXCERPT_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records every request.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, CompletionError>>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("default".into()))
        }
    }

    fn too_large() -> Result<String, CompletionError> {
        Err(CompletionError::RequestTooLarge {
            message: "413".into(),
        })
    }

    fn rate_limited() -> Result<String, CompletionError> {
        Err(CompletionError::RateLimited {
            message: "slow down".into(),
        })
    }

    fn invoker(service: Arc<Scripted>) -> ResilientInvoker {
        let policy = RetryPolicy {
            backoff_unit: Duration::ZERO,
            ..RetryPolicy::default()
        };
        ResilientInvoker::new(service, &CompletionSection::default(), policy)
    }

    fn long_prompt(words: usize) -> String {
        let body = (0..words).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        format!("Product Idea: Meal kits\n\n{}\n\nPlease provide an answer.", body)
    }

    #[tokio::test]
    async fn test_success_is_trimmed() {
        let service = Scripted::new(vec![Ok("\n  result text \n".into())]);
        let out = invoker(service.clone()).invoke("short prompt").await.unwrap();
        assert_eq!(out, "result text");
        assert_eq!(service.requests().len(), 1);
    }

    #[test]
    fn test_output_budget_formula() {
        let inv = invoker(Scripted::new(vec![]));
        assert_eq!(inv.output_budget(100.0), 5900);
        assert_eq!(inv.output_budget(5800.0), 500);
        assert_eq!(inv.output_budget(9000.0), 500);
        assert_eq!(inv.output_budget(0.0), 6000);
    }

    #[tokio::test]
    async fn test_preflight_truncates_and_caps_output() {
        let service = Scripted::new(vec![Ok("ok".into())]);
        invoker(service.clone())
            .invoke(&long_prompt(5000))
            .await
            .unwrap();
        let sent = &service.requests()[0];
        assert!(estimate_tokens(&sent.prompt) <= 4000.0);
        assert!(sent.prompt.contains("Product Idea: Meal kits"));
        assert!(sent.max_tokens <= 1500);
    }

    #[tokio::test]
    async fn test_size_failure_hard_truncates_then_succeeds() {
        let service = Scripted::new(vec![too_large(), Ok("recovered".into())]);
        let out = invoker(service.clone())
            .invoke(&long_prompt(3000))
            .await
            .unwrap();
        assert_eq!(out, "recovered");
        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert!(estimate_tokens(&requests[1].prompt) <= 2000.0);
    }

    #[tokio::test]
    async fn test_size_failure_exhausted_returns_degraded() {
        let service = Scripted::new(vec![too_large(), too_large(), too_large()]);
        let out = invoker(service.clone())
            .invoke("Product Idea: tiny prompt")
            .await
            .unwrap();
        assert!(out.starts_with(DEGRADED_RESPONSE_PREFIX));
        assert!(out.contains("Product Idea: tiny prompt"));
        assert_eq!(service.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_same_prompt() {
        let service = Scripted::new(vec![rate_limited(), Ok("done".into())]);
        let out = invoker(service.clone()).invoke("hello").await.unwrap();
        assert_eq!(out, "done");
        let requests = service.requests();
        assert_eq!(requests[0].prompt, requests[1].prompt);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausted_propagates() {
        let service = Scripted::new(vec![rate_limited(), rate_limited(), rate_limited()]);
        let err = invoker(service.clone()).invoke("hello").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::RateLimited);
        assert_eq!(service.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_other_failure_propagates_after_attempts() {
        let fail = || {
            Err(CompletionError::Service {
                status: 500,
                message: "boom".into(),
            })
        };
        let service = Scripted::new(vec![fail(), fail(), fail()]);
        let err = invoker(service.clone()).invoke("hello").await.unwrap_err();
        assert!(matches!(err, CompletionError::Service { status: 500, .. }));
        assert_eq!(service.requests().len(), 3);
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(2));
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
    }
}
