//! Completion service boundary.
//!
//! The pipeline only ever sends one user message and reads back text. Any
//! provider that can do that implements [`CompletionService`]; the rest of the
//! crate never sees HTTP.

pub mod groq;
pub mod invoker;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::CompletionError;

pub use groq::GroqClient;
pub use invoker::{DEGRADED_RESPONSE_PREFIX, ResilientInvoker, RetryPolicy};

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// The single user message
    pub prompt: String,
}

/// Abstraction over the text-completion endpoint for testability.
/// Real implementation: `GroqClient`. Test doubles script their replies.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one request and return the generated text, or a classified failure.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
