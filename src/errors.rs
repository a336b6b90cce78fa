//! Typed error hierarchy for the PRD generator.
//!
//! One enum per subsystem:
//! - `ConfigError`: startup configuration failures (fatal)
//! - `CompletionError`: classified failures at the completion-service boundary
//! - `CatalogError`: prompt and template catalog lookups
//! - `StageError`: a single stage's failure, recorded inline
//! - `TemplateError`: placeholder substitution
//! - `AgentError`: failures surfaced by the generation entry point

use thiserror::Error;

/// Errors raised while building configuration or constructing the agent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing completion-service credential: set {env_var}")]
    MissingCredential { env_var: &'static str },

    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {message}")]
    ParseFailed {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid configuration in {path}: {message}")]
    InvalidFile {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure classes reported by the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    RequestTooLarge,
    Other,
}

/// Errors from a single completion request.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Rate limited by completion service: {message}")]
    RateLimited { message: String },

    #[error("Request too large for completion service: {message}")]
    RequestTooLarge { message: String },

    #[error("Completion service returned status {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Completion request failed: {0}")]
    Transport(String),

    #[error("Completion service returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    /// Failure class driving the retry policy.
    pub fn kind(&self) -> FailureKind {
        match self {
            CompletionError::RateLimited { .. } => FailureKind::RateLimited,
            CompletionError::RequestTooLarge { .. } => FailureKind::RequestTooLarge,
            CompletionError::Service { .. }
            | CompletionError::Transport(_)
            | CompletionError::InvalidResponse(_) => FailureKind::Other,
        }
    }
}

/// Errors from the prompt and template catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Prompt '{name}' not found")]
    PromptNotFound { name: String },

    #[error("Template '{id}' not found")]
    TemplateNotFound { id: String },

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template {path}: {message}")]
    InvalidTemplate {
        path: std::path::PathBuf,
        message: String,
    },
}

/// Errors from a single analysis stage. Recorded as a failure marker, never returned
/// from generation.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Prompt(#[from] CatalogError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Completion service returned an empty response")]
    EmptyResponse,
}

/// Errors from literal placeholder substitution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template placeholder '{{{0}}}' has no value")]
    MissingPlaceholder(String),
}

/// Errors surfaced by the generation entry point.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Product idea must not be empty")]
    EmptyProductIdea,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Generation limiter is closed")]
    LimiterClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_error_kinds_are_classified() {
        let rate = CompletionError::RateLimited {
            message: "slow down".into(),
        };
        let large = CompletionError::RequestTooLarge {
            message: "413".into(),
        };
        let other = CompletionError::Service {
            status: 500,
            message: "oops".into(),
        };
        assert_eq!(rate.kind(), FailureKind::RateLimited);
        assert_eq!(large.kind(), FailureKind::RequestTooLarge);
        assert_eq!(other.kind(), FailureKind::Other);
        assert_eq!(
            CompletionError::Transport("reset".into()).kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn missing_credential_names_env_var() {
        let err = ConfigError::MissingCredential {
            env_var: "GROQ_API_KEY",
        };
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn template_error_shows_braced_name() {
        let err = TemplateError::MissingPlaceholder("product_name".into());
        assert_eq!(
            err.to_string(),
            "Template placeholder '{product_name}' has no value"
        );
    }

    #[test]
    fn agent_error_converts_from_subsystems() {
        let err: AgentError = CatalogError::TemplateNotFound { id: "x".into() }.into();
        assert!(matches!(err, AgentError::Catalog(_)));
        let err: AgentError = ConfigError::Invalid("bad".into()).into();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ConfigError::Invalid("x".into()));
        assert_std_error(&CompletionError::Transport("x".into()));
        assert_std_error(&CatalogError::PromptNotFound { name: "x".into() });
        assert_std_error(&AgentError::EmptyProductIdea);
    }
}
