//! Layered configuration for the PRD generator.
//!
//! Settings are read from `prd-forge.toml` (every field has a default), then
//! overlaid by environment variables, then by CLI flags in the binary.
//!
//! # Configuration File Format
//!
//! ```toml
//! [completion]
//! base_url = "https://api.groq.com/openai/v1"
//! model = "llama-3.1-8b-instant"
//! temperature = 0.1
//! max_tokens = 8192
//! timeout_secs = 60
//!
//! [budget]
//! context_budget = 1500
//! stage_prompt_threshold = 4500
//! max_attempts = 3
//! backoff_unit_ms = 1000
//!
//! [sessions]
//! max_concurrent = 50
//!
//! [paths]
//! prompts_dir = "prompts"
//! templates_dir = "templates"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "prd-forge.toml";

/// Environment variable holding the completion-service credential.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
/// Environment variable overriding the model identifier.
pub const MODEL_ENV: &str = "GROQ_MODEL";
/// Environment variable overriding the service base URL.
pub const BASE_URL_ENV: &str = "GROQ_BASE_URL";

/// Completion-service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSection {
    /// OpenAI-compatible API root (the client appends `/chat/completions`)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on requested output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CompletionSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Size thresholds and retry policy, all in estimated tokens unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSection {
    /// Word budget for the prior-stage digest injected into a stage prompt
    #[serde(default = "default_context_budget")]
    pub context_budget: usize,
    /// Character budget for a single stage digest
    #[serde(default = "default_summary_length")]
    pub summary_length: usize,
    /// Stage prompts above this size are soft-truncated before sending
    #[serde(default = "default_stage_prompt_threshold")]
    pub stage_prompt_threshold: usize,
    /// Target size for soft truncation
    #[serde(default = "default_soft_budget")]
    pub soft_budget: usize,
    /// The invoker soft-truncates any prompt above this size
    #[serde(default = "default_preflight_threshold")]
    pub preflight_threshold: usize,
    /// Target size for hard truncation after a size-limit failure
    #[serde(default = "default_emergency_budget")]
    pub emergency_budget: usize,
    /// Combined request + response ceiling of the service
    #[serde(default = "default_request_ceiling")]
    pub request_ceiling: usize,
    /// Floor for the requested output size
    #[serde(default = "default_min_output_tokens")]
    pub min_output_tokens: u32,
    /// Output cap once a prompt had to be truncated pre-emptively
    #[serde(default = "default_degraded_output_tokens")]
    pub degraded_output_tokens: u32,
    /// Attempts per completion call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff unit for rate limiting, in milliseconds
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// Assembly switches from direct mode to substitution above this size
    #[serde(default = "default_direct_assembly_threshold")]
    pub direct_assembly_threshold: usize,
}

fn default_context_budget() -> usize {
    1500
}

fn default_summary_length() -> usize {
    300
}

fn default_stage_prompt_threshold() -> usize {
    4500
}

fn default_soft_budget() -> usize {
    4000
}

fn default_preflight_threshold() -> usize {
    5500
}

fn default_emergency_budget() -> usize {
    2000
}

fn default_request_ceiling() -> usize {
    6000
}

fn default_min_output_tokens() -> u32 {
    500
}

fn default_degraded_output_tokens() -> u32 {
    1500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_direct_assembly_threshold() -> usize {
    5500
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            context_budget: default_context_budget(),
            summary_length: default_summary_length(),
            stage_prompt_threshold: default_stage_prompt_threshold(),
            soft_budget: default_soft_budget(),
            preflight_threshold: default_preflight_threshold(),
            emergency_budget: default_emergency_budget(),
            request_ceiling: default_request_ceiling(),
            min_output_tokens: default_min_output_tokens(),
            degraded_output_tokens: default_degraded_output_tokens(),
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
            direct_assembly_threshold: default_direct_assembly_threshold(),
        }
    }
}

impl BudgetSection {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

/// Session registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsSection {
    /// Generations allowed to run at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    50
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Optional on-disk catalogs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsSection {
    /// Directory of `*.prompt` files that override the embedded prompts
    #[serde(default)]
    pub prompts_dir: Option<PathBuf>,
    /// Directory of `*.json` templates added to the built-in ones
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

/// The complete `prd-forge.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrdConfig {
    #[serde(default)]
    pub completion: CompletionSection,
    #[serde(default)]
    pub budget: BudgetSection,
    #[serde(default)]
    pub sessions: SessionsSection,
    #[serde(default)]
    pub paths: PathsSection,
}

impl PrdConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PrdConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate().map_err(|e| match e {
            ConfigError::Invalid(message) => ConfigError::InvalidFile {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: PrdConfig =
            toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment overrides (model and base URL).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var(MODEL_ENV)
            && !model.trim().is_empty()
        {
            self.completion.model = model;
        }
        if let Ok(base_url) = std::env::var(BASE_URL_ENV)
            && !base_url.trim().is_empty()
        {
            self.completion.base_url = base_url;
        }
        self
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.budget;
        if b.max_attempts == 0 {
            return Err(ConfigError::Invalid("budget.max_attempts must be at least 1".into()));
        }
        if self.sessions.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "sessions.max_concurrent must be at least 1".into(),
            ));
        }
        if b.emergency_budget == 0 || b.soft_budget == 0 || b.context_budget == 0 {
            return Err(ConfigError::Invalid("budgets must be non-zero".into()));
        }
        if b.soft_budget > b.request_ceiling {
            return Err(ConfigError::Invalid(format!(
                "budget.soft_budget ({}) exceeds budget.request_ceiling ({})",
                b.soft_budget, b.request_ceiling
            )));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::Invalid(format!(
                "completion.temperature must be within 0.0..=2.0, got {}",
                self.completion.temperature
            )));
        }
        Ok(())
    }
}

/// Read the completion-service credential from the environment.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}
