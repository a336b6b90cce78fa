//! OpenAI-compatible chat-completions client (Groq by default).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, CompletionService};
use crate::config::{API_KEY_ENV, CompletionSection, api_key_from_env};
use crate::errors::{CompletionError, ConfigError};

/// Client for the `/chat/completions` endpoint.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GroqClient {
    /// Build a client against `settings.base_url`.
    ///
    /// An empty credential is a configuration error.
    pub fn new(
        api_key: impl Into<String>,
        settings: &CompletionSection,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                env_var: API_KEY_ENV,
            });
        }
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
        })
    }

    /// Build a client with the credential from `GROQ_API_KEY`.
    pub fn from_env(settings: &CompletionSection) -> Result<Self, ConfigError> {
        let api_key = api_key_from_env().ok_or(ConfigError::MissingCredential {
            env_var: API_KEY_ENV,
        })?;
        Self::new(api_key, settings)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionService for GroqClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: 1.0,
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| CompletionError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            CompletionError::InvalidResponse(format!("Failed to parse response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::InvalidResponse("no content in the response".into()))
}

/// Classify a non-success status into the three failure classes.
fn map_http_error(status: StatusCode, body: String) -> CompletionError {
    let (message, code) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(wrapper) => (wrapper.error.message, wrapper.error.code),
        Err(_) => (body, None),
    };
    let lower = message.to_lowercase();

    let too_large = status == StatusCode::PAYLOAD_TOO_LARGE
        || lower.contains("too large")
        || code.as_deref() == Some("context_length_exceeded");

    if too_large {
        CompletionError::RequestTooLarge { message }
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        CompletionError::RateLimited { message }
    } else {
        CompletionError::Service {
            status: status.as_u16(),
            message,
        }
    }
}
