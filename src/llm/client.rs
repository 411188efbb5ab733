//! Core LLM client types and trait definitions

use std::time::Duration;

use async_trait::async_trait;

/// Stateless LLM client - each call is independent (fresh context)
///
/// Implementations must report upstream quota exhaustion as
/// [`LlmError::RateLimited`]; the queue relies on that variant alone to drive
/// its cool-down.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text for a single prompt
    async fn generate(&self, prompt: &str) -> Result<Completion, LlmError>;

    /// Get the model name
    fn model(&self) -> &str;
}

/// Result of one successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,

    /// Total tokens billed for the call, when the API reports it
    pub total_tokens: u64,
}

impl Completion {
    pub fn new(text: impl Into<String>, total_tokens: u64) -> Self {
        Self {
            text: text.into(),
            total_tokens,
        }
    }
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }
}
