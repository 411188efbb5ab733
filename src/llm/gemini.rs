//! Gemini API client implementation
//!
//! This module implements the LlmClient trait for Google's Generative Language
//! (Gemini) `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{GateError, Result};
use crate::llm::client::{Completion, LlmClient, LlmError};

/// Gemini API base URL
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model to use
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Status string Gemini uses for quota exhaustion
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Configuration for the Gemini client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub timeout: Duration,
    /// Preamble placed ahead of every user question
    pub system_prompt: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: Duration::from_secs(120),
            system_prompt: String::new(),
        }
    }
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// Reads the API key from the environment variable named in the config
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            GateError::Llm(
                LlmError::MissingApiKey {
                    env_var: config.api_key_env.clone(),
                }
                .to_string(),
            )
        })?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GateError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Wrap the user's question in the configured preamble
    fn render_prompt(&self, question: &str) -> String {
        if self.config.system_prompt.is_empty() {
            question.to_string()
        } else {
            format!("{}\n\nUser question: {}", self.config.system_prompt, question)
        }
    }

    /// Build the request body for the Gemini API
    fn build_request(&self, question: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": self.render_prompt(question) }]
            }]
        })
    }

    /// Send a request to the Gemini API
    async fn send_request(&self, body: Value) -> std::result::Result<Value, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_error(status.as_u16(), retry_after, &error_body));
        }

        let bytes = response.bytes().await?;
        decode_body(&bytes)
    }
}

/// Decode a success body; malformed JSON is a parse error, not a network one
pub fn decode_body(bytes: &[u8]) -> std::result::Result<Value, LlmError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Map a non-success HTTP response onto an [`LlmError`].
///
/// Quota exhaustion is recognized by status 429 or by the structured
/// `error.status == "RESOURCE_EXHAUSTED"` field, never by message text.
pub fn classify_error(status: u16, retry_after: Option<Duration>, body: &str) -> LlmError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error_status = parsed
        .as_ref()
        .and_then(|v| v["error"]["status"].as_str())
        .unwrap_or_default();

    if status == 429 || error_status == RESOURCE_EXHAUSTED {
        return LlmError::RateLimited { retry_after };
    }

    let message = parsed
        .as_ref()
        .and_then(|v| v["error"]["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());

    LlmError::ApiError { status, message }
}

/// Parse a `generateContent` response body into a [`Completion`]
pub fn parse_response(body: &Value) -> std::result::Result<Completion, LlmError> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| LlmError::InvalidResponse("response has no candidate content".to_string()))?;

    let text = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        let reason = body["candidates"][0]["finishReason"].as_str().unwrap_or("unknown");
        return Err(LlmError::InvalidResponse(format!(
            "candidate contains no text (finish reason: {})",
            reason
        )));
    }

    let total_tokens = body["usageMetadata"]["totalTokenCount"].as_u64().unwrap_or(0);

    Ok(Completion { text, total_tokens })
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<Completion, LlmError> {
        let body = self.build_request(prompt);
        let response = self.send_request(body).await?;
        parse_response(&response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}
