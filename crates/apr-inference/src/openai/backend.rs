//! OpenAI-compatible chat backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use apr_core::defaults::{
    LLM_MAX_TOKENS, LLM_MODEL, LLM_TEMPERATURE, LLM_TIMEOUT_SECS, OPENAI_BASE_URL,
};
use apr_core::logging::{DURATION_MS, ERROR_MSG, MODEL, PROVIDER, RESPONSE_LEN};
use apr_core::{ChatTurn, Completion, Error, GenerationBackend, LlmConfig, Result};

use super::error::{to_core_error, OpenAIErrorCode};
use super::types::*;

/// Configuration for an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Provider name reported in responses and errors.
    pub provider: String,
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication (optional for local endpoints).
    pub api_key: Option<String>,
    /// Model to use for generation.
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: LLM_MODEL.to_string(),
            temperature: Some(LLM_TEMPERATURE),
            max_tokens: Some(LLM_MAX_TOKENS),
            timeout_seconds: LLM_TIMEOUT_SECS,
        }
    }
}

impl From<&LlmConfig> for OpenAIConfig {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            provider: llm.provider.to_string(),
            base_url: llm.base_url().to_string(),
            api_key: llm.api_key().map(str::to_string),
            model: llm.model.clone(),
            temperature: Some(llm.temperature),
            max_tokens: Some(llm.max_tokens),
            timeout_seconds: llm.timeout_seconds,
        }
    }
}

/// Chat backend for any `/chat/completions` endpoint (OpenAI, Grok, MiniMax).
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!({ PROVIDER } = %config.provider, "llm: no API key configured");
        }
        info!(
            { PROVIDER } = %config.provider,
            base_url = %config.base_url,
            { MODEL } = %config.model,
            "llm: backend initialized"
        );

        Ok(Self { client, config })
    }

    /// Create a backend for the provider selected in `llm`.
    pub fn from_llm_config(llm: &LlmConfig) -> Result<Self> {
        Self::new(OpenAIConfig::from(llm))
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a request with authentication if configured.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }

    /// Turn a non-success response into a classified core error.
    async fn error_from_response(&self, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let (message, error_type, code) = match serde_json::from_str::<OpenAIErrorResponse>(&body)
        {
            Ok(parsed) => {
                let code = parsed.error.code_str();
                (parsed.error.message, parsed.error.error_type, code)
            }
            Err(_) if body.trim().is_empty() => ("Unknown error".to_string(), String::new(), None),
            Err(_) => (body.chars().take(500).collect(), String::new(), None),
        };

        let kind = OpenAIErrorCode::from_response(status.as_u16(), &error_type, code.as_deref());
        warn!(
            { PROVIDER } = %self.config.provider,
            status = status.as_u16(),
            kind = ?kind,
            retryable = kind.is_retryable(),
            { ERROR_MSG } = %message,
            "llm: provider returned error"
        );
        to_core_error(&self.config.provider, status.as_u16(), kind, &message)
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    async fn chat(&self, messages: &[ChatTurn]) -> Result<Completion> {
        let prompt_len: usize = messages.iter().map(|m| m.content.len()).sum();
        debug!(
            { PROVIDER } = %self.config.provider,
            { MODEL } = %self.config.model,
            prompt_len,
            message_count = messages.len(),
            "llm: chat request"
        );
        let started = Instant::now();

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response).await);
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let text = result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!(
            { PROVIDER } = %self.config.provider,
            { RESPONSE_LEN } = text.len(),
            { DURATION_MS } = started.elapsed().as_millis() as u64,
            "llm: chat complete"
        );
        Ok(Completion {
            text,
            usage: result.usage.map(Into::into),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider(&self) -> &str {
        &self.config.provider
    }
}
