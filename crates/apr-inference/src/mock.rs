//! Mock generation backend for deterministic testing.
//!
//! ```rust,ignore
//! use apr_core::GenerationBackend;
//! use apr_inference::mock::MockBackend;
//!
//! let backend = MockBackend::new().with_fixed_response("Test response");
//! let completion = backend.complete("system", "question").await.unwrap();
//! assert_eq!(completion.text, "Test response");
//! assert_eq!(backend.call_count(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use apr_core::{ChatTurn, Completion, Error, GenerationBackend, Result, TokenUsage};

#[derive(Debug, Clone)]
struct MockConfig {
    model: String,
    provider: String,
    default_response: String,
    /// Exact last-user-message to response.
    mapped_responses: HashMap<String, String>,
    /// When set, every call fails with `Error::Inference(message)`.
    failure: Option<String>,
    latency_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: "mock-model".to_string(),
            provider: "mock".to_string(),
            default_response: "Mock response".to_string(),
            mapped_responses: HashMap::new(),
            failure: None,
            latency_ms: 0,
        }
    }
}

/// Mock backend that records every call.
#[derive(Clone, Default)]
pub struct MockBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<Vec<ChatTurn>>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response returned when no mapping matches.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Response for a specific final user message.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .mapped_responses
            .insert(input.into(), output.into());
        self
    }

    /// Fail every call with an inference error carrying `message`.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).failure = Some(message.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>, provider: impl Into<String>) -> Self {
        let config = Arc::make_mut(&mut self.config);
        config.model = model.into();
        config.provider = provider.into();
        self
    }

    /// Set simulated latency for every call.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Message lists of every call, oldest first.
    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.call_log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Messages of the most recent call.
    pub fn last_call(&self) -> Option<Vec<ChatTurn>> {
        self.call_log.lock().ok()?.last().cloned()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn chat(&self, messages: &[ChatTurn]) -> Result<Completion> {
        if let Ok(mut log) = self.call_log.lock() {
            log.push(messages.to_vec());
        }
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }
        if let Some(message) = &self.config.failure {
            return Err(Error::Inference(message.clone()));
        }

        let last_user = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let text = self
            .config
            .mapped_responses
            .get(last_user)
            .cloned()
            .unwrap_or_else(|| self.config.default_response.clone());

        let prompt_tokens: u32 = messages
            .iter()
            .map(|m| m.content.split_whitespace().count() as u32)
            .sum();
        let completion_tokens = text.split_whitespace().count() as u32;
        Ok(Completion {
            text,
            usage: Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider(&self) -> &str {
        &self.config.provider
    }
}
