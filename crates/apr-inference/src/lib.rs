//! # apr-inference
//!
//! Text generation for the AI Paper Reader backend.
//!
//! This crate provides:
//! - An OpenAI-compatible chat backend used for the `openai`, `grok` and
//!   `minimax` providers
//! - Prompt builders for questions, summaries and chat
//! - A mock backend for tests (feature `mock`)

pub mod openai;
pub mod prompts;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::sync::Arc;

use apr_core::{GenerationBackend, LlmConfig, Result};

pub use openai::{OpenAIBackend, OpenAIConfig};

/// Build the generation backend for the configured provider.
pub fn backend_from_config(llm: &LlmConfig) -> Result<Arc<dyn GenerationBackend>> {
    Ok(Arc::new(OpenAIBackend::from_llm_config(llm)?))
}
