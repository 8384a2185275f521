//! OpenAI-compatible chat backend.
//!
//! Grok and MiniMax expose the same `/chat/completions` protocol, so one
//! backend serves every configured provider; only the base URL and API key
//! differ.
//!
//! # Example
//!
//! ```rust,no_run
//! use apr_core::{GenerationBackend, LlmConfig};
//! use apr_inference::openai::OpenAIBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIBackend::from_llm_config(&LlmConfig::default()).unwrap();
//!     let completion = backend
//!         .complete("You are terse.", "What is a transformer?")
//!         .await
//!         .unwrap();
//!     println!("{}", completion.text);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use error::{to_core_error, OpenAIErrorCode};
pub use types::*;
