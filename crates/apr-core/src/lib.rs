//! # apr-core
//!
//! Core types and abstractions for the AI Paper Reader backend.
//!
//! This crate provides:
//! - The shared error taxonomy and `Result` alias
//! - Domain models (papers, notes, highlights, chat turns)
//! - Collaborator traits for PDF processing and text generation
//! - Configuration loading and centralized defaults
//! - Upload validation and Markdown rendering

pub mod config;
pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod logging;
pub mod markdown;
pub mod models;
pub mod traits;

pub use config::{ApiConfig, AppConfig, LlmConfig, LlmProvider, PdfConfig, StorageConfig};
pub use error::{Error, Result, UpstreamKind};
pub use models::*;
pub use traits::*;
