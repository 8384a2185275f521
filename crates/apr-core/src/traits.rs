//! Collaborator traits implemented by the PDF and inference crates.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChatTurn, Completion, HighlightOutcome, HighlightRequest, PageText, PdfInfo};

/// PDF inspection, rendering and annotation.
///
/// All methods block on file I/O (and possibly an external process); async
/// callers run them on the blocking pool.
pub trait PdfProcessor: Send + Sync {
    /// Page count and document info of the PDF at `path`.
    fn inspect(&self, path: &Path) -> Result<PdfInfo>;

    /// Text of the requested 0-indexed pages, or of every page when `pages`
    /// is `None`. Out-of-range indices are skipped.
    fn page_text(&self, path: &Path, pages: Option<&[usize]>) -> Result<Vec<PageText>>;

    /// Render page 1 of `pdf` as a JPEG at `dest`.
    fn render_thumbnail(&self, pdf: &Path, dest: &Path) -> Result<()>;

    /// Copy `src` to `dest` with highlight annotations added.
    fn add_highlight(
        &self,
        src: &Path,
        dest: &Path,
        request: &HighlightRequest,
    ) -> Result<HighlightOutcome>;
}

/// Backend for chat-completion text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Single-turn completion with an optional system prompt.
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatTurn::system(system));
        }
        messages.push(ChatTurn::user(prompt));
        self.chat(&messages).await
    }

    /// Multi-turn completion over an ordered message list.
    async fn chat(&self, messages: &[ChatTurn]) -> Result<Completion>;

    /// Model slug used for generation.
    fn model_name(&self) -> &str;

    /// Provider name ("openai", "grok", "minimax", "mock").
    fn provider(&self) -> &str;
}
