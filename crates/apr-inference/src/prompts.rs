//! Prompt construction for the assistant endpoints.

use apr_core::defaults::SUMMARY_MAX_CHARS;
use apr_core::ChatTurn;

/// System prompt for summarization.
pub const SUMMARIZE_SYSTEM_PROMPT: &str = "You are an expert at summarizing research papers and technical content.

Your task is to provide a clear, concise summary that includes:
- Main topic/focus
- Key findings or contributions
- Important methodologies (briefly)
- Conclusions

Keep it concise but informative. Use bullet points for clarity.";

const ASK_PREAMBLE: &str = "You are an AI expert specializing in explaining concepts from research papers.
Your role is to help users understand complex technical concepts, paper methodologies, and findings.

Guidelines:
- Be clear and precise in your explanations
- Use examples when helpful
- If the context doesn't contain enough information to answer, say so
- Break down complex concepts into digestible parts
- Use proper technical terminology but explain it

";

const CHAT_PREAMBLE: &str = "You are an AI assistant helping users understand research papers.";

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Build the system prompt for a question.
///
/// Returns the prompt and whether any context went into it. Caller context
/// comes first, then paper text under a "From the research paper:" label.
pub fn build_ask_prompt(context: Option<&str>, pdf_context: Option<&str>) -> (String, bool) {
    let mut parts: Vec<String> = Vec::new();
    if let Some(context) = non_empty(context) {
        parts.push(context.to_string());
    }
    if let Some(pdf_context) = non_empty(pdf_context) {
        parts.push(format!("From the research paper:\n{}", pdf_context));
    }

    let context_used = !parts.is_empty();
    let context_block = if context_used {
        format!(
            "Use the following context to answer questions:\n\n{}\n\n",
            parts.join("\n\n")
        )
    } else {
        String::new()
    };

    let prompt = format!(
        "{}{}Now answer the following question:",
        ASK_PREAMBLE, context_block
    );
    (prompt, context_used)
}

/// Cut `text` to at most [`SUMMARY_MAX_CHARS`] characters.
pub fn truncate_for_summary(text: &str) -> &str {
    match text.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// User message for summarization, with the input truncated.
pub fn build_summarize_prompt(text: &str) -> String {
    format!(
        "Please summarize the following content:\n\n{}\n\nSummary:",
        truncate_for_summary(text)
    )
}

/// System prompt for conversational chat, optionally scoped to a paper.
pub fn chat_system_prompt(paper_id: Option<&str>) -> String {
    match non_empty(paper_id) {
        Some(id) => format!("{} Paper ID: {}\n", CHAT_PREAMBLE, id),
        None => format!("{} ", CHAT_PREAMBLE),
    }
}

/// Full message list for a chat turn: system prompt, prior history, then
/// the new user message.
pub fn chat_messages(paper_id: Option<&str>, history: &[ChatTurn], message: &str) -> Vec<ChatTurn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatTurn::system(chat_system_prompt(paper_id)));
    messages.extend(history.iter().cloned());
    messages.push(ChatTurn::user(message));
    messages
}
