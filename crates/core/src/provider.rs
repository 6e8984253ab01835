//! Provider trait — the abstraction over the generative-AI backend.
//!
//! A Provider knows how to turn a user message (plus optional document
//! context) into a reply, and how to analyze uploaded report text/images.
//! Every operation is fail-soft: `converse` reports unavailability through
//! [`ChatOutcome::Unavailable`] rather than an error, and the analysis calls
//! return a textual banner on failure. The chat pipeline treats
//! `Unavailable` as the signal to fall back to the mock engine.

use crate::model::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat-completion request sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseRequest {
    /// The user's message.
    pub message: String,

    /// Prior messages in the conversation.
    ///
    /// Reserved for future prompt shaping — the current one-shot prompt
    /// builder uses only `context` and `message`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatMessage>,

    /// Concatenated attachment text for the conversation ("" when none).
    #[serde(default)]
    pub context: String,

    /// The conversation's selected model name.
    pub model: String,

    /// Sampling temperature (0.0 = deterministic).
    pub temperature: f64,
}

/// The outcome of a chat-completion attempt.
///
/// Configuration absence and transient call failure are both folded into
/// `Unavailable` — the caller sees one fallback signal, with diagnostic
/// detail logged for operators only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatOutcome {
    /// The provider produced a reply.
    Answered(String),

    /// No credential configured, or the call failed/timed out.
    Unavailable,
}

impl ChatOutcome {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ChatOutcome::Unavailable)
    }
}

/// The core Provider trait.
///
/// The chat pipeline calls `converse()` without knowing which backend is
/// configured; the upload path calls the two analysis operations.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Attempt a chat completion. Never returns an error.
    async fn converse(&self, request: ConverseRequest) -> ChatOutcome;

    /// Analyze report text, returning structured markdown.
    ///
    /// On failure returns a literal failure banner instead of an error.
    async fn analyze_report_text(&self, text: &str) -> String;

    /// Analyze a report image, returning structured markdown.
    ///
    /// Same banner contract as [`Provider::analyze_report_text`].
    async fn analyze_report_image(&self, image: &[u8], mime_type: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_detectable() {
        assert!(ChatOutcome::Unavailable.is_unavailable());
        assert!(!ChatOutcome::Answered("hi".into()).is_unavailable());
    }

    #[test]
    fn converse_request_serializes_without_empty_history() {
        let req = ConverseRequest {
            message: "hello".into(),
            history: vec![],
            context: String::new(),
            model: "aura-standard".into(),
            temperature: 0.7,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("history"));
        assert!(json.contains("aura-standard"));
    }
}
