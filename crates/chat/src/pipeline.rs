//! The conversation orchestrator.
//!
//! Sequences each inbound user message: rate-limit check → conversation
//! lookup → persist user message → gather attachment context → generate a
//! reply (provider first, mock fallback) → persist the assistant message and
//! a usage metric. Provider unavailability is recovered locally; store and
//! lookup failures surface to the caller.

use crate::context::build_context;
use crate::limiter::RateLimiter;
use crate::upload::extract_content;
use aura_core::error::ChatError;
use aura_core::model::{Attachment, ChatMessage, Role};
use aura_core::provider::{ChatOutcome, ConverseRequest, Provider};
use aura_providers::MockEngine;
use aura_store::Store;
use std::sync::Arc;
use tracing::{debug, info};

/// Endpoint name recorded on usage metrics for message exchanges.
const CHAT_ENDPOINT: &str = "/chat";

/// Orchestrates message handling and uploads against the shared store,
/// provider, and rate limiter.
pub struct ChatPipeline {
    store: Arc<Store>,
    provider: Arc<dyn Provider>,
    limiter: Arc<RateLimiter>,
}

impl ChatPipeline {
    pub fn new(store: Arc<Store>, provider: Arc<dyn Provider>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            store,
            provider,
            limiter,
        }
    }

    /// Handle one inbound user message, returning the persisted assistant
    /// reply.
    ///
    /// A rate-limited call persists nothing. Store failures after the rate
    /// check surface as `ChatError::Store`; a user message may remain
    /// persisted without an assistant reply when a later step fails
    /// (best-effort semantics, reported to the operator log).
    pub async fn handle_message(
        &self,
        conversation_id: i64,
        client_key: &str,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        if !self.limiter.allow(client_key) {
            return Err(ChatError::RateLimited {
                max_requests: self.limiter.max_requests(),
            });
        }

        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or(ChatError::ConversationNotFound)?;

        self.store
            .insert_message(conversation_id, Role::User, content)
            .await?;

        let attachments = self.store.list_attachments(conversation_id).await?;
        let context = build_context(attachments.iter().map(|a| a.content.as_str()));

        let descriptor =
            MockEngine::describe(content, &conversation.selected_model, conversation.temperature);

        let outcome = self
            .provider
            .converse(ConverseRequest {
                message: content.to_string(),
                history: Vec::new(),
                context: context.clone(),
                model: conversation.selected_model.clone(),
                temperature: conversation.temperature,
            })
            .await;

        let reply = match outcome {
            ChatOutcome::Answered(text) => {
                debug!(provider = %self.provider.name(), "Provider answered");
                descriptor.decorate(&text)
            }
            ChatOutcome::Unavailable => {
                debug!("Provider unavailable; using mock engine");
                MockEngine::generate_with(&descriptor, content, &context)
            }
        };

        let assistant = self
            .store
            .insert_message(conversation_id, Role::Assistant, &reply)
            .await?;

        let token_estimate = (word_count(content) + word_count(&reply)) as i64;
        self.store
            .insert_usage_metric(CHAT_ENDPOINT, &conversation.selected_model, token_estimate)
            .await?;

        info!(
            conversation_id,
            model = %conversation.selected_model,
            tokens = token_estimate,
            "Message exchange complete"
        );

        Ok(assistant)
    }

    /// Handle a file upload: classify, extract/analyze content, and store
    /// the resulting Attachment.
    pub async fn handle_upload(
        &self,
        conversation_id: i64,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<Attachment, ChatError> {
        self.store
            .get_conversation(conversation_id)
            .await?
            .ok_or(ChatError::ConversationNotFound)?;

        let content =
            extract_content(self.provider.as_ref(), filename, content_type, data).await;

        let attachment = self
            .store
            .insert_attachment(conversation_id, filename, &content)
            .await?;

        info!(conversation_id, filename, "Attachment stored");
        Ok(attachment)
    }
}

/// Naive whitespace word count, used as the token estimate.
///
/// Deliberately not a real tokenizer; the estimate formula is
/// `word_count(user_text) + word_count(assistant_text)`.
fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
