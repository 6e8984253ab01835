//! Persistent domain entities.
//!
//! These are the value objects the store persists and the gateway serializes:
//! a Conversation owns Messages and Attachments, a Message may receive one
//! Feedback, and every exchange records a UsageMetric.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default title for a newly created conversation.
pub const DEFAULT_TITLE: &str = "New Chat";
/// Default generation model shown to clients.
pub const DEFAULT_MODEL: &str = "aura-standard";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// A chat session with its generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub selected_model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An uploaded file, reduced to its extracted/analyzed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub conversation_id: i64,
    pub filename: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Thumbs-up/down on a single assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub message_id: i64,
    pub conversation_id: i64,
    pub is_positive: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recorded token-consumption estimate for one exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetric {
    pub id: i64,
    pub endpoint: String,
    pub model_used: String,
    pub token_count: i64,
    pub created_at: DateTime<Utc>,
}
