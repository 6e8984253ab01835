//! SQLite persistence for the Aura chat backend.
//!
//! A single database file holds five tables: `conversations`, `messages`,
//! `attachments`, `feedback`, and `usage_metrics`. Messages and attachments
//! cascade on conversation deletion via foreign keys (the pool enables the
//! `foreign_keys` pragma). Timestamps are stored as RFC 3339 text.

mod sqlite;

pub use sqlite::{AnalyticsSummary, ConversationPatch, NewConversation, Store};
