//! # Aura Core
//!
//! Domain types, traits, and error definitions for the Aura chat backend.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! The persistence layer, the provider adapter, and the chat pipeline each
//! depend inward on this crate and never on each other's internals.

pub mod error;
pub mod model;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{ChatError, Error, ProviderError, Result, StoreError};
pub use model::{Attachment, ChatMessage, Conversation, Feedback, Role, UsageMetric};
pub use provider::{ChatOutcome, ConverseRequest, Provider};
