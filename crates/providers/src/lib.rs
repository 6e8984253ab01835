//! Provider implementations for Aura.
//!
//! `GeminiProvider` implements the `aura_core::Provider` trait against the
//! Gemini REST API. `MockEngine` is the deterministic fallback used whenever
//! the provider reports itself unavailable.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiProvider;
pub use mock::{BehaviorDescriptor, MockEngine, ToolInvocation};
