//! The Aura message pipeline and its collaborators.
//!
//! `ChatPipeline` sequences a user message through rate limiting,
//! persistence, context assembly, and response generation. The rate limiter
//! and context assembler live here as injectable, separately testable pieces.

pub mod context;
pub mod limiter;
pub mod pipeline;
pub mod upload;

pub use context::build_context;
pub use limiter::RateLimiter;
pub use pipeline::ChatPipeline;
pub use upload::{classify, UploadKind};
