//! AI completion service client and types.
//!
//! The stage agents depend only on the [`CompletionService`] trait, so the
//! real [`OpenAiClient`] can be swapped for a deterministic double in tests.

mod client;
mod types;

pub use client::OpenAiClient;
pub use types::{CompletionRequest, Message, MessageRole};

use async_trait::async_trait;

use crate::error::CompletionResult;

/// Chat-completion collaborator consumed by the stage agents.
///
/// Implementations send the role-tagged messages to a model and return the
/// completion text. Malformed or non-JSON completions are a normal outcome
/// for callers, not an exceptional one; the agents handle them with their
/// documented fallbacks.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one completion and return the raw completion text.
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<String>;
}
