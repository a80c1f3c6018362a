//! Chat completion backend.

mod client;

pub use client::OpenAiClient;

use async_trait::async_trait;

use crate::conversation::ChatMessage;
use crate::error::Result;

/// Sampling parameters for one completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// Something that turns a conversation into the next assistant reply.
///
/// Implemented by [`OpenAiClient`]; tests substitute their own.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce the reply text for `messages`, oldest first.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String>;
}
