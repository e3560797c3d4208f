// LLM provider support
//
// Abstraction over OpenAI-compatible chat completion APIs. The chat
// controller only ever talks to `dyn LlmProvider`, so tests substitute
// scripted fakes.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

pub mod factory;
pub mod openai;
pub mod types;

pub use factory::create_provider;
pub use openai::OpenAIProvider;
pub use types::{Message, ProviderRequest, Role, StreamChunk};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a message and stream the response
    ///
    /// Returns a channel that receives text deltas followed by one
    /// `StreamChunk::Finished`, or an `Err` item if the stream breaks.
    /// Dropping the receiver must stop the provider's work and release its
    /// connection.
    async fn send_message_stream(&self, request: &ProviderRequest)
        -> Result<Receiver<Result<StreamChunk>>>;

    /// Get the provider name (e.g., "openai", "grok")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;
}
