//! Language-model client for scriptcrew.
//!
//! Exposes the [`ChatModel`] seam the agent executor talks to, and
//! [`OpenAiCompatClient`], the production implementation over any
//! OpenAI-compatible `/chat/completions` endpoint.

mod client;
pub mod types;

use async_trait::async_trait;

use scriptcrew_shared::Result;

pub use client::OpenAiCompatClient;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Role, ToolCall, ToolDefinition, Usage,
};

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one request and wait for the reply.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Model identifier, for logging.
    fn model_id(&self) -> &str;
}
