//! Abstracts `LlmClient`'s two operations behind traits (spec.md §4.A) so
//! callers that only need to drive the agent loop — tests chief among
//! them — can supply a fake instead of a live HTTP endpoint. Mirrors the
//! teacher's split between `Agent`/`PromptBuilder` and `EmbedAgent`
//! (`ai_client::traits`), collapsed here to the two operations this
//! workspace actually needs.

use async_trait::async_trait;

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::tool::ToolDefinition;
use crate::types::{ChatCompletion, Message};

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat_complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, LlmError>;
}

#[async_trait]
pub trait EmbedProvider: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// Everything the agent loop needs from an LLM adapter. Blanket-implemented
/// for anything that is already both a `ChatProvider` and an `EmbedProvider`.
pub trait LlmProvider: ChatProvider + EmbedProvider {}
impl<T: ChatProvider + EmbedProvider + ?Sized> LlmProvider for T {}

#[async_trait]
impl ChatProvider for LlmClient {
    async fn chat_complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, LlmError> {
        LlmClient::chat_complete(self, messages, tools).await
    }
}

#[async_trait]
impl EmbedProvider for LlmClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, LlmError> {
        LlmClient::embed(self, model, text).await
    }
}
