//! Chat model endpoint abstraction.
//!
//! A provider implements [`ChatProvider`] to turn a [`ChatRequest`] into an
//! ordered stream of [`ChatChunk`]s. Each chunk carries zero or more of a
//! text fragment and tool-call fragments.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use llmstxt_core::types::{Message, RequestOptions, ToolsType};

pub mod openai;
pub mod sse;

pub use openai::OpenAiProvider;

/// A streaming chat-completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Tool descriptors, already shaped for `tools_type`. Empty means the
    /// request carries no tool-calling fields at all.
    pub tools: Vec<serde_json::Value>,
    pub tools_type: ToolsType,
    pub options: RequestOptions,
}

/// One partial piece of a tool call, as streamed by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Slot the fragment belongs to.
    pub index: usize,
    /// Call identifier; normally only on the first fragment of a slot.
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// A streamed chunk from the endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatChunk {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallFragment>,
    pub finish_reason: Option<String>,
    pub usage: Option<ChunkUsage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = anyhow::Result<ChatChunk>> + Send>>;

/// The model endpoint seam.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider identifier (e.g., "openai", "azure").
    fn id(&self) -> &str;

    /// Open a streaming chat completion.
    ///
    /// An `Err` here means the stream could not be opened at all; errors
    /// yielded by the stream itself are mid-stream failures.
    async fn stream(&self, request: &ChatRequest) -> anyhow::Result<ChatStream>;
}
