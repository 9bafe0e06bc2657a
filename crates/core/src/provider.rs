//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get a response
//! back, either as a complete message or as a stream of fragments. Vendor
//! wire protocols live behind this trait and are supplied by collaborators.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::{ChatMessage, ToolCallRequest};

/// Broad family of a configured provider, used for model routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-class hosted API (GPT / o-series models)
    OpenAi,
    /// Anthropic-class hosted API (Claude models)
    Anthropic,
    /// Any other hosted endpoint
    Other,
    /// Self-hosted / local inference server
    Local,
}

impl ProviderKind {
    /// Model used when a request does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4",
            Self::Local => "llama3.1",
            Self::Other => "default",
        }
    }

    /// Lower is preferred when choosing the fallback provider.
    pub fn priority(&self) -> u8 {
        match self {
            Self::OpenAi => 0,
            Self::Anthropic => 1,
            Self::Other => 2,
            Self::Local => 3,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Other => "other",
            Self::Local => "local",
        };
        f.write_str(s)
    }
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A single model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Canonical model name, as resolved by the router
    pub model: String,

    /// The conversation so far
    pub messages: Vec<ChatMessage>,

    /// Tools the model may request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Whether the caller will consume the response incrementally
    #[serde(default)]
    pub stream: bool,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The assistant message, with any tool call requests attached
    pub message: ChatMessage,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Partial tool call deltas. A delta with an empty `id` continues the
    /// most recent call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A text-only chunk.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Receiving half of a provider stream. Dropping it releases the connection.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// The engine calls `generate()` or `stream_generate()` without knowing which
/// backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn generate(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Whether `stream_generate` is implemented.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Send a request and get a stream of response chunks.
    ///
    /// The stream ends when the sender is dropped; an `Err` item is terminal.
    async fn stream_generate(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<ChunkReceiver, ProviderError> {
        Err(ProviderError::StreamingUnsupported(self.name().to_string()))
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
