//! # Provider Abstraction
//!
//! A single async trait uniformly covering request/response, streaming, and
//! tool-call handling across heterogeneous LLM backends. Two reference
//! adapters ship behind it: [`openai::OpenAiCompatibleProvider`] for
//! backends with native tool calling (LM Studio, Ollama, llama.cpp, vLLM),
//! and [`synthetic::SyntheticToolCallProvider`], which wraps any
//! text-completion backend and emulates tool calling via prompt injection
//! and strict JSON parsing — modeled on providers (like Gemini) that don't
//! expose a native tool-calling API through this crate's HTTP surface.

pub mod openai;
pub mod presets;
pub mod synthetic;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A provider-agnostic chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// "system" | "user" | "assistant" | "tool"
    pub role: String,
    /// message text
    pub content: String,
    /// tool name, required on tool-role messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// id of the tool call this message answers, when `role == "tool"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ProviderMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            name: None,
            tool_call_id: None,
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            name: None,
            tool_call_id: None,
        }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            name: None,
            tool_call_id: None,
        }
    }
}

/// A model-requested tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// id used to correlate a later tool-result message
    pub id: String,
    /// tool name
    pub name: String,
    /// parsed arguments
    pub arguments: Value,
}

/// The normalized result of a non-streaming request.
#[derive(Debug, Clone, Default)]
pub struct ProviderReply {
    /// text content, possibly empty if the reply was tool calls only
    pub content: String,
    /// tool calls the model asked to make
    pub tool_calls: Vec<ToolCall>,
    /// provider's finish reason, if it supplied one
    pub finish_reason: Option<String>,
}

/// Capability flags a provider may declare.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// native or emulated tool calling
    pub supports_tools: bool,
    /// image content in messages
    pub supports_images: bool,
    /// audio input
    pub supports_audio_in: bool,
    /// audio output
    pub supports_audio_out: bool,
}

/// Per-call knobs, independent of the provider adapter.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// model id to request
    pub model: String,
    /// sampling temperature
    pub temperature: Option<f32>,
    /// max output tokens
    pub max_tokens: Option<u32>,
    /// tool definitions, pre-formatted for this provider's wire shape (see
    /// `ToolRegistry::format_for_provider`)
    pub tools: Vec<Value>,
}

/// Uniform interface over a chat-completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// One non-streaming turn.
    async fn request(
        &self,
        messages: &[ProviderMessage],
        options: &CompletionOptions,
    ) -> Result<ProviderReply>;

    /// The same turn, as a stream of text chunks. Implementations that
    /// can't stream natively may synthesize a one-chunk stream from
    /// `request`.
    async fn stream(
        &self,
        messages: &[ProviderMessage],
        options: &CompletionOptions,
    ) -> Result<BoxStream<'static, Result<String>>>;

    /// Append a tool-result message to `messages` in this provider's
    /// expected shape (role, id linkage) and return the extended list.
    fn add_tool_message(
        &self,
        messages: &[ProviderMessage],
        tool_call_id: &str,
        tool_name: &str,
        content: &str,
    ) -> Vec<ProviderMessage> {
        let mut extended = messages.to_vec();
        extended.push(ProviderMessage {
            role: "tool".to_string(),
            content: content.to_string(),
            name: Some(tool_name.to_string()),
            tool_call_id: Some(tool_call_id.to_string()),
        });
        extended
    }

    /// What this provider supports.
    fn capabilities(&self) -> Capabilities;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_constructors_set_expected_roles() {
        assert_eq!(ProviderMessage::system("s").role, "system");
        assert_eq!(ProviderMessage::user("u").role, "user");
        assert_eq!(ProviderMessage::assistant("a").role, "assistant");
    }
}
