//! OpenAI-compatible adapter: targets local servers (LM Studio, Ollama,
//! llama.cpp, vLLM) that speak the `/v1/chat/completions` wire format with
//! native tool calling, reusing this crate's SSE parser and tool-call
//! aggregator.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{Error, Result};
use crate::types::{OpenAIContent, OpenAIMessage, OpenAIRequest, OpenAIToolCall};
use crate::utils::{ToolCallAggregator, parse_sse_stream};
use crate::ContentBlock;

use super::{Capabilities, CompletionOptions, Provider, ProviderMessage, ProviderReply, ToolCall};

/// Talks to any server implementing the OpenAI chat completions API.
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build an adapter targeting `base_url` (e.g. `http://localhost:1234/v1`).
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn to_wire_messages(messages: &[ProviderMessage]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|m| OpenAIMessage {
                role: m.role.clone(),
                content: Some(OpenAIContent::Text(m.content.clone())),
                tool_calls: None,
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn build_request(&self, messages: &[ProviderMessage], options: &CompletionOptions) -> OpenAIRequest {
        OpenAIRequest {
            model: options.model.clone(),
            messages: Self::to_wire_messages(messages),
            stream: true,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools: if options.tools.is_empty() {
                None
            } else {
                Some(options.tools.clone())
            },
        }
    }

    async fn send(&self, request: &OpenAIRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self.http.post(url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                Error::ProviderAuth(body)
            } else if status.as_u16() == 429 {
                Error::ProviderRateLimited { retry_after: None }
            } else {
                Error::ProviderBadResponse(format!("{status}: {body}"))
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn request(
        &self,
        messages: &[ProviderMessage],
        options: &CompletionOptions,
    ) -> Result<ProviderReply> {
        let wire_request = self.build_request(messages, options);
        let response = self.send(&wire_request).await?;
        let mut chunk_stream = parse_sse_stream(response);
        let mut aggregator = ToolCallAggregator::new();

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut finish_reason = None;

        while let Some(chunk) = chunk_stream.next().await {
            let chunk = chunk?;
            if let Some(choice) = chunk.choices.first() {
                if let Some(reason) = &choice.finish_reason {
                    finish_reason = Some(reason.clone());
                }
            }
            for block in aggregator.process_chunk(chunk)? {
                match block {
                    ContentBlock::Text(t) => text.push_str(&t.text),
                    ContentBlock::ToolUse(t) => tool_calls.push(ToolCall {
                        id: t.id,
                        name: t.name,
                        arguments: t.input,
                    }),
                    _ => {}
                }
            }
        }

        Ok(ProviderReply {
            content: text,
            tool_calls,
            finish_reason,
        })
    }

    async fn stream(
        &self,
        messages: &[ProviderMessage],
        options: &CompletionOptions,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let wire_request = self.build_request(messages, options);
        let response = self.send(&wire_request).await?;
        let mut chunk_stream = parse_sse_stream(response);
        let mut aggregator = ToolCallAggregator::new();

        let text_stream = stream::poll_fn(move |cx| chunk_stream.poll_next_unpin(cx)).flat_map(
            move |chunk_result| {
                let blocks = match chunk_result.and_then(|c| aggregator.process_chunk(c)) {
                    Ok(blocks) => blocks,
                    Err(e) => return stream::iter(vec![Err(e)]),
                };
                let texts: Vec<Result<String>> = blocks
                    .into_iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text(t) => Some(Ok(t.text)),
                        _ => None,
                    })
                    .collect();
                stream::iter(texts)
            },
        );

        Ok(Box::pin(text_stream))
    }

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

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_tools: true,
            supports_images: true,
            supports_audio_in: false,
            supports_audio_out: false,
        }
    }
}

/// Convert a wire-format tool call (as returned inside an assistant message)
/// into the provider-agnostic [`ToolCall`], parsing its JSON-string
/// arguments. Used by adapters that receive tool calls outside the
/// streaming aggregator (e.g. constructing request history for retries).
pub fn from_wire_tool_call(call: &OpenAIToolCall) -> ToolCall {
    let arguments = serde_json::from_str(&call.function.arguments).unwrap_or(serde_json::Value::Null);
    ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_wire_messages_preserves_role_and_content() {
        let messages = vec![ProviderMessage::user("hello")];
        let wire = OpenAiCompatibleProvider::to_wire_messages(&messages);
        assert_eq!(wire[0].role, "user");
    }

    #[test]
    fn build_request_omits_tools_when_empty() {
        let provider = OpenAiCompatibleProvider::new("http://localhost:1234/v1", None);
        let options = CompletionOptions {
            model: "local-standard".to_string(),
            ..Default::default()
        };
        let request = provider.build_request(&[ProviderMessage::user("hi")], &options);
        assert!(request.tools.is_none());
        assert!(request.stream);
    }
}
