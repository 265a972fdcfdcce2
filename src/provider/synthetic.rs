//! Synthetic tool-call adapter: wraps any text-completion backend that has
//! no native tool-calling API (modeled on the Gemini case in the reference
//! design notes) and emulates one via prompt injection plus strict JSON
//! parsing of the reply.
//!
//! The inner [`Provider`] sees ordinary text messages; this adapter is the
//! only thing that knows tool declarations were ever involved.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::Result;

use super::{Capabilities, CompletionOptions, Provider, ProviderMessage, ProviderReply, ToolCall};

/// Emulates tool calling on top of a plain text-completion [`Provider`].
///
/// Tool declarations are expected in the `gemini` wire shape produced by
/// `ToolRegistry::format_for_provider("gemini", ...)`: a single-element
/// array wrapping a `function_declarations` list of `{name, description,
/// parameters}` objects. Any other shape is tolerated but yields no tool
/// descriptors, which degrades to a plain text completion.
pub struct SyntheticToolCallProvider<P> {
    inner: P,
}

impl<P: Provider> SyntheticToolCallProvider<P> {
    /// Wrap `inner`, emulating tool calls for it.
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// Reference to the wrapped provider, e.g. to inspect its own capabilities.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn tool_descriptors(tools: &[Value]) -> Vec<(String, String, Value)> {
        let mut out = Vec::new();
        for entry in tools {
            if let Some(declarations) = entry.get("function_declarations").and_then(|d| d.as_array()) {
                for decl in declarations {
                    if let Some(name) = decl.get("name").and_then(|n| n.as_str()) {
                        let description = decl
                            .get("description")
                            .and_then(|d| d.as_str())
                            .unwrap_or_default()
                            .to_string();
                        let parameters = decl.get("parameters").cloned().unwrap_or(Value::Null);
                        out.push((name.to_string(), description, parameters));
                    }
                }
                continue;
            }
            // Tolerate a flat {name, description, parameters} shape too.
            if let Some(name) = entry.get("name").and_then(|n| n.as_str()) {
                let description = entry
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or_default()
                    .to_string();
                let parameters = entry.get("parameters").cloned().unwrap_or(Value::Null);
                out.push((name.to_string(), description, parameters));
            }
        }
        out
    }

    fn instruction_block(descriptors: &[(String, String, Value)]) -> String {
        let mut block = String::from(
            "You have access to the following tools. If one of them would help answer \
             the request, reply with EXACTLY one JSON object and nothing else:\n\
             {\"tool\": \"<name>\", \"parameters\": { ... }}\n\n\
             Do not wrap the JSON in explanation. If no tool is needed, answer normally.\n\n\
             Available tools:\n",
        );
        for (name, description, _) in descriptors {
            block.push_str(&format!("- {name}: {description}\n"));
        }
        block
    }

    fn inject(messages: &[ProviderMessage], descriptors: &[(String, String, Value)]) -> Vec<ProviderMessage> {
        if descriptors.is_empty() {
            return messages.to_vec();
        }
        let mut augmented = messages.to_vec();
        let instructions = Self::instruction_block(descriptors);
        match augmented.last_mut() {
            Some(last) if last.role == "user" => {
                last.content = format!("{instructions}\n{}", last.content);
            }
            _ => augmented.push(ProviderMessage::user(instructions)),
        }
        augmented
    }

    /// Attempt to read a synthetic tool call out of a raw reply. Per the
    /// design notes' mitigation, the reply must be *exclusively* a JSON
    /// object after trimming and stripping one pair of fenced-code
    /// markers — partial/embedded JSON is rejected, not scanned for.
    fn try_parse_tool_call(content: &str, descriptors: &[(String, String, Value)]) -> Option<ToolCall> {
        let trimmed = strip_one_fence(content.trim());
        let parsed: Value = serde_json::from_str(trimmed).ok()?;
        let obj = parsed.as_object()?;
        let tool_name = obj.get("tool")?.as_str()?;
        if !descriptors.iter().any(|(name, _, _)| name == tool_name) {
            return None;
        }
        let arguments = obj.get("parameters").cloned().unwrap_or_else(|| Value::Object(Default::default()));
        Some(ToolCall {
            id: format!("tool-{tool_name}"),
            name: tool_name.to_string(),
            arguments,
        })
    }
}

/// Strip one pair of fenced-code markers (```` ``` ```` or ` ```json `),
/// if the trimmed text both starts and ends with one.
fn strip_one_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

#[async_trait]
impl<P: Provider> Provider for SyntheticToolCallProvider<P> {
    async fn request(
        &self,
        messages: &[ProviderMessage],
        options: &CompletionOptions,
    ) -> Result<ProviderReply> {
        let descriptors = Self::tool_descriptors(&options.tools);
        if descriptors.is_empty() {
            return self.inner.request(messages, options).await;
        }

        let augmented = Self::inject(messages, &descriptors);
        let mut inner_options = options.clone();
        inner_options.tools = Vec::new();
        let reply = self.inner.request(&augmented, &inner_options).await?;

        match Self::try_parse_tool_call(&reply.content, &descriptors) {
            Some(call) => {
                log::debug!("synthetic provider parsed tool call '{}'", call.name);
                Ok(ProviderReply {
                    content: String::new(),
                    tool_calls: vec![call],
                    finish_reason: reply.finish_reason,
                })
            }
            None => Ok(reply),
        }
    }

    async fn stream(
        &self,
        messages: &[ProviderMessage],
        options: &CompletionOptions,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let descriptors = Self::tool_descriptors(&options.tools);
        let augmented = Self::inject(messages, &descriptors);
        let mut inner_options = options.clone();
        inner_options.tools = Vec::new();
        self.inner.stream(&augmented, &inner_options).await
    }

    fn add_tool_message(
        &self,
        messages: &[ProviderMessage],
        tool_call_id: &str,
        tool_name: &str,
        content: &str,
    ) -> Vec<ProviderMessage> {
        self.inner.add_tool_message(messages, tool_call_id, tool_name, content)
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = self.inner.capabilities();
        caps.supports_tools = true;
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Capabilities, CompletionOptions, ProviderReply};

    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn request(
            &self,
            _messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> Result<ProviderReply> {
            Ok(ProviderReply {
                content: self.reply.clone(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }

        async fn stream(
            &self,
            _messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> Result<BoxStream<'static, Result<String>>> {
            Ok(Box::pin(futures::stream::iter(vec![Ok(self.reply.clone())])))
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
    }

    fn gemini_tools() -> Vec<Value> {
        vec![serde_json::json!({
            "function_declarations": [
                {"name": "add_numbers", "description": "adds two numbers", "parameters": {"type": "object"}}
            ]
        })]
    }

    #[tokio::test]
    async fn parses_exact_json_reply_into_a_tool_call() {
        let provider = SyntheticToolCallProvider::new(StubProvider {
            reply: r#"{"tool": "add_numbers", "parameters": {"a": 25, "b": 17}}"#.to_string(),
        });
        let options = CompletionOptions {
            tools: gemini_tools(),
            ..Default::default()
        };
        let reply = provider
            .request(&[ProviderMessage::user("what is 25 + 17?")], &options)
            .await
            .unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].id, "tool-add_numbers");
        assert_eq!(reply.tool_calls[0].arguments["a"], 25);
    }

    #[tokio::test]
    async fn strips_one_fenced_code_block_before_parsing() {
        let provider = SyntheticToolCallProvider::new(StubProvider {
            reply: "```json\n{\"tool\": \"add_numbers\", \"parameters\": {}}\n```".to_string(),
        });
        let options = CompletionOptions {
            tools: gemini_tools(),
            ..Default::default()
        };
        let reply = provider
            .request(&[ProviderMessage::user("go")], &options)
            .await
            .unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn prose_around_json_is_rejected_not_scanned() {
        let provider = SyntheticToolCallProvider::new(StubProvider {
            reply: r#"Sure! {"tool": "add_numbers", "parameters": {}}"#.to_string(),
        });
        let options = CompletionOptions {
            tools: gemini_tools(),
            ..Default::default()
        };
        let reply = provider
            .request(&[ProviderMessage::user("go")], &options)
            .await
            .unwrap();
        assert!(reply.tool_calls.is_empty());
        assert!(reply.content.starts_with("Sure!"));
    }

    #[tokio::test]
    async fn unknown_tool_name_is_not_emitted_as_a_call() {
        let provider = SyntheticToolCallProvider::new(StubProvider {
            reply: r#"{"tool": "delete_everything", "parameters": {}}"#.to_string(),
        });
        let options = CompletionOptions {
            tools: gemini_tools(),
            ..Default::default()
        };
        let reply = provider
            .request(&[ProviderMessage::user("go")], &options)
            .await
            .unwrap();
        assert!(reply.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn no_tools_declared_skips_injection_entirely() {
        let provider = SyntheticToolCallProvider::new(StubProvider {
            reply: "just chatting".to_string(),
        });
        let reply = provider
            .request(&[ProviderMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "just chatting");
    }

    #[test]
    fn capabilities_report_tool_support_even_though_inner_lacks_it() {
        let provider = SyntheticToolCallProvider::new(StubProvider {
            reply: String::new(),
        });
        assert!(provider.capabilities().supports_tools);
    }
}
