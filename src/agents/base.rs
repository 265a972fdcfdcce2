//! The general-purpose agent: forwards a prompt to a provider, running the
//! tool-call loop (§4.2, §4.4) until the model stops asking for tools or an
//! iteration cap is hit.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConfigStore;
use crate::provider::{CompletionOptions, Provider, ProviderMessage};
use crate::tool_executor::ToolExecutor;
use crate::tool_registry::ToolRegistry;

use super::{Agent, AgentRequest, AgentResponse};

/// A safety cap on tool round-trips within one `process_request` call, in
/// case a model keeps asking for tools indefinitely.
const MAX_TOOL_ITERATIONS: u32 = 8;

/// Forwards requests to a [`Provider`], executing any tool calls the model
/// emits through a [`ToolExecutor`] and feeding the results back until the
/// model replies with plain text.
pub struct BaseAgent {
    id: String,
    #[allow(dead_code)]
    config: ConfigStore,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    executor: Arc<ToolExecutor>,
    default_model: String,
    default_system_prompt: Option<String>,
}

impl BaseAgent {
    /// Build an agent registered under `id`, defaulting to `default_model`
    /// and `default_system_prompt` when a request doesn't override them.
    pub fn new(
        id: impl Into<String>,
        config: ConfigStore,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        executor: Arc<ToolExecutor>,
        default_model: impl Into<String>,
        default_system_prompt: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            provider,
            tools,
            executor,
            default_model: default_model.into(),
            default_system_prompt,
        }
    }

    fn resolve_model(&self, request: &AgentRequest) -> String {
        request.model.clone().unwrap_or_else(|| self.default_model.clone())
    }

    fn resolve_system_prompt(&self, request: &AgentRequest) -> Option<String> {
        request
            .system_prompt
            .clone()
            .or_else(|| self.default_system_prompt.clone())
    }

    async fn run_tool_loop(&self, model: &str, messages: &mut Vec<ProviderMessage>, tool_defs: &[serde_json::Value]) -> crate::Result<(String, Vec<(String, bool)>)> {
        let mut tools_invoked = Vec::new();

        for _ in 0..MAX_TOOL_ITERATIONS {
            let options = CompletionOptions {
                model: model.to_string(),
                tools: tool_defs.to_vec(),
                ..Default::default()
            };
            let reply = self.provider.request(messages, &options).await?;

            if reply.tool_calls.is_empty() {
                return Ok((reply.content, tools_invoked));
            }

            messages.push(ProviderMessage::assistant(reply.content.clone()));
            for call in &reply.tool_calls {
                let result = self.executor.execute(&call.name, call.arguments.clone()).await;
                tools_invoked.push((call.name.clone(), result.success));
                let payload = serde_json::to_string(&result).unwrap_or_default();
                *messages = self
                    .provider
                    .add_tool_message(messages, &call.id, &call.name, &payload);
            }
        }

        Ok((
            "The request needed more tool calls than allowed; returning the best available answer.".to_string(),
            tools_invoked,
        ))
    }
}

#[async_trait]
impl Agent for BaseAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn process_request(&self, request: &AgentRequest) -> AgentResponse {
        let model = self.resolve_model(request);
        let system_prompt = self.resolve_system_prompt(request);

        let mut messages = Vec::new();
        if let Some(prompt) = &system_prompt {
            messages.push(ProviderMessage::system(prompt.clone()));
        }
        messages.push(ProviderMessage::user(request.prompt.clone()));

        let tool_defs = if request.relevant_tools.is_empty() {
            Vec::new()
        } else {
            self.tools
                .format_for_provider("openai", Some(&request.relevant_tools))
        };

        match self.run_tool_loop(&model, &mut messages, &tool_defs).await {
            Ok((content, tools_invoked)) => {
                let mut response = AgentResponse::success(content);
                if !tools_invoked.is_empty() {
                    let names: Vec<serde_json::Value> = tools_invoked
                        .iter()
                        .map(|(name, success)| serde_json::json!({"tool": name, "success": success}))
                        .collect();
                    response.metadata.insert("tools_invoked".to_string(), serde_json::Value::Array(names));
                }
                response
            }
            Err(e) => AgentResponse::error(
                format!("An error occurred while processing your request: {e}"),
                e.to_string(),
            ),
        }
    }

    fn can_handle(&self, _request: &AgentRequest) -> f32 {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Capabilities, ProviderReply, ToolCall};
    use crate::tool;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        async fn request(
            &self,
            messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> crate::Result<ProviderReply> {
            let last_user = messages.iter().rev().find(|m| m.role == "user");
            Ok(ProviderReply {
                content: format!("echo: {}", last_user.map(|m| m.content.as_str()).unwrap_or("")),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }

        async fn stream(
            &self,
            _messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> crate::Result<futures::stream::BoxStream<'static, crate::Result<String>>> {
            Ok(Box::pin(futures::stream::empty()))
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                supports_tools: true,
                ..Default::default()
            }
        }
    }

    struct OneShotToolCallProvider {
        called: AtomicU32,
    }

    #[async_trait]
    impl Provider for OneShotToolCallProvider {
        async fn request(
            &self,
            _messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> crate::Result<ProviderReply> {
            if self.called.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ProviderReply {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call-1".to_string(),
                        name: "add_numbers".to_string(),
                        arguments: serde_json::json!({"a": 25, "b": 17}),
                    }],
                    finish_reason: None,
                })
            } else {
                Ok(ProviderReply {
                    content: "The answer is 42.".to_string(),
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                })
            }
        }

        async fn stream(
            &self,
            _messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> crate::Result<futures::stream::BoxStream<'static, crate::Result<String>>> {
            Ok(Box::pin(futures::stream::empty()))
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                supports_tools: true,
                ..Default::default()
            }
        }
    }

    fn registry_with_add_numbers() -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        registry
            .register(
                tool("add_numbers", "Add two numbers")
                    .param("a", "int")
                    .param("b", "int")
                    .build(|args| async move {
                        let a = args["a"].as_i64().unwrap_or(0);
                        let b = args["b"].as_i64().unwrap_or(0);
                        Ok(serde_json::json!({"result": a + b}))
                    }),
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn forwards_prompt_and_returns_success() {
        let tools = Arc::new(ToolRegistry::new());
        let executor = Arc::new(ToolExecutor::new(tools.clone()));
        let agent = BaseAgent::new(
            "chat_assistant",
            ConfigStore::with_defaults(),
            Arc::new(EchoProvider),
            tools,
            executor,
            "local-standard",
            None,
        );
        let response = agent.process_request(&AgentRequest::new("hello there")).await;
        assert_eq!(response.content, "echo: hello there");
    }

    #[tokio::test]
    async fn executes_a_tool_call_and_returns_the_final_text() {
        let tools = registry_with_add_numbers();
        let executor = Arc::new(ToolExecutor::new(tools.clone()));
        let agent = BaseAgent::new(
            "chat_assistant",
            ConfigStore::with_defaults(),
            Arc::new(OneShotToolCallProvider { called: AtomicU32::new(0) }),
            tools,
            executor,
            "local-standard",
            None,
        );
        let mut request = AgentRequest::new("what is 25 + 17?");
        request.relevant_tools = vec!["add_numbers".to_string()];
        let response = agent.process_request(&request).await;
        assert!(response.content.contains("42"));
        assert!(response.metadata.contains_key("tools_invoked"));
    }

    #[tokio::test]
    async fn request_model_override_wins_over_default() {
        struct CapturingProvider {
            seen_model: std::sync::Mutex<Option<String>>,
        }
        #[async_trait]
        impl Provider for CapturingProvider {
            async fn request(
                &self,
                _messages: &[ProviderMessage],
                options: &CompletionOptions,
            ) -> crate::Result<ProviderReply> {
                *self.seen_model.lock().unwrap() = Some(options.model.clone());
                Ok(ProviderReply::default())
            }
            async fn stream(
                &self,
                _messages: &[ProviderMessage],
                _options: &CompletionOptions,
            ) -> crate::Result<futures::stream::BoxStream<'static, crate::Result<String>>> {
                Ok(Box::pin(futures::stream::empty()))
            }
            fn capabilities(&self) -> Capabilities {
                Capabilities::default()
            }
        }

        let tools = Arc::new(ToolRegistry::new());
        let executor = Arc::new(ToolExecutor::new(tools.clone()));
        let provider = Arc::new(CapturingProvider {
            seen_model: std::sync::Mutex::new(None),
        });
        let agent = BaseAgent::new(
            "chat_assistant",
            ConfigStore::with_defaults(),
            provider.clone(),
            tools,
            executor,
            "local-standard",
            None,
        );
        let mut request = AgentRequest::new("hi");
        request.model = Some("local-large".to_string());
        agent.process_request(&request).await;
        assert_eq!(provider.seen_model.lock().unwrap().as_deref(), Some("local-large"));
    }

    #[tokio::test]
    async fn provider_error_becomes_an_error_response_not_a_panic() {
        struct FailingProvider;
        #[async_trait]
        impl Provider for FailingProvider {
            async fn request(
                &self,
                _messages: &[ProviderMessage],
                _options: &CompletionOptions,
            ) -> crate::Result<ProviderReply> {
                Err(crate::Error::ProviderTimeout)
            }
            async fn stream(
                &self,
                _messages: &[ProviderMessage],
                _options: &CompletionOptions,
            ) -> crate::Result<futures::stream::BoxStream<'static, crate::Result<String>>> {
                Ok(Box::pin(futures::stream::empty()))
            }
            fn capabilities(&self) -> Capabilities {
                Capabilities::default()
            }
        }
        let tools = Arc::new(ToolRegistry::new());
        let executor = Arc::new(ToolExecutor::new(tools.clone()));
        let agent = BaseAgent::new(
            "chat_assistant",
            ConfigStore::with_defaults(),
            Arc::new(FailingProvider),
            tools,
            executor,
            "local-standard",
            None,
        );
        let response = agent.process_request(&AgentRequest::new("hi")).await;
        assert_eq!(response.status, super::super::AgentStatus::Error);
        assert!(response.content.starts_with("An error occurred"));
    }
}
