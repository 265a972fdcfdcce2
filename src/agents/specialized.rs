//! Thin domain wrappers around [`BaseAgent`]: same tool-call loop, different
//! default system prompt and self-assessed suitability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConfigStore;
use crate::provider::Provider;
use crate::tool_executor::ToolExecutor;
use crate::tool_registry::ToolRegistry;

use super::{Agent, AgentRequest, AgentResponse, BaseAgent};

const CODING_SYSTEM_PROMPT: &str =
    "You are a careful coding assistant. Prefer correct, minimal solutions over clever ones, \
     call out edge cases, and use the available tools when they let you verify your answer.";

/// Specializes in code generation, review, and debugging requests.
pub struct CodingAssistantAgent {
    inner: BaseAgent,
}

impl CodingAssistantAgent {
    /// Build the coding assistant registered under `id`.
    pub fn new(
        id: impl Into<String>,
        config: ConfigStore,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        executor: Arc<ToolExecutor>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            inner: BaseAgent::new(
                id,
                config,
                provider,
                tools,
                executor,
                default_model,
                Some(CODING_SYSTEM_PROMPT.to_string()),
            ),
        }
    }
}

#[async_trait]
impl Agent for CodingAssistantAgent {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn process_request(&self, request: &AgentRequest) -> AgentResponse {
        self.inner.process_request(request).await
    }

    fn can_handle(&self, request: &AgentRequest) -> f32 {
        let prompt_lower = request.prompt.to_lowercase();
        const CODE_SIGNALS: &[&str] = &[
            "code", "function", "bug", "error", "compile", "refactor", "algorithm", "script",
            "class", "api", "debug", "test",
        ];
        if CODE_SIGNALS.iter().any(|signal| prompt_lower.contains(signal)) {
            0.85
        } else {
            0.2
        }
    }
}

const LISTENER_SYSTEM_PROMPT: &str =
    "You are a supportive listener. Acknowledge what the person shared, reflect it back \
     briefly, and avoid jumping straight to solutions unless asked.";

/// Specializes in conversational, non-technical requests where the user
/// mainly wants to be heard.
pub struct ListenerAgent {
    inner: BaseAgent,
}

impl ListenerAgent {
    /// Build the listener agent registered under `id`.
    pub fn new(
        id: impl Into<String>,
        config: ConfigStore,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        executor: Arc<ToolExecutor>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            inner: BaseAgent::new(
                id,
                config,
                provider,
                tools,
                executor,
                default_model,
                Some(LISTENER_SYSTEM_PROMPT.to_string()),
            ),
        }
    }
}

#[async_trait]
impl Agent for ListenerAgent {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn process_request(&self, request: &AgentRequest) -> AgentResponse {
        self.inner.process_request(request).await
    }

    fn can_handle(&self, request: &AgentRequest) -> f32 {
        let prompt_lower = request.prompt.to_lowercase();
        const LISTENING_SIGNALS: &[&str] =
            &["feel", "feeling", "stressed", "worried", "frustrated", "overwhelmed", "vent"];
        if LISTENING_SIGNALS.iter().any(|signal| prompt_lower.contains(signal)) {
            0.8
        } else {
            0.15
        }
    }
}
