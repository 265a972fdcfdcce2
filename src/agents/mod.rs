//! # Agents
//!
//! Specialized request handlers that sit behind the uniform [`Agent`]
//! trait: a base text agent with the tool-call loop, thin domain wrappers
//! around it (coding, listening), and the two orchestration-internal
//! agents (tool finding, response aggregation). The top-level coordinating
//! agent lives in [`crate::orchestrator`] to keep this module free of the
//! cyclic Orchestrator ↔ Factory ↔ Registry references (§9).

mod aggregator;
mod base;
mod specialized;
mod tool_finder_agent;

pub use aggregator::{ResponseAggregator, ResponseAggregatorAgent};
pub use base::BaseAgent;
pub use specialized::{CodingAssistantAgent, ListenerAgent};
pub use tool_finder_agent::ToolFinderAgent;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::UseCase;

/// The normalized request an [`Agent`] processes. The orchestrator builds
/// this from the raw user prompt, enriching it per-agent with a resolved
/// model, relevant tools, and orchestration context before dispatch.
#[derive(Debug, Clone, Default)]
pub struct AgentRequest {
    /// id correlating this invocation back to a `RequestRecord`
    pub request_id: Option<String>,
    /// the text the agent should act on
    pub prompt: String,
    /// model id override; falls back to the agent's own default
    pub model: Option<String>,
    /// system prompt override; falls back to the agent's own default
    pub system_prompt: Option<String>,
    /// use case this request was classified into, if known
    pub use_case: Option<UseCase>,
    /// tool names the orchestrator's Tool Finder judged relevant
    pub relevant_tools: Vec<String>,
    /// free-form metadata (e.g. orchestrator id, confidence)
    pub metadata: HashMap<String, Value>,
}

impl AgentRequest {
    /// A bare request carrying only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

/// How an [`Agent`] finished processing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// the agent produced a complete, trustworthy answer
    Success,
    /// the agent produced something, but with caveats (e.g. a fallback path)
    Partial,
    /// the agent failed to produce a usable answer
    Error,
}

/// The normalized output of [`Agent::process_request`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AgentResponse {
    /// the agent's answer text
    pub content: String,
    /// how the agent finished
    pub status: AgentStatus,
    /// free-form metadata (e.g. selected tools, aggregation notes)
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// agent ids that contributed to this response, set during aggregation
    #[serde(default)]
    pub contributing_agents: Vec<String>,
    /// failure detail, set when `status == Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    /// A successful response with no metadata.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: AgentStatus::Success,
            metadata: HashMap::new(),
            contributing_agents: Vec::new(),
            error: None,
        }
    }

    /// An error response; `content` is the user-visible message, `error`
    /// the underlying detail.
    pub fn error(content: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: AgentStatus::Error,
            metadata: HashMap::new(),
            contributing_agents: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// A response carrying metadata but no free-text answer (e.g. the Tool
    /// Finder agent, whose "content" is a set of selected tool names).
    pub fn with_metadata(status: AgentStatus, metadata: HashMap<String, Value>) -> Self {
        Self {
            content: String::new(),
            status,
            metadata,
            contributing_agents: Vec::new(),
            error: None,
        }
    }
}

/// A request handler specialized for one domain. Every agent the registry
/// can construct implements this.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable id this agent is registered under.
    fn id(&self) -> &str;

    /// Process one request end to end, never panicking or propagating an
    /// exception — failures are captured as `AgentResponse { status: Error, .. }`.
    async fn process_request(&self, request: &AgentRequest) -> AgentResponse;

    /// A lightweight self-assessed confidence that this agent is suited to
    /// `request`, independent of the orchestrator's Request Analyzer pass.
    /// Agents that don't specialize return a flat default.
    fn can_handle(&self, request: &AgentRequest) -> f32 {
        let _ = request;
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_response_success_has_no_error() {
        let response = AgentResponse::success("done");
        assert_eq!(response.status, AgentStatus::Success);
        assert!(response.error.is_none());
    }

    #[test]
    fn agent_response_error_carries_both_content_and_detail() {
        let response = AgentResponse::error("An error occurred", "provider timed out");
        assert_eq!(response.status, AgentStatus::Error);
        assert_eq!(response.error.as_deref(), Some("provider timed out"));
    }
}
