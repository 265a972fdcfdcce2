//! Wraps a [`ToolFinder`] strategy behind the [`Agent`] trait so the
//! orchestrator can dispatch to it the same way it dispatches to any other
//! agent (§4.10's "special constructor path" for orchestration-internal
//! agents).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool_finder::ToolFinder;

use super::{Agent, AgentRequest, AgentResponse, AgentStatus};

/// An agent whose "answer" is the set of tool names relevant to the
/// request, carried in `metadata["tools"]` rather than in `content`.
pub struct ToolFinderAgent {
    id: String,
    finder: Arc<dyn ToolFinder>,
}

impl ToolFinderAgent {
    /// Build a tool-finder agent registered under `id`, delegating to `finder`.
    pub fn new(id: impl Into<String>, finder: Arc<dyn ToolFinder>) -> Self {
        Self { id: id.into(), finder }
    }
}

#[async_trait]
impl Agent for ToolFinderAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn process_request(&self, request: &AgentRequest) -> AgentResponse {
        let recent_messages: Vec<String> = request
            .metadata
            .get("recent_messages")
            .and_then(|v| v.as_array())
            .map(|array| array.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        match self.finder.find_tools(&request.prompt, &recent_messages).await {
            Ok(tools) => {
                let mut sorted: Vec<String> = tools.into_iter().collect();
                sorted.sort();
                let mut metadata = std::collections::HashMap::new();
                metadata.insert(
                    "tools".to_string(),
                    Value::Array(sorted.into_iter().map(Value::String).collect()),
                );
                AgentResponse::with_metadata(AgentStatus::Success, metadata)
            }
            Err(e) => {
                log::warn!("tool finder agent: {e}, degrading to no tools found");
                AgentResponse::with_metadata(AgentStatus::Partial, std::collections::HashMap::from([(
                    "tools".to_string(),
                    Value::Array(Vec::new()),
                )]))
            }
        }
    }

    fn can_handle(&self, _request: &AgentRequest) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::collections::HashSet;

    struct AlwaysFailsFinder;

    #[async_trait]
    impl ToolFinder for AlwaysFailsFinder {
        async fn find_tools(&self, _prompt: &str, _recent_messages: &[String]) -> Result<HashSet<String>> {
            Err(crate::error::Error::tool_finder("simulated failure"))
        }
    }

    struct FixedFinder(Vec<&'static str>);

    #[async_trait]
    impl ToolFinder for FixedFinder {
        async fn find_tools(&self, _prompt: &str, _recent_messages: &[String]) -> Result<HashSet<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    #[tokio::test]
    async fn successful_find_reports_tools_in_metadata() {
        let agent = ToolFinderAgent::new("tool_finder", Arc::new(FixedFinder(vec!["add_numbers"])));
        let response = agent.process_request(&AgentRequest::new("what is 2+2")).await;
        assert_eq!(response.status, AgentStatus::Success);
        assert_eq!(response.metadata["tools"], serde_json::json!(["add_numbers"]));
    }

    #[tokio::test]
    async fn a_failing_finder_degrades_to_an_empty_tool_list_not_a_crash() {
        let agent = ToolFinderAgent::new("tool_finder", Arc::new(AlwaysFailsFinder));
        let response = agent.process_request(&AgentRequest::new("anything")).await;
        assert_eq!(response.status, AgentStatus::Partial);
        assert_eq!(response.metadata["tools"], serde_json::json!([]));
    }

    #[test]
    fn tool_finder_agent_never_self_selects_for_direct_routing() {
        let agent = ToolFinderAgent::new("tool_finder", Arc::new(FixedFinder(vec![])));
        assert_eq!(agent.can_handle(&AgentRequest::new("anything")), 0.0);
    }
}
