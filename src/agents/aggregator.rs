//! Merges the responses of several dispatched agents into one (§4.11).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::prompt_template::PromptTemplateStore;
use crate::provider::{CompletionOptions, Provider, ProviderMessage};

use super::{Agent, AgentRequest, AgentResponse, AgentStatus};

/// Template id consulted by [`ResponseAggregator`] before falling back to
/// its hardcoded merge prompt (§4.7).
pub const RESPONSE_AGGREGATOR_TEMPLATE: &str = "response_aggregator";

/// One agent's contribution passed into [`ResponseAggregator::aggregate`],
/// carrying the confidence the Request Analyzer assigned it.
#[derive(Debug, Clone)]
pub struct ScoredResponse {
    /// id of the agent that produced `response`
    pub agent_id: String,
    /// the Request Analyzer's confidence for this agent, used for ordering
    /// and as the aggregation-failure fallback criterion
    pub confidence: f32,
    /// the agent's own output
    pub response: AgentResponse,
}

/// Combines zero, one, or many agent responses into a single final answer.
pub struct ResponseAggregator {
    provider: Arc<dyn Provider>,
    model: String,
    templates: Option<Arc<PromptTemplateStore>>,
}

impl ResponseAggregator {
    /// Build an aggregator that calls `model` through `provider` when two
    /// or more responses need merging.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            templates: None,
        }
    }

    /// Consult `store` for the `response_aggregator` template before falling
    /// back to the hardcoded merge prompt.
    pub fn with_templates(mut self, store: Arc<PromptTemplateStore>) -> Self {
        self.templates = Some(store);
        self
    }

    fn responses_block(responses: &[ScoredResponse]) -> String {
        let mut out = String::new();
        for (i, scored) in responses.iter().enumerate() {
            out.push_str(&format!(
                "--- Response {} ({}, confidence={:.2}, status={:?}) ---\n{}\n\n",
                i + 1,
                scored.agent_id,
                scored.confidence,
                scored.response.status,
                scored.response.content,
            ));
        }
        out
    }

    fn build_prompt(&self, original_request: &str, responses: &[ScoredResponse]) -> String {
        let responses_block = Self::responses_block(responses);

        if let Some(store) = &self.templates {
            let mut vars = HashMap::new();
            vars.insert("original_request".to_string(), original_request.to_string());
            vars.insert("responses".to_string(), responses_block.clone());
            if let Some(rendered) = store.render_or_none(RESPONSE_AGGREGATOR_TEMPLATE, &vars) {
                return rendered;
            }
        }

        format!(
            "Original request: {original_request}\n\n\
             Combine the following agent responses into one coherent answer. \
             Prefer higher-confidence responses when they disagree.\n\n{responses_block}"
        )
    }

    fn highest_confidence(responses: &[ScoredResponse]) -> &ScoredResponse {
        responses
            .iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
            .expect("caller guarantees at least one response")
    }

    /// Merge `responses` gathered for `original_request` into one
    /// `AgentResponse`, per §4.11's 0/1/≥2-response rules.
    pub async fn aggregate(&self, responses: &[ScoredResponse], original_request: &str) -> AgentResponse {
        match responses.len() {
            0 => AgentResponse::error(
                "No agents were able to process your request.",
                "no agents matched the request",
            ),
            1 => {
                let mut response = responses[0].response.clone();
                response.contributing_agents = vec![responses[0].agent_id.clone()];
                response
            }
            _ => {
                let contributing: Vec<String> = responses.iter().map(|s| s.agent_id.clone()).collect();
                let built_prompt = self.build_prompt(original_request, responses);
                let options = CompletionOptions {
                    model: self.model.clone(),
                    ..Default::default()
                };
                match self
                    .provider
                    .request(&[ProviderMessage::user(built_prompt)], &options)
                    .await
                {
                    Ok(reply) => {
                        let mut response = AgentResponse::success(reply.content);
                        response.contributing_agents = contributing;
                        response
                    }
                    Err(e) => {
                        log::warn!("response aggregation failed: {e}, falling back to highest-confidence response");
                        let fallback = Self::highest_confidence(responses);
                        let mut response = fallback.response.clone();
                        response.status = AgentStatus::Partial;
                        response.contributing_agents = contributing;
                        response
                            .metadata
                            .insert("note".to_string(), Value::String(format!("aggregation error: {e}")));
                        response
                    }
                }
            }
        }
    }
}

/// Exposes [`ResponseAggregator`] through the [`Agent`] trait so the
/// orchestrator can dispatch to it uniformly. Expects the scored responses
/// to aggregate serialized in `request.metadata["responses"]` (an array of
/// `{agent_id, confidence, response}` objects) — the orchestrator builds
/// this request rather than a user ever constructing one directly.
pub struct ResponseAggregatorAgent {
    id: String,
    aggregator: ResponseAggregator,
}

impl ResponseAggregatorAgent {
    /// Build the aggregator agent registered under `id`.
    pub fn new(id: impl Into<String>, aggregator: ResponseAggregator) -> Self {
        Self { id: id.into(), aggregator }
    }
}

#[async_trait]
impl Agent for ResponseAggregatorAgent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn process_request(&self, request: &AgentRequest) -> AgentResponse {
        let responses: Vec<ScoredResponse> = request
            .metadata
            .get("responses")
            .and_then(|v| v.as_array())
            .map(|array| {
                array
                    .iter()
                    .filter_map(|entry| {
                        let agent_id = entry.get("agent_id")?.as_str()?.to_string();
                        let confidence = entry.get("confidence")?.as_f64()? as f32;
                        let response: AgentResponse =
                            serde_json::from_value(entry.get("response")?.clone()).ok()?;
                        Some(ScoredResponse { agent_id, confidence, response })
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.aggregator.aggregate(&responses, &request.prompt).await
    }

    fn can_handle(&self, _request: &AgentRequest) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Capabilities, ProviderReply};

    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn request(
            &self,
            _messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> crate::Result<ProviderReply> {
            Ok(ProviderReply {
                content: self.reply.clone(),
                tool_calls: Vec::new(),
                finish_reason: None,
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
            Capabilities::default()
        }
    }

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

    fn scored(agent_id: &str, confidence: f32, content: &str) -> ScoredResponse {
        ScoredResponse {
            agent_id: agent_id.to_string(),
            confidence,
            response: AgentResponse::success(content),
        }
    }

    #[tokio::test]
    async fn zero_responses_is_an_error() {
        let aggregator = ResponseAggregator::new(Arc::new(StubProvider { reply: String::new() }), "local-small");
        let response = aggregator.aggregate(&[], "hello").await;
        assert_eq!(response.status, AgentStatus::Error);
    }

    #[tokio::test]
    async fn one_response_is_returned_enriched_with_its_own_agent_id() {
        let aggregator = ResponseAggregator::new(Arc::new(StubProvider { reply: String::new() }), "local-small");
        let response = aggregator
            .aggregate(&[scored("coding_assistant", 0.9, "here's your function")], "write a function")
            .await;
        assert_eq!(response.content, "here's your function");
        assert_eq!(response.contributing_agents, vec!["coding_assistant".to_string()]);
    }

    #[tokio::test]
    async fn two_or_more_responses_are_merged_via_the_model() {
        let aggregator = ResponseAggregator::new(
            Arc::new(StubProvider { reply: "merged answer".to_string() }),
            "local-small",
        );
        let response = aggregator
            .aggregate(
                &[scored("coding_assistant", 0.9, "a"), scored("chat_assistant", 0.4, "b")],
                "help me",
            )
            .await;
        assert_eq!(response.content, "merged answer");
        assert_eq!(response.status, AgentStatus::Success);
        assert_eq!(response.contributing_agents.len(), 2);
    }

    #[tokio::test]
    async fn two_or_more_responses_use_a_registered_template_over_the_hardcoded_fallback() {
        let store = Arc::new(crate::prompt_template::PromptTemplateStore::new());
        store.create_template(
            RESPONSE_AGGREGATOR_TEMPLATE,
            "Merge for: {{original_request}}\n{{responses}}",
            HashMap::new(),
            HashMap::new(),
        );
        let aggregator = ResponseAggregator::new(
            Arc::new(StubProvider { reply: "merged answer".to_string() }),
            "local-small",
        )
        .with_templates(store);
        let response = aggregator
            .aggregate(
                &[scored("coding_assistant", 0.9, "a"), scored("chat_assistant", 0.4, "b")],
                "help me",
            )
            .await;
        assert_eq!(response.content, "merged answer");
    }

    #[tokio::test]
    async fn aggregation_failure_falls_back_to_highest_confidence_with_partial_status() {
        let aggregator = ResponseAggregator::new(Arc::new(FailingProvider), "local-small");
        let response = aggregator
            .aggregate(
                &[scored("chat_assistant", 0.4, "b"), scored("coding_assistant", 0.9, "a")],
                "help me",
            )
            .await;
        assert_eq!(response.status, AgentStatus::Partial);
        assert_eq!(response.content, "a");
        assert!(response.metadata.get("note").unwrap().as_str().unwrap().contains("aggregation error"));
    }
}
