//! # Request Analyzer
//!
//! Classifies a prompt against the menu of available agents, returning an
//! ordered `(agent_id, confidence)` list, and separately against the tool
//! registry's names. Both calls go through a small model; on any failure
//! the analyzer's own errors never propagate — the orchestrator treats a
//! failed classification as "route directly" (§4.8).

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::Result;
use crate::prompt_template::PromptTemplateStore;
use crate::provider::{CompletionOptions, Provider, ProviderMessage};

/// Confidence below which a candidate agent is dropped (§4.8 step 4).
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Template id consulted for [`RequestAnalyzer::analyze_request`] before
/// falling back to the hardcoded prompt (§4.7).
pub const ANALYZE_REQUEST_TEMPLATE: &str = "analyze_request";
/// Template id consulted for [`RequestAnalyzer::analyze_tools`] before
/// falling back to the hardcoded prompt (§4.7).
pub const ANALYZE_TOOLS_TEMPLATE: &str = "analyze_tools";

/// Classifies prompts into ranked agent and tool candidates.
pub struct RequestAnalyzer {
    provider: Arc<dyn Provider>,
    model: String,
    confidence_threshold: f32,
    templates: Option<Arc<PromptTemplateStore>>,
}

impl RequestAnalyzer {
    /// Build an analyzer that queries `model` through `provider`, using the
    /// default confidence threshold.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            templates: None,
        }
    }

    /// Override the confidence threshold applied in [`RequestAnalyzer::analyze_request`].
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Consult `store` for the `analyze_request`/`analyze_tools` templates
    /// before falling back to the hardcoded prompts.
    pub fn with_templates(mut self, store: Arc<PromptTemplateStore>) -> Self {
        self.templates = Some(store);
        self
    }

    fn agent_menu_prompt(&self, prompt: &str, descriptions: &HashMap<String, String>) -> String {
        let mut menu: Vec<String> = descriptions
            .iter()
            .map(|(id, description)| format!("{id}: {description}"))
            .collect();
        menu.sort();
        let agent_menu = menu.join("\n");

        if let Some(store) = &self.templates {
            let mut vars = HashMap::new();
            vars.insert("prompt".to_string(), prompt.to_string());
            vars.insert("agent_menu".to_string(), agent_menu.clone());
            if let Some(rendered) = store.render_or_none(ANALYZE_REQUEST_TEMPLATE, &vars) {
                return rendered;
            }
        }

        format!(
            "Available agents:\n{agent_menu}\n\nRequest: {prompt}\n\n\
             Reply with a JSON array of [agent_id, confidence] pairs, confidence between 0 and 1, \
             e.g. [[\"coding_assistant\", 0.9], [\"chat_assistant\", 0.3]]."
        )
    }

    /// Classify `prompt` against `available_agents`, returning agent ids
    /// paired with confidence, filtered to `>= threshold` and sorted
    /// non-increasing by confidence (stable within ties).
    pub async fn analyze_request(
        &self,
        prompt: &str,
        available_agents: &[String],
        descriptions: &HashMap<String, String>,
    ) -> Result<Vec<(String, f32)>> {
        let built_prompt = self.agent_menu_prompt(prompt, descriptions);
        let options = CompletionOptions {
            model: self.model.clone(),
            ..Default::default()
        };
        let reply = self
            .provider
            .request(&[ProviderMessage::user(built_prompt)], &options)
            .await?;

        let pairs = parse_agent_pairs(&reply.content).unwrap_or_default();

        let mut filtered: Vec<(String, f32)> = pairs
            .into_iter()
            .filter(|(id, confidence)| *confidence >= self.confidence_threshold && available_agents.contains(id))
            .collect();
        filtered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(filtered)
    }

    /// Classify `prompt` against the tool registry, returning selected tool
    /// ids. Mirrors [`RequestAnalyzer::analyze_request`] but expects a bare
    /// JSON array of strings.
    pub async fn analyze_tools(&self, prompt: &str, available_tools: &[String]) -> Result<Vec<String>> {
        let mut menu = available_tools.to_vec();
        menu.sort();
        let tool_menu = menu.join(", ");

        let built_prompt = self
            .templates
            .as_ref()
            .and_then(|store| {
                let mut vars = HashMap::new();
                vars.insert("prompt".to_string(), prompt.to_string());
                vars.insert("tool_menu".to_string(), tool_menu.clone());
                store.render_or_none(ANALYZE_TOOLS_TEMPLATE, &vars)
            })
            .unwrap_or_else(|| {
                format!(
                    "Available tools: {tool_menu}\n\nRequest: {prompt}\n\nReply with a JSON array of tool names relevant to the request."
                )
            });
        let options = CompletionOptions {
            model: self.model.clone(),
            ..Default::default()
        };
        let reply = self
            .provider
            .request(&[ProviderMessage::user(built_prompt)], &options)
            .await?;

        let names: Vec<String> = serde_json::from_str::<Vec<String>>(reply.content.trim())
            .unwrap_or_default()
            .into_iter()
            .filter(|name| available_tools.contains(name))
            .collect();
        Ok(names)
    }
}

/// Parse the model's `[[id, confidence], ...]` reply. Tries strict JSON
/// first; on failure, falls back to regex-extracting `"name", 0.d+` pairs
/// out of whatever text came back (§4.8 step 3).
fn parse_agent_pairs(content: &str) -> Option<Vec<(String, f32)>> {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(content.trim()) {
        if let Some(array) = parsed.as_array() {
            let mut pairs = Vec::new();
            for item in array {
                let Some(pair) = item.as_array() else { continue };
                let Some(id) = pair.first().and_then(|v| v.as_str()) else { continue };
                let Some(confidence) = pair.get(1).and_then(|v| v.as_f64()) else { continue };
                pairs.push((id.to_string(), confidence as f32));
            }
            return Some(pairs);
        }
    }

    let fallback_re = Regex::new(r#""([A-Za-z0-9_\-]+)"\s*,\s*(0\.\d+)"#).ok()?;
    let pairs: Vec<(String, f32)> = fallback_re
        .captures_iter(content)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str().to_string();
            let confidence: f32 = caps.get(2)?.as_str().parse().ok()?;
            Some((id, confidence))
        })
        .collect();
    if pairs.is_empty() { None } else { Some(pairs) }
}
