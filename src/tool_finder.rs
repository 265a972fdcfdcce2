//! # Tool Finder
//!
//! Narrows the full tool registry down to the subset relevant to one
//! prompt. Two interchangeable strategies: [`AiToolFinder`] asks a small
//! model, [`KeywordToolFinder`] falls back to simple lexical overlap with
//! no model call at all.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::prompt_template::PromptTemplateStore;
use crate::provider::{CompletionOptions, Provider, ProviderMessage};
use crate::tool_registry::ToolRegistry;

/// Template id consulted by [`AiToolFinder`] before falling back to its
/// hardcoded prompt (§4.7).
pub const TOOL_FINDER_TEMPLATE: &str = "tool_finder";

/// Finds tools relevant to a prompt. Implementations must never let a
/// transient failure propagate as a crash — §4.5 requires `ToolFinderError`
/// to degrade to "no tools found" at the caller.
#[async_trait]
pub trait ToolFinder: Send + Sync {
    /// Candidate tool names for `prompt`, optionally informed by the most
    /// recent conversation lines.
    async fn find_tools(&self, prompt: &str, recent_messages: &[String]) -> Result<HashSet<String>>;
}

/// Lexical fallback: a tool is selected if any non-stop-word token from its
/// description appears in the lowercased prompt. No model call, so it never
/// fails transiently.
pub struct KeywordToolFinder {
    registry: Arc<ToolRegistry>,
}

impl KeywordToolFinder {
    /// Build a finder over `registry`.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "to", "in", "on", "for", "with", "and", "or", "is", "are", "this",
    "that", "it", "its", "by", "as", "be", "from", "your", "you", "given", "using",
];

fn content_tokens(description: &str) -> Vec<String> {
    description
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

#[async_trait]
impl ToolFinder for KeywordToolFinder {
    async fn find_tools(&self, prompt: &str, _recent_messages: &[String]) -> Result<HashSet<String>> {
        let prompt_lower = prompt.to_lowercase();
        let descriptions = self.registry.descriptions();
        let selected = descriptions
            .into_iter()
            .filter(|(_, description)| {
                content_tokens(description)
                    .iter()
                    .any(|token| prompt_lower.contains(token.as_str()))
            })
            .map(|(name, _)| name)
            .collect();
        Ok(selected)
    }
}

/// LLM-driven strategy: lists every registered tool as `name: description`,
/// optionally prepends recent conversation lines, and asks a small model
/// to return `{"tools": ["..."]}`.
pub struct AiToolFinder {
    registry: Arc<ToolRegistry>,
    provider: Arc<dyn Provider>,
    model: String,
    templates: Option<Arc<PromptTemplateStore>>,
}

impl AiToolFinder {
    /// Build a finder that queries `model` through `provider`.
    pub fn new(registry: Arc<ToolRegistry>, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            registry,
            provider,
            model: model.into(),
            templates: None,
        }
    }

    /// Consult `store` for the `tool_finder` template before falling back to
    /// the hardcoded prompt.
    pub fn with_templates(mut self, store: Arc<PromptTemplateStore>) -> Self {
        self.templates = Some(store);
        self
    }

    fn build_prompt(&self, prompt: &str, recent_messages: &[String]) -> String {
        let descriptions = self.registry.descriptions();
        let mut menu: Vec<String> = descriptions
            .iter()
            .map(|(name, description)| format!("{name}: {description}"))
            .collect();
        menu.sort();
        let tool_menu = menu.join("\n");
        let recent_conversation = recent_messages.join("\n");

        if let Some(store) = &self.templates {
            let mut vars = HashMap::new();
            vars.insert("prompt".to_string(), prompt.to_string());
            vars.insert("tool_menu".to_string(), tool_menu.clone());
            vars.insert("recent_conversation".to_string(), recent_conversation.clone());
            if let Some(rendered) = store.render_or_none(TOOL_FINDER_TEMPLATE, &vars) {
                return rendered;
            }
        }

        let mut out = String::new();
        if !recent_messages.is_empty() {
            out.push_str("Recent conversation:\n");
            for line in recent_messages {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str("Available tools:\n");
        for line in &menu {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!(
            "\nRequest: {prompt}\n\nReply with a JSON object of the shape {{\"tools\": [\"name1\", \"name2\"]}} \
             listing only the tools relevant to the request. If none apply, reply {{\"tools\": []}}."
        ));
        out
    }
}

#[async_trait]
impl ToolFinder for AiToolFinder {
    async fn find_tools(&self, prompt: &str, recent_messages: &[String]) -> Result<HashSet<String>> {
        let built_prompt = self.build_prompt(prompt, recent_messages);
        let options = CompletionOptions {
            model: self.model.clone(),
            ..Default::default()
        };
        let reply = self
            .provider
            .request(&[ProviderMessage::user(built_prompt)], &options)
            .await
            .map_err(|e| crate::error::Error::tool_finder(e.to_string()))?;

        let body = strip_one_fence(reply.content.trim());
        let parsed: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| crate::error::Error::tool_finder(format!("unparseable reply: {e}")))?;
        let names = parsed
            .get("tools")
            .and_then(|v| v.as_array())
            .ok_or_else(|| crate::error::Error::tool_finder("reply missing 'tools' array"))?;

        let mut selected = HashSet::new();
        for name in names {
            let Some(name) = name.as_str() else { continue };
            if self.registry.has(name) {
                selected.insert(name.to_string());
            } else {
                log::warn!("tool finder: model named unknown tool '{name}'");
            }
        }
        Ok(selected)
    }
}

fn strip_one_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Capabilities, ProviderReply};
    use crate::tool;

    fn registry_with_add_and_search() -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        registry
            .register(
                tool("add_numbers", "Adds two numbers together")
                    .param("a", "int")
                    .param("b", "int")
                    .build(|_| async { Ok(serde_json::Value::Null) }),
            )
            .unwrap();
        registry
            .register(
                tool("web_search", "Searches the web for relevant pages")
                    .build(|_| async { Ok(serde_json::Value::Null) }),
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn keyword_finder_selects_tools_whose_description_overlaps_the_prompt() {
        let finder = KeywordToolFinder::new(registry_with_add_and_search());
        let selected = finder.find_tools("what is 25 + 17?", &[]).await.unwrap();
        assert!(selected.contains("add_numbers"));
        assert!(!selected.contains("web_search"));
    }

    #[tokio::test]
    async fn keyword_finder_returns_empty_set_when_nothing_overlaps() {
        let finder = KeywordToolFinder::new(registry_with_add_and_search());
        let selected = finder.find_tools("tell me a joke", &[]).await.unwrap();
        assert!(selected.is_empty());
    }

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
                finish_reason: None,
            })
        }

        async fn stream(
            &self,
            _messages: &[ProviderMessage],
            _options: &CompletionOptions,
        ) -> Result<futures::stream::BoxStream<'static, Result<String>>> {
            Ok(Box::pin(futures::stream::iter(vec![Ok(self.reply.clone())])))
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
    }

    #[tokio::test]
    async fn ai_finder_parses_tool_list_and_drops_unknown_names() {
        let registry = registry_with_add_and_search();
        let provider = Arc::new(StubProvider {
            reply: r#"{"tools": ["add_numbers", "time_travel"]}"#.to_string(),
        });
        let finder = AiToolFinder::new(registry, provider, "local-small".to_string());
        let selected = finder.find_tools("what is 2+2", &[]).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert!(selected.contains("add_numbers"));
    }

    #[tokio::test]
    async fn ai_finder_strips_fenced_code_block_before_parsing() {
        let registry = registry_with_add_and_search();
        let provider = Arc::new(StubProvider {
            reply: "```json\n{\"tools\": [\"web_search\"]}\n```".to_string(),
        });
        let finder = AiToolFinder::new(registry, provider, "local-small".to_string());
        let selected = finder.find_tools("search something", &[]).await.unwrap();
        assert!(selected.contains("web_search"));
    }

    #[tokio::test]
    async fn ai_finder_surfaces_parse_failures_as_tool_finder_error() {
        let registry = registry_with_add_and_search();
        let provider = Arc::new(StubProvider {
            reply: "not json at all".to_string(),
        });
        let finder = AiToolFinder::new(registry, provider, "local-small".to_string());
        let err = finder.find_tools("anything", &[]).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::ToolFinderError(_)));
    }

    #[tokio::test]
    async fn ai_finder_uses_a_registered_template_over_the_hardcoded_fallback() {
        let registry = registry_with_add_and_search();
        let store = Arc::new(crate::prompt_template::PromptTemplateStore::new());
        store.create_template(
            TOOL_FINDER_TEMPLATE,
            "Tools:\n{{tool_menu}}\nRequest: {{prompt}}",
            std::collections::HashMap::new(),
            std::collections::HashMap::new(),
        );
        let provider = Arc::new(StubProvider {
            reply: r#"{"tools": ["add_numbers"]}"#.to_string(),
        });
        let finder = AiToolFinder::new(registry, provider, "local-small".to_string()).with_templates(store);
        let selected = finder.find_tools("what is 2+2", &[]).await.unwrap();
        assert!(selected.contains("add_numbers"));
    }

    #[tokio::test]
    async fn ai_finder_empty_tools_array_is_a_valid_outcome() {
        let registry = registry_with_add_and_search();
        let provider = Arc::new(StubProvider {
            reply: r#"{"tools": []}"#.to_string(),
        });
        let finder = AiToolFinder::new(registry, provider, "local-small".to_string());
        let selected = finder.find_tools("tell me a joke", &[]).await.unwrap();
        assert!(selected.is_empty());
    }
}
