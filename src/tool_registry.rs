//! # Tool Registry
//!
//! An append-mostly map from tool name to [`Tool`], with per-provider
//! formatting.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::tools::Tool;

/// Registry of tools available to agents and the tool executor.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Tool>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool. Rejects a second registration under the same name.
    pub fn register(&self, tool: Tool) -> Result<()> {
        let mut tools = self
            .tools
            .write()
            .map_err(|_| Error::other("tool registry lock poisoned"))?;
        if tools.contains_key(tool.name()) {
            return Err(Error::ToolAlreadyRegistered(tool.name().to_string()));
        }
        tools.insert(tool.name().to_string(), tool);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Tool> {
        self.tools.read().ok()?.get(name).cloned()
    }

    /// Whether a tool with this name exists.
    pub fn has(&self, name: &str) -> bool {
        self.tools
            .read()
            .map(|t| t.contains_key(name))
            .unwrap_or(false)
    }

    /// `{name: description}` for every registered tool.
    pub fn descriptions(&self) -> HashMap<String, String> {
        self.tools
            .read()
            .map(|t| {
                t.iter()
                    .map(|(name, tool)| (name.clone(), tool.description().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All registered tool names.
    pub fn names(&self) -> Vec<String> {
        self.tools
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Format a subset (or all, if `names` is `None`) of registered tools
    /// for a given provider's wire format.
    ///
    /// - `openai`: `{type: "function", function: {name, description, parameters}}`
    /// - `anthropic`: `{name, description, input_schema}`
    /// - `gemini`: one object with a `function_declarations` array
    /// - anything else: empty list
    pub fn format_for_provider(&self, provider: &str, names: Option<&[String]>) -> Vec<Value> {
        let tools = match self.tools.read() {
            Ok(t) => t,
            Err(_) => return Vec::new(),
        };
        let selected: Vec<&Tool> = tools
            .values()
            .filter(|t| names.is_none_or(|ns| ns.iter().any(|n| n == t.name())))
            .collect();

        match provider.to_lowercase().as_str() {
            "openai" => selected.iter().map(|t| t.to_openai_format()).collect(),
            "anthropic" => selected
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name(),
                        "description": t.description(),
                        "input_schema": t.input_schema(),
                    })
                })
                .collect(),
            "gemini" => {
                let declarations: Vec<Value> = selected
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "name": t.name(),
                            "description": t.description(),
                            "parameters": t.input_schema(),
                        })
                    })
                    .collect();
                vec![serde_json::json!({ "function_declarations": declarations })]
            }
            _ => Vec::new(),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool;

    fn sample_tool() -> Tool {
        tool("add_numbers", "Add two numbers")
            .param("a", "int")
            .param("b", "int")
            .build(|args| async move {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(serde_json::json!({ "result": a + b }))
            })
    }

    #[test]
    fn register_then_get_round_trips() {
        let registry = ToolRegistry::new();
        registry.register(sample_tool()).unwrap();
        let tool = registry.get("add_numbers").unwrap();
        assert_eq!(tool.name(), "add_numbers");
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = ToolRegistry::new();
        registry.register(sample_tool()).unwrap();
        let err = registry.register(sample_tool()).unwrap_err();
        assert!(matches!(err, Error::ToolAlreadyRegistered(_)));
    }

    #[test]
    fn format_for_openai_wraps_as_function() {
        let registry = ToolRegistry::new();
        registry.register(sample_tool()).unwrap();
        let formatted = registry.format_for_provider("openai", None);
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0]["type"], "function");
        assert_eq!(formatted[0]["function"]["name"], "add_numbers");
    }

    #[test]
    fn format_for_anthropic_uses_input_schema() {
        let registry = ToolRegistry::new();
        registry.register(sample_tool()).unwrap();
        let formatted = registry.format_for_provider("anthropic", None);
        assert_eq!(formatted[0]["name"], "add_numbers");
        assert!(formatted[0]["input_schema"].is_object());
    }

    #[test]
    fn format_for_gemini_wraps_in_function_declarations() {
        let registry = ToolRegistry::new();
        registry.register(sample_tool()).unwrap();
        let formatted = registry.format_for_provider("gemini", None);
        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0]["function_declarations"][0]["name"], "add_numbers");
    }

    #[test]
    fn unknown_provider_formats_to_empty_list() {
        let registry = ToolRegistry::new();
        registry.register(sample_tool()).unwrap();
        assert!(registry.format_for_provider("carrier-pigeon", None).is_empty());
    }

    #[test]
    fn format_respects_name_subset() {
        let registry = ToolRegistry::new();
        registry.register(sample_tool()).unwrap();
        registry
            .register(tool("other", "unused").build(|_| async { Ok(Value::Null) }))
            .unwrap();
        let formatted = registry.format_for_provider("openai", Some(&["add_numbers".to_string()]));
        assert_eq!(formatted.len(), 1);
    }
}
