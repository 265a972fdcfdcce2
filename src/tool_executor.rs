//! # Tool Executor
//!
//! Executes one tool call with a timeout, capped-exponential retry on
//! transient failures, optional result caching, and argument validation
//! against the tool's declared schema. A failing tool never aborts the
//! surrounding request; every outcome, including exhausted retries, is
//! captured in a [`ToolResult`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::Error;
use crate::tool_registry::ToolRegistry;

/// The outcome of executing a tool, whatever happened.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolResult {
    /// tool name this result belongs to
    pub tool_name: String,
    /// whether the handler returned successfully
    pub success: bool,
    /// the handler's return value, when `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// a human-readable failure reason, when not `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// wall-clock time spent executing, including retries
    pub duration_ms: u64,
}

/// Tunables for a [`ToolExecutor`]. Defaults match the reference
/// implementation: 30s timeout, 3 retries, `min(2^attempt, 10)` second
/// backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// per-attempt timeout
    pub timeout: Duration,
    /// number of retries after the first attempt (so `retries + 1` total attempts)
    pub max_retries: u32,
    /// whether successful results are cached by `(tool_name, canonical args)`
    pub cache_enabled: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            cache_enabled: false,
        }
    }
}

/// Executes tools looked up from a [`ToolRegistry`].
pub struct ToolExecutor {
    registry: std::sync::Arc<ToolRegistry>,
    config: ExecutorConfig,
    cache: Mutex<HashMap<String, ToolResult>>,
}

impl ToolExecutor {
    /// Build an executor with default tunables.
    pub fn new(registry: std::sync::Arc<ToolRegistry>) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    /// Build an executor with explicit tunables.
    pub fn with_config(registry: std::sync::Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        Self {
            registry,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop all cached results.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Execute `tool_name` with `arguments`, retrying transient failures.
    pub async fn execute(&self, tool_name: &str, arguments: Value) -> ToolResult {
        let started = Instant::now();

        let Some(tool) = self.registry.get(tool_name) else {
            return ToolResult {
                tool_name: tool_name.to_string(),
                success: false,
                result: None,
                error: Some(Error::ToolNotFound(tool_name.to_string()).to_string()),
                duration_ms: elapsed_ms(started),
            };
        };

        let cache_key = self.cache_key(tool_name, &arguments);
        if self.config.cache_enabled {
            if let Some(cached) = cache_key
                .as_ref()
                .and_then(|key| self.cache.lock().ok()?.get(key).cloned())
            {
                return cached;
            }
        }

        if let Err(reason) = validate_arguments(tool.input_schema(), &arguments) {
            return ToolResult {
                tool_name: tool_name.to_string(),
                success: false,
                result: None,
                error: Some(reason),
                duration_ms: elapsed_ms(started),
            };
        }

        let mut attempt = 0u32;
        loop {
            let outcome = tokio::time::timeout(self.config.timeout, tool.execute(arguments.clone())).await;

            let (success, result, error, transient) = match outcome {
                Ok(Ok(value)) => (true, Some(value), None, false),
                Ok(Err(e)) => {
                    let transient = e.is_transient();
                    (false, None, Some(e.to_string()), transient)
                }
                Err(_) => (false, None, Some(Error::ToolTimeout(tool_name.to_string()).to_string()), true),
            };

            if success || !transient || attempt >= self.config.max_retries {
                let final_result = ToolResult {
                    tool_name: tool_name.to_string(),
                    success,
                    result,
                    error,
                    duration_ms: elapsed_ms(started),
                };
                if success && self.config.cache_enabled {
                    if let Some(key) = cache_key {
                        if let Ok(mut cache) = self.cache.lock() {
                            cache.insert(key, final_result.clone());
                        }
                    }
                }
                return final_result;
            }

            let backoff_secs = 2u64.pow(attempt).min(10);
            tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            attempt += 1;
        }
    }

    fn cache_key(&self, tool_name: &str, arguments: &Value) -> Option<String> {
        if !self.config.cache_enabled {
            return None;
        }
        Some(format!("{tool_name}:{}", canonical_json(arguments)))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// A stable string form of a JSON value used as a cache key: object keys
/// are sorted so that `{"a":1,"b":2}` and `{"b":2,"a":1}` collide.
fn canonical_json(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                let sorted: serde_json::Map<String, Value> = entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort(v)))
                    .collect();
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    sort(value).to_string()
}

/// Structural validation of `arguments` against `schema`: every
/// non-optional property in the schema's `required` array must be present,
/// and each present property's declared `type` must match.
fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Some(schema_obj) = schema.as_object() else {
        return Ok(());
    };
    let Some(properties) = schema_obj.get("properties").and_then(|p| p.as_object()) else {
        return Ok(());
    };
    let Some(args_obj) = arguments.as_object() else {
        return Err("arguments must be a JSON object".to_string());
    };

    if let Some(required) = schema_obj.get("required").and_then(|r| r.as_array()) {
        for name in required {
            let Some(name) = name.as_str() else { continue };
            if !args_obj.contains_key(name) {
                return Err(format!("missing required argument '{name}'"));
            }
        }
    }

    for (name, value) in args_obj {
        let Some(prop_schema) = properties.get(name).and_then(|p| p.as_object()) else {
            continue;
        };
        let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) else {
            continue;
        };
        if !type_matches(expected_type, value) {
            return Err(format!(
                "argument '{name}' expected type '{expected_type}', got '{}'",
                json_type_name(value)
            ));
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn registry_with(tool: crate::tools::Tool) -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(tool).unwrap();
        registry
    }

    #[tokio::test]
    async fn successful_tool_passes_through_unchanged() {
        let registry = registry_with(
            tool("add_numbers", "Add two numbers")
                .param("a", "int")
                .param("b", "int")
                .build(|args| async move {
                    let a = args["a"].as_i64().unwrap_or(0);
                    let b = args["b"].as_i64().unwrap_or(0);
                    Ok(serde_json::json!({ "result": a + b }))
                }),
        );
        let executor = ToolExecutor::new(registry);
        let result = executor
            .execute("add_numbers", serde_json::json!({"a": 25, "b": 17}))
            .await;
        assert!(result.success);
        assert_eq!(result.result.unwrap()["result"], 42);
    }

    #[tokio::test]
    async fn unknown_tool_fails_without_retry() {
        let registry = Arc::new(ToolRegistry::new());
        let executor = ToolExecutor::new(registry);
        let result = executor.execute("missing", serde_json::json!({})).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn always_failing_handler_retries_max_retries_plus_one_times_when_transient() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let registry = registry_with(tool("always_fails", "always fails").build(move |_| {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::ProviderTimeout)
            }
        }));
        let executor = ToolExecutor::with_config(
            registry,
            ExecutorConfig {
                timeout: Duration::from_millis(50),
                max_retries: 2,
                cache_enabled: false,
            },
        );
        let result = executor.execute("always_fails", serde_json::json!({})).await;
        assert!(!result.success);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_failure_is_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let registry = registry_with(tool("always_fails", "always fails").build(move |_| {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::tool("permanent failure"))
            }
        }));
        let executor = ToolExecutor::with_config(
            registry,
            ExecutorConfig {
                timeout: Duration::from_millis(50),
                max_retries: 2,
                cache_enabled: false,
            },
        );
        let result = executor.execute("always_fails", serde_json::json!({})).await;
        assert!(!result.success);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let registry = registry_with(tool("slow", "sleeps").build(|_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Value::Null)
        }));
        let executor = ToolExecutor::with_config(
            registry,
            ExecutorConfig {
                timeout: Duration::from_millis(20),
                max_retries: 0,
                cache_enabled: false,
            },
        );
        let result = executor.execute("slow", serde_json::json!({})).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn invalid_arguments_skip_the_handler_entirely() {
        let called = Arc::new(AtomicU32::new(0));
        let called_clone = called.clone();
        let registry = registry_with(
            tool("needs_a", "needs argument a")
                .param("a", "int")
                .build(move |_| {
                    let called = called_clone.clone();
                    async move {
                        called.fetch_add(1, Ordering::SeqCst);
                        Ok(Value::Null)
                    }
                }),
        );
        let executor = ToolExecutor::new(registry);
        let result = executor.execute("needs_a", serde_json::json!({})).await;
        assert!(!result.success);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
