//! Error types for the orchestration runtime.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the runtime.
///
/// Variants are grouped by the subsystem that raises them: setup/config,
/// provider I/O, tool execution, agent processing, conversation/prompt
/// handling, and orchestration-level failures. Tool and agent failures are
/// usually captured into `ToolResult`/`AgentResponse` before they reach this
/// type; see the `tools` and `agents` modules for that boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A named config entry (model/provider/agent/use-case/tool) was not found.
    #[error("{kind} config not found: {id}")]
    ConfigNotFound {
        /// catalog kind, e.g. "model", "provider"
        kind: &'static str,
        /// the id that was looked up
        id: String,
    },

    /// API error from the model server
    #[error("API error: {0}")]
    Api(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// A tool name was requested but never registered.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Registration was attempted twice under the same name.
    #[error("Tool already registered: {0}")]
    ToolAlreadyRegistered(String),

    /// Arguments failed schema validation before the handler ran.
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    ToolInvalidArguments {
        /// tool name
        tool: String,
        /// human-readable validation failure
        reason: String,
    },

    /// A tool call exceeded its allotted time budget.
    #[error("Tool '{0}' timeout")]
    ToolTimeout(String),

    /// No agent is registered under the requested id.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// An agent raised while processing a request.
    #[error("Agent '{agent}' failed: {reason}")]
    AgentProcessingFailed {
        /// agent id
        agent: String,
        /// failure reason
        reason: String,
    },

    /// A named prompt template does not exist.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A template was rendered without a required variable and no default.
    #[error("Template '{template}' is missing variable '{variable}'")]
    MissingVariable {
        /// template id
        template: String,
        /// variable name
        variable: String,
    },

    /// A model/agent response could not be parsed into the expected shape.
    #[error("Failed to parse response: {0}")]
    ResponseParseFailed(String),

    /// No model in the catalog satisfies the requested constraints.
    #[error("No suitable model for use case '{0}'")]
    NoSuitableModel(String),

    /// Response aggregation failed after at least one agent succeeded.
    #[error("Aggregation failed: {0}")]
    AggregationFailed(String),

    /// The Tool Finder's LLM strategy failed transiently. Callers treat
    /// this as "no tools found" and continue (§4.5).
    #[error("Tool finder failed: {0}")]
    ToolFinderError(String),

    /// Provider rejected credentials.
    #[error("Provider authentication failed: {0}")]
    ProviderAuth(String),

    /// Provider asked the caller to slow down.
    #[error("Provider rate limited{}", .retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    ProviderRateLimited {
        /// seconds to wait before retrying, if the provider supplied one
        retry_after: Option<u64>,
    },

    /// Provider did not respond within its configured timeout.
    #[error("Provider timed out")]
    ProviderTimeout,

    /// Provider returned a response this crate could not interpret.
    #[error("Provider returned an unexpected response: {0}")]
    ProviderBadResponse(String),

    /// Provider is unreachable or refused the connection.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a config-not-found error
    pub fn config_not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::ConfigNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a new stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }

    /// Create a new tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    /// Create a tool-invalid-arguments error
    pub fn tool_invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ToolInvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create an agent-processing-failed error
    pub fn agent_processing_failed(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::AgentProcessingFailed {
            agent: agent.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-variable error
    pub fn missing_variable(template: impl Into<String>, variable: impl Into<String>) -> Self {
        Error::MissingVariable {
            template: template.into(),
            variable: variable.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create a tool-finder error
    pub fn tool_finder(msg: impl Into<String>) -> Self {
        Error::ToolFinderError(msg.into())
    }

    /// Create a timeout error
    pub fn timeout() -> Self {
        Error::Timeout
    }

    /// Whether this error represents a transient condition worth retrying
    /// (timeouts and rate limits), matching the retry policy in §7 of the
    /// design: only these kinds are retried automatically by the tool
    /// executor and provider retry loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::ToolTimeout(_)
                | Error::ProviderTimeout
                | Error::ProviderRateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::config("Invalid model");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Invalid configuration: Invalid model");
    }

    #[test]
    fn test_error_config_not_found() {
        let err = Error::config_not_found("model", "gpt-5");
        assert_eq!(err.to_string(), "model config not found: gpt-5");
    }

    #[test]
    fn test_error_api() {
        let err = Error::api("500 Internal Server Error");
        assert!(matches!(err, Error::Api(_)));
        assert_eq!(err.to_string(), "API error: 500 Internal Server Error");
    }

    #[test]
    fn test_error_stream() {
        let err = Error::stream("Connection lost");
        assert!(matches!(err, Error::Stream(_)));
        assert_eq!(err.to_string(), "Streaming error: Connection lost");
    }

    #[test]
    fn test_error_tool() {
        let err = Error::tool("Tool not found");
        assert!(matches!(err, Error::Tool(_)));
        assert_eq!(err.to_string(), "Tool execution error: Tool not found");
    }

    #[test]
    fn test_error_tool_invalid_arguments() {
        let err = Error::tool_invalid_arguments("add_numbers", "missing field `a`");
        assert_eq!(
            err.to_string(),
            "Invalid arguments for tool 'add_numbers': missing field `a`"
        );
    }

    #[test]
    fn test_error_no_suitable_model() {
        let err = Error::NoSuitableModel("coding".to_string());
        assert_eq!(err.to_string(), "No suitable model for use case 'coding'");
    }

    #[test]
    fn test_error_is_transient() {
        assert!(Error::Timeout.is_transient());
        assert!(Error::ToolTimeout("slow_tool".into()).is_transient());
        assert!(Error::ProviderTimeout.is_transient());
        assert!(
            Error::ProviderRateLimited {
                retry_after: Some(5)
            }
            .is_transient()
        );
        assert!(!Error::config("bad").is_transient());
        assert!(!Error::ToolNotFound("x".into()).is_transient());
    }

    #[test]
    fn test_error_invalid_input() {
        let err = Error::invalid_input("Missing parameter");
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(err.to_string(), "Invalid input: Missing parameter");
    }

    #[test]
    fn test_error_timeout() {
        let err = Error::timeout();
        assert!(matches!(err, Error::Timeout));
        assert_eq!(err.to_string(), "Request timeout");
    }

    #[test]
    fn test_error_other() {
        let err = Error::other("Something went wrong");
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "Error: Something went wrong");
    }

    #[test]
    fn test_error_from_reqwest() {
        fn _test_conversion(_e: reqwest::Error) -> Error {
            Error::Http(_e)
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn _returns_result() -> Result<i32> {
            Ok(42)
        }

        fn _returns_error() -> Result<i32> {
            Err(Error::timeout())
        }
    }
}
