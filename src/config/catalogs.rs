//! Typed catalog entry shapes for the [`super::ConfigStore`].

use serde::{Deserialize, Serialize};

/// Relative capability tier for a model, used by the Model Selector to
/// filter and rank candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// cheapest / smallest models
    Low,
    /// balanced default
    Medium,
    /// largest / most capable models
    High,
}

impl Quality {
    /// Ranking weight used by the Model Selector (`HIGH=3, MEDIUM=2, LOW=1`).
    pub fn weight(self) -> u8 {
        match self {
            Quality::Low => 1,
            Quality::Medium => 2,
            Quality::High => 3,
        }
    }
}

/// Relative latency tier for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// lowest latency
    Fast,
    /// balanced default
    Standard,
    /// highest latency, typically the most capable models
    Slow,
}

impl Speed {
    /// Ranking weight used by the Model Selector (`FAST=3, STANDARD=2, SLOW=1`).
    pub fn weight(self) -> u8 {
        match self {
            Speed::Fast => 3,
            Speed::Standard => 2,
            Speed::Slow => 1,
        }
    }
}

/// Where a model runs. `Local` models never leave the host; `External`
/// models are served by a third-party API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    /// runs on the local machine / network
    Local,
    /// served by an external provider
    External,
}

/// The use case an orchestrated request is classified into. Drives both the
/// default `{quality, speed}` lookup (Model Selector) and the system prompt
/// the selected model is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    /// generic conversational requests; the default when nothing else matches
    Chat,
    /// general-purpose programming requests
    Coding,
    /// Solidity / smart-contract programming requests
    SolidityCoding,
    /// translating text between languages
    Translation,
    /// condensing content into a summary
    Summarization,
    /// creative / marketing / long-form writing
    ContentGeneration,
    /// analyzing structured or tabular data
    DataAnalysis,
    /// analyzing the content of web pages
    WebAnalysis,
    /// generating images from a text description
    ImageGeneration,
}

impl UseCase {
    /// Stable string key used in configuration documents.
    pub fn as_str(self) -> &'static str {
        match self {
            UseCase::Chat => "chat",
            UseCase::Coding => "coding",
            UseCase::SolidityCoding => "solidity_coding",
            UseCase::Translation => "translation",
            UseCase::Summarization => "summarization",
            UseCase::ContentGeneration => "content_generation",
            UseCase::DataAnalysis => "data_analysis",
            UseCase::WebAnalysis => "web_analysis",
            UseCase::ImageGeneration => "image_generation",
        }
    }

    /// Parse a use case from its string key (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chat" => Some(UseCase::Chat),
            "coding" => Some(UseCase::Coding),
            "solidity_coding" | "solidity-coding" => Some(UseCase::SolidityCoding),
            "translation" => Some(UseCase::Translation),
            "summarization" => Some(UseCase::Summarization),
            "content_generation" | "content-generation" => Some(UseCase::ContentGeneration),
            "data_analysis" | "data-analysis" => Some(UseCase::DataAnalysis),
            "web_analysis" | "web-analysis" => Some(UseCase::WebAnalysis),
            "image_generation" | "image-generation" => Some(UseCase::ImageGeneration),
            _ => None,
        }
    }
}

/// Per-token cost model for a model entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// cost per input token
    #[serde(default)]
    pub input_per_token: f64,
    /// cost per output token
    #[serde(default)]
    pub output_per_token: f64,
    /// floor applied to any estimate for this model, regardless of token counts
    #[serde(default)]
    pub minimum: f64,
}

impl CostModel {
    /// Estimate the cost of a request with the given token counts, floored
    /// by `minimum`.
    pub fn estimate(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let raw = self.input_per_token * input_tokens as f64
            + self.output_per_token * output_tokens as f64;
        raw.max(self.minimum)
    }
}

/// `models.<id>` catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// canonical model id; must equal this entry's catalog key
    pub model_id: String,
    /// provider id this model is served through
    pub provider: String,
    /// capability tier
    pub quality: Quality,
    /// latency tier
    pub speed: Speed,
    /// data-locality tier
    pub privacy: Privacy,
    /// default max output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// default sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// per-token cost model
    #[serde(default)]
    pub cost: CostModel,
    /// use cases this model is suited for, most-preferred first
    #[serde(default)]
    pub use_cases: Vec<UseCase>,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// `providers.<id>` catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// environment variable holding the API key for this provider
    pub api_key_env: String,
    /// base URL override; `None` means use the provider adapter's built-in default
    #[serde(default)]
    pub base_url: Option<String>,
    /// request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    60
}

/// `agents.<id>` catalog entry. Missing entries resolve to
/// `AgentEntry::default()`, which is intentionally not an error (§4.1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
    /// human-readable description, surfaced to the Request Analyzer's prompt
    #[serde(default)]
    pub description: String,
    /// model id this agent defaults to when the orchestrator does not override it
    #[serde(default)]
    pub default_model: Option<String>,
    /// system prompt override for this agent
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// `use_cases.<id>` catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UseCaseEntry {
    /// required capability tier
    pub quality: Quality,
    /// required latency tier
    pub speed: Speed,
}

/// `tools.categories.<cat>.<name>` catalog entry. This only describes a
/// tool's advertised shape for configuration purposes; the live handler
/// lives in the Tool Registry, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCatalogEntry {
    /// human-readable description
    pub description: String,
    /// JSON schema for the tool's parameters
    #[serde(default)]
    pub parameters_schema: serde_json::Value,
}
