//! # Open Agent SDK - Rust Implementation
//!
//! A production-ready, streaming-first Rust SDK for building AI agents with local OpenAI-compatible servers.
//!
//! ## Overview
//!
//! This SDK provides a clean, ergonomic API for working with local LLM servers such as:
//! - LM Studio
//! - Ollama
//! - llama.cpp
//! - vLLM
//!
//! ## Key Features
//!
//! - **Zero API Costs**: Run models on your own hardware
//! - **Privacy-First**: All data stays local on your machine
//! - **High Performance**: Native async/await with Tokio runtime
//! - **Streaming Responses**: Real-time token-by-token streaming
//! - **Tool Calling**: Define and execute tools with automatic schema generation
//! - **Lifecycle Hooks**: Intercept and control execution at key points
//! - **Interrupts**: Gracefully cancel long-running operations
//! - **Context Management**: Manual token estimation and history truncation
//! - **Retry Logic**: Exponential backoff with jitter for reliability
//!
//! ## Two Interaction Modes
//!
//! ### 1. Simple Query Function (`query()`)
//! For single-turn interactions without conversation state:
//!
//! ```rust,no_run
//! use open_agent::{query, AgentOptions, ContentBlock};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Configure the agent with required settings
//!     let options = AgentOptions::builder()
//!         .system_prompt("You are a helpful assistant")
//!         .model("qwen2.5-32b-instruct")
//!         .base_url("http://localhost:1234/v1")
//!         .build()?;
//!
//!     // Send a single query and stream the response
//!     let mut stream = query("What's the capital of France?", &options).await?;
//!
//!     // Process each content block as it arrives
//!     while let Some(block) = stream.next().await {
//!         match block? {
//!             ContentBlock::Text(text_block) => {
//!                 print!("{}", text_block.text);
//!             }
//!             ContentBlock::ToolUse(tool_block) => {
//!                 println!("Tool called: {}", tool_block.name);
//!             }
//!             ContentBlock::ToolResult(_) => {
//!                 // Tool results can be ignored in simple queries
//!             }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### 2. Client Object (`Client`)
//! For multi-turn conversations with persistent state:
//!
//! ```rust,no_run
//! use open_agent::{Client, AgentOptions, ContentBlock};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = AgentOptions::builder()
//!         .system_prompt("You are a helpful assistant")
//!         .model("qwen2.5-32b-instruct")
//!         .base_url("http://localhost:1234/v1")
//!         .build()?;
//!
//!     // Create a stateful client that maintains conversation history
//!     let mut client = Client::new(options)?;
//!
//!     // First turn
//!     client.send("What's 2+2?").await?;
//!     while let Some(block) = client.receive().await? {
//!         if let ContentBlock::Text(text) = block {
//!             print!("{}", text.text);
//!         }
//!     }
//!
//!     // Second turn - client remembers previous context
//!     client.send("What about if we multiply that by 3?").await?;
//!     while let Some(block) = client.receive().await? {
//!         if let ContentBlock::Text(text) = block {
//!             print!("{}", text.text);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The SDK is organized into several modules, each with a specific responsibility:
//!
//! - **client**: Core streaming query engine and multi-turn client
//! - **types**: Data structures for messages, content blocks, and configuration
//! - **tools**: Tool definition system with automatic JSON schema generation
//! - **hooks**: Lifecycle event system for intercepting execution
//! - **config**: Layered model/provider/agent/use-case catalogs (the Config Store)
//! - **model_selector**: Use-case-driven model selection over the catalogs
//! - **conversation**: Message history with `<think>` block extraction
//! - **tool_registry**: Tool bookkeeping and per-provider wire formatting
//! - **tool_executor**: Timeout, retry, and caching around tool invocation
//! - **provider**: Uniform chat-completion trait plus concrete backends
//! - **error**: Comprehensive error types and conversions
//! - **context**: Token estimation and message truncation utilities
//! - **retry**: Exponential backoff retry logic with jitter
//! - **utils**: Internal utilities for SSE parsing and tool aggregation
//! - **agents**: Specialized request handlers unified behind the `Agent` trait
//! - **agent_registry**: Maps agent ids to constructors and their shared collaborators
//! - **orchestrator**: Classifies, dispatches, and aggregates across agents
//! - **metrics**: Per-process request/agent/tool/model usage tracking
//! - **prompt_template**: Versioned prompt templates with variable substitution
//! - **request_analyzer**: LLM-backed classification of a prompt into candidate agents
//! - **tool_finder**: Narrows the tool catalog down to what's relevant per request

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
// These modules are private (internal implementation details) unless explicitly
// re-exported through `pub use` statements below.

/// Core client implementation providing streaming queries and stateful conversations.
/// Contains the `query()` function for single-turn queries and `Client` struct
/// for multi-turn conversations with automatic state management.
mod client;

/// The Config Store: layered model/provider/agent/use-case catalogs, loaded
/// from a built-in default set and optionally overlaid with a user document
/// (JSON or YAML) and environment-supplied API keys.
mod config;

/// Context window management utilities for token estimation and history truncation.
/// Provides manual control over conversation memory to prevent context overflow.
mod context;

/// Message history for a single agent turn, with `<think>` block extraction
/// and scoped metadata/context maps.
mod conversation;

/// Use-case-driven model selection: filters the Config Store's catalog by
/// quality, speed, privacy, and cost, then ranks the survivors.
mod model_selector;

/// The uniform `Provider` trait plus concrete adapters (an OpenAI-compatible
/// native tool-calling backend and a synthetic prompt-injection backend for
/// providers without native tool support).
mod provider;

/// Tool bookkeeping: registration, lookup, and per-provider wire formatting.
mod tool_registry;

/// Timeout, capped-exponential retry, schema validation, and optional result
/// caching around a single tool invocation.
mod tool_executor;

/// Error types and conversions for comprehensive error handling throughout the SDK.
/// Defines the `Error` enum and `Result<T>` type alias used across all public APIs.
mod error;

/// Lifecycle hooks system for intercepting and controlling execution at key points.
/// Enables security gates, audit logging, input/output modification, and compliance checks.
mod hooks;

/// Tool definition and execution system with automatic JSON schema generation.
/// Allows LLMs to call Rust functions with type-safe parameter handling.
mod tools;

/// Core type definitions for messages, content blocks, and agent configuration.
/// Includes builder patterns for ergonomic configuration and OpenAI API serialization.
mod types;

/// Internal utilities for Server-Sent Events (SSE) parsing and tool call aggregation.
/// Handles the low-level details of streaming response parsing.
mod utils;

/// Specialized request handlers (chat, coding, listening) plus the two
/// orchestration-internal agents (tool finding, response aggregation),
/// unified behind the `Agent` trait.
mod agents;

/// Maps agent ids to constructors and turns a bare id into a live `Agent`,
/// resolving shared collaborators (provider, tools, executor, tool finder).
mod agent_registry;

/// Classifies a prompt into use case + tool relevance, then dispatches to
/// the matching agents in bounded parallel and aggregates their answers.
mod orchestrator;

/// Per-process usage tracking: request lifecycle records and rolling
/// per-agent/tool/model counters, with atomic file persistence.
mod metrics;

/// Versioned prompt templates with `{{var}}` substitution and per-version
/// performance tracking.
mod prompt_template;

/// Classifies a prompt's intent into ranked candidate agents and relevant
/// tool names, via an LLM-backed provider call.
mod request_analyzer;

/// Strategies for narrowing the tool catalog down to what's relevant to a
/// single request: lexical keyword overlap and LLM-backed selection.
mod tool_finder;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================
// These items form the public API of the SDK. Everything else is internal.

/// Retry utilities with exponential backoff and jitter.
/// Made public as a module so users can access retry configuration and functions
/// for their own operations that need retry logic.
pub mod retry;

// --- Core Client API ---

pub use client::{Client, query};

// --- Config Store ---

pub use config::{
    AgentEntry, Catalogs, ConfigStore, CostModel, ModelEntry, Privacy, ProviderEntry, Quality,
    Speed, ToolCatalogEntry, UseCase, UseCaseEntry, UserConfig,
};

// --- Local Server Presets ---
//
// Named `LocalServerProvider` here (rather than the bare `Provider` the
// pre-orchestration SDK exported) because `Provider` now names the
// chat-completion trait in the `provider` module.
pub use provider::presets::{Provider as LocalServerProvider, get_base_url, get_model};

// --- Model Selection ---

pub use model_selector::{ModelSelector, SelectionParams};

// --- Conversation Management ---

pub use conversation::{Conversation, Message as ConversationMessage, Role as ConversationRole, ThoughtOptions};

// --- Tool Registry & Execution ---

pub use tool_registry::ToolRegistry;
pub use tool_executor::{ExecutorConfig, ToolExecutor, ToolResult};

// --- Provider Abstraction ---

pub use provider::{
    Capabilities, CompletionOptions, Provider as ChatProvider, ProviderMessage, ProviderReply,
    ToolCall,
};
pub use provider::openai::OpenAiCompatibleProvider;
pub use provider::synthetic::SyntheticToolCallProvider;

// --- Context Management ---

pub use context::{estimate_tokens, is_approaching_limit, truncate_messages};

// --- Error Handling ---

pub use error::{Error, Result};

// --- Lifecycle Hooks ---

pub use hooks::{
    HOOK_POST_TOOL_USE, HOOK_PRE_TOOL_USE, HOOK_USER_PROMPT_SUBMIT, HookDecision, Hooks,
    PostToolUseEvent, PreToolUseEvent, UserPromptSubmitEvent,
};

// --- Tool System ---

pub use tools::{Tool, ToolBuilder, tool};

// --- Core Types ---

pub use types::{
    AgentOptions, AgentOptionsBuilder, ContentBlock, Message, MessageRole, TextBlock,
    ToolResultBlock, ToolUseBlock,
};

// --- Agents ---

pub use agents::{
    Agent, AgentRequest, AgentResponse, AgentStatus, BaseAgent, CodingAssistantAgent,
    ListenerAgent, ResponseAggregator, ResponseAggregatorAgent, ToolFinderAgent,
};

// --- Agent Registry & Factory ---

pub use agent_registry::{
    AgentDeps, AgentFactory, AgentRegistry, CHAT_ASSISTANT, CODING_ASSISTANT, LISTENER,
    RESPONSE_AGGREGATOR, TOOL_FINDER,
};

// --- Orchestrator ---

pub use orchestrator::{Orchestrator, build_default_orchestrator};

// --- Metrics Service ---

pub use metrics::{MetricsService, RequestRecord, UsageCounters, UsageSummary};

// --- Prompt Template Store ---

pub use prompt_template::{PerformanceRecord, PromptTemplateStore, TemplateVersion};

// --- Request Analyzer ---

pub use request_analyzer::RequestAnalyzer;

// --- Tool Finder ---

pub use tool_finder::{AiToolFinder, KeywordToolFinder, ToolFinder};

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Convenience module containing the most commonly used types and functions.
/// Import with `use open_agent::prelude::*;` to get everything you need for typical usage.
///
/// This includes:
/// - Configuration: AgentOptions, AgentOptionsBuilder, ConfigStore
/// - Client: Client, query()
/// - Content: ContentBlock, TextBlock, ToolUseBlock
/// - Tools: Tool, tool(), ToolRegistry, ToolExecutor
/// - Providers: ChatProvider, ProviderMessage, ProviderReply
/// - Hooks: Hooks, HookDecision, hook event types
/// - Errors: Error, Result
pub mod prelude {
    pub use crate::{
        Agent, AgentOptions, AgentOptionsBuilder, AgentRegistry, AgentRequest, AgentResponse,
        AgentStatus, ChatProvider, Client, ConfigStore, Conversation, ContentBlock, Error,
        HookDecision, Hooks, MetricsService, ModelSelector, Orchestrator, PostToolUseEvent,
        PreToolUseEvent, ProviderMessage, ProviderReply, Result, TextBlock, Tool, ToolExecutor,
        ToolFinder, ToolRegistry, ToolUseBlock, UserPromptSubmitEvent, build_default_orchestrator,
        query, tool,
    };
}
