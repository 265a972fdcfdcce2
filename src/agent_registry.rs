//! # Agent Registry & Factory
//!
//! `AgentRegistry` maps an agent id to a constructor; `AgentFactory` pairs a
//! registry with the shared collaborators (provider, tool registry,
//! executor, tool finder) every built-in agent needs and turns a bare id
//! into a live [`Agent`]. Modeled as boxed constructor closures rather than
//! a type-erased class object, since Rust has no runtime class registry —
//! the idiomatic translation of a dynamic agent-class lookup.
//!
//! The orchestrator's own agent (which needs a handle back to this very
//! factory and registry) is deliberately built outside this module, in
//! [`crate::orchestrator`], to avoid a cyclic `Orchestrator <-> AgentFactory
//! <-> AgentRegistry` dependency.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::agents::{Agent, BaseAgent, CodingAssistantAgent, ListenerAgent, ResponseAggregator, ResponseAggregatorAgent, ToolFinderAgent};
use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::tool_executor::ToolExecutor;
use crate::tool_finder::ToolFinder;
use crate::tool_registry::ToolRegistry;

/// Well-known built-in agent ids. `AgentFactory::create` also accepts any
/// id registered via [`AgentRegistry::register`] that isn't one of these.
pub const CHAT_ASSISTANT: &str = "chat_assistant";
pub const CODING_ASSISTANT: &str = "coding_assistant";
pub const LISTENER: &str = "listener";
pub const TOOL_FINDER: &str = "tool_finder";
pub const RESPONSE_AGGREGATOR: &str = "response_aggregator";

/// Collaborators every built-in agent constructor may draw on. Passed by
/// reference to each constructor closure so the factory doesn't need to
/// know each agent's individual dependency list.
pub struct AgentDeps {
    /// layered configuration (models, providers, agent descriptions, ...)
    pub config: ConfigStore,
    /// LLM backend agents forward requests to
    pub provider: Arc<dyn Provider>,
    /// tool catalog agents may call into
    pub tools: Arc<ToolRegistry>,
    /// executes tool calls with timeout/retry/caching
    pub executor: Arc<ToolExecutor>,
    /// strategy backing the built-in `tool_finder` agent
    pub tool_finder: Arc<dyn ToolFinder>,
    /// default model id used when an agent's catalog entry has none
    pub default_model: String,
}

type AgentConstructor = Arc<dyn Fn(&str, &AgentDeps) -> Box<dyn Agent> + Send + Sync>;

/// Maps agent ids to constructors. Registration is idempotent: registering
/// an id that's already present is a no-op, matching the reference
/// registry's "duplicate registration" contract.
pub struct AgentRegistry {
    constructors: RwLock<HashMap<String, AgentConstructor>>,
}

impl AgentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-populated with every built-in agent kind.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(CHAT_ASSISTANT, |id, deps| {
            Box::new(BaseAgent::new(
                id,
                deps.config.clone(),
                deps.provider.clone(),
                deps.tools.clone(),
                deps.executor.clone(),
                resolve_model(deps, id),
                deps.config.agent_config(id).system_prompt,
            ))
        });
        registry.register(CODING_ASSISTANT, |id, deps| {
            Box::new(CodingAssistantAgent::new(
                id,
                deps.config.clone(),
                deps.provider.clone(),
                deps.tools.clone(),
                deps.executor.clone(),
                resolve_model(deps, id),
            ))
        });
        registry.register(LISTENER, |id, deps| {
            Box::new(ListenerAgent::new(
                id,
                deps.config.clone(),
                deps.provider.clone(),
                deps.tools.clone(),
                deps.executor.clone(),
                resolve_model(deps, id),
            ))
        });
        registry.register(TOOL_FINDER, |id, deps| {
            Box::new(ToolFinderAgent::new(id, deps.tool_finder.clone()))
        });
        registry.register(RESPONSE_AGGREGATOR, |id, deps| {
            Box::new(ResponseAggregatorAgent::new(
                id,
                ResponseAggregator::new(deps.provider.clone(), resolve_model(deps, id)),
            ))
        });
        registry
    }

    /// Register `id`'s constructor if it isn't already registered.
    /// Duplicate registration is a no-op.
    pub fn register<F>(&self, id: impl Into<String>, constructor: F)
    where
        F: Fn(&str, &AgentDeps) -> Box<dyn Agent> + Send + Sync + 'static,
    {
        let id = id.into();
        let mut constructors = self.constructors.write().unwrap_or_else(|e| e.into_inner());
        constructors.entry(id).or_insert_with(|| Arc::new(constructor));
    }

    /// Whether `id` has a registered constructor.
    pub fn contains(&self, id: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// All registered agent ids.
    pub fn agent_ids(&self) -> Vec<String> {
        self.constructors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    fn get(&self, id: &str) -> Option<AgentConstructor> {
        self.constructors.read().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_model(deps: &AgentDeps, agent_id: &str) -> String {
    deps.config
        .agent_config(agent_id)
        .default_model
        .unwrap_or_else(|| deps.default_model.clone())
}

/// Turns a bare agent id into a live [`Agent`], resolving missing
/// collaborators against its [`AgentDeps`].
pub struct AgentFactory {
    registry: Arc<AgentRegistry>,
    deps: AgentDeps,
}

impl AgentFactory {
    /// Build a factory over `registry`, using `deps` for every construction.
    pub fn new(registry: Arc<AgentRegistry>, deps: AgentDeps) -> Self {
        Self { registry, deps }
    }

    /// The collaborators this factory hands to every constructor.
    pub fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    /// The registry backing this factory.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Construct the agent registered under `agent_id`.
    pub fn create(&self, agent_id: &str) -> Result<Box<dyn Agent>> {
        let constructor = self
            .registry
            .get(agent_id)
            .ok_or_else(|| Error::AgentNotFound(agent_id.to_string()))?;
        Ok(constructor(agent_id, &self.deps))
    }
}
