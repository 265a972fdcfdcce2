//! # Config Store
//!
//! Layered, typed configuration for the orchestration runtime: five logical
//! catalogs (models, providers, agents, use cases, tools) loaded once at
//! startup, plus an optional [`UserConfig`] overlay consulted by accessors
//! ahead of the base catalogs without mutating them.
//!
//! The store is read-mostly. [`ConfigStore::reload`] swaps the whole
//! snapshot atomically under a short-lived write lock so that concurrent
//! readers always see either the old or the new catalogs, never a torn mix
//! of both.

mod catalogs;
mod defaults;
mod user_config;

pub use catalogs::{
    AgentEntry, CostModel, ModelEntry, Privacy, ProviderEntry, Quality, Speed, ToolCatalogEntry,
    UseCase, UseCaseEntry,
};
pub use user_config::UserConfig;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// The full set of catalogs loaded from configuration documents.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Catalogs {
    /// `models.<id>`
    #[serde(default)]
    pub models: HashMap<String, ModelEntry>,
    /// `providers.<id>`
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
    /// `agents.<id>`
    #[serde(default)]
    pub agents: HashMap<String, AgentEntry>,
    /// `use_cases.<id>`
    #[serde(default)]
    pub use_cases: HashMap<String, UseCaseEntry>,
    /// `tools.categories.<cat>.<name>`
    #[serde(default)]
    pub tools: HashMap<String, HashMap<String, ToolCatalogEntry>>,
    /// top-level default model id, consulted when no use-case entry applies
    #[serde(default)]
    pub default_model: Option<String>,
}

impl Catalogs {
    fn validate(&self) -> Result<()> {
        // model ids must be unique across the catalog; HashMap keys already
        // guarantee this, but a model's own `model_id` field must agree with
        // its key, since ModelSelector matches on that field.
        for (key, model) in &self.models {
            if model.model_id != *key {
                return Err(Error::config(format!(
                    "model entry '{key}' has mismatched model_id '{}'",
                    model.model_id
                )));
            }
        }
        Ok(())
    }
}

/// Shared, reloadable configuration store.
///
/// Clone is cheap: it shares the same underlying snapshot pointer and the
/// same overlay. A process typically holds one `ConfigStore` behind an
/// `Arc` and hands clones to every component that needs config access.
#[derive(Clone)]
pub struct ConfigStore {
    snapshot: Arc<RwLock<Arc<Catalogs>>>,
    overlay: Arc<RwLock<Option<UserConfig>>>,
}

impl ConfigStore {
    /// Build a store from the built-in catalogs (see [`defaults`]).
    pub fn with_defaults() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(defaults::builtin_catalogs()))),
            overlay: Arc::new(RwLock::new(None)),
        }
    }

    /// Parse a document (YAML or JSON, auto-detected) into catalogs and
    /// build a store from it.
    pub fn from_str(document: &str) -> Result<Self> {
        let catalogs = parse_catalogs(document)?;
        catalogs.validate()?;
        Ok(Self {
            snapshot: Arc::new(RwLock::new(Arc::new(catalogs))),
            overlay: Arc::new(RwLock::new(None)),
        })
    }

    /// Replace the active catalogs. Existing clones of this store observe
    /// the new snapshot on their next read; in-flight reads using an
    /// already-cloned `Arc<Catalogs>` keep running against the old one.
    pub fn reload(&self, document: &str) -> Result<()> {
        let catalogs = parse_catalogs(document)?;
        catalogs.validate()?;
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| Error::other("config snapshot lock poisoned"))?;
        *guard = Arc::new(catalogs);
        Ok(())
    }

    /// Install (or replace) the user overlay.
    pub fn set_user_config(&self, user_config: UserConfig) {
        if let Ok(mut guard) = self.overlay.write() {
            *guard = Some(user_config);
        }
    }

    /// Current user overlay, if any.
    pub fn user_config(&self) -> Option<UserConfig> {
        self.overlay.read().ok().and_then(|g| g.clone())
    }

    fn snapshot(&self) -> Arc<Catalogs> {
        self.snapshot
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    /// Look up a provider's configuration.
    pub fn provider_config(&self, id: &str) -> Result<ProviderEntry> {
        self.snapshot
            .clone()
            .read()
            .ok()
            .and_then(|s| s.providers.get(id).cloned())
            .ok_or_else(|| Error::config_not_found("provider", id))
    }

    /// Look up a model's configuration, applying a temperature override
    /// from the user overlay when the overlay's `model` field matches this
    /// model id (mirrors the reference config manager: overrides only ever
    /// apply to the model the user actually selected).
    pub fn model_config(&self, id: &str) -> Result<ModelEntry> {
        let snap = self.snapshot();
        let mut model = snap
            .models
            .get(id)
            .cloned()
            .ok_or_else(|| Error::config_not_found("model", id))?;
        if let Some(overlay) = self.user_config() {
            if overlay.model.as_deref() == Some(id) {
                if let Some(temp) = overlay.temperature {
                    model.temperature = temp;
                }
            }
        }
        Ok(model)
    }

    /// All model entries.
    pub fn all_models(&self) -> Vec<ModelEntry> {
        self.snapshot().models.values().cloned().collect()
    }

    /// Agent configuration, or a default (empty) entry if the agent has no
    /// explicit catalog entry — the reference manager treats a missing
    /// agent entry as "use defaults," not as an error, for backward
    /// compatibility with agents added after a config document was written.
    pub fn agent_config(&self, id: &str) -> AgentEntry {
        self.snapshot()
            .agents
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// `{id: description}` for every registered agent.
    pub fn agent_descriptions(&self) -> HashMap<String, String> {
        self.snapshot()
            .agents
            .iter()
            .map(|(id, entry)| (id.clone(), entry.description.clone()))
            .collect()
    }

    /// Resolve a use case's `{quality, speed}` preference.
    ///
    /// Order: explicit overlay override, else the use-case catalog entry,
    /// else the first use case listed on the default model, else a
    /// hardcoded `{quality: medium, speed: standard}`.
    pub fn use_case_config(&self, use_case: UseCase) -> UseCaseEntry {
        if let Some(overlay) = self.user_config() {
            if overlay.use_case == Some(use_case) {
                if let (Some(q), Some(s)) = (overlay.quality, overlay.speed) {
                    return UseCaseEntry {
                        quality: q,
                        speed: s,
                    };
                }
            }
        }
        let snap = self.snapshot();
        if let Some(entry) = snap.use_cases.get(use_case.as_str()) {
            return entry.clone();
        }
        if let Some(default_model) = snap.default_model.as_ref().and_then(|id| snap.models.get(id))
        {
            if !default_model.use_cases.is_empty() {
                return UseCaseEntry {
                    quality: default_model.quality,
                    speed: default_model.speed,
                };
            }
        }
        UseCaseEntry {
            quality: Quality::Medium,
            speed: Speed::Standard,
        }
    }

    /// The top-level default model id, if configured.
    pub fn default_model(&self) -> Option<String> {
        self.snapshot().default_model.clone()
    }

    /// Resolve an API key for a provider through its configured
    /// environment variable.
    pub fn api_key(&self, provider_id: &str) -> Result<String> {
        let provider = self.provider_config(provider_id)?;
        std::env::var(&provider.api_key_env).map_err(|_| {
            Error::config(format!(
                "environment variable '{}' is not set for provider '{provider_id}'",
                provider.api_key_env
            ))
        })
    }

    /// A user-supplied system prompt override, if any.
    pub fn system_prompt_override(&self) -> Option<String> {
        self.user_config().and_then(|u| u.system_prompt)
    }

    /// Look up a tool's catalog entry, searching every category, or all
    /// entries across all categories if no name is given.
    pub fn tool_config(&self, name: Option<&str>) -> HashMap<String, ToolCatalogEntry> {
        let snap = self.snapshot();
        match name {
            None => snap
                .tools
                .values()
                .flat_map(|cat| cat.iter().map(|(k, v)| (k.clone(), v.clone())))
                .collect(),
            Some(name) => snap
                .tools
                .values()
                .filter_map(|cat| cat.get(name).map(|v| (name.to_string(), v.clone())))
                .collect(),
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse a config document, trying JSON first (unambiguous braces) and
/// falling back to YAML, which is a superset syntax for our schema.
fn parse_catalogs(document: &str) -> Result<Catalogs> {
    if let Ok(catalogs) = serde_json::from_str::<Catalogs>(document) {
        return Ok(catalogs);
    }
    serde_yaml::from_str::<Catalogs>(document)
        .map_err(|e| Error::config(format!("failed to parse config document: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_error() {
        let store = ConfigStore::with_defaults();
        assert!(store.default_model().is_some());
    }

    #[test]
    fn unknown_provider_is_not_found() {
        let store = ConfigStore::with_defaults();
        let err = store.provider_config("nope").unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn missing_agent_config_is_empty_not_an_error() {
        let store = ConfigStore::with_defaults();
        let entry = store.agent_config("an_agent_nobody_configured");
        assert_eq!(entry.description, "");
    }

    #[test]
    fn reload_swaps_snapshot_atomically() {
        let store = ConfigStore::with_defaults();
        let before = store.all_models().len();
        store
            .reload(r#"{"models": {}, "providers": {}, "agents": {}, "use_cases": {}, "tools": {}}"#)
            .unwrap();
        assert_eq!(store.all_models().len(), 0);
        assert_ne!(before, 0, "defaults should not start out empty");
    }

    #[test]
    fn duplicate_model_id_key_mismatch_is_rejected() {
        let doc = r#"{
            "models": { "gpt-4": { "model_id": "gpt-5", "provider": "openai", "quality": "high", "speed": "standard", "privacy": "external", "max_tokens": 4096, "temperature": 0.7, "cost": {"input_per_token": 0.0, "output_per_token": 0.0, "minimum": 0.0}, "use_cases": [] } },
            "providers": {}, "agents": {}, "use_cases": {}, "tools": {}
        }"#;
        let err = ConfigStore::from_str(doc).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn user_overlay_temperature_applies_only_to_selected_model() {
        let store = ConfigStore::with_defaults();
        let default_id = store.default_model().unwrap();
        store.set_user_config(UserConfig {
            model: Some(default_id.clone()),
            temperature: Some(0.1),
            ..Default::default()
        });
        let model = store.model_config(&default_id).unwrap();
        assert_eq!(model.temperature, 0.1);
    }
}
