//! User-supplied configuration overlay.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::catalogs::{Quality, Speed, UseCase};

/// Overrides a caller may supply on top of the base catalogs. Every field is
/// optional; accessors on [`super::ConfigStore`] consult this overlay first
/// but never write it back into the base snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// force a specific model id regardless of use-case selection
    #[serde(default)]
    pub model: Option<String>,
    /// force a specific use case
    #[serde(default)]
    pub use_case: Option<UseCase>,
    /// override sampling temperature (applies only to `model`, if both set)
    #[serde(default)]
    pub temperature: Option<f32>,
    /// override the system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// whether extracted `<think>` content is echoed back to callers
    #[serde(default)]
    pub show_thinking: Option<bool>,
    /// quality preference, paired with `speed` and consulted only when
    /// `use_case` is also set
    #[serde(default)]
    pub quality: Option<Quality>,
    /// speed preference, see `quality`
    #[serde(default)]
    pub speed: Option<Speed>,
}

impl UserConfig {
    /// Load a `UserConfig` from a file, dispatching on extension: `.yml`/
    /// `.yaml` for YAML, anything else is parsed as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read '{}': {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => serde_yaml::from_str(&contents)
                .map_err(|e| Error::config(format!("invalid YAML in '{}': {e}", path.display()))),
            _ => serde_json::from_str(&contents)
                .map_err(|e| Error::config(format!("invalid JSON in '{}': {e}", path.display()))),
        }
    }
}
