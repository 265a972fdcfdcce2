//! # Prompt Template Service
//!
//! Named templates with `{{var}}` placeholders and per-variable default
//! values, versioned so a caller can promote a new revision while keeping
//! history, plus a side table of recorded render performance keyed by a
//! generated usage id.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};

/// One revision of a template's content and variable defaults.
#[derive(Debug, Clone)]
pub struct TemplateVersion {
    /// the `{{var}}`-bearing template text
    pub content: String,
    /// default value per variable name; a variable absent here and not
    /// supplied at render time is a hard error
    pub defaults: HashMap<String, String>,
    /// free-form metadata carried with this revision
    pub metadata: HashMap<String, Value>,
    /// when this revision was created
    pub created_at: DateTime<Utc>,
}

/// A named template plus its version history.
#[derive(Debug, Clone)]
struct StoredTemplate {
    versions: Vec<TemplateVersion>,
    active_index: usize,
}

/// A recorded render outcome, appended by [`PromptTemplateStore::record_performance`].
#[derive(Debug, Clone)]
pub struct PerformanceRecord {
    /// caller-supplied metrics (latency, token counts, ratings, ...)
    pub metrics: HashMap<String, Value>,
    /// when this record was appended
    pub recorded_at: DateTime<Utc>,
}

/// Stores named, versioned templates and the render-usage history tied to
/// each `render` call.
pub struct PromptTemplateStore {
    templates: RwLock<HashMap<String, StoredTemplate>>,
    performance: RwLock<HashMap<String, Vec<PerformanceRecord>>>,
}

impl PromptTemplateStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            performance: RwLock::new(HashMap::new()),
        }
    }

    /// Register a template's first version, becoming active immediately.
    pub fn create_template(
        &self,
        template_id: impl Into<String>,
        content: impl Into<String>,
        defaults: HashMap<String, String>,
        metadata: HashMap<String, Value>,
    ) {
        let template_id = template_id.into();
        let version = TemplateVersion {
            content: content.into(),
            defaults,
            metadata,
            created_at: Utc::now(),
        };
        let mut templates = self.templates.write().unwrap_or_else(|e| e.into_inner());
        templates.insert(
            template_id,
            StoredTemplate {
                versions: vec![version],
                active_index: 0,
            },
        );
    }

    /// Append a new version to an existing template, optionally making it
    /// the active one. Errors if the template doesn't exist yet — use
    /// [`PromptTemplateStore::create_template`] for the first version.
    pub fn create_version(
        &self,
        template_id: &str,
        content: impl Into<String>,
        defaults: HashMap<String, String>,
        metadata: HashMap<String, Value>,
        set_active: bool,
    ) -> Result<()> {
        let mut templates = self.templates.write().unwrap_or_else(|e| e.into_inner());
        let stored = templates
            .get_mut(template_id)
            .ok_or_else(|| Error::TemplateNotFound(template_id.to_string()))?;
        stored.versions.push(TemplateVersion {
            content: content.into(),
            defaults,
            metadata,
            created_at: Utc::now(),
        });
        if set_active {
            stored.active_index = stored.versions.len() - 1;
        }
        Ok(())
    }

    /// Render the active version of `template_id`, substituting `{{var}}`
    /// placeholders from `variables`, falling back to that version's
    /// per-variable default, and returns `(rendered, usage_id)`.
    ///
    /// Errors with [`Error::MissingVariable`] the first time a placeholder
    /// has neither an explicit value nor a default.
    pub fn render(&self, template_id: &str, variables: &HashMap<String, String>) -> Result<(String, String)> {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        let stored = templates
            .get(template_id)
            .ok_or_else(|| Error::TemplateNotFound(template_id.to_string()))?;
        let version = &stored.versions[stored.active_index];

        let rendered = substitute(&version.content, variables, &version.defaults, template_id)?;
        let usage_id = uuid::Uuid::new_v4().to_string();
        Ok((rendered, usage_id))
    }

    /// Append a performance record for a prior `render` call's usage id.
    pub fn record_performance(&self, usage_id: impl Into<String>, metrics: HashMap<String, Value>) {
        let mut performance = self.performance.write().unwrap_or_else(|e| e.into_inner());
        performance.entry(usage_id.into()).or_default().push(PerformanceRecord {
            metrics,
            recorded_at: Utc::now(),
        });
    }

    /// All performance records recorded against `usage_id`.
    pub fn performance_for(&self, usage_id: &str) -> Vec<PerformanceRecord> {
        self.performance
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(usage_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The currently active version's content, without rendering.
    pub fn active_content(&self, template_id: &str) -> Result<String> {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        let stored = templates
            .get(template_id)
            .ok_or_else(|| Error::TemplateNotFound(template_id.to_string()))?;
        Ok(stored.versions[stored.active_index].content.clone())
    }

    /// Number of versions retained for `template_id`.
    pub fn version_count(&self, template_id: &str) -> Result<usize> {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        let stored = templates
            .get(template_id)
            .ok_or_else(|| Error::TemplateNotFound(template_id.to_string()))?;
        Ok(stored.versions.len())
    }

    /// Render `template_id` with `variables`, or `None` if it isn't
    /// registered (or otherwise fails to render). Agent-facing callers use
    /// this to implement the load-bearing fall-back-to-a-hardcoded-prompt
    /// behavior described in §4.7: ask the store first, fall back on a miss.
    pub fn render_or_none(&self, template_id: &str, variables: &HashMap<String, String>) -> Option<String> {
        match self.render(template_id, variables) {
            Ok((rendered, _usage_id)) => Some(rendered),
            Err(_) => None,
        }
    }
}

impl Default for PromptTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn substitute(
    content: &str,
    variables: &HashMap<String, String>,
    defaults: &HashMap<String, String>,
    template_id: &str,
) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = after_open[..end].trim();
        let value = variables
            .get(name)
            .or_else(|| defaults.get(name))
            .ok_or_else(|| Error::missing_variable(template_id, name))?;
        out.push_str(value);
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_greeting() -> PromptTemplateStore {
        let store = PromptTemplateStore::new();
        let mut defaults = HashMap::new();
        defaults.insert("style".to_string(), "formal".to_string());
        store.create_template(
            "greeting",
            "Say hello to {{name}} in a {{style}} tone.",
            defaults,
            HashMap::new(),
        );
        store
    }

    #[test]
    fn render_substitutes_variables_and_defaults() {
        let store = store_with_greeting();
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Ada".to_string());
        let (rendered, usage_id) = store.render("greeting", &vars).unwrap();
        assert_eq!(rendered, "Say hello to Ada in a formal tone.");
        assert!(!usage_id.is_empty());
    }

    #[test]
    fn explicit_variable_overrides_default() {
        let store = store_with_greeting();
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Ada".to_string());
        vars.insert("style".to_string(), "casual".to_string());
        let (rendered, _) = store.render("greeting", &vars).unwrap();
        assert_eq!(rendered, "Say hello to Ada in a casual tone.");
    }

    #[test]
    fn missing_variable_without_default_is_an_error() {
        let store = store_with_greeting();
        let err = store.render("greeting", &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::MissingVariable { .. }));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let store = PromptTemplateStore::new();
        let err = store.render("nope", &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(_)));
    }

    #[test]
    fn render_or_none_yields_none_on_an_unregistered_template() {
        let store = PromptTemplateStore::new();
        assert!(store.render_or_none("nope", &HashMap::new()).is_none());
    }

    #[test]
    fn render_or_none_yields_the_rendered_text_when_registered() {
        let store = store_with_greeting();
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Ada".to_string());
        assert_eq!(
            store.render_or_none("greeting", &vars),
            Some("Say hello to Ada in a formal tone.".to_string())
        );
    }

    #[test]
    fn create_version_promotes_active_revision_when_requested() {
        let store = store_with_greeting();
        store
            .create_version(
                "greeting",
                "Yo {{name}}!",
                HashMap::new(),
                HashMap::new(),
                true,
            )
            .unwrap();
        assert_eq!(store.version_count("greeting").unwrap(), 2);
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Ada".to_string());
        let (rendered, _) = store.render("greeting", &vars).unwrap();
        assert_eq!(rendered, "Yo Ada!");
    }

    #[test]
    fn create_version_without_set_active_keeps_old_version_live() {
        let store = store_with_greeting();
        store
            .create_version("greeting", "Yo {{name}}!", HashMap::new(), HashMap::new(), false)
            .unwrap();
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Ada".to_string());
        let (rendered, _) = store.render("greeting", &vars).unwrap();
        assert_eq!(rendered, "Say hello to Ada in a formal tone.");
    }

    #[test]
    fn record_performance_appends_under_the_usage_id() {
        let store = store_with_greeting();
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Ada".to_string());
        let (_, usage_id) = store.render("greeting", &vars).unwrap();

        let mut metrics = HashMap::new();
        metrics.insert("latency_ms".to_string(), Value::from(120));
        store.record_performance(usage_id.clone(), metrics);

        let records = store.performance_for(&usage_id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metrics["latency_ms"], 120);
    }
}
