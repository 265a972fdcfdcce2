//! # Model Selector
//!
//! Maps a use case plus optional explicit constraints to a single concrete
//! model id, and carries the built-in system prompt table used when an
//! agent or the orchestrator does not supply its own.

use crate::config::{ConfigStore, ModelEntry, Privacy, Quality, Speed, UseCase};
use crate::error::{Error, Result};

/// Optional constraints layered on top of a use case's defaults. Any field
/// left `None` falls back to the use case's `{quality, speed}` entry (for
/// `quality`/`speed`) or is simply not applied (`privacy`, `max_cost`).
#[derive(Debug, Clone, Default)]
pub struct SelectionParams {
    /// override the use case's quality tier
    pub quality: Option<Quality>,
    /// override the use case's speed tier
    pub speed: Option<Speed>,
    /// require this data-locality tier
    pub privacy: Option<Privacy>,
    /// reject any model whose estimated cost exceeds this
    pub max_cost: Option<f64>,
    /// token counts used to estimate cost against `max_cost`
    pub estimated_tokens: Option<(u64, u64)>,
}

/// Stateless selection logic over a [`ConfigStore`]'s model catalog.
pub struct ModelSelector {
    config: ConfigStore,
}

impl ModelSelector {
    /// Build a selector backed by the given config store.
    pub fn new(config: ConfigStore) -> Self {
        Self { config }
    }

    /// Select a model id for `use_case`, honoring `params`.
    ///
    /// Algorithm (must stay in this order — see design notes for why):
    /// 1. resolve `{quality, speed}` defaults from the use case, then apply
    ///    explicit overrides;
    /// 2. filter to models matching quality and speed exactly, then privacy
    ///    if given;
    /// 3. drop models whose estimated cost exceeds `max_cost`;
    /// 4. if nothing is left, fail with [`Error::NoSuitableModel`];
    /// 5. otherwise rank survivors by `(quality_weight, speed_weight)`
    ///    descending and return the first.
    pub fn select_model(&self, use_case: UseCase, params: &SelectionParams) -> Result<String> {
        let defaults = self.config.use_case_config(use_case);
        let quality = params.quality.unwrap_or(defaults.quality);
        let speed = params.speed.unwrap_or(defaults.speed);

        let mut candidates: Vec<ModelEntry> = self
            .config
            .all_models()
            .into_iter()
            .filter(|m| m.quality == quality && m.speed == speed)
            .collect();

        if let Some(privacy) = params.privacy {
            candidates.retain(|m| m.privacy == privacy);
        }

        if let Some(max_cost) = params.max_cost {
            let (input_tokens, output_tokens) = params.estimated_tokens.unwrap_or((0, 0));
            candidates.retain(|m| m.cost.estimate(input_tokens, output_tokens) <= max_cost);
        }

        if candidates.is_empty() {
            return Err(Error::NoSuitableModel(use_case.as_str().to_string()));
        }

        candidates.sort_by(|a, b| {
            let rank = |m: &ModelEntry| (m.quality.weight(), m.speed.weight());
            rank(b).cmp(&rank(a))
        });

        Ok(candidates.remove(0).model_id)
    }

    /// The built-in system prompt for a use case. Every variant has an
    /// entry; there is no "missing" case.
    pub fn system_prompt(use_case: UseCase) -> &'static str {
        match use_case {
            UseCase::Translation => {
                "You are an expert translator. Translate the text accurately while preserving meaning, tone, and cultural nuances."
            }
            UseCase::Summarization => {
                "You are an expert at summarizing content. Create concise, informative summaries that capture the key points."
            }
            UseCase::Coding => {
                "You are an expert programmer. Provide clean, efficient, and well-documented code."
            }
            UseCase::SolidityCoding => {
                "You are an expert Solidity programmer. Provide safe, clean, gas-efficient, and well-documented Solidity code."
            }
            UseCase::Chat => "You are a helpful, friendly assistant. Provide accurate and informative responses.",
            UseCase::ContentGeneration => {
                "You are a creative content creator. Generate engaging, original content."
            }
            UseCase::DataAnalysis => {
                "You are a data analysis expert. Analyze data thoroughly and provide insightful interpretations."
            }
            UseCase::WebAnalysis => {
                "You are an expert web pages analyst. Analyze web pages thoroughly and provide insightful interpretations."
            }
            UseCase::ImageGeneration => {
                "You are an expert image generator. Generate high-quality, realistic images based on text descriptions."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_highest_ranked_candidate_for_chat() {
        let selector = ModelSelector::new(ConfigStore::with_defaults());
        let model = selector
            .select_model(UseCase::Chat, &SelectionParams::default())
            .unwrap();
        // chat defaults to quality=medium, speed=standard -> local-standard
        assert_eq!(model, "local-standard");
    }

    #[test]
    fn explicit_quality_override_wins_over_use_case_default() {
        let selector = ModelSelector::new(ConfigStore::with_defaults());
        let params = SelectionParams {
            quality: Some(Quality::High),
            speed: Some(Speed::Slow),
            ..Default::default()
        };
        let model = selector.select_model(UseCase::Chat, &params).unwrap();
        assert_eq!(model, "local-large");
    }

    #[test]
    fn no_suitable_model_when_filters_exclude_everything() {
        let selector = ModelSelector::new(ConfigStore::with_defaults());
        let params = SelectionParams {
            quality: Some(Quality::Low),
            speed: Some(Speed::Slow),
            ..Default::default()
        };
        let err = selector.select_model(UseCase::Chat, &params).unwrap_err();
        assert!(matches!(err, Error::NoSuitableModel(_)));
    }

    #[test]
    fn selection_is_a_pure_function_of_its_inputs() {
        let selector = ModelSelector::new(ConfigStore::with_defaults());
        let a = selector
            .select_model(UseCase::Coding, &SelectionParams::default())
            .unwrap();
        let b = selector
            .select_model(UseCase::Coding, &SelectionParams::default())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn system_prompt_table_covers_every_use_case() {
        for use_case in [
            UseCase::Chat,
            UseCase::Coding,
            UseCase::SolidityCoding,
            UseCase::Translation,
            UseCase::Summarization,
            UseCase::ContentGeneration,
            UseCase::DataAnalysis,
            UseCase::WebAnalysis,
            UseCase::ImageGeneration,
        ] {
            assert!(!ModelSelector::system_prompt(use_case).is_empty());
        }
    }

    #[test]
    fn max_cost_filters_out_expensive_models() {
        let selector = ModelSelector::new(ConfigStore::with_defaults());
        let params = SelectionParams {
            max_cost: Some(0.0),
            estimated_tokens: Some((1000, 1000)),
            ..Default::default()
        };
        // built-in models all have zero cost, so this should still succeed
        let model = selector.select_model(UseCase::Chat, &params).unwrap();
        assert_eq!(model, "local-standard");
    }
}
