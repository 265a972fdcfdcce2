//! Built-in catalog literals, used when no external configuration document
//! is supplied. These describe a small set of local OpenAI-compatible
//! models reachable through the shipped provider adapters; a real
//! deployment is expected to call [`super::ConfigStore::from_str`] with its
//! own document instead.

use std::collections::HashMap;

use super::catalogs::{
    AgentEntry, CostModel, ModelEntry, Privacy, ProviderEntry, Quality, Speed, UseCase,
    UseCaseEntry,
};
use super::Catalogs;

pub(super) fn builtin_catalogs() -> Catalogs {
    let mut models = HashMap::new();
    models.insert(
        "local-small".to_string(),
        ModelEntry {
            model_id: "local-small".to_string(),
            provider: "local".to_string(),
            quality: Quality::Low,
            speed: Speed::Fast,
            privacy: Privacy::Local,
            max_tokens: 2048,
            temperature: 0.7,
            cost: CostModel::default(),
            use_cases: vec![UseCase::Chat, UseCase::Translation, UseCase::Summarization],
        },
    );
    models.insert(
        "local-standard".to_string(),
        ModelEntry {
            model_id: "local-standard".to_string(),
            provider: "local".to_string(),
            quality: Quality::Medium,
            speed: Speed::Standard,
            privacy: Privacy::Local,
            max_tokens: 4096,
            temperature: 0.7,
            cost: CostModel::default(),
            use_cases: vec![
                UseCase::Chat,
                UseCase::Coding,
                UseCase::DataAnalysis,
                UseCase::WebAnalysis,
                UseCase::ContentGeneration,
            ],
        },
    );
    models.insert(
        "local-large".to_string(),
        ModelEntry {
            model_id: "local-large".to_string(),
            provider: "local".to_string(),
            quality: Quality::High,
            speed: Speed::Slow,
            privacy: Privacy::Local,
            max_tokens: 8192,
            temperature: 0.7,
            cost: CostModel::default(),
            use_cases: vec![
                UseCase::Coding,
                UseCase::SolidityCoding,
                UseCase::DataAnalysis,
                UseCase::ImageGeneration,
            ],
        },
    );

    let mut providers = HashMap::new();
    providers.insert(
        "local".to_string(),
        ProviderEntry {
            api_key_env: "OPEN_AGENT_API_KEY".to_string(),
            base_url: None,
            timeout_seconds: 60,
        },
    );

    let mut agents = HashMap::new();
    agents.insert(
        "coding_assistant".to_string(),
        AgentEntry {
            description: "Writes, reviews, and explains code across languages.".to_string(),
            default_model: Some("local-large".to_string()),
            system_prompt: None,
        },
    );
    agents.insert(
        "chat_assistant".to_string(),
        AgentEntry {
            description: "Handles general conversational requests.".to_string(),
            default_model: Some("local-standard".to_string()),
            system_prompt: None,
        },
    );
    agents.insert(
        "tool_finder".to_string(),
        AgentEntry {
            description: "Selects relevant tools for a request.".to_string(),
            default_model: Some("local-small".to_string()),
            system_prompt: None,
        },
    );

    let mut use_cases = HashMap::new();
    use_cases.insert(
        UseCase::Chat.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::Medium,
            speed: Speed::Standard,
        },
    );
    use_cases.insert(
        UseCase::Coding.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::High,
            speed: Speed::Slow,
        },
    );
    use_cases.insert(
        UseCase::SolidityCoding.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::High,
            speed: Speed::Slow,
        },
    );
    use_cases.insert(
        UseCase::Translation.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::Low,
            speed: Speed::Fast,
        },
    );
    use_cases.insert(
        UseCase::Summarization.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::Low,
            speed: Speed::Fast,
        },
    );
    use_cases.insert(
        UseCase::ContentGeneration.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::Medium,
            speed: Speed::Standard,
        },
    );
    use_cases.insert(
        UseCase::DataAnalysis.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::High,
            speed: Speed::Standard,
        },
    );
    use_cases.insert(
        UseCase::WebAnalysis.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::Medium,
            speed: Speed::Standard,
        },
    );
    use_cases.insert(
        UseCase::ImageGeneration.as_str().to_string(),
        UseCaseEntry {
            quality: Quality::High,
            speed: Speed::Slow,
        },
    );

    Catalogs {
        models,
        providers,
        agents,
        use_cases,
        tools: HashMap::new(),
        default_model: Some("local-standard".to_string()),
    }
}
