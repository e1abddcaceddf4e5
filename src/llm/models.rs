//! Catalog of models the engine can drive

use super::anthropic::AnthropicModel;
use super::openai::OpenAIModel;
use super::{AnthropicService, LlmService, OpenAIService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAI => "OpenAI",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gpt-4o")
    pub id: &'static str,
    pub provider: Provider,
    pub description: &'static str,
    /// Factory function to create the service from an API key and optional gateway
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

fn openai(model: OpenAIModel, api_key: &str, gateway: Option<&str>) -> Result<Arc<dyn LlmService>, String> {
    OpenAIService::new(api_key.to_string(), model, gateway)
        .map(|svc| Arc::new(svc) as Arc<dyn LlmService>)
        .map_err(|e| e.message)
}

fn anthropic(
    model: AnthropicModel,
    api_key: &str,
    gateway: Option<&str>,
) -> Result<Arc<dyn LlmService>, String> {
    AnthropicService::new(api_key.to_string(), model, gateway)
        .map(|svc| Arc::new(svc) as Arc<dyn LlmService>)
        .map_err(|e| e.message)
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gpt-4-turbo",
            provider: Provider::OpenAI,
            description: "GPT-4 Turbo (reference extraction model)",
            factory: |key, gw| openai(OpenAIModel::GPT4Turbo, key, gw),
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o (balanced)",
            factory: |key, gw| openai(OpenAIModel::GPT4o, key, gw),
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o Mini (fast, cheap)",
            factory: |key, gw| openai(OpenAIModel::GPT4oMini, key, gw),
        },
        ModelDef {
            id: "claude-4.5-sonnet",
            provider: Provider::Anthropic,
            description: "Claude Sonnet 4.5 (balanced performance)",
            factory: |key, gw| anthropic(AnthropicModel::Claude45Sonnet, key, gw),
        },
        ModelDef {
            id: "claude-4.5-haiku",
            provider: Provider::Anthropic,
            description: "Claude Haiku 4.5 (fast, efficient)",
            factory: |key, gw| anthropic(AnthropicModel::Claude45Haiku, key, gw),
        },
    ]
}
