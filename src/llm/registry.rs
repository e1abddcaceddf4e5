//! Model registry for managing available LLM providers

use super::{all_models, LlmService, LoggingService, ModelDef, Provider};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Preferred default when `DEFAULT_MODEL` is unset
const PREFERRED_DEFAULT: &str = "gpt-4o";

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Gateway base URL; when set, every model is routed through it
    pub gateway: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            gateway: var("LLM_GATEWAY"),
            default_model: var("DEFAULT_MODEL"),
        }
    }
}

/// Public metadata about a registered model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub provider: String,
    pub description: String,
    pub context_window: usize,
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        let default_model = config
            .default_model
            .clone()
            .or_else(|| {
                if services.contains_key(PREFERRED_DEFAULT) {
                    Some(PREFERRED_DEFAULT.to_string())
                } else {
                    let mut ids: Vec<_> = services.keys().cloned().collect();
                    ids.sort();
                    ids.into_iter().next()
                }
            })
            .unwrap_or_else(|| PREFERRED_DEFAULT.to_string());

        Self {
            services,
            default_model,
        }
    }

    fn try_create_model(model_def: &ModelDef, config: &LlmConfig) -> Option<Arc<dyn LlmService>> {
        // In gateway mode the gateway handles authentication
        let api_key = if config.gateway.is_some() {
            "implicit".to_string()
        } else {
            match model_def.provider {
                Provider::Anthropic => config.anthropic_api_key.as_ref()?,
                Provider::OpenAI => config.openai_api_key.as_ref()?,
            }
            .clone()
        };

        if api_key.is_empty() {
            return None;
        }

        match (model_def.factory)(&api_key, config.gateway.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(service))),
            Err(e) => {
                tracing::warn!(model = model_def.id, error = %e, "Failed to create model service");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    /// Resolve an optional explicit model ID, falling back to the default
    pub fn get_or_default(&self, model_id: Option<&str>) -> Option<Arc<dyn LlmService>> {
        match model_id {
            Some(id) => self.get(id),
            None => self.default(),
        }
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Metadata for every registered model, in catalog order
    pub fn available_model_info(&self) -> Vec<ModelInfo> {
        all_models()
            .iter()
            .filter_map(|def| {
                let service = self.services.get(def.id)?;
                Some(ModelInfo {
                    id: def.id.to_string(),
                    provider: def.provider.display_name().to_string(),
                    description: def.description.to_string(),
                    context_window: service.context_window(),
                })
            })
            .collect()
    }

    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_api_keys_no_models() {
        let registry = ModelRegistry::new(&LlmConfig::default());
        assert!(registry.available_models().is_empty());
        assert!(!registry.has_models());
        assert!(registry.default().is_none());
    }

    #[test]
    fn test_openai_key_only_openai_models() {
        let config = LlmConfig {
            openai_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);

        let models = registry.available_models();
        assert!(!models.is_empty());
        for model_id in &models {
            assert!(model_id.starts_with("gpt"), "Expected gpt model, got {model_id}");
        }
        assert_eq!(registry.default_model_id(), "gpt-4o");
    }

    #[test]
    fn test_anthropic_key_falls_back_to_first_model() {
        let config = LlmConfig {
            anthropic_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);
        assert_eq!(registry.default_model_id(), "claude-4.5-haiku");
    }

    #[test]
    fn test_empty_key_is_ignored() {
        let config = LlmConfig {
            openai_api_key: Some(String::new()),
            ..Default::default()
        };
        assert!(!ModelRegistry::new(&config).has_models());
    }

    #[test]
    fn test_config_from_lookup_ignores_blank_values() {
        let config = LlmConfig::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "LLM_GATEWAY" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert!(config.gateway.is_none());
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn test_gateway_enables_all_models() {
        let config = LlmConfig {
            gateway: Some("https://example.com".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);
        assert_eq!(registry.available_models().len(), all_models().len());
        assert!(registry.get("claude-4.5-sonnet").is_some());
        assert!(registry.get("gpt-4-turbo").is_some());
    }

    #[test]
    fn test_custom_default_model_and_lookup() {
        let config = LlmConfig {
            openai_api_key: Some("test-key".to_string()),
            default_model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };
        let registry = ModelRegistry::new(&config);
        assert_eq!(registry.default_model_id(), "gpt-4o-mini");
        assert_eq!(
            registry.get_or_default(None).unwrap().model_id(),
            "gpt-4o-mini"
        );
        assert_eq!(
            registry.get_or_default(Some("gpt-4-turbo")).unwrap().model_id(),
            "gpt-4-turbo"
        );
        assert!(registry.get_or_default(Some("nope")).is_none());
    }

    #[test]
    fn test_model_info_metadata() {
        let config = LlmConfig {
            openai_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let infos = ModelRegistry::new(&config).available_model_info();
        assert_eq!(infos.len(), 3);
        for info in &infos {
            assert_eq!(info.provider, "OpenAI");
            assert!(!info.description.is_empty());
            assert_eq!(info.context_window, 128_000);
        }
    }
}
