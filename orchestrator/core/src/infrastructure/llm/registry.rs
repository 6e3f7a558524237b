// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Completion Provider Registry
//
// Builds CompletionClient adapters from configuration and manages them by
// name. Process-wide, read-mostly after startup initialization, safe for
// concurrent read access by multiple runs.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::completion::{CompletionClient, ProviderError};
use crate::domain::config::ProviderConfig;

use super::anthropic::AnthropicAdapter;
use super::ollama::OllamaAdapter;
use super::openai::OpenAIAdapter;

/// Registry of named completion providers.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn CompletionClient>>,
    /// Provider names in configuration order; the first is the default.
    order: Vec<String>,
}

impl ProviderRegistry {
    /// Build the registry from provider configurations. A provider that
    /// fails to initialize is skipped with a warning; the registry fails
    /// only if nothing initializes.
    pub fn from_config(configs: &[ProviderConfig]) -> anyhow::Result<Self> {
        let mut providers = HashMap::new();
        let mut order = Vec::new();

        info!("Initializing completion provider registry");

        for config in configs {
            if !config.enabled {
                info!("Provider '{}' disabled, skipping", config.name);
                continue;
            }

            match Self::create_provider(config) {
                Ok(provider) => {
                    info!(
                        "Initialized provider '{}' ({} / {})",
                        config.name, config.provider_type, config.model
                    );
                    providers.insert(config.name.clone(), provider);
                    order.push(config.name.clone());
                }
                Err(e) => {
                    warn!("Failed to initialize provider '{}': {}", config.name, e);
                }
            }
        }

        if providers.is_empty() {
            anyhow::bail!("no completion providers could be initialized");
        }

        Ok(Self { providers, order })
    }

    fn create_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn CompletionClient>> {
        let api_key = Self::resolve_api_key(&config.api_key)?;

        let provider: Arc<dyn CompletionClient> = match config.provider_type.as_str() {
            "openai" | "openai-compatible" => Arc::new(OpenAIAdapter::new(
                config.endpoint.clone(),
                api_key,
                config.model.clone(),
            )),
            "anthropic" => {
                if config.endpoint.is_empty() {
                    Arc::new(AnthropicAdapter::new(api_key, config.model.clone()))
                } else {
                    Arc::new(AnthropicAdapter::with_endpoint(
                        config.endpoint.clone(),
                        api_key,
                        config.model.clone(),
                    ))
                }
            }
            "ollama" => Arc::new(OllamaAdapter::new(
                config.endpoint.clone(),
                config.model.clone(),
            )),
            other => anyhow::bail!("Unsupported provider type: {other}"),
        };

        Ok(provider)
    }

    /// Resolve API key from config (supports "env:VAR_NAME" syntax)
    fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
        match key {
            Some(k) if k.starts_with("env:") => {
                let var_name = k.trim_start_matches("env:");
                std::env::var(var_name)
                    .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name))
            }
            Some(k) => Ok(k.clone()),
            // Local providers without auth.
            None => Ok(String::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CompletionClient>> {
        self.providers.get(name).map(Arc::clone)
    }

    /// The default provider: explicitly named, or the first configured one.
    pub fn default_provider(&self, preferred: Option<&str>) -> Option<Arc<dyn CompletionClient>> {
        match preferred {
            Some(name) => self.get(name),
            None => self.order.first().and_then(|name| self.get(name)),
        }
    }

    /// Provider names in configuration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Check health of all providers.
    pub async fn health_check_all(&self) -> HashMap<String, Result<(), ProviderError>> {
        let mut results = HashMap::new();
        for name in &self.order {
            if let Some(provider) = self.providers.get(name) {
                results.insert(name.clone(), provider.health_check().await);
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str, provider_type: &str, enabled: bool) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            provider_type: provider_type.to_string(),
            endpoint: "http://localhost:11434".to_string(),
            api_key: None,
            model: "llama3.2".to_string(),
            enabled,
        }
    }

    #[test]
    fn builds_registry_in_config_order() {
        let registry = ProviderRegistry::from_config(&[
            provider("local", "ollama", true),
            provider("compat", "openai-compatible", true),
        ])
        .unwrap();

        assert_eq!(registry.names(), &["local", "compat"]);
        assert!(registry.get("local").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn disabled_providers_are_skipped() {
        let registry = ProviderRegistry::from_config(&[
            provider("off", "ollama", false),
            provider("on", "ollama", true),
        ])
        .unwrap();

        assert_eq!(registry.names(), &["on"]);
        assert!(registry.get("off").is_none());
    }

    #[test]
    fn empty_registry_is_an_error() {
        assert!(ProviderRegistry::from_config(&[provider("off", "ollama", false)]).is_err());
    }

    #[test]
    fn default_provider_prefers_explicit_name() {
        let registry = ProviderRegistry::from_config(&[
            provider("first", "ollama", true),
            provider("second", "ollama", true),
        ])
        .unwrap();

        assert!(registry.default_provider(Some("second")).is_some());
        assert!(registry.default_provider(None).is_some());
        assert!(registry.default_provider(Some("ghost")).is_none());
    }

    #[test]
    fn unsupported_provider_type_is_skipped_not_fatal() {
        let registry = ProviderRegistry::from_config(&[
            provider("weird", "gemini", true),
            provider("ok", "ollama", true),
        ])
        .unwrap();

        assert_eq!(registry.names(), &["ok"]);
    }
}
