// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Router Configuration Types
//
// Defines the configuration schema for RELAY router nodes, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Completion provider configuration (BYOLLM support)
// - Agent catalog entries (capability tags, provider refs, sampling params)
// - Workflow definition and engine limits
// - Selection policy tuning (analysis-intent keywords, capability cues)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::completion::SamplingParams;
use crate::domain::workflow::WorkflowDefinition;

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const MANIFEST_KIND: &str = "RouterConfig";

/// Top-level Kubernetes-style router configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "RouterConfig")
    pub kind: String,

    /// Manifest metadata (name, labels, version)
    pub metadata: ManifestMetadata,

    /// Router configuration specification
    pub spec: RouterConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable router name
    pub name: String,

    /// Optional: Configuration version for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional: Labels for categorization and discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Router configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfigSpec {
    /// Completion provider configurations
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Agent catalog entries
    #[serde(default)]
    pub agents: Vec<AgentConfig>,

    /// Workflow definition (agent order, step ceiling, run timeout)
    #[serde(default)]
    pub workflow: WorkflowDefinition,

    /// Engine limits (retries, per-call timeout, admission ceiling)
    #[serde(default)]
    pub engine: EngineConfig,

    /// Selection policy tuning
    #[serde(default)]
    pub selection: SelectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name (e.g. "ollama-local", "openai")
    pub name: String,

    /// Provider type: "openai", "anthropic", "ollama", "openai-compatible"
    #[serde(rename = "type")]
    pub provider_type: String,

    /// API endpoint URL (optional for providers with a fixed endpoint)
    #[serde(default)]
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME" for environment variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Actual model identifier for the provider API
    pub model: String,

    /// Whether this provider is active
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// One agent catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent name
    pub name: String,

    /// Human-readable description, surfaced to the decomposition prompt
    pub description: String,

    /// Capability tags used for deterministic selection
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Name of the completion provider backing this agent
    pub provider: String,

    /// Sampling parameters for this agent's completions
    #[serde(default)]
    pub generation: SamplingParams,

    /// Optional Handlebars prompt template overriding the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Total attempts per worker invocation (first try included)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay between attempts; doubles per retry
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Per-call timeout for one worker invocation
    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: u64,

    /// Ceiling on concurrently executing runs
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,

    /// Provider used by the decomposer; defaults to the first enabled one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_provider: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
            step_timeout_seconds: default_step_timeout(),
            max_concurrent_runs: default_max_concurrent_runs(),
            router_provider: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Keywords in the *original request* that signal analysis intent.
    /// Agents carrying an analysis-class capability tag are only eligible
    /// when one of these appears in the request.
    #[serde(default = "default_analysis_keywords")]
    pub analysis_keywords: Vec<String>,

    /// Extra capability-tag cue words, merged over the built-in table.
    #[serde(default)]
    pub capability_cues: HashMap<String, Vec<String>>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            analysis_keywords: default_analysis_keywords(),
            capability_cues: HashMap::new(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_step_timeout() -> u64 {
    90
}

fn default_max_concurrent_runs() -> usize {
    4
}

fn default_analysis_keywords() -> Vec<String> {
    ["analysis", "analyze", "summarization", "summarize", "reporting", "insights"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for RouterConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: MANIFEST_KIND.to_string(),
            metadata: ManifestMetadata {
                name: "relay-router".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: RouterConfigSpec::default(),
        }
    }
}

impl RouterConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. RELAY_CONFIG_PATH environment variable
    /// 2. ./relay-config.yaml (working directory)
    /// 3. ~/.relay/config.yaml (user home)
    /// 4. /etc/relay/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("RELAY_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./relay-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".relay").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/relay/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration: explicit path first, then discovery.
    pub fn load(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            return Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e));
        }

        match Self::discover_config() {
            Some(path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", path);
                Self::from_yaml_file(path)
            }
            None => anyhow::bail!(
                "No configuration file found (set RELAY_CONFIG_PATH or create ./relay-config.yaml)"
            ),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != MANIFEST_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, MANIFEST_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.providers.is_empty() {
            anyhow::bail!("spec.providers cannot be empty");
        }

        for provider in &self.spec.providers {
            if provider.name.is_empty() {
                anyhow::bail!("provider name cannot be empty");
            }
            if provider.endpoint.is_empty() && provider.provider_type != "anthropic" {
                anyhow::bail!("provider endpoint cannot be empty for: {}", provider.name);
            }
            if provider.model.is_empty() {
                anyhow::bail!("provider model cannot be empty for: {}", provider.name);
            }
        }

        if self.spec.agents.is_empty() {
            anyhow::bail!("spec.agents cannot be empty");
        }

        for agent in &self.spec.agents {
            if agent.name.is_empty() {
                anyhow::bail!("agent name cannot be empty");
            }
            if !self.spec.providers.iter().any(|p| p.name == agent.provider) {
                anyhow::bail!(
                    "agent '{}' references unknown provider '{}'",
                    agent.name,
                    agent.provider
                );
            }
        }

        self.spec.workflow.validate()?;
        for name in &self.spec.workflow.agents {
            if !self.spec.agents.iter().any(|a| &a.name == name) {
                anyhow::bail!("workflow references unknown agent '{}'", name);
            }
        }

        if self.spec.engine.retry_attempts == 0 {
            anyhow::bail!("engine.retry_attempts must be at least 1");
        }
        if self.spec.engine.max_concurrent_runs == 0 {
            anyhow::bail!("engine.max_concurrent_runs must be at least 1");
        }

        if let Some(router_provider) = &self.spec.engine.router_provider {
            if !self.spec.providers.iter().any(|p| &p.name == router_provider) {
                anyhow::bail!(
                    "engine.router_provider '{}' not found in spec.providers",
                    router_provider
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: 100monkeys.ai/v1
kind: RouterConfig
metadata:
  name: test-router
spec:
  providers:
    - name: local
      type: ollama
      endpoint: http://localhost:11434
      model: llama3.2
  agents:
    - name: solver
      description: Handles general computation
      capabilities: [computation]
      provider: local
    - name: analyst
      description: Deep analysis and reporting
      capabilities: [analysis, reporting]
      provider: local
      generation:
        temperature: 0.2
  workflow:
    name: sequential
    agents: [solver, analyst]
    max_steps: 6
    timeout_seconds: 120
  engine:
    retry_attempts: 2
    max_concurrent_runs: 2
"#;

    #[test]
    fn parses_sample_manifest() {
        let manifest = RouterConfigManifest::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(manifest.metadata.name, "test-router");
        assert_eq!(manifest.spec.providers.len(), 1);
        assert_eq!(manifest.spec.agents.len(), 2);
        assert_eq!(manifest.spec.workflow.max_steps, 6);
        assert_eq!(manifest.spec.engine.retry_attempts, 2);
        // Untouched fields pick up defaults.
        assert_eq!(manifest.spec.engine.step_timeout_seconds, 90);
        assert_eq!(
            manifest.spec.agents[1].generation.temperature,
            Some(0.2)
        );
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn loads_manifest_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay-config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let manifest = RouterConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(manifest.metadata.name, "test-router");
    }

    #[test]
    fn validation_rejects_wrong_kind() {
        let mut manifest = RouterConfigManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn validation_rejects_unknown_provider_ref() {
        let mut manifest = RouterConfigManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.spec.agents[0].provider = "nonexistent".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn validation_rejects_unknown_workflow_agent() {
        let mut manifest = RouterConfigManifest::from_yaml_str(SAMPLE).unwrap();
        manifest.spec.workflow.agents.push("ghost".to_string());
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn validation_requires_agents_and_providers() {
        let manifest = RouterConfigManifest::default();
        // Default spec has no providers/agents and must not validate.
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn default_selection_keywords_cover_spec_set() {
        let selection = SelectionConfig::default();
        for kw in ["analysis", "summarization", "reporting", "insights"] {
            assert!(selection.analysis_keywords.iter().any(|k| k == kw));
        }
    }
}
