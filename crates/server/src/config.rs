//! Persisted server configuration (`.allpass/config.json`)
//!
//! Every field is optional; unset fields fall back to the orchestrator
//! defaults. PATCH requests merge field-wise.

use std::path::{Path, PathBuf};

use allpass_core::models::{ModelConfig, SimulationProfile};
use allpass_core::swarm::OrchestratorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const CONFIG_PATH: &str = ".allpass/config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PersistedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sonnet_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub haiku_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_base_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keepalive_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_min_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_max_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_failure_rate: Option<f64>,
}

impl PersistedConfig {
    /// Read the config file. A missing or unreadable file yields the empty config.
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Overwrite every field that is set in `other`
    pub fn merge(&mut self, other: PersistedConfig) {
        if other.sonnet_model.is_some() {
            self.sonnet_model = other.sonnet_model;
        }
        if other.haiku_model.is_some() {
            self.haiku_model = other.haiku_model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.max_retries.is_some() {
            self.max_retries = other.max_retries;
        }
        if other.retry_base_ms.is_some() {
            self.retry_base_ms = other.retry_base_ms;
        }
        if other.keepalive_interval_ms.is_some() {
            self.keepalive_interval_ms = other.keepalive_interval_ms;
        }
        if other.latency_min_ms.is_some() {
            self.latency_min_ms = other.latency_min_ms;
        }
        if other.latency_max_ms.is_some() {
            self.latency_max_ms = other.latency_max_ms;
        }
        if other.api_failure_rate.is_some() {
            self.api_failure_rate = other.api_failure_rate;
        }
    }

    /// Orchestrator settings: defaults, then environment, then this file
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();

        let mut model = ModelConfig::from_env();
        if let Some(name) = &self.sonnet_model {
            model.sonnet_model = name.clone();
        }
        if let Some(name) = &self.haiku_model {
            model.haiku_model = name.clone();
        }
        if self.base_url.is_some() {
            model.base_url = self.base_url.clone();
        }

        let sim = SimulationProfile::default();
        OrchestratorConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_base_ms: self.retry_base_ms.unwrap_or(defaults.retry_base_ms),
            keepalive_interval_ms: self
                .keepalive_interval_ms
                .unwrap_or(defaults.keepalive_interval_ms),
            simulation: SimulationProfile {
                latency_min_ms: self.latency_min_ms.unwrap_or(sim.latency_min_ms),
                latency_max_ms: self.latency_max_ms.unwrap_or(sim.latency_max_ms),
                api_failure_rate: self.api_failure_rate.unwrap_or(sim.api_failure_rate),
            },
            model,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigDefaults {
    sonnet_model: String,
    haiku_model: String,
    max_retries: u32,
    retry_base_ms: u64,
    keepalive_interval_ms: u64,
    latency_min_ms: u64,
    latency_max_ms: u64,
    api_failure_rate: f64,
    /// Whether `ANTHROPIC_API_KEY` is set
    live: bool,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            sonnet_model: defaults.model.sonnet_model,
            haiku_model: defaults.model.haiku_model,
            max_retries: defaults.max_retries,
            retry_base_ms: defaults.retry_base_ms,
            keepalive_interval_ms: defaults.keepalive_interval_ms,
            latency_min_ms: defaults.simulation.latency_min_ms,
            latency_max_ms: defaults.simulation.latency_max_ms,
            api_failure_rate: defaults.simulation.api_failure_rate,
            live: ModelConfig::from_env().is_live(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub config: PersistedConfig,
    pub defaults: ConfigDefaults,
}

/// Default location, relative to the working directory
pub fn default_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_only_overwrites_set_fields() {
        let mut config = PersistedConfig {
            max_retries: Some(5),
            sonnet_model: Some("a".into()),
            ..Default::default()
        };
        config.merge(PersistedConfig {
            sonnet_model: Some("b".into()),
            latency_max_ms: Some(0),
            ..Default::default()
        });
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.sonnet_model.as_deref(), Some("b"));
        assert_eq!(config.latency_max_ms, Some(0));
    }

    #[test]
    fn test_unset_fields_fall_back_to_defaults() {
        let config = PersistedConfig {
            retry_base_ms: Some(10),
            latency_min_ms: Some(0),
            latency_max_ms: Some(0),
            ..Default::default()
        }
        .to_orchestrator_config();
        assert_eq!(config.retry_base_ms, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.keepalive_interval_ms, 3000);
        assert_eq!(config.simulation.latency_max_ms, 0);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("allpass-config-{}", std::process::id()))
            .join("config.json");
        let config = PersistedConfig {
            api_failure_rate: Some(0.25),
            ..Default::default()
        };
        config.save(&path).await.unwrap();
        assert_eq!(PersistedConfig::load(&path).await, config);

        let missing = PersistedConfig::load(Path::new("/nonexistent/allpass.json")).await;
        assert_eq!(missing, PersistedConfig::default());
    }
}
