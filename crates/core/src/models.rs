//! # All-Pass Models
//!
//! Model configuration shared by the agents and the orchestrator.
//!
//! The system runs in one of two modes:
//! - **Simulation** (no `ANTHROPIC_API_KEY`): every agent answers from
//!   deterministic templates after a short, jittered delay.
//! - **Live**: the master agent (intent + synthesis) and the generative
//!   planner call the Anthropic Messages API.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Capability tier an agent runs on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Reasoning-heavy agents (master, legal, validator)
    Sonnet,
    /// Fast template-style agents (planner, document, api, scheduler)
    Haiku,
}

/// Configuration for live model calls
///
/// ## Example
/// ```rust,ignore
/// use allpass_core::models::ModelConfig;
///
/// let config = ModelConfig::from_env();
/// if config.is_live() {
///     let text = config.client()?.complete(ModelTier::Sonnet, "system", "prompt").await?;
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used for `ModelTier::Sonnet`
    pub sonnet_model: String,
    /// Model used for `ModelTier::Haiku`
    pub haiku_model: String,
    /// Optional base URL override (proxies, gateways)
    pub base_url: Option<String>,
    /// API key; `None` means simulation mode
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Maximum tokens per completion
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sonnet_model: "claude-sonnet-4-5".to_string(),
            haiku_model: "claude-haiku-4-5".to_string(),
            base_url: None,
            api_key: None,
            max_tokens: 2048,
        }
    }
}

impl ModelConfig {
    /// Build from environment variables (`ANTHROPIC_API_KEY`, `ALLPASS_MODEL`,
    /// `ANTHROPIC_BASE_URL`)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Ok(model) = std::env::var("ALLPASS_MODEL") {
            config.sonnet_model = model;
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            config.base_url = Some(url);
        }
        config
    }

    /// Whether live model calls are enabled
    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }

    /// Model name for a tier
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Sonnet => &self.sonnet_model,
            ModelTier::Haiku => &self.haiku_model,
        }
    }

    /// Create a client. Fails in simulation mode.
    pub fn client(&self) -> Result<LlmClient> {
        let api_key = self
            .api_key
            .clone()
            .context("ANTHROPIC_API_KEY is not set (simulation mode)")?;
        Ok(LlmClient {
            http: reqwest::Client::new(),
            config: self.clone(),
            api_key,
        })
    }
}

/// Minimal Anthropic Messages API client
pub struct LlmClient {
    http: reqwest::Client,
    config: ModelConfig,
    api_key: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl LlmClient {
    /// Run one completion and return the concatenated text blocks
    pub async fn complete(&self, tier: ModelTier, system: &str, prompt: &str) -> Result<String> {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/v1/messages", base.trim_end_matches('/'));
        let model = self.config.model_for(tier);

        let body = MessagesRequest {
            model,
            max_tokens: self.config.max_tokens,
            system,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("model {} rejected the request", model))?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("malformed Messages API response")?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        anyhow::ensure!(!text.trim().is_empty(), "model {} returned no text", model);
        Ok(text)
    }
}

/// Slice the outermost `{ ... }` block out of a model reply
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Simulation knobs shared by every mocked agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationProfile {
    /// Lower bound of the per-call delay (ms)
    pub latency_min_ms: u64,
    /// Upper bound of the per-call delay (ms, exclusive)
    pub latency_max_ms: u64,
    /// Probability that a mock government API call fails
    pub api_failure_rate: f64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            latency_min_ms: 200,
            latency_max_ms: 600,
            api_failure_rate: 0.0,
        }
    }
}

impl SimulationProfile {
    /// No delay, no injected failures. Used by tests and the CLI `--fast` flag.
    pub fn instant() -> Self {
        Self {
            latency_min_ms: 0,
            latency_max_ms: 0,
            api_failure_rate: 0.0,
        }
    }

    /// Pick a delay inside the configured window
    pub fn sample_latency(&self) -> Duration {
        if self.latency_max_ms <= self.latency_min_ms {
            return Duration::from_millis(self.latency_min_ms);
        }
        let ms = rand::rng().random_range(self.latency_min_ms..self.latency_max_ms);
        Duration::from_millis(ms)
    }

    /// Sleep for a sampled delay
    pub async fn pause(&self) {
        let delay = self.sample_latency();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Roll for an injected API failure
    pub fn should_fail(&self) -> bool {
        let p = self.api_failure_rate.clamp(0.0, 1.0);
        p > 0.0 && rand::rng().random_bool(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_simulation() {
        let config = ModelConfig::default();
        assert!(!config.is_live());
        assert!(config.client().is_err());
    }

    #[test]
    fn test_extract_json_block() {
        let reply = "Here you go:\n```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_json_block(reply), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_block("no json"), None);
    }

    #[test]
    fn test_instant_profile() {
        let profile = SimulationProfile::instant();
        assert!(profile.sample_latency().is_zero());
        assert!(!profile.should_fail());
    }

    #[test]
    fn test_latency_window() {
        let profile = SimulationProfile {
            latency_min_ms: 10,
            latency_max_ms: 20,
            api_failure_rate: 1.0,
        };
        let d = profile.sample_latency();
        assert!(d >= Duration::from_millis(10) && d < Duration::from_millis(20));
        assert!(profile.should_fail());
    }
}
