//! # Master Skill
//!
//! Classifies the (masked) request and writes the final answer.
//!
//! In simulation mode both steps are keyword and template driven. In live
//! mode they call the model; a classification reply that is not valid JSON
//! falls back to a `general` intent, while a transport failure propagates
//! so the orchestrator can retry the attempt.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{extract_json_block, ModelConfig, ModelTier, SimulationProfile};
use crate::swarm::metrics::RunMetrics;
use crate::tools::legal_search::LegalCitation;

use super::planner_skill::ScenarioId;
use super::AgentId;

const ANALYZE_PROMPT: &str = r#"You are the master agent of All-Pass, a civil petition processing system.
Analyze the citizen's request and identify the intent, category, complexity and the agents required.
Reply with JSON only:
{"intent":"...","category":"restaurant|relocation|welfare|general","complexity":"simple|complex|multi","requiredAgents":["legal","document","api","validator","scheduler"],"summary":"..."}"#;

const SYNTHESIZE_PROMPT: &str = "You are the master agent of All-Pass, a civil petition processing system. \
Combine the specialist agents' results into one clear, friendly answer a citizen can follow. \
Write in Markdown.";

/// Petition category, used to pick a canned plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Restaurant,
    Relocation,
    Welfare,
    General,
}

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Restaurant,
        &[
            "식당", "음식", "파스타", "영업허가", "창업", "restaurant", "food", "cafe", "pasta",
            "business permit",
        ],
    ),
    (
        Category::Relocation,
        &["전입", "이사", "move-in", "moving", "relocat", "new address"],
    ),
    (
        Category::Welfare,
        &[
            "실업", "실직", "잘렸", "고용보험", "복지", "unemploy", "laid off", "lost my job",
            "fired", "welfare",
        ],
    ),
];

impl Category {
    /// Keyword classification, first matching category wins
    pub fn detect(text: &str) -> Category {
        let text = text.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| text.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::General)
    }

    pub fn parse_lenient(name: &str) -> Category {
        match name.trim().to_ascii_lowercase().as_str() {
            "restaurant" => Category::Restaurant,
            "relocation" => Category::Relocation,
            "welfare" => Category::Welfare,
            _ => Category::General,
        }
    }

    /// Scenario with a canned plan, if any
    pub fn scenario(self) -> Option<ScenarioId> {
        match self {
            Category::Restaurant => Some(ScenarioId::Restaurant),
            Category::Relocation => Some(ScenarioId::Relocation),
            Category::Welfare => Some(ScenarioId::Welfare),
            Category::General => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Complex,
    Multi,
}

impl Complexity {
    fn parse_lenient(name: &str) -> Complexity {
        match name.trim().to_ascii_lowercase().as_str() {
            "complex" => Complexity::Complex,
            "multi" => Complexity::Multi,
            _ => Complexity::Simple,
        }
    }
}

/// Output of intent classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntentAnalysis {
    pub intent: String,
    pub category: Category,
    pub complexity: Complexity,
    pub required_agents: Vec<AgentId>,
    pub summary: String,
}

impl IntentAnalysis {
    /// Keyword-driven classification
    pub fn classify(input: &str) -> Self {
        match Category::detect(input) {
            Category::Restaurant => Self {
                intent: "Restaurant business permit and start-up guidance".into(),
                category: Category::Restaurant,
                complexity: Complexity::Complex,
                required_agents: vec![
                    AgentId::Legal,
                    AgentId::Document,
                    AgentId::Api,
                    AgentId::Scheduler,
                    AgentId::Validator,
                ],
                summary: "Business permit, building check and sanitation education scheduling for a new restaurant".into(),
            },
            Category::Relocation => Self {
                intent: "Move-in report with linked follow-up petitions".into(),
                category: Category::Relocation,
                complexity: Complexity::Multi,
                required_agents: vec![
                    AgentId::Legal,
                    AgentId::Document,
                    AgentId::Api,
                    AgentId::Validator,
                ],
                summary: "Move-in report plus six linked petitions such as health insurance and vehicle registration".into(),
            },
            Category::Welfare => Self {
                intent: "Unemployment benefit application and emergency welfare guidance".into(),
                category: Category::Welfare,
                complexity: Complexity::Complex,
                required_agents: vec![
                    AgentId::Legal,
                    AgentId::Document,
                    AgentId::Api,
                    AgentId::Validator,
                ],
                summary: "Unemployment benefit procedure and linked welfare support after a sudden job loss".into(),
            },
            Category::General => Self::general(input),
        }
    }

    /// Catch-all intent for anything unrecognized
    pub fn general(input: &str) -> Self {
        Self {
            intent: "General civil petition".into(),
            category: Category::General,
            complexity: Complexity::Simple,
            required_agents: vec![AgentId::Legal, AgentId::Document, AgentId::Validator],
            summary: format!("Petition about \"{}...\"", truncate_chars(input, 30)),
        }
    }
}

/// Loose shape of a model classification reply
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIntent {
    intent: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    complexity: String,
    #[serde(default)]
    required_agents: Vec<String>,
    #[serde(default)]
    summary: String,
}

impl From<RawIntent> for IntentAnalysis {
    fn from(raw: RawIntent) -> Self {
        Self {
            intent: raw.intent,
            category: Category::parse_lenient(&raw.category),
            complexity: Complexity::parse_lenient(&raw.complexity),
            required_agents: raw
                .required_agents
                .iter()
                .filter_map(|a| AgentId::parse(a))
                .collect(),
            summary: raw.summary,
        }
    }
}

/// Everything the final answer is built from
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub intent: IntentAnalysis,
    /// node id -> result text
    pub results: BTreeMap<String, String>,
    pub citations: Vec<LegalCitation>,
    pub metrics: RunMetrics,
    pub scenario: Option<ScenarioId>,
}

/// Classification and synthesis seam used by the orchestrator
#[async_trait]
pub trait MasterAgent: Send + Sync {
    async fn analyze(&self, input: &str) -> Result<IntentAnalysis>;
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct MasterSkill {
    config: ModelConfig,
    profile: SimulationProfile,
}

impl MasterSkill {
    pub fn new(config: ModelConfig, profile: SimulationProfile) -> Self {
        Self { config, profile }
    }

    async fn analyze_live(&self, input: &str) -> Result<IntentAnalysis> {
        let client = self.config.client()?;
        let reply = client
            .complete(
                ModelTier::Sonnet,
                ANALYZE_PROMPT,
                &format!("Analyze this request: \"{}\"", input),
            )
            .await
            .context("intent classification failed")?;

        let parsed = extract_json_block(&reply)
            .and_then(|block| serde_json::from_str::<RawIntent>(block).ok());
        Ok(match parsed {
            Some(raw) => raw.into(),
            None => {
                tracing::warn!("classification reply was not JSON, using general intent");
                IntentAnalysis {
                    intent: truncate_chars(input, 50),
                    summary: truncate_chars(&reply, 100),
                    ..IntentAnalysis::general(input)
                }
            }
        })
    }

    async fn synthesize_live(&self, request: &SynthesisRequest) -> Result<String> {
        let client = self.config.client()?;
        let results = request
            .results
            .iter()
            .map(|(id, text)| format!("[{}]: {}", id, text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let citations = request
            .citations
            .iter()
            .map(|c| format!("{} {}: {}", c.law_name, c.article, truncate_chars(&c.content, 80)))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Write the final guidance from these agent results.\n\nAgent results:\n{}\n\nRelated statutes:\n{}\n\nProcessing time: {:.1}s",
            results,
            if citations.is_empty() { "none" } else { citations.as_str() },
            request.metrics.total_time as f64 / 1000.0
        );
        client
            .complete(ModelTier::Sonnet, SYNTHESIZE_PROMPT, &prompt)
            .await
            .context("response synthesis failed")
    }
}

impl Default for MasterSkill {
    fn default() -> Self {
        Self::new(ModelConfig::default(), SimulationProfile::default())
    }
}

#[async_trait]
impl MasterAgent for MasterSkill {
    async fn analyze(&self, input: &str) -> Result<IntentAnalysis> {
        if self.config.is_live() {
            return self.analyze_live(input).await;
        }
        self.profile.pause().await;
        Ok(IntentAnalysis::classify(input))
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String> {
        if self.config.is_live() {
            return self.synthesize_live(request).await;
        }
        self.profile.pause().await;
        Ok(render_summary(request))
    }
}

/// Template answer used in simulation mode
pub fn render_summary(request: &SynthesisRequest) -> String {
    if let Some(scenario) = request.scenario {
        return scenario.closing_message().to_string();
    }

    let results = request
        .results
        .values()
        .filter(|r| !r.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let citations = request
        .citations
        .iter()
        .map(|c| format!("- {} {}", c.law_name, c.article))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Processing is complete.\n\n**Summary**\n{}\n\n**Related statutes**\n{}\n\n**Processing time**: {:.1}s",
        truncate_chars(&results, 300),
        if citations.is_empty() { "none".to_string() } else { citations },
        request.metrics.total_time as f64 / 1000.0
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
