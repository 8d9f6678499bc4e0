//! # Planner Skill
//!
//! Turns an intent into an executable [`Plan`].
//!
//! Precedence:
//! 1. an explicitly requested scenario gets its library plan
//! 2. a category that maps to a scenario gets that library plan
//! 3. anything else is generated: by the model in live mode, otherwise
//!    (and whenever generation fails) the minimal default plan
//!    `legal → document → validator`

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{extract_json_block, ModelConfig, ModelTier, SimulationProfile};
use crate::swarm::dag::{Edge, Node, Plan};

use super::master_skill::IntentAnalysis;
use super::AgentId;

const PLAN_PROMPT: &str = r#"You are the planner agent of All-Pass, a civil petition processing system.
Produce a DAG (directed acyclic graph) execution plan as JSON.
Agent kinds: master, planner, legal, document, api, validator, scheduler
Reply with JSON only, in exactly this shape:
{
  "id": "dag-xxx",
  "title": "...",
  "nodes": [{"id":"n1","label":"...","agentId":"...","description":"...","dependencies":[]}],
  "edges": [{"id":"e1","source":"n1","target":"n2"}]
}"#;

/// Scenario with a hand-authored plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioId {
    Restaurant,
    Relocation,
    Welfare,
}

/// Catalog entry served to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInfo {
    pub id: ScenarioId,
    pub title: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub default_input: &'static str,
    pub expected_steps: usize,
    pub tags: &'static [&'static str],
}

impl ScenarioId {
    pub fn all() -> &'static [ScenarioId] {
        &[
            ScenarioId::Restaurant,
            ScenarioId::Relocation,
            ScenarioId::Welfare,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioId::Restaurant => "restaurant",
            ScenarioId::Relocation => "relocation",
            ScenarioId::Welfare => "welfare",
        }
    }

    pub fn parse(id: &str) -> Option<ScenarioId> {
        Self::all().iter().copied().find(|s| s.as_str() == id)
    }

    pub fn info(self) -> ScenarioInfo {
        match self {
            ScenarioId::Restaurant => ScenarioInfo {
                id: self,
                title: "Small business restaurant start-up",
                description: "Every permit a new restaurant needs, handled in one stop",
                color: "#f59e0b",
                default_input: "I'm opening a pasta place on the 1st floor of 383-22 Yeonnam-dong. The lease is already signed.",
                expected_steps: 7,
                tags: &["business permit", "building register", "Food Sanitation Act"],
            },
            ScenarioId::Relocation => ScenarioInfo {
                id: self,
                title: "Move-in report with linked petitions",
                description: "One move-in report triggers six linked petitions automatically",
                color: "#3b82f6",
                default_input: "We're moving to Yeongtong-gu, Suwon. Please file the move-in report for me, my husband and our 3-year-old.",
                expected_steps: 7,
                tags: &["move-in report", "Resident Registration Act", "auto-linking"],
            },
            ScenarioId::Welfare => ScenarioInfo {
                id: self,
                title: "Emergency welfare linkage",
                description: "Detects a crisis and proactively surfaces welfare benefits",
                color: "#ef4444",
                default_input: "I was suddenly laid off... what do I need to do to get unemployment benefits?",
                expected_steps: 5,
                tags: &["unemployment benefit", "emergency welfare", "MyData"],
            },
        }
    }

    /// Final answer used by the simulated master agent
    pub fn closing_message(self) -> &'static str {
        match self {
            ScenarioId::Restaurant => "Your restaurant start-up checklist is ready.\n\n\
                **1. Business report**: 2 of the 5 required documents (building register, lease) were filled in automatically.\n\
                **2. Building check**: the building is a Class 1 neighborhood facility and is eligible for a restaurant.\n\
                **3. Sanitation education**: complete the food sanitation education before filing. The nearest session is listed in your schedule.\n\
                **4. Visit**: bring the education certificate and health certificate to the district office sanitation team.\n\n\
                Basis: Food Sanitation Act Articles 36, 37 and 41.",
            ScenarioId::Relocation => "Your move-in report has been submitted.\n\n\
                **Linked petitions processed automatically**: health insurance, vehicle registration, driver license, national pension, child allowance and daycare transfer.\n\
                **Still to do**: the vehicle registration change requires a visit to the registration office.\n\n\
                Basis: Resident Registration Act Article 10. Report within 14 days to avoid a fine.",
            ScenarioId::Welfare => "Here is what to do after your job loss.\n\n\
                **1. Unemployment benefit**: your insurance history (683 insured days) meets the 180-day requirement. Register on the job portal, then visit the employment center.\n\
                **2. Linked support**: National Employment Support Program, Emergency Welfare Support and a health insurance premium deferral.\n\
                **3. Deadline**: apply within 12 months of separation.\n\n\
                Basis: Employment Insurance Act Articles 40 and 48.",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan construction seam used by the orchestrator
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, intent: &IntentAnalysis, scenario: Option<ScenarioId>) -> Result<Plan>;
}

/// Hand-authored plans for the known scenarios
#[derive(Debug, Clone, Default)]
pub struct LibraryPlanner;

impl LibraryPlanner {
    pub fn plan_for(&self, scenario: ScenarioId) -> Plan {
        let plan = match scenario {
            ScenarioId::Restaurant => Plan::new("dag-restaurant", "Restaurant start-up permits")
                .with_node(Node::new("n1", "Food Sanitation Act review", AgentId::Legal, "Review facility, permit and education requirements for a restaurant"))
                .with_node(Node::new("n2", "Building register lookup", AgentId::Api, "Check the building use and floor area at the restaurant address"))
                .with_node(Node::new("n3", "Sanitation education schedule", AgentId::Api, "Find the next food sanitation education sessions").after(["n1"]))
                .with_node(Node::new("n4", "Business report documents", AgentId::Document, "Prepare the restaurant business report checklist").after(["n1", "n2"]))
                .with_node(Node::new("n5", "Visit schedule", AgentId::Scheduler, "Plan the district office visit after the education").after(["n3", "n4"]))
                .with_node(Node::new("n6", "Cross-check", AgentId::Validator, "Cross-check every result against the cited statutes").after(["n4", "n5"]))
                .with_node(Node::new("n7", "Final guidance", AgentId::Master, "Assemble the restaurant start-up guidance").after(["n6"])),
            ScenarioId::Relocation => Plan::new("dag-relocation", "Move-in report and linked petitions")
                .with_node(Node::new("n1", "Resident Registration Act review", AgentId::Legal, "Review move-in reporting duties and deadlines"))
                .with_node(Node::new("n2", "Move-in report submission", AgentId::Api, "Submit the move-in report for the household").after(["n1"]))
                .with_node(Node::new("n3", "Move-in documents", AgentId::Document, "Prepare the documents for the move-in report").after(["n1"]))
                .with_node(Node::new("n4", "Health insurance address change", AgentId::Api, "Update the address on the health insurance record").after(["n2"]))
                .with_node(Node::new("n5", "Vehicle registration update", AgentId::Api, "Update the address on the vehicle registration").after(["n2"]))
                .with_node(Node::new("n6", "Cross-check", AgentId::Validator, "Cross-check the report and every linked petition").after(["n3", "n4", "n5"]))
                .with_node(Node::new("n7", "Linked petitions summary", AgentId::Master, "Summarize the linked petitions").after(["n6"])),
            ScenarioId::Welfare => Plan::new("dag-welfare", "Unemployment benefit and emergency welfare")
                .with_node(Node::new("n1", "Employment Insurance Act review", AgentId::Legal, "Review unemployment benefit eligibility after being laid off"))
                .with_node(Node::new("n2", "Employment insurance history", AgentId::Api, "Look up insured days and the separation reason"))
                .with_node(Node::new("n3", "Welfare benefits lookup", AgentId::Api, "Find emergency welfare support programs").after(["n1"]))
                .with_node(Node::new("n4", "Benefit application documents", AgentId::Document, "Prepare the unemployment benefit application checklist").after(["n1", "n2"]))
                .with_node(Node::new("n5", "Cross-check", AgentId::Validator, "Cross-check eligibility and the support found").after(["n3", "n4"])),
        };
        plan.derive_edges().prepare()
    }
}

/// Minimal fallback plan for any intent
pub fn default_plan(intent: &str) -> Plan {
    Plan::new(
        format!("dag-{}", chrono::Utc::now().timestamp_millis()),
        intent,
    )
    .with_node(Node::new(
        "n1",
        "Statute search",
        AgentId::Legal,
        format!("Search statutes related to {}", intent),
    ))
    .with_node(
        Node::new(
            "n2",
            "Document guidance",
            AgentId::Document,
            format!("List the documents required for {}", intent),
        )
        .after(["n1"]),
    )
    .with_node(
        Node::new("n3", "Result check", AgentId::Validator, "Cross-check the results").after(["n2"]),
    )
    .derive_edges()
    .prepare()
}

/// Loose shape of a generated plan
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    agent_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Parse a model reply into a typed plan. Unknown agent ids become `master`.
pub fn parse_plan(reply: &str, fallback_title: &str) -> Result<Plan> {
    let block = extract_json_block(reply).context("no JSON object in planner reply")?;
    let raw: RawPlan = serde_json::from_str(block).context("planner reply is not a plan")?;
    anyhow::ensure!(!raw.nodes.is_empty(), "generated plan has no nodes");
    let mut seen = HashSet::new();
    if let Some(repeated) = raw.nodes.iter().find(|n| !seen.insert(n.id.as_str())) {
        anyhow::bail!("generated plan repeats node id {}", repeated.id);
    }

    let mut plan = Plan::new(
        raw.id
            .unwrap_or_else(|| format!("dag-{}", chrono::Utc::now().timestamp_millis())),
        raw.title.unwrap_or_else(|| fallback_title.to_string()),
    );
    for node in raw.nodes {
        let label = if node.label.is_empty() {
            node.id.clone()
        } else {
            node.label
        };
        plan = plan.with_node(
            Node::new(
                node.id,
                label,
                AgentId::parse_lenient(&node.agent_id),
                node.description,
            )
            .after(node.dependencies),
        );
    }
    plan.edges = raw.edges;
    if plan.edges.is_empty() {
        plan = plan.derive_edges();
    }
    Ok(plan.prepare())
}

/// Generates plans for intents without a library plan
#[derive(Debug, Clone)]
pub struct GenerativePlanner {
    config: ModelConfig,
    profile: SimulationProfile,
}

impl GenerativePlanner {
    pub fn new(config: ModelConfig, profile: SimulationProfile) -> Self {
        Self { config, profile }
    }

    /// Never fails: any generation problem yields the default plan
    pub async fn generate(&self, intent: &IntentAnalysis) -> Plan {
        if !self.config.is_live() {
            self.profile.pause().await;
            return default_plan(&intent.intent);
        }
        match self.generate_live(intent).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "plan generation failed, using default plan");
                default_plan(&intent.intent)
            }
        }
    }

    async fn generate_live(&self, intent: &IntentAnalysis) -> Result<Plan> {
        let client = self.config.client()?;
        let prompt = format!(
            "Build the DAG execution plan for this petition.\nIntent: {}\nCategory: {:?}",
            intent.intent, intent.category
        );
        let reply = client
            .complete(ModelTier::Haiku, PLAN_PROMPT, &prompt)
            .await?;
        parse_plan(&reply, &intent.intent)
    }
}

/// Default planner: library first, generation as the fallback
#[derive(Debug, Clone)]
pub struct PlannerAgent {
    library: LibraryPlanner,
    generative: GenerativePlanner,
    profile: SimulationProfile,
}

impl PlannerAgent {
    pub fn new(config: ModelConfig, profile: SimulationProfile) -> Self {
        Self {
            library: LibraryPlanner,
            generative: GenerativePlanner::new(config, profile.clone()),
            profile,
        }
    }
}

#[async_trait]
impl Planner for PlannerAgent {
    async fn plan(&self, intent: &IntentAnalysis, scenario: Option<ScenarioId>) -> Result<Plan> {
        if let Some(scenario) = scenario.or_else(|| intent.category.scenario()) {
            tracing::debug!(%scenario, "using library plan");
            self.profile.pause().await;
            return Ok(self.library.plan_for(scenario));
        }
        Ok(self.generative.generate(intent).await)
    }
}
