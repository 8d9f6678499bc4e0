//! # All-Pass Skills
//!
//! The agents a plan node can be dispatched to, and the dispatch table that
//! routes a node to its agent.
//!
//! ## Architecture
//!
//! ```text
//! DagExecutor
//!   └── AgentDispatch (SkillDispatcher by default)
//!         └── Skills (LegalSkill, DocumentSkill, ApiSkill, ...)
//!               └── Tools (legal_search, gov_api)
//! ```
//!
//! ## Skill Categories
//!
//! **Coordinator Skills** (run outside the plan):
//! - `MasterSkill` - Intent classification and response synthesis
//! - `PlannerAgent` - Builds the plan for an intent
//!
//! **Node Skills** (run as plan nodes):
//! - `LegalSkill` - Statute lookup and compliance notes
//! - `DocumentSkill` - Required document checklist
//! - `ApiSkill` - Mock government service calls
//! - `SchedulerSkill` - Visit schedule
//! - `ValidatorSkill` - Cross-checks every result of the run

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::AgentError;
use crate::models::SimulationProfile;
use crate::swarm::dag::Node;

pub mod agent_definitions;
pub mod api_skill;
pub mod document_skill;
pub mod legal_skill;
pub mod master_skill;
pub mod planner_skill;
pub mod scheduler_skill;
pub mod validator_skill;

pub use agent_definitions::{agent_catalog, AgentProfile};
pub use api_skill::ApiSkill;
pub use document_skill::DocumentSkill;
pub use legal_skill::LegalSkill;
pub use master_skill::{Category, IntentAnalysis, MasterAgent, MasterSkill, SynthesisRequest};
pub use planner_skill::{GenerativePlanner, LibraryPlanner, Planner, PlannerAgent, ScenarioId};
pub use scheduler_skill::SchedulerSkill;
pub use validator_skill::ValidatorSkill;

/// Closed set of agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Master,
    Planner,
    Legal,
    Document,
    Api,
    Scheduler,
    Validator,
}

impl AgentId {
    pub fn all() -> &'static [AgentId] {
        &[
            AgentId::Master,
            AgentId::Planner,
            AgentId::Legal,
            AgentId::Document,
            AgentId::Api,
            AgentId::Scheduler,
            AgentId::Validator,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentId::Master => "master",
            AgentId::Planner => "planner",
            AgentId::Legal => "legal",
            AgentId::Document => "document",
            AgentId::Api => "api",
            AgentId::Scheduler => "scheduler",
            AgentId::Validator => "validator",
        }
    }

    pub fn parse(id: &str) -> Option<AgentId> {
        let id = id.trim().to_ascii_lowercase();
        Self::all().iter().copied().find(|a| a.as_str() == id)
    }

    /// Unknown ids become the `master` coordinator placeholder
    pub fn parse_lenient(id: &str) -> AgentId {
        Self::parse(id).unwrap_or(AgentId::Master)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call made against a (mock) external service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallRecord {
    pub endpoint: String,
    pub method: String,
    /// HTTP status code
    pub status: u16,
    /// Milliseconds
    pub response_time: u64,
}

/// What a dispatched node gets to see.
///
/// Ordinary nodes see only their direct dependencies. Validator nodes also
/// get every result accumulated so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeContext {
    pub node_id: String,
    /// Keyed `dep_<id>`
    pub dependencies: BTreeMap<String, String>,
    pub all_results: Option<BTreeMap<String, String>>,
}

impl NodeContext {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, dep_id: &str, result: impl Into<String>) -> Self {
        self.dependencies
            .insert(format!("dep_{}", dep_id), result.into());
        self
    }

    pub fn with_all_results(mut self, results: BTreeMap<String, String>) -> Self {
        self.all_results = Some(results);
        self
    }

    /// Result of a direct dependency by node id
    pub fn dependency(&self, dep_id: &str) -> Option<&str> {
        self.dependencies
            .get(&format!("dep_{}", dep_id))
            .map(String::as_str)
    }

    /// `{nodeId, dep_<id>..., allResults?}`
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("nodeId".into(), json!(self.node_id));
        for (key, value) in &self.dependencies {
            map.insert(key.clone(), json!(value));
        }
        if let Some(all) = &self.all_results {
            map.insert("allResults".into(), json!(all));
        }
        Value::Object(map)
    }
}

/// Successful dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    pub result: String,
    /// Published as an `api_call` event when present
    pub api_call: Option<ApiCallRecord>,
}

impl AgentOutput {
    pub fn text(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            api_call: None,
        }
    }

    pub fn with_api_call(mut self, record: ApiCallRecord) -> Self {
        self.api_call = Some(record);
        self
    }
}

/// Routes a node to the agent that handles it
#[async_trait]
pub trait AgentDispatch: Send + Sync {
    async fn dispatch(&self, node: &Node, ctx: &NodeContext) -> Result<AgentOutput, AgentError>;
}

/// Default dispatch table over the simulated skills
#[derive(Debug, Clone)]
pub struct SkillDispatcher {
    legal: LegalSkill,
    document: DocumentSkill,
    api: ApiSkill,
    scheduler: SchedulerSkill,
    validator: ValidatorSkill,
    profile: SimulationProfile,
}

impl SkillDispatcher {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            legal: LegalSkill::new(profile.clone()),
            document: DocumentSkill::new(profile.clone()),
            api: ApiSkill::new(profile.clone()),
            scheduler: SchedulerSkill::new(profile.clone()),
            validator: ValidatorSkill::new(profile.clone()),
            profile,
        }
    }
}

impl Default for SkillDispatcher {
    fn default() -> Self {
        Self::new(SimulationProfile::default())
    }
}

#[async_trait]
impl AgentDispatch for SkillDispatcher {
    async fn dispatch(&self, node: &Node, ctx: &NodeContext) -> Result<AgentOutput, AgentError> {
        match node.agent_id {
            AgentId::Legal => self.legal.handle(node, ctx).await,
            AgentId::Document => self.document.handle(node, ctx).await,
            AgentId::Api => self.api.handle(node, ctx).await,
            AgentId::Scheduler => self.scheduler.handle(node, ctx).await,
            AgentId::Validator => self.validator.handle(node, ctx).await,
            // Coordinator placeholders inside a plan only acknowledge
            AgentId::Master | AgentId::Planner => {
                self.profile.pause().await;
                Ok(AgentOutput::text(format!("{} completed", node.description)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_parsing() {
        assert_eq!(AgentId::parse("Legal"), Some(AgentId::Legal));
        assert_eq!(AgentId::parse("unknown"), None);
        assert_eq!(AgentId::parse_lenient("coordinator"), AgentId::Master);
        assert_eq!(AgentId::Validator.to_string(), "validator");
        assert_eq!(AgentId::all().len(), 7);
    }

    #[test]
    fn test_context_json_shape() {
        let ctx = NodeContext::new("n3")
            .with_dependency("n1", "first")
            .with_dependency("n2", "second");
        let json = ctx.to_json();
        assert_eq!(json["nodeId"], "n3");
        assert_eq!(json["dep_n1"], "first");
        assert_eq!(json["dep_n2"], "second");
        assert!(json.get("allResults").is_none());
        assert_eq!(ctx.dependency("n2"), Some("second"));
    }

    #[test]
    fn test_validator_context_carries_all_results() {
        let mut all = BTreeMap::new();
        all.insert("n1".to_string(), "a".to_string());
        let json = NodeContext::new("v").with_all_results(all).to_json();
        assert_eq!(json["allResults"]["n1"], "a");
    }

    #[tokio::test]
    async fn test_coordinator_nodes_acknowledge() {
        let dispatcher = SkillDispatcher::new(SimulationProfile::instant());
        for agent in [AgentId::Master, AgentId::Planner] {
            let node = Node::new("n9", "Wrap up", agent, "Final guidance");
            let out = dispatcher
                .dispatch(&node, &NodeContext::new("n9"))
                .await
                .unwrap();
            assert_eq!(out.result, "Final guidance completed");
            assert!(out.api_call.is_none());
        }
    }

    #[tokio::test]
    async fn test_api_nodes_report_the_call() {
        let dispatcher = SkillDispatcher::new(SimulationProfile::instant());
        let node = Node::new("n2", "Building register lookup", AgentId::Api, "Check the building");
        let out = dispatcher
            .dispatch(&node, &NodeContext::new("n2"))
            .await
            .unwrap();
        let record = out.api_call.unwrap();
        assert_eq!(record.endpoint, "/api/gov/building_registry");
        assert_eq!(record.status, 200);
    }
}
