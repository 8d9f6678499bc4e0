//! # Agent Definitions
//!
//! Display metadata for every agent, served to clients so they can label
//! and color agent activity.

use serde::Serialize;

use crate::models::ModelTier;

use super::AgentId;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: AgentId,
    pub name: &'static str,
    pub description: &'static str,
    pub model: ModelTier,
    /// Hex color used in the graph view
    pub color: &'static str,
}

impl AgentId {
    pub fn profile(self) -> AgentProfile {
        let (name, description, model, color) = match self {
            AgentId::Master => (
                "MasterAgent",
                "Intent analysis, plan orchestration and final response synthesis",
                ModelTier::Sonnet,
                "#6366f1",
            ),
            AgentId::Planner => (
                "PlannerAgent",
                "Breaks a complex petition down into an execution graph",
                ModelTier::Haiku,
                "#8b5cf6",
            ),
            AgentId::Legal => (
                "LegalAgent",
                "Statute search and regulatory compliance checks",
                ModelTier::Sonnet,
                "#ec4899",
            ),
            AgentId::Document => (
                "DocumentAgent",
                "Required document lists and auto-fill guidance",
                ModelTier::Haiku,
                "#f59e0b",
            ),
            AgentId::Api => (
                "APIAgent",
                "Government API simulation",
                ModelTier::Haiku,
                "#10b981",
            ),
            AgentId::Validator => (
                "ValidatorAgent",
                "Result validation and hallucination detection",
                ModelTier::Sonnet,
                "#ef4444",
            ),
            AgentId::Scheduler => (
                "SchedulerAgent",
                "Agency visit schedule optimization",
                ModelTier::Haiku,
                "#06b6d4",
            ),
        };
        AgentProfile {
            id: self,
            name,
            description,
            model,
            color,
        }
    }
}

/// Every agent, in catalog order
pub fn agent_catalog() -> Vec<AgentProfile> {
    AgentId::all().iter().map(|a| a.profile()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_agent() {
        let catalog = agent_catalog();
        assert_eq!(catalog.len(), AgentId::all().len());
        assert_eq!(catalog[0].name, "MasterAgent");
        assert_eq!(AgentId::Api.profile().color, "#10b981");
    }

    #[test]
    fn test_profile_wire_shape() {
        let json = serde_json::to_value(AgentId::Legal.profile()).unwrap();
        assert_eq!(json["id"], "legal");
        assert_eq!(json["model"], "sonnet");
    }
}
