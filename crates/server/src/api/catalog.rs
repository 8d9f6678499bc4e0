//! Scenario and agent catalogs

use allpass_core::skills::agent_definitions::{agent_catalog, AgentProfile};
use allpass_core::skills::planner_skill::ScenarioInfo;
use allpass_core::skills::ScenarioId;
use axum::Json;

/// Demo scenarios with canned plans
#[utoipa::path(
    get,
    path = "/api/v1/scenarios",
    tag = "catalog",
    responses((status = 200, description = "Scenario catalog"))
)]
pub async fn list_scenarios() -> Json<Vec<ScenarioInfo>> {
    Json(ScenarioId::all().iter().map(|s| s.info()).collect())
}

/// Every agent with its display metadata
#[utoipa::path(
    get,
    path = "/api/v1/agents",
    tag = "catalog",
    responses((status = 200, description = "Agent catalog"))
)]
pub async fn list_agents() -> Json<Vec<AgentProfile>> {
    Json(agent_catalog())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_catalogs() {
        let (status, body) = send(instant_router("scenarios").await, get("/api/v1/scenarios")).await;
        assert_eq!(status, StatusCode::OK);
        let scenarios: Vec<Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[0]["id"], "restaurant");
        assert_eq!(scenarios[0]["expectedSteps"], 7);

        let (_, body) = send(instant_router("agents").await, get("/api/v1/agents")).await;
        let agents: Vec<Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(agents.len(), 7);
        assert!(agents.iter().any(|a| a["id"] == "validator"));
    }
}
