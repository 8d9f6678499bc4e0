//! # API Skill
//!
//! Calls the mock government service a node's text points at and reports
//! the call so the executor can publish it.

use serde_json::Value;

use crate::error::AgentError;
use crate::models::SimulationProfile;
use crate::swarm::dag::Node;
use crate::tools::gov_api::{ApiKind, GovApi};

use super::{AgentOutput, ApiCallRecord, NodeContext};

#[derive(Debug, Clone, Default)]
pub struct ApiSkill {
    api: GovApi,
}

impl ApiSkill {
    pub fn new(profile: SimulationProfile) -> Self {
        Self {
            api: GovApi::new(profile),
        }
    }

    /// Service a node talks to, from its label and description
    pub fn infer_kind(node: &Node) -> ApiKind {
        ApiKind::infer(&format!("{} {}", node.label, node.description))
    }

    pub async fn handle(&self, node: &Node, ctx: &NodeContext) -> Result<AgentOutput, AgentError> {
        let kind = Self::infer_kind(node);

        let mut params = ctx.to_json();
        if let Value::Object(map) = &mut params {
            map.insert("task".into(), Value::String(node.description.clone()));
        }

        let response = self.api.call(kind, &params).await?;
        let result = serde_json::to_string(&response.data)?;

        Ok(AgentOutput::text(result).with_api_call(ApiCallRecord {
            endpoint: response.endpoint,
            method: method_for(kind).to_string(),
            status: 200,
            response_time: response.response_time,
        }))
    }
}

/// Lookups are reads, everything else files something
fn method_for(kind: ApiKind) -> &'static str {
    match kind {
        ApiKind::BuildingRegistry
        | ApiKind::EmploymentInsurance
        | ApiKind::FoodEducation
        | ApiKind::WelfareBenefits => "GET",
        ApiKind::ResidentRegistration
        | ApiKind::HealthInsurance
        | ApiKind::VehicleRegistration
        | ApiKind::Generic => "POST",
    }
}
