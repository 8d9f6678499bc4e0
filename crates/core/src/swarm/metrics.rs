//! Aggregate run metrics published at VALIDATING and COMPLETED

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::skills::AgentId;

use super::dag::Plan;

/// Manual processing baseline the time-reduction figure is measured against
pub const MANUAL_BASELINE: Duration = Duration::from_secs(21 * 24 * 3600);

/// Agent invocations that happen outside the plan: classification and planning
const COORDINATION_CALLS: u32 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// Milliseconds since the request was accepted
    pub total_time: u64,
    pub agent_calls: u32,
    pub api_calls: u32,
    pub legal_citations: u32,
    pub documents_generated: u32,
    /// Percent saved versus [`MANUAL_BASELINE`]
    pub time_reduction: i64,
}

impl RunMetrics {
    /// Count a finished plan
    pub fn from_plan(plan: &Plan, citations: usize) -> Self {
        Self {
            total_time: 0,
            agent_calls: COORDINATION_CALLS + plan.nodes.len() as u32,
            api_calls: plan.count_by_agent(AgentId::Api) as u32,
            legal_citations: citations as u32,
            documents_generated: plan.count_by_agent(AgentId::Document) as u32,
            time_reduction: 0,
        }
    }

    /// Set the elapsed time and derive the reduction percentage
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.total_time = elapsed.as_millis() as u64;
        self.time_reduction = time_reduction(elapsed);
        self
    }
}

/// `round((1 - elapsed / baseline) * 100)`
pub fn time_reduction(elapsed: Duration) -> i64 {
    let ratio = elapsed.as_secs_f64() / MANUAL_BASELINE.as_secs_f64();
    ((1.0 - ratio) * 100.0).round() as i64
}
