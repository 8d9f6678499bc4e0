//! # Run View
//!
//! Client-side picture of a run, folded from its event stream. Each event
//! kind updates exactly one part of the view; nothing else mutates it.
//!
//! ```rust,ignore
//! let view = events.iter().fold(RunView::default(), RunView::apply);
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::skills::{AgentId, ApiCallRecord};
use crate::swarm::dag::Plan;
use crate::swarm::events::{AgentEvent, EventPayload};
use crate::swarm::metrics::RunMetrics;
use crate::swarm::pipeline::WorkflowState;
use crate::tools::legal_search::LegalCitation;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentActivity {
    #[default]
    Idle,
    Working,
    Thinking,
    Done,
    Error,
}

/// Latest known state of one agent
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub activity: AgentActivity,
    pub task: Option<String>,
    pub thought: Option<String>,
    pub result: Option<String>,
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PiiNotice {
    pub original: String,
    pub masked: String,
    pub detected_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub state: Option<WorkflowState>,
    /// RETRY transitions seen
    pub retries: u32,
    pub agents: BTreeMap<AgentId, AgentView>,
    /// Plan of the current attempt
    pub plan: Option<Plan>,
    pub citations: Vec<LegalCitation>,
    pub metrics: Option<RunMetrics>,
    /// Latest chat-visible content
    pub message: Option<String>,
    pub pii: Vec<PiiNotice>,
    pub api_calls: Vec<ApiCallRecord>,
    /// Events applied, `complete` included
    pub events: usize,
    pub completed: bool,
}

impl RunView {
    /// Fold one event into the view. Events after `complete` are ignored.
    pub fn apply(mut self, event: &AgentEvent) -> Self {
        if self.completed {
            return self;
        }
        self.events += 1;

        match &event.payload {
            EventPayload::WorkflowState { state } => {
                if *state == WorkflowState::Retry {
                    self.retries += 1;
                    self.plan = None;
                    self.citations.clear();
                }
                self.state = Some(*state);
            }
            EventPayload::AgentStart { agent_id, task } => {
                let agent = self.agents.entry(*agent_id).or_default();
                agent.activity = AgentActivity::Working;
                agent.task = Some(task.clone());
            }
            EventPayload::AgentThinking { agent_id, thought } => {
                let agent = self.agents.entry(*agent_id).or_default();
                agent.activity = AgentActivity::Thinking;
                agent.thought = Some(thought.clone());
            }
            EventPayload::AgentResult {
                agent_id,
                result,
                duration,
            } => {
                let agent = self.agents.entry(*agent_id).or_default();
                agent.activity = AgentActivity::Done;
                agent.result = Some(result.clone());
                agent.duration = Some(*duration);
            }
            EventPayload::AgentError { agent_id } => {
                self.agents.entry(*agent_id).or_default().activity = AgentActivity::Error;
            }
            EventPayload::DagUpdate { dag } => self.plan = Some(dag.clone()),
            EventPayload::DagNodeUpdate {
                node_id,
                status,
                result,
                duration,
            } => {
                if let Some(node) = self.plan.as_mut().and_then(|p| p.node_mut(node_id)) {
                    node.status = *status;
                    if result.is_some() {
                        node.result = result.clone();
                    }
                    if duration.is_some() {
                        node.duration = *duration;
                    }
                }
            }
            EventPayload::LegalCitation(citation) => self.citations.push(citation.clone()),
            EventPayload::PiiMasking {
                original,
                masked,
                detected_types,
            } => self.pii.push(PiiNotice {
                original: original.clone(),
                masked: masked.clone(),
                detected_types: detected_types.clone(),
            }),
            EventPayload::ApiCall(record) => self.api_calls.push(record.clone()),
            EventPayload::Message { content } => self.message = Some(content.clone()),
            EventPayload::MetricsUpdate(metrics) => self.metrics = Some(metrics.clone()),
            EventPayload::Complete {} => self.completed = true,
        }
        self
    }

    /// Fold a whole event log
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a AgentEvent>) -> Self {
        events.into_iter().fold(Self::default(), Self::apply)
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentView> {
        self.agents.get(&id)
    }
}
