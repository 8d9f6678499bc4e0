//! # Swarm Events
//!
//! The progress stream of a single run. Every observable step of the
//! orchestrator and the executor becomes an [`AgentEvent`] pushed onto an
//! [`EventChannel`]; the HTTP layer reads the matching [`EventStream`].
//!
//! Wire shape:
//!
//! ```text
//! {"type": "dag_node_update", "timestamp": 1718000000000, "data": {"nodeId": "n1", "status": "running"}}
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::mpsc;

use crate::skills::{AgentId, ApiCallRecord};
use crate::tools::legal_search::LegalCitation;

use super::dag::{NodeStatus, Plan};
use super::metrics::RunMetrics;
use super::pipeline::WorkflowState;

/// Kind of event, the `type` field on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WorkflowState,
    AgentStart,
    AgentThinking,
    AgentResult,
    AgentError,
    DagUpdate,
    DagNodeUpdate,
    LegalCitation,
    PiiMasking,
    ApiCall,
    Message,
    MetricsUpdate,
    /// Terminal. Nothing follows it.
    Complete,
}

/// Event body, the `data` field on the wire
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum EventPayload {
    WorkflowState {
        state: WorkflowState,
    },
    #[serde(rename_all = "camelCase")]
    AgentStart {
        agent_id: AgentId,
        task: String,
    },
    #[serde(rename_all = "camelCase")]
    AgentThinking {
        agent_id: AgentId,
        thought: String,
    },
    #[serde(rename_all = "camelCase")]
    AgentResult {
        agent_id: AgentId,
        result: String,
        duration: u64,
    },
    #[serde(rename_all = "camelCase")]
    AgentError {
        agent_id: AgentId,
    },
    DagUpdate {
        dag: Plan,
    },
    #[serde(rename_all = "camelCase")]
    DagNodeUpdate {
        node_id: String,
        status: NodeStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
    LegalCitation(LegalCitation),
    #[serde(rename_all = "camelCase")]
    PiiMasking {
        original: String,
        masked: String,
        detected_types: Vec<String>,
    },
    ApiCall(ApiCallRecord),
    Message {
        content: String,
    },
    MetricsUpdate(RunMetrics),
    Complete {},
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::WorkflowState { .. } => EventKind::WorkflowState,
            EventPayload::AgentStart { .. } => EventKind::AgentStart,
            EventPayload::AgentThinking { .. } => EventKind::AgentThinking,
            EventPayload::AgentResult { .. } => EventKind::AgentResult,
            EventPayload::AgentError { .. } => EventKind::AgentError,
            EventPayload::DagUpdate { .. } => EventKind::DagUpdate,
            EventPayload::DagNodeUpdate { .. } => EventKind::DagNodeUpdate,
            EventPayload::LegalCitation(_) => EventKind::LegalCitation,
            EventPayload::PiiMasking { .. } => EventKind::PiiMasking,
            EventPayload::ApiCall(_) => EventKind::ApiCall,
            EventPayload::Message { .. } => EventKind::Message,
            EventPayload::MetricsUpdate(_) => EventKind::MetricsUpdate,
            EventPayload::Complete {} => EventKind::Complete,
        }
    }
}

/// One immutable entry in a run's event log
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEvent {
    /// Epoch milliseconds
    pub timestamp: i64,
    pub payload: EventPayload,
}

impl AgentEvent {
    /// Stamp a payload with the current time
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Render as a single JSON line
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for AgentEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AgentEvent", 3)?;
        state.serialize_field("type", &self.kind())?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("data", &self.payload)?;
        state.end()
    }
}

/// Writer half of a run's event stream.
///
/// Clones share one sender. After [`close`](Self::close), or once the
/// reader is gone, emits are dropped silently.
#[derive(Clone)]
pub struct EventChannel {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<AgentEvent>>>>,
}

/// Reader half of a run's event stream
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<AgentEvent>,
}

impl EventChannel {
    /// Create a connected writer/reader pair
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventChannel, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            EventChannel {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            EventStream { rx },
        )
    }

    /// Push one event. Never fails.
    pub fn emit(&self, payload: EventPayload) {
        let event = AgentEvent::new(payload);
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => {
                if let Err(e) = tx.send(event) {
                    tracing::debug!(kind = ?e.0.kind(), "event reader gone, dropping event");
                }
            }
            None => tracing::debug!(kind = ?event.kind(), "event channel closed, dropping event"),
        }
    }

    /// Drop the writer. The reader sees end-of-stream once drained.
    pub fn close(&self) {
        self.tx.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().as_ref().map_or(true, |tx| tx.is_closed())
    }

    pub fn workflow_state(&self, state: WorkflowState) {
        self.emit(EventPayload::WorkflowState { state });
    }

    pub fn agent_start(&self, agent_id: AgentId, task: impl Into<String>) {
        self.emit(EventPayload::AgentStart {
            agent_id,
            task: task.into(),
        });
    }

    pub fn agent_thinking(&self, agent_id: AgentId, thought: impl Into<String>) {
        self.emit(EventPayload::AgentThinking {
            agent_id,
            thought: thought.into(),
        });
    }

    pub fn agent_result(&self, agent_id: AgentId, result: impl Into<String>, duration: u64) {
        self.emit(EventPayload::AgentResult {
            agent_id,
            result: result.into(),
            duration,
        });
    }

    pub fn agent_error(&self, agent_id: AgentId) {
        self.emit(EventPayload::AgentError { agent_id });
    }

    /// Publish a full plan snapshot
    pub fn dag_update(&self, plan: &Plan) {
        self.emit(EventPayload::DagUpdate { dag: plan.clone() });
    }

    pub fn dag_node_update(
        &self,
        node_id: impl Into<String>,
        status: NodeStatus,
        result: Option<String>,
        duration: Option<u64>,
    ) {
        self.emit(EventPayload::DagNodeUpdate {
            node_id: node_id.into(),
            status,
            result,
            duration,
        });
    }

    pub fn legal_citation(&self, citation: LegalCitation) {
        self.emit(EventPayload::LegalCitation(citation));
    }

    pub fn pii_masking(
        &self,
        original: impl Into<String>,
        masked: impl Into<String>,
        detected_types: Vec<String>,
    ) {
        self.emit(EventPayload::PiiMasking {
            original: original.into(),
            masked: masked.into(),
            detected_types,
        });
    }

    pub fn api_call(&self, record: ApiCallRecord) {
        self.emit(EventPayload::ApiCall(record));
    }

    /// Chat-visible content. Replaces whatever was shown before.
    pub fn message(&self, content: impl Into<String>) {
        self.emit(EventPayload::Message {
            content: content.into(),
        });
    }

    pub fn metrics_update(&self, metrics: RunMetrics) {
        self.emit(EventPayload::MetricsUpdate(metrics));
    }

    pub fn complete(&self) {
        self.emit(EventPayload::Complete {});
    }
}

impl EventStream {
    /// Next event, `None` once the channel is closed and drained
    pub async fn recv(&mut self) -> Option<AgentEvent> {
        self.rx.recv().await
    }

    /// Take everything currently buffered without waiting
    pub fn drain(&mut self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Read until end-of-stream
    pub async fn collect(mut self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }

    /// Hand the raw receiver to a transport adapter
    pub fn into_inner(self) -> mpsc::UnboundedReceiver<AgentEvent> {
        self.rx
    }
}
