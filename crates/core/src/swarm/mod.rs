//! # Swarm Orchestration
//!
//! Coordinates the agent pipeline for All-Pass.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Petition → PII mask → Master (classify) → Planner → DagExecutor (waves) → Master (synthesize)
//! ```

pub mod coordinator;
pub mod dag;
pub mod events;
pub mod executor;
pub mod metrics;
pub mod pipeline;

pub use coordinator::{Orchestrator, OrchestratorConfig, RunReport, RunRequest};
pub use dag::{Edge, Node, NodeStatus, Plan};
pub use events::{AgentEvent, EventChannel, EventKind, EventPayload, EventStream};
pub use executor::{DagExecutor, ExecutionOutcome};
pub use metrics::RunMetrics;
pub use pipeline::{Pipeline, WorkflowState};
