//! # Pipeline Stages
//!
//! Workflow state machine for one orchestration run.
//!
//! ```text
//! INIT → PLANNING → EXECUTING → VALIDATING → COMPLETED
//!   ↑                                  │ (stage failure)
//!   └──────────── RETRY ←──────────────┤
//!                                      └→ HUMAN_REVIEW (retries exhausted)
//! ```

use serde::{Deserialize, Serialize};

/// Top-level phase of a run, independent of any node's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// Input received, PII scrub
    Init,
    /// Intent classification and plan construction
    Planning,
    /// DAG execution
    Executing,
    /// Metrics and synthesis
    Validating,
    /// Response delivered
    Completed,
    /// Attempt failed, about to restart
    Retry,
    /// Retries exhausted, handed to a person
    HumanReview,
}

impl WorkflowState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Init => "INIT",
            WorkflowState::Planning => "PLANNING",
            WorkflowState::Executing => "EXECUTING",
            WorkflowState::Validating => "VALIDATING",
            WorkflowState::Completed => "COMPLETED",
            WorkflowState::Retry => "RETRY",
            WorkflowState::HumanReview => "HUMAN_REVIEW",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline state machine
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Current state
    pub state: WorkflowState,
    /// Retries consumed so far
    pub retries: u32,
    /// Retries allowed before escalation
    pub max_retries: u32,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            state: WorkflowState::Init,
            retries: 0,
            max_retries: 3,
        }
    }
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Advance to the next stage and return it
    pub fn advance(&mut self) -> WorkflowState {
        self.state = match self.state {
            WorkflowState::Init => WorkflowState::Planning,
            WorkflowState::Planning => WorkflowState::Executing,
            WorkflowState::Executing => WorkflowState::Validating,
            WorkflowState::Validating => WorkflowState::Completed,
            WorkflowState::Retry => WorkflowState::Init,
            WorkflowState::Completed => WorkflowState::Completed,
            WorkflowState::HumanReview => WorkflowState::HumanReview,
        };
        self.state
    }

    /// Record a failed attempt.
    ///
    /// Returns `true` and moves to `RETRY` while retries remain, otherwise
    /// moves to `HUMAN_REVIEW` and returns `false`.
    pub fn retry(&mut self) -> bool {
        if self.retries >= self.max_retries {
            self.state = WorkflowState::HumanReview;
            false
        } else {
            self.retries += 1;
            self.state = WorkflowState::Retry;
            true
        }
    }

    /// Begin a fresh attempt from `INIT`
    pub fn restart(&mut self) {
        self.state = WorkflowState::Init;
    }

    /// `COMPLETED` or `HUMAN_REVIEW`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            WorkflowState::Completed | WorkflowState::HumanReview
        )
    }

    pub fn is_success(&self) -> bool {
        self.state == WorkflowState::Completed
    }
}
