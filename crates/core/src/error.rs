//! Agent error types

use thiserror::Error;

use crate::skills::AgentId;

/// Errors raised by an agent while handling a single plan node.
///
/// These never escape the executor: a failed dispatch becomes an `error`
/// node whose result is the rendered message.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent ran but could not produce a result
    #[error("{agent} agent failed: {reason}")]
    Failed { agent: AgentId, reason: String },

    /// A (mock) government service answered with a failure status
    #[error("{endpoint} responded with status {status}")]
    Upstream { endpoint: String, status: u16 },

    /// Live model call failed
    #[error("model call failed: {0}")]
    Model(#[from] anyhow::Error),

    /// Result could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgentError {
    pub fn failed(agent: AgentId, reason: impl Into<String>) -> Self {
        Self::Failed {
            agent,
            reason: reason.into(),
        }
    }
}
