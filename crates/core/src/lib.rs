//! # All-Pass Core
//!
//! The "Brain" of All-Pass: turns a civil petition into a dependency graph
//! of agent tasks, runs it in parallel waves, and streams every step as an
//! event.
//!
//! ## Architecture
//!
//! - `swarm/` - Orchestrator, DAG executor, plan model and the event protocol
//! - `skills/` - Agents (master, planner, legal, document, api, scheduler, validator)
//! - `tools/` - PII masking, statute search and mock government services
//! - `models` - Live model configuration and simulation knobs
//! - `state/` - Client-side view folded from the event stream
//!
//! ## Usage
//!
//! ```rust,ignore
//! use allpass_core::swarm::{EventChannel, Orchestrator, OrchestratorConfig, RunRequest};
//!
//! let (channel, stream) = EventChannel::new();
//! let report = Orchestrator::new(OrchestratorConfig::default(), channel)
//!     .run(RunRequest::new("I was laid off, how do I get unemployment benefits?"))
//!     .await;
//! ```

pub mod error;
pub mod models;
pub mod skills;
pub mod state;
pub mod swarm;
pub mod tools;

pub use error::AgentError;
