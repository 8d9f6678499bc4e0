//! # DAG Executor
//!
//! Runs a [`Plan`] in waves. Each wave is every pending node whose
//! dependencies have all resolved (`completed` or `error`); the wave is
//! dispatched concurrently and joined with all-settle semantics before the
//! next wave is computed. An empty wave ends the run, so a cycle or a
//! dependency on an unknown id leaves nodes `pending` instead of hanging.
//!
//! A node failure stays local: its error text becomes its result and its
//! dependents still run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::error::AgentError;
use crate::skills::{AgentDispatch, AgentId, AgentOutput, NodeContext};

use super::dag::{Node, NodeStatus, Plan};
use super::events::EventChannel;

/// Final state of an executed plan
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Plan with every node's final status
    pub plan: Plan,
    /// node id -> result text (error text for failed nodes)
    pub results: BTreeMap<String, String>,
}

type Settled = (usize, AgentId, Result<AgentOutput, AgentError>, Duration);

pub struct DagExecutor {
    plan: Plan,
    dispatcher: Arc<dyn AgentDispatch>,
    channel: EventChannel,
    results: BTreeMap<String, String>,
}

impl DagExecutor {
    pub fn new(plan: Plan, dispatcher: Arc<dyn AgentDispatch>, channel: EventChannel) -> Self {
        Self {
            plan,
            dispatcher,
            channel,
            results: BTreeMap::new(),
        }
    }

    /// Run every reachable node and return the final plan and results
    pub async fn execute(mut self) -> ExecutionOutcome {
        let mut wave = 0usize;

        loop {
            let ready = self.ready_nodes();
            if ready.is_empty() {
                break;
            }
            wave += 1;
            tracing::debug!(wave, nodes = ?ready, "dispatching wave");

            let mut join_set: JoinSet<Settled> = JoinSet::new();
            for index in ready {
                let Some(node) = self.start_node(index) else {
                    continue;
                };
                let ctx = self.context_for(&node);
                let dispatcher = Arc::clone(&self.dispatcher);

                join_set.spawn(async move {
                    let started = Instant::now();
                    let result = dispatcher.dispatch(&node, &ctx).await;
                    (index, node.agent_id, result, started.elapsed())
                });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((index, agent, Ok(output), elapsed)) => {
                        self.complete_node(index, agent, output, elapsed)
                    }
                    Ok((index, agent, Err(e), elapsed)) => {
                        self.fail_node(index, agent, e.to_string(), elapsed)
                    }
                    Err(e) => tracing::error!(error = %e, "agent task aborted"),
                }
            }

            // A panicked task never reports back; its node is still running
            let orphaned: Vec<(usize, AgentId)> = self
                .plan
                .nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| n.status == NodeStatus::Running)
                .map(|(index, n)| (index, n.agent_id))
                .collect();
            for (index, agent) in orphaned {
                self.fail_node(index, agent, "agent task panicked".to_string(), Duration::ZERO);
            }
        }

        let pending = self
            .plan
            .nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Pending)
            .count();
        if pending > 0 {
            tracing::warn!(
                pending,
                "execution stopped with unreachable nodes (cycle or unknown dependency)"
            );
        }
        tracing::info!(waves = wave, results = self.results.len(), "plan executed");

        ExecutionOutcome {
            plan: self.plan,
            results: self.results,
        }
    }

    /// Indices of pending nodes whose dependencies have all resolved, in plan order.
    /// Nodes are tracked by position so a repeated id cannot alias another node.
    fn ready_nodes(&self) -> Vec<usize> {
        self.plan
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.status == NodeStatus::Pending)
            .filter(|(_, n)| {
                n.dependencies.iter().all(|dep| {
                    self.plan
                        .node(dep)
                        .is_some_and(|d| d.status.is_resolved())
                })
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Only a `pending` node may start; status never moves backwards.
    fn start_node(&mut self, index: usize) -> Option<Node> {
        let node = self
            .plan
            .nodes
            .get_mut(index)
            .filter(|n| n.status == NodeStatus::Pending)?;
        node.status = NodeStatus::Running;
        let node = node.clone();

        self.channel
            .dag_node_update(node.id.as_str(), NodeStatus::Running, None, None);
        self.channel.dag_update(&self.plan);
        self.channel
            .agent_start(node.agent_id, node.description.clone());
        Some(node)
    }

    fn context_for(&self, node: &Node) -> NodeContext {
        let mut ctx = NodeContext::new(node.id.clone());
        for dep in &node.dependencies {
            if let Some(result) = self.results.get(dep) {
                ctx = ctx.with_dependency(dep, result.clone());
            }
        }
        if node.agent_id == AgentId::Validator {
            ctx = ctx.with_all_results(self.results.clone());
        }
        ctx
    }

    fn complete_node(&mut self, index: usize, agent: AgentId, output: AgentOutput, elapsed: Duration) {
        let duration = elapsed.as_millis() as u64;
        let Some(node) = self.plan.nodes.get_mut(index) else {
            return;
        };
        node.status = NodeStatus::Completed;
        node.result = Some(output.result.clone());
        node.duration = Some(duration);
        let id = node.id.clone();
        self.results.insert(id.clone(), output.result.clone());

        self.channel.dag_node_update(
            id.as_str(),
            NodeStatus::Completed,
            Some(output.result.clone()),
            Some(duration),
        );
        self.channel.dag_update(&self.plan);
        self.channel.agent_result(agent, output.result, duration);
        if let Some(record) = output.api_call {
            self.channel.api_call(record);
        }
    }

    fn fail_node(&mut self, index: usize, agent: AgentId, message: String, elapsed: Duration) {
        let duration = elapsed.as_millis() as u64;
        let Some(node) = self.plan.nodes.get_mut(index) else {
            return;
        };
        node.status = NodeStatus::Error;
        node.result = Some(message.clone());
        node.duration = Some(duration);
        let id = node.id.clone();
        tracing::warn!(node = %id, %agent, error = %message, "node failed");
        self.results.insert(id.clone(), message.clone());

        self.channel
            .dag_node_update(id.as_str(), NodeStatus::Error, Some(message), Some(duration));
        self.channel.dag_update(&self.plan);
        self.channel.agent_error(agent);
    }
}
