//! # Swarm Coordinator
//!
//! Drives one petition from raw text to a final answer:
//!
//! ```text
//! INIT (PII mask) → PLANNING (classify + plan) → EXECUTING (DAG) → citations
//!     → VALIDATING (metrics + synthesis) → COMPLETED
//! ```
//!
//! Any stage error aborts the attempt and the whole pipeline is re-run from
//! INIT with linear backoff. Once retries are exhausted the run escalates to
//! HUMAN_REVIEW. Either way the event stream ends with exactly one
//! `complete` and the channel is closed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::{ModelConfig, SimulationProfile};
use crate::skills::{
    AgentDispatch, AgentId, LegalSkill, MasterAgent, MasterSkill, Planner,
    PlannerAgent, ScenarioId, SkillDispatcher, SynthesisRequest,
};
use crate::tools::pii;

use super::dag::Plan;
use super::events::EventChannel;
use super::executor::{DagExecutor, ExecutionOutcome};
use super::metrics::RunMetrics;
use super::pipeline::{Pipeline, WorkflowState};

const THINKING_TEXT: &str = "Composing the final answer...";
const ESCALATION_TEXT: &str = "Sorry, we could not finish processing your request automatically. \
A human officer will review it and get back to you shortly.";

/// Configuration for the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Retries after the first failed attempt (default: 3)
    pub max_retries: u32,
    /// Backoff unit; the n-th retry waits n times this (ms)
    pub retry_base_ms: u64,
    /// Period of `agent_thinking` keep-alives during synthesis (ms)
    pub keepalive_interval_ms: u64,
    /// Latency and failure injection for simulated agents
    pub simulation: SimulationProfile,
    /// Live model settings
    pub model: ModelConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_ms: 1000,
            keepalive_interval_ms: 3000,
            simulation: SimulationProfile::default(),
            model: ModelConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// No simulated latency. Backoff and keep-alive timings are kept.
    pub fn instant() -> Self {
        Self {
            simulation: SimulationProfile::instant(),
            ..Self::default()
        }
    }
}

/// One inbound petition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub message: String,
    /// Forces a canned plan
    pub scenario: Option<ScenarioId>,
}

impl RunRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            scenario: None,
        }
    }

    pub fn with_scenario(mut self, scenario: Option<ScenarioId>) -> Self {
        self.scenario = scenario;
        self
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub struct RunReport {
    /// `COMPLETED` or `HUMAN_REVIEW`
    pub state: WorkflowState,
    /// Retries consumed
    pub retries: u32,
    /// Final chat-visible message
    pub response: String,
    /// Executed plan of the successful attempt
    pub plan: Option<Plan>,
    pub metrics: Option<RunMetrics>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.state == WorkflowState::Completed
    }
}

/// Output of one successful attempt
struct Attempt {
    plan: Plan,
    response: String,
    metrics: RunMetrics,
}

/// Runs a single request end to end, writing progress into its channel
pub struct Orchestrator {
    config: OrchestratorConfig,
    channel: EventChannel,
    master: Arc<dyn MasterAgent>,
    planner: Arc<dyn Planner>,
    dispatcher: Arc<dyn AgentDispatch>,
    legal: LegalSkill,
    pipeline: Pipeline,
}

impl Orchestrator {
    /// Create an orchestrator with the default agents for `config`
    pub fn new(config: OrchestratorConfig, channel: EventChannel) -> Self {
        let sim = config.simulation.clone();
        Self {
            master: Arc::new(MasterSkill::new(config.model.clone(), sim.clone())),
            planner: Arc::new(PlannerAgent::new(config.model.clone(), sim.clone())),
            dispatcher: Arc::new(SkillDispatcher::new(sim.clone())),
            legal: LegalSkill::new(sim),
            pipeline: Pipeline::new(config.max_retries),
            config,
            channel,
        }
    }

    pub fn with_master(mut self, master: Arc<dyn MasterAgent>) -> Self {
        self.master = master;
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn AgentDispatch>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_legal(mut self, legal: LegalSkill) -> Self {
        self.legal = legal;
        self
    }

    /// Run the request to COMPLETED or HUMAN_REVIEW. Never fails.
    #[tracing::instrument(
        skip(self, request),
        fields(message_preview = %request.message.chars().take(50).collect::<String>(), scenario = ?request.scenario)
    )]
    pub async fn run(mut self, request: RunRequest) -> RunReport {
        let started = Instant::now();
        tracing::info!("run started");

        loop {
            self.pipeline.restart();
            match self.run_attempt(&request, started).await {
                Ok(attempt) => {
                    tracing::info!(
                        retries = self.pipeline.retries,
                        total_ms = attempt.metrics.total_time,
                        "run completed"
                    );
                    return RunReport {
                        state: self.pipeline.state,
                        retries: self.pipeline.retries,
                        response: attempt.response,
                        plan: Some(attempt.plan),
                        metrics: Some(attempt.metrics),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = self.pipeline.retries + 1,
                        error = %format!("{:#}", e),
                        "pipeline attempt failed"
                    );
                    if !self.pipeline.retry() {
                        return self.escalate();
                    }

                    let retries = self.pipeline.retries;
                    self.channel.workflow_state(WorkflowState::Retry);
                    self.channel.message(format!(
                        "Retrying... ({}/{})",
                        retries, self.pipeline.max_retries
                    ));
                    let backoff = Duration::from_millis(self.config.retry_base_ms * retries as u64);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// One pass through the pipeline. Errors abort the attempt.
    async fn run_attempt(&mut self, request: &RunRequest, started: Instant) -> Result<Attempt> {
        // INIT
        self.channel.workflow_state(self.pipeline.state);
        let stage = Instant::now();
        self.channel
            .agent_start(AgentId::Master, "Screening the request for personal information");
        let masking = pii::mask(&request.message);
        let screening = if masking.is_clean() {
            "No personal information found".to_string()
        } else {
            self.channel.pii_masking(
                request.message.as_str(),
                masking.masked.as_str(),
                masking.detected_labels(),
            );
            format!("{} personal data item(s) masked", masking.detections.len())
        };
        self.channel
            .agent_result(AgentId::Master, screening, elapsed_ms(stage));

        // PLANNING
        self.channel.workflow_state(self.pipeline.advance());
        let stage = Instant::now();
        self.channel
            .agent_start(AgentId::Master, "Analyzing the request");
        self.channel.agent_thinking(
            AgentId::Master,
            "Identifying the petition type and the agents it needs",
        );
        let intent = self
            .master
            .analyze(&masking.masked)
            .await
            .inspect_err(|_| self.channel.agent_error(AgentId::Master))
            .context("intent analysis failed")?;
        self.channel
            .agent_result(AgentId::Master, intent.summary.clone(), elapsed_ms(stage));

        let stage = Instant::now();
        self.channel
            .agent_start(AgentId::Planner, "Building the execution plan");
        self.channel.agent_thinking(
            AgentId::Planner,
            "Splitting the petition into steps that can run in parallel",
        );
        let plan = self
            .planner
            .plan(&intent, request.scenario)
            .await
            .inspect_err(|_| self.channel.agent_error(AgentId::Planner))
            .context("planning failed")?
            .prepare();
        self.channel.agent_result(
            AgentId::Planner,
            format!("{} steps planned", plan.nodes.len()),
            elapsed_ms(stage),
        );
        self.channel.dag_update(&plan);
        tracing::debug!(plan = %plan.title, nodes = plan.nodes.len(), "plan ready");

        // EXECUTING
        self.channel.workflow_state(self.pipeline.advance());
        let ExecutionOutcome { plan, results } =
            DagExecutor::new(plan, Arc::clone(&self.dispatcher), self.channel.clone())
                .execute()
                .await;

        let citations = if results.values().any(|r| !r.is_empty()) {
            self.legal.citations(&intent.intent).await
        } else {
            Vec::new()
        };
        for citation in &citations {
            self.channel.legal_citation(citation.clone());
        }

        // VALIDATING
        self.channel.workflow_state(self.pipeline.advance());
        let metrics = RunMetrics::from_plan(&plan, citations.len()).with_elapsed(started.elapsed());
        self.channel.metrics_update(metrics.clone());

        let synthesis = SynthesisRequest {
            intent,
            results,
            citations,
            metrics,
            scenario: request.scenario,
        };
        let stage = Instant::now();
        self.channel
            .agent_start(AgentId::Master, "Composing the final response");
        self.channel.agent_thinking(
            AgentId::Master,
            "Combining the agent results into the final guidance",
        );
        let response = self
            .synthesize_with_keepalive(&synthesis)
            .await
            .inspect_err(|_| self.channel.agent_error(AgentId::Master))
            .context("response synthesis failed")?;
        self.channel
            .agent_result(AgentId::Master, "Response ready", elapsed_ms(stage));

        // COMPLETED
        let metrics = RunMetrics::from_plan(&plan, synthesis.citations.len())
            .with_elapsed(started.elapsed());
        self.channel.workflow_state(self.pipeline.advance());
        self.channel.metrics_update(metrics.clone());
        self.channel.message(response.as_str());
        self.channel.complete();
        self.channel.close();

        Ok(Attempt {
            plan,
            response,
            metrics,
        })
    }

    /// Await synthesis, emitting `agent_thinking` every keep-alive period
    /// until it settles.
    async fn synthesize_with_keepalive(&self, request: &SynthesisRequest) -> Result<String> {
        let period = Duration::from_millis(self.config.keepalive_interval_ms.max(1));
        let mut ticker = tokio::time::interval(period);
        // First tick is immediate
        ticker.tick().await;

        let synthesis = self.master.synthesize(request);
        tokio::pin!(synthesis);

        loop {
            tokio::select! {
                biased;
                result = &mut synthesis => return result,
                _ = ticker.tick() => {
                    self.channel.agent_thinking(AgentId::Master, THINKING_TEXT);
                }
            }
        }
    }

    fn escalate(self) -> RunReport {
        tracing::error!(retries = self.pipeline.retries, "retries exhausted, escalating to human review");
        self.channel.workflow_state(WorkflowState::HumanReview);
        self.channel.message(ESCALATION_TEXT);
        self.channel.complete();
        self.channel.close();

        RunReport {
            state: WorkflowState::HumanReview,
            retries: self.pipeline.retries,
            response: ESCALATION_TEXT.to_string(),
            plan: None,
            metrics: None,
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::master_skill::render_summary;
    use crate::skills::{IntentAnalysis, LibraryPlanner};
    use crate::swarm::dag::NodeStatus;
    use crate::swarm::events::{AgentEvent, EventKind, EventPayload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Simulated master that can fail analysis or synthesis and stall synthesis
    #[derive(Default)]
    struct StubMaster {
        failures_left: AtomicUsize,
        synthesis_failures_left: AtomicUsize,
        synthesis_delay: Duration,
    }

    impl StubMaster {
        fn failing(times: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(times),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MasterAgent for StubMaster {
        async fn analyze(&self, input: &str) -> Result<IntentAnalysis> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                anyhow::bail!("classifier unavailable");
            }
            Ok(IntentAnalysis::classify(input))
        }

        async fn synthesize(&self, request: &SynthesisRequest) -> Result<String> {
            tokio::time::sleep(self.synthesis_delay).await;
            if self
                .synthesis_failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                anyhow::bail!("writer unavailable");
            }
            Ok(render_summary(request))
        }
    }

    /// Planner that fails a fixed number of times before delegating
    struct FlakyPlanner {
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl Planner for FlakyPlanner {
        async fn plan(&self, intent: &IntentAnalysis, scenario: Option<ScenarioId>) -> Result<Plan> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                anyhow::bail!("plan store offline");
            }
            let scenario = scenario.or(intent.category.scenario()).unwrap_or(ScenarioId::Welfare);
            Ok(LibraryPlanner.plan_for(scenario))
        }
    }

    async fn run_with(orchestrator: impl FnOnce(EventChannel) -> Orchestrator, request: RunRequest) -> (RunReport, Vec<AgentEvent>) {
        let (channel, stream) = EventChannel::new();
        let report = orchestrator(channel).run(request).await;
        (report, stream.collect().await)
    }

    fn states(events: &[AgentEvent]) -> Vec<WorkflowState> {
        events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::WorkflowState { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn count(events: &[AgentEvent], kind: EventKind) -> usize {
        events.iter().filter(|e| e.kind() == kind).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_run_completes() {
        let request = RunRequest::new("I want to open a pasta restaurant")
            .with_scenario(Some(ScenarioId::Restaurant));
        let (report, events) = run_with(
            |ch| Orchestrator::new(OrchestratorConfig::instant(), ch),
            request,
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.retries, 0);
        assert_eq!(report.response, ScenarioId::Restaurant.closing_message());
        assert_eq!(
            states(&events),
            vec![
                WorkflowState::Init,
                WorkflowState::Planning,
                WorkflowState::Executing,
                WorkflowState::Validating,
                WorkflowState::Completed,
            ]
        );
        assert_eq!(count(&events, EventKind::Complete), 1);
        assert_eq!(events.last().unwrap().kind(), EventKind::Complete);
        assert_eq!(count(&events, EventKind::MetricsUpdate), 2);
        assert_eq!(count(&events, EventKind::ApiCall), 2);

        let plan = report.plan.unwrap();
        assert_eq!(plan.nodes.len(), 7);
        assert!(plan.nodes.iter().all(|n| n.status == NodeStatus::Completed));
        assert!(plan.nodes.iter().all(|n| n.result.is_some()));

        let metrics = report.metrics.unwrap();
        assert_eq!(metrics.agent_calls, 9);
        assert_eq!(metrics.api_calls, 2);
        assert_eq!(metrics.documents_generated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_attempt_is_retried_from_scratch() {
        let (report, events) = run_with(
            |ch| {
                Orchestrator::new(OrchestratorConfig::instant(), ch)
                    .with_master(Arc::new(StubMaster::failing(1)))
            },
            RunRequest::new("I was laid off last week"),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.retries, 1);
        let states = states(&events);
        assert_eq!(states[..3], [WorkflowState::Init, WorkflowState::Planning, WorkflowState::Retry]);
        assert_eq!(states.iter().filter(|s| **s == WorkflowState::Init).count(), 2);
        assert!(events.iter().any(|e| matches!(
            &e.payload,
            EventPayload::Message { content } if content == "Retrying... (1/3)"
        )));

        let last_dag = events
            .iter()
            .rev()
            .find_map(|e| match &e.payload {
                EventPayload::DagUpdate { dag } => Some(dag.clone()),
                _ => None,
            })
            .unwrap();
        assert!(last_dag.is_settled());
        assert_eq!(count(&events, EventKind::Complete), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_planning_failure_triggers_retry() {
        let (report, events) = run_with(
            |ch| {
                Orchestrator::new(OrchestratorConfig::instant(), ch).with_planner(Arc::new(
                    FlakyPlanner {
                        failures_left: AtomicUsize::new(2),
                    },
                ))
            },
            RunRequest::new("Moving to Suwon next month"),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.retries, 2);
        assert_eq!(count(&events, EventKind::AgentError), 2);
        assert!(events.iter().any(|e| matches!(
            &e.payload,
            EventPayload::Message { content } if content == "Retrying... (2/3)"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_escalate_once() {
        let started = Instant::now();
        let (report, events) = run_with(
            |ch| {
                Orchestrator::new(OrchestratorConfig::instant(), ch)
                    .with_master(Arc::new(StubMaster::failing(4)))
            },
            RunRequest::new("help"),
        )
        .await;

        assert_eq!(report.state, WorkflowState::HumanReview);
        assert_eq!(report.retries, 3);
        assert!(report.plan.is_none());
        // 1s + 2s + 3s of backoff
        assert!(started.elapsed() >= Duration::from_secs(6));

        let states = states(&events);
        assert_eq!(
            states.iter().filter(|s| **s == WorkflowState::HumanReview).count(),
            1
        );
        assert_eq!(states.iter().filter(|s| **s == WorkflowState::Retry).count(), 3);
        assert_eq!(count(&events, EventKind::Complete), 1);

        let tail: Vec<EventKind> = events[events.len() - 3..].iter().map(|e| e.kind()).collect();
        assert_eq!(
            tail,
            vec![EventKind::WorkflowState, EventKind::Message, EventKind::Complete]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_phone_number_is_masked_once() {
        let (_, events) = run_with(
            |ch| Orchestrator::new(OrchestratorConfig::instant(), ch),
            RunRequest::new("Call me at 010-1234-5678 about my restaurant permit"),
        )
        .await;

        let masking: Vec<&EventPayload> = events
            .iter()
            .filter(|e| e.kind() == EventKind::PiiMasking)
            .map(|e| &e.payload)
            .collect();
        assert_eq!(masking.len(), 1);
        match masking[0] {
            EventPayload::PiiMasking {
                masked,
                detected_types,
                ..
            } => {
                assert!(!masked.contains("010-1234-5678"));
                assert!(detected_types.iter().any(|t| t == "phone number"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_input_emits_no_masking_event() {
        let (_, events) = run_with(
            |ch| Orchestrator::new(OrchestratorConfig::instant(), ch),
            RunRequest::new("How do I renew a passport?"),
        )
        .await;
        assert_eq!(count(&events, EventKind::PiiMasking), 0);
        // screening start/result always brackets INIT
        assert!(matches!(
            &events[1].payload,
            EventPayload::AgentStart { agent_id: AgentId::Master, .. }
        ));
        assert!(matches!(
            &events[2].payload,
            EventPayload::AgentResult { agent_id: AgentId::Master, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_stops_when_synthesis_settles() {
        let master = StubMaster {
            synthesis_delay: Duration::from_secs(10),
            ..StubMaster::default()
        };
        let (report, events) = run_with(
            |ch| Orchestrator::new(OrchestratorConfig::instant(), ch).with_master(Arc::new(master)),
            RunRequest::new("I lost my job"),
        )
        .await;

        assert!(report.is_success());
        let is_keepalive = |e: &AgentEvent| {
            matches!(&e.payload, EventPayload::AgentThinking { thought, .. } if thought == THINKING_TEXT)
        };
        // ticks at 3s, 6s and 9s, synthesis settles at 10s
        assert_eq!(events.iter().filter(|e| is_keepalive(e)).count(), 3);
        // analysis, planning and synthesis each announce their work once
        assert_eq!(count(&events, EventKind::AgentThinking), 6);

        let synthesis_start = events
            .iter()
            .rposition(|e| {
                matches!(&e.payload, EventPayload::AgentStart { agent_id: AgentId::Master, .. })
            })
            .unwrap();
        let synthesis_result = events
            .iter()
            .rposition(|e| {
                matches!(&e.payload, EventPayload::AgentResult { agent_id: AgentId::Master, .. })
            })
            .unwrap();
        let first_keepalive = events.iter().position(|e| is_keepalive(e)).unwrap();
        let last_keepalive = events.iter().rposition(|e| is_keepalive(e)).unwrap();
        let completed = events
            .iter()
            .position(|e| {
                matches!(&e.payload, EventPayload::WorkflowState { state: WorkflowState::Completed })
            })
            .unwrap();
        assert!(synthesis_start < first_keepalive);
        assert!(last_keepalive < synthesis_result);
        assert!(synthesis_result < completed);
        match &events[synthesis_result].payload {
            EventPayload::AgentResult { duration, .. } => assert!(*duration >= 10_000),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_failure_reruns_plan_from_scratch() {
        let master = StubMaster {
            synthesis_failures_left: AtomicUsize::new(1),
            ..StubMaster::default()
        };
        let (report, events) = run_with(
            |ch| Orchestrator::new(OrchestratorConfig::instant(), ch).with_master(Arc::new(master)),
            RunRequest::new("I want to open a pasta restaurant")
                .with_scenario(Some(ScenarioId::Restaurant)),
        )
        .await;

        assert!(report.is_success());
        assert_eq!(report.retries, 1);
        assert_eq!(count(&events, EventKind::AgentError), 1);

        let snapshots: Vec<(usize, &Plan)> = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| match &e.payload {
                EventPayload::DagUpdate { dag } => Some((i, dag)),
                _ => None,
            })
            .collect();
        let retry_at = events
            .iter()
            .position(|e| {
                matches!(&e.payload, EventPayload::WorkflowState { state: WorkflowState::Retry })
            })
            .unwrap();

        // the first attempt ran every node before synthesis failed
        let (_, before_retry) = snapshots.iter().rev().find(|(i, _)| *i < retry_at).unwrap();
        assert!(before_retry.is_settled());

        // the second attempt publishes a fresh all-pending plan
        let (_, republished) = snapshots.iter().find(|(i, _)| *i > retry_at).unwrap();
        assert_eq!(republished.nodes.len(), 7);
        assert!(republished.nodes.iter().all(|n| n.status == NodeStatus::Pending));

        let (_, last) = snapshots.last().unwrap();
        assert!(last.is_settled());
        assert!(last.nodes.iter().all(|n| n.status == NodeStatus::Completed));
        assert!(last.nodes.iter().all(|n| n.status != NodeStatus::Running));

        let plan = report.plan.unwrap();
        assert_eq!(&plan, *last);
        assert_eq!(report.metrics.unwrap().agent_calls, 9);
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"max_retries": 1}"#).unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.retry_base_ms, 1000);
        assert_eq!(config.keepalive_interval_ms, 3000);
        assert_eq!(config.simulation.latency_min_ms, 200);
    }
}
