//! Workflow orchestrator
//!
//! Decomposes a workflow into sub-tasks, delegates each to the best-fit
//! capable agent, and drives every delegated decision through the pipeline's
//! propose → validate → execute flow. Sub-tasks run concurrently on a
//! `JoinSet`; each carries its own deadline, and the workflow as a whole
//! carries a cancellation deadline that moves in-flight decisions to
//! Canceled instead of leaving them dangling.

use crate::bus::EventBus;
use crate::pipeline::decide::DecisionPipeline;
use crate::pipeline::feedback::FeedbackProcessor;
use crate::ports::agent::Agent;
use crate::registry::AgentRegistry;
use agora_domain::{
    Capability, CoordinationError, DecisionStatus, Event, EventKind, EventPriority, FeedbackData,
    OperatingMode, SubTaskSpec, WorkflowSpec, WorkflowStatus,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Additional selection attempts when no healthy agent is available
    pub select_retries: u32,
    /// Initial backoff between selection attempts; doubles per retry
    pub select_backoff_ms: u64,
    /// Deadline for the workflow as a whole
    pub workflow_timeout_ms: u64,
    /// Feed execution quality signals back into learning automatically
    pub auto_feedback: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            select_retries: 3,
            select_backoff_ms: 50,
            workflow_timeout_ms: 120_000,
            auto_feedback: true,
        }
    }
}

/// How a single sub-task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTaskOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Canceled,
}

/// Result of one delegated sub-task
#[derive(Debug, Clone)]
pub struct SubTaskReport {
    pub sub_task_id: String,
    pub agent_id: Option<String>,
    pub decision_id: Option<String>,
    pub outcome: SubTaskOutcome,
    pub detail: String,
}

impl SubTaskReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == SubTaskOutcome::Succeeded
    }
}

/// Final result of a workflow run
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub sub_tasks: Vec<SubTaskReport>,
}

/// What the delegation slot holds while an attempt is in flight; consumed
/// by the abort path to release the lease and cancel the decision.
#[derive(Default)]
struct InFlight {
    decision_id: Option<String>,
    leased_agent: Option<String>,
}

enum AttemptFailure {
    /// The agent itself failed; worth one backup retry with a new decision
    Agent(String),
    /// Pipeline-level error; not the agent's fault, no backup retry
    Fatal(CoordinationError),
}

/// Drives workflows through delegation, decision-making, and synthesis
#[derive(Clone)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<AgentRegistry>,
    pipeline: Arc<DecisionPipeline>,
    feedback: Arc<FeedbackProcessor>,
    bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<AgentRegistry>,
        pipeline: Arc<DecisionPipeline>,
        feedback: Arc<FeedbackProcessor>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            registry,
            pipeline,
            feedback,
            bus,
        }
    }

    /// Run a workflow to a terminal status.
    ///
    /// Sub-task failures are reported per sub-task and folded into the
    /// terminal status by the workflow's completion policy; they never
    /// surface as errors from here.
    pub async fn run(&self, spec: WorkflowSpec) -> WorkflowReport {
        let workflow_id = spec.id.clone();
        let total = spec.sub_tasks.len();
        info!(workflow = %workflow_id, goal = %spec.goal, sub_tasks = total, mode = %spec.mode, "Workflow started");
        self.publish_status(&workflow_id, WorkflowStatus::Initiated);
        self.publish_status(&workflow_id, WorkflowStatus::Delegating);

        let token = CancellationToken::new();
        let watchdog = {
            let token = token.clone();
            let deadline = Duration::from_millis(self.config.workflow_timeout_ms);
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                token.cancel();
            })
        };

        let mut join_set = JoinSet::new();
        for sub_task in spec.sub_tasks.iter().cloned() {
            let this = self.clone();
            let token = token.clone();
            let mode = spec.mode;
            let deadline = Duration::from_millis(spec.sub_task_timeout_ms);
            join_set.spawn(async move {
                let inflight = Arc::new(Mutex::new(InFlight::default()));
                let sub_task_id = sub_task.id.clone();
                tokio::select! {
                    _ = token.cancelled() => {
                        this.abort_sub_task(
                            &sub_task_id,
                            &inflight,
                            mode,
                            SubTaskOutcome::Canceled,
                            "workflow deadline elapsed",
                        )
                        .await
                    }
                    finished = tokio::time::timeout(
                        deadline,
                        this.run_sub_task(sub_task, mode, Arc::clone(&inflight)),
                    ) => match finished {
                        Ok(report) => report,
                        Err(_) => {
                            this.abort_sub_task(
                                &sub_task_id,
                                &inflight,
                                mode,
                                SubTaskOutcome::TimedOut,
                                "sub-task deadline elapsed",
                            )
                            .await
                        }
                    },
                }
            });
        }
        self.publish_status(&workflow_id, WorkflowStatus::AwaitingResults);

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(error) => warn!(workflow = %workflow_id, %error, "Sub-task join failed"),
            }
        }
        watchdog.abort();

        self.publish_status(&workflow_id, WorkflowStatus::Synthesizing);
        // Report in spec order regardless of completion order
        reports.sort_by_key(|report| {
            spec.sub_tasks
                .iter()
                .position(|s| s.id == report.sub_task_id)
                .unwrap_or(usize::MAX)
        });

        let succeeded = reports.iter().filter(|r| r.succeeded()).count();
        let status = spec.policy.evaluate(succeeded, total);
        self.publish_status(&workflow_id, status);
        info!(workflow = %workflow_id, status = %status, succeeded, total, "Workflow finished");

        WorkflowReport {
            workflow_id,
            status,
            sub_tasks: reports,
        }
    }

    /// Delegate one sub-task: primary agent attempt, then at most one
    /// backup attempt (with a fresh decision) when the agent itself failed.
    async fn run_sub_task(
        &self,
        sub_task: SubTaskSpec,
        mode: OperatingMode,
        inflight: Arc<Mutex<InFlight>>,
    ) -> SubTaskReport {
        let Some((agent_id, handle)) = self
            .select_with_retry(sub_task.capability, &sub_task.context.tags)
            .await
        else {
            let error = CoordinationError::CapacityUnavailable {
                capability: sub_task.capability.to_string(),
            };
            warn!(sub_task = %sub_task.id, %error, "Delegation failed");
            return SubTaskReport {
                sub_task_id: sub_task.id.clone(),
                agent_id: None,
                decision_id: None,
                outcome: SubTaskOutcome::Failed,
                detail: error.to_string(),
            };
        };

        match self.attempt(&agent_id, handle, &sub_task, mode, &inflight).await {
            Ok(report) => report,
            Err(AttemptFailure::Fatal(error)) => SubTaskReport {
                sub_task_id: sub_task.id.clone(),
                agent_id: Some(agent_id),
                decision_id: inflight.lock().await.decision_id.clone(),
                outcome: SubTaskOutcome::Failed,
                detail: error.to_string(),
            },
            Err(AttemptFailure::Agent(detail)) => {
                self.report_agent_failure(&agent_id, &sub_task.id, &detail).await;

                let excluded: HashSet<String> = [agent_id.clone()].into_iter().collect();
                let backup = self
                    .registry
                    .select_best_excluding(sub_task.capability, &sub_task.context.tags, &excluded)
                    .await;
                let Some((backup_id, backup_handle)) = backup else {
                    return SubTaskReport {
                        sub_task_id: sub_task.id.clone(),
                        agent_id: Some(agent_id),
                        decision_id: inflight.lock().await.decision_id.clone(),
                        outcome: SubTaskOutcome::Failed,
                        detail,
                    };
                };

                info!(sub_task = %sub_task.id, backup = %backup_id, "Retrying with backup agent");
                inflight.lock().await.decision_id = None;
                match self
                    .attempt(&backup_id, backup_handle, &sub_task, mode, &inflight)
                    .await
                {
                    Ok(report) => report,
                    Err(AttemptFailure::Agent(backup_detail)) => {
                        self.report_agent_failure(&backup_id, &sub_task.id, &backup_detail).await;
                        SubTaskReport {
                            sub_task_id: sub_task.id.clone(),
                            agent_id: Some(backup_id),
                            decision_id: inflight.lock().await.decision_id.clone(),
                            outcome: SubTaskOutcome::Failed,
                            detail: backup_detail,
                        }
                    }
                    Err(AttemptFailure::Fatal(error)) => SubTaskReport {
                        sub_task_id: sub_task.id.clone(),
                        agent_id: Some(backup_id),
                        decision_id: inflight.lock().await.decision_id.clone(),
                        outcome: SubTaskOutcome::Failed,
                        detail: error.to_string(),
                    },
                }
            }
        }
    }

    /// One full delegation attempt against a specific agent, with the load
    /// lease held for its duration.
    async fn attempt(
        &self,
        agent_id: &str,
        handle: Arc<dyn Agent>,
        sub_task: &SubTaskSpec,
        mode: OperatingMode,
        inflight: &Arc<Mutex<InFlight>>,
    ) -> Result<SubTaskReport, AttemptFailure> {
        self.registry.lease(agent_id).await;
        inflight.lock().await.leased_agent = Some(agent_id.to_string());

        let result = self
            .attempt_inner(agent_id, handle, sub_task, mode, inflight)
            .await;

        self.registry.release(agent_id).await;
        inflight.lock().await.leased_agent = None;
        result
    }

    async fn attempt_inner(
        &self,
        agent_id: &str,
        handle: Arc<dyn Agent>,
        sub_task: &SubTaskSpec,
        mode: OperatingMode,
        inflight: &Arc<Mutex<InFlight>>,
    ) -> Result<SubTaskReport, AttemptFailure> {
        let options = handle
            .assess(sub_task, mode)
            .await
            .map_err(|error| AttemptFailure::Agent(error.to_string()))?;

        let decision = self
            .pipeline
            .propose(sub_task.context.clone(), &options, &sub_task.constraints, mode)
            .await
            .map_err(AttemptFailure::Fatal)?;
        let decision_id = decision.id.clone();
        inflight.lock().await.decision_id = Some(decision_id.clone());

        if decision.status == DecisionStatus::Rejected {
            debug!(sub_task = %sub_task.id, decision = %decision_id, "No feasible option");
            return Ok(SubTaskReport {
                sub_task_id: sub_task.id.clone(),
                agent_id: Some(agent_id.to_string()),
                decision_id: Some(decision_id),
                outcome: SubTaskOutcome::Failed,
                detail: decision.rationale,
            });
        }

        let validation = self
            .pipeline
            .validate(&decision_id, mode)
            .await
            .map_err(AttemptFailure::Fatal)?;
        if !validation.is_valid {
            return Ok(SubTaskReport {
                sub_task_id: sub_task.id.clone(),
                agent_id: Some(agent_id.to_string()),
                decision_id: Some(decision_id),
                outcome: SubTaskOutcome::Failed,
                detail: validation.messages.join("; "),
            });
        }

        let tracker = self.pipeline.tracker();
        tracker
            .update_status(&decision_id, DecisionStatus::Executing, mode)
            .await
            .map_err(AttemptFailure::Fatal)?;
        let executing = tracker
            .get(&decision_id)
            .await
            .ok_or_else(|| {
                AttemptFailure::Fatal(CoordinationError::not_found("Decision", &decision_id))
            })?;

        match handle.perform(&executing).await {
            Ok(execution) => {
                let final_status = if execution.success {
                    DecisionStatus::Completed
                } else {
                    DecisionStatus::Failed
                };
                tracker
                    .update_status(&decision_id, final_status, mode)
                    .await
                    .map_err(AttemptFailure::Fatal)?;
                self.registry.report_outcome(agent_id, execution.success).await;

                if self.config.auto_feedback
                    && let Err(error) = self
                        .feedback
                        .submit(
                            &decision_id,
                            FeedbackData::new(execution.quality_signal, 1.0),
                            mode,
                        )
                        .await
                {
                    warn!(decision = %decision_id, %error, "Auto-feedback failed");
                }

                Ok(SubTaskReport {
                    sub_task_id: sub_task.id.clone(),
                    agent_id: Some(agent_id.to_string()),
                    decision_id: Some(decision_id),
                    outcome: if execution.success {
                        SubTaskOutcome::Succeeded
                    } else {
                        SubTaskOutcome::Failed
                    },
                    detail: execution.detail,
                })
            }
            Err(error) => {
                // The decision cannot be retried; a backup attempt makes a new one
                tracker
                    .update_status(&decision_id, DecisionStatus::Failed, mode)
                    .await
                    .map_err(AttemptFailure::Fatal)?;
                Err(AttemptFailure::Agent(error.to_string()))
            }
        }
    }

    /// Selection with bounded exponential backoff; transient absence of a
    /// healthy agent is retried before giving up.
    async fn select_with_retry(
        &self,
        capability: Capability,
        tags: &HashSet<String>,
    ) -> Option<(String, Arc<dyn Agent>)> {
        let mut delay = self.config.select_backoff_ms;
        for attempt in 0..=self.config.select_retries {
            if let Some(found) = self.registry.select_best(capability, tags).await {
                return Some(found);
            }
            if attempt < self.config.select_retries {
                debug!(capability = %capability, attempt, "No healthy agent, backing off");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay = delay.saturating_mul(2);
            }
        }
        None
    }

    /// Deadline path: release the lease and move any in-flight decision to
    /// Canceled so nothing stays stuck in a non-terminal state.
    async fn abort_sub_task(
        &self,
        sub_task_id: &str,
        inflight: &Arc<Mutex<InFlight>>,
        mode: OperatingMode,
        outcome: SubTaskOutcome,
        detail: &str,
    ) -> SubTaskReport {
        let state = std::mem::take(&mut *inflight.lock().await);
        if let Some(agent_id) = &state.leased_agent {
            self.registry.release(agent_id).await;
        }
        if let Some(decision_id) = &state.decision_id
            && let Err(error) = self
                .pipeline
                .tracker()
                .update_status(decision_id, DecisionStatus::Canceled, mode)
                .await
        {
            // Already terminal: the attempt finished in the same instant
            debug!(decision = %decision_id, %error, "Cancel transition skipped");
        }
        warn!(sub_task = %sub_task_id, outcome = ?outcome, detail, "Sub-task aborted");

        SubTaskReport {
            sub_task_id: sub_task_id.to_string(),
            agent_id: state.leased_agent,
            decision_id: state.decision_id,
            outcome,
            detail: detail.to_string(),
        }
    }

    async fn report_agent_failure(&self, agent_id: &str, sub_task_id: &str, detail: &str) {
        warn!(agent = %agent_id, sub_task = %sub_task_id, detail, "Agent attempt failed");
        self.registry.report_outcome(agent_id, false).await;
        self.bus.publish(
            Event::new(
                EventKind::AgentFailure,
                "orchestrator",
                json!({ "agent_id": agent_id, "sub_task_id": sub_task_id, "detail": detail }),
            )
            .with_priority(EventPriority::High),
        );
    }

    fn publish_status(&self, workflow_id: &str, status: WorkflowStatus) {
        self.bus.publish(Event::new(
            EventKind::WorkflowStatus,
            "orchestrator",
            json!({ "workflow_id": workflow_id, "status": status.as_str() }),
        ));
    }
}
