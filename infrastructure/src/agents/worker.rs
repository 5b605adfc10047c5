//! Worker agent
//!
//! A general-purpose agent: `assess` routes a reasoning task through the
//! model router and annotates the sub-task's options with the assessment;
//! `perform` hands the approved decision to an action executor.

use agora_application::ports::agent::{Agent, AgentError};
use agora_application::ports::connector::{ActionExecutor, ExecutionReport};
use agora_application::routing::router::ModelRouter;
use agora_domain::{
    AgentDescriptor, Capability, Decision, DecisionOption, OperatingMode, SubTaskSpec,
    TaskDescriptor,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Per-request spend cap applied when operating constrained
const CONSTRAINED_MAX_COST: f64 = 0.005;

/// Router-backed agent executing through a connector
pub struct WorkerAgent {
    descriptor: AgentDescriptor,
    router: Arc<ModelRouter>,
    executor: Arc<dyn ActionExecutor>,
}

impl WorkerAgent {
    pub fn new(
        agent_id: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
        router: Arc<ModelRouter>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            descriptor: AgentDescriptor::new(agent_id, capabilities),
            router,
            executor,
        }
    }

    pub fn with_affinity_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.descriptor = self.descriptor.with_affinity_tags(tags);
        self
    }
}

#[async_trait]
impl Agent for WorkerAgent {
    fn descriptor(&self) -> AgentDescriptor {
        self.descriptor.clone()
    }

    /// Route a reasoning pass over the sub-task, then return its options
    /// annotated with the assessment. Constrained mode caps the per-request
    /// spend so assessment stays on the cheapest tier.
    async fn assess(
        &self,
        sub_task: &SubTaskSpec,
        mode: OperatingMode,
    ) -> Result<Vec<DecisionOption>, AgentError> {
        let mut task = TaskDescriptor::new(sub_task.context.summary.clone());
        if mode.is_constrained() {
            task = task.with_max_cost(CONSTRAINED_MAX_COST);
        }

        let routed = self
            .router
            .route(&task)
            .await
            .map_err(|error| AgentError::Inference(error.to_string()))?;
        debug!(
            agent = %self.descriptor.agent_id,
            sub_task = %sub_task.id,
            tier = %routed.record.chosen_tier,
            "Sub-task assessed"
        );

        Ok(sub_task
            .options
            .iter()
            .cloned()
            .map(|option| option.with_attribute("assessment", json!(routed.outcome.content)))
            .collect())
    }

    async fn perform(&self, decision: &Decision) -> Result<ExecutionReport, AgentError> {
        self.executor
            .execute(decision)
            .await
            .map_err(|error| AgentError::Execution(error.to_string()))
    }
}
