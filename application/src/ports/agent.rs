//! Agent port
//!
//! The interface every agent implementation satisfies. The registry resolves
//! capabilities to live handles implementing this trait; dispatch is
//! polymorphic over the capability set, never via runtime type inspection.

use agora_domain::{AgentDescriptor, Decision, DecisionOption, OperatingMode, SubTaskSpec};
use async_trait::async_trait;
use thiserror::Error;

use super::connector::ExecutionReport;

/// Errors an agent can surface to the orchestrator
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Agent unavailable: {0}")]
    Unavailable(String),
}

/// An independently schedulable decision-making unit
///
/// `assess` is the agent's reasoning step (typically routed through the
/// Model Router); `perform` is the leaf action taken once the decision is
/// Approved and moved to Executing.
#[async_trait]
pub trait Agent: Send + Sync {
    fn descriptor(&self) -> AgentDescriptor;

    /// Refine the sub-task's candidate options (re-estimate value/cost,
    /// drop hopeless ones, add discovered ones).
    async fn assess(
        &self,
        sub_task: &SubTaskSpec,
        mode: OperatingMode,
    ) -> Result<Vec<DecisionOption>, AgentError>;

    /// Execute the approved decision's chosen option.
    async fn perform(&self, decision: &Decision) -> Result<ExecutionReport, AgentError>;
}
