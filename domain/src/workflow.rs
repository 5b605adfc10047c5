//! Workflow domain types
//!
//! A workflow is an orchestrator-managed composition of sub-tasks delegated
//! to capable agents. This module holds the pure state machine and specs;
//! delegation, timeouts, and retries live in the application orchestrator.

use crate::agent::Capability;
use crate::core::mode::OperatingMode;
use crate::decision::{Constraints, DecisionContext, DecisionOption};
use crate::util::new_id;
use serde::{Deserialize, Serialize};

/// Lifecycle of a workflow (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Initiated,
    Delegating,
    AwaitingResults,
    Synthesizing,
    Completed,
    PartiallyFailed,
    Failed,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::PartiallyFailed | WorkflowStatus::Failed
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            WorkflowStatus::Initiated => "initiated",
            WorkflowStatus::Delegating => "delegating",
            WorkflowStatus::AwaitingResults => "awaiting_results",
            WorkflowStatus::Synthesizing => "synthesizing",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::PartiallyFailed => "partially_failed",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// "Require at least N of M" completion policy (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Every sub-task must succeed
    #[default]
    RequireAll,
    /// At least this many sub-tasks must succeed
    AtLeast(usize),
}

impl CompletionPolicy {
    /// Terminal workflow status for `succeeded` of `total` sub-tasks.
    pub fn evaluate(&self, succeeded: usize, total: usize) -> WorkflowStatus {
        if succeeded == total {
            return WorkflowStatus::Completed;
        }
        let threshold = match self {
            CompletionPolicy::RequireAll => total,
            CompletionPolicy::AtLeast(n) => *n,
        };
        if succeeded >= threshold {
            WorkflowStatus::PartiallyFailed
        } else {
            WorkflowStatus::Failed
        }
    }
}

/// One delegable unit of work inside a workflow (Value Object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskSpec {
    pub id: String,
    /// Capability required of the executing agent
    pub capability: Capability,
    pub context: DecisionContext,
    /// Candidate actions for the agent's decision
    pub options: Vec<DecisionOption>,
    #[serde(default)]
    pub constraints: Constraints,
}

impl SubTaskSpec {
    pub fn new(capability: Capability, context: DecisionContext, options: Vec<DecisionOption>) -> Self {
        Self {
            id: new_id("sub"),
            capability,
            context,
            options,
            constraints: Constraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Specification of a whole workflow (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub id: String,
    pub goal: String,
    pub sub_tasks: Vec<SubTaskSpec>,
    #[serde(default)]
    pub policy: CompletionPolicy,
    /// Per-sub-task deadline, in milliseconds
    pub sub_task_timeout_ms: u64,
    #[serde(default)]
    pub mode: OperatingMode,
}

impl WorkflowSpec {
    pub fn new(goal: impl Into<String>, sub_tasks: Vec<SubTaskSpec>) -> Self {
        Self {
            id: new_id("wfl"),
            goal: goal.into(),
            sub_tasks,
            policy: CompletionPolicy::RequireAll,
            sub_task_timeout_ms: 30_000,
            mode: OperatingMode::Normal,
        }
    }

    pub fn with_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.sub_task_timeout_ms = timeout_ms;
        self
    }

    pub fn with_mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_succeeded_completes() {
        assert_eq!(
            CompletionPolicy::RequireAll.evaluate(3, 3),
            WorkflowStatus::Completed
        );
        assert_eq!(
            CompletionPolicy::AtLeast(1).evaluate(3, 3),
            WorkflowStatus::Completed
        );
    }

    #[test]
    fn test_require_all_fails_on_any_loss() {
        assert_eq!(
            CompletionPolicy::RequireAll.evaluate(2, 3),
            WorkflowStatus::Failed
        );
    }

    #[test]
    fn test_at_least_threshold_splits_partial_and_failed() {
        let policy = CompletionPolicy::AtLeast(2);
        assert_eq!(policy.evaluate(2, 3), WorkflowStatus::PartiallyFailed);
        assert_eq!(policy.evaluate(1, 3), WorkflowStatus::Failed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::PartiallyFailed.is_terminal());
        assert!(!WorkflowStatus::Delegating.is_terminal());
    }
}
