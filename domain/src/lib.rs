//! Domain layer for agora
//!
//! This crate contains the core business logic, entities, and value objects
//! of the decision-coordination substrate. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Decision pipeline
//!
//! Agents propose actions as [`Decision`]s over a set of
//! [`DecisionOption`]s. Each decision is scored by the [`DecisionMaker`],
//! gated by the [`DecisionValidator`], and then owned by the application
//! layer's tracker through the lifecycle
//! `Pending -> Validating -> Approved -> Executing -> Completed`.
//!
//! ## Learning loop
//!
//! Outcome [`Feedback`] keyed to decision ids feeds [`LearningState`],
//! whose per-category confidence adjustments flow back into future scoring.
//!
//! ## Cost-aware routing
//!
//! Inference requests carry a [`TaskDescriptor`]; the router picks the
//! cheapest [`ModelTier`] meeting the quality floor under a rolling
//! [`BudgetState`], escalating a tier when observed quality is too low.

pub mod agent;
pub mod core;
pub mod decision;
pub mod event;
pub mod feedback;
pub mod learning;
pub mod routing;
pub mod util;
pub mod workflow;

// Re-export commonly used types
pub use agent::{
    AgentDescriptor, AgentStatus, Capability, FitnessWeights, HeartbeatPolicy, fitness_score,
};
pub use core::{error::CoordinationError, mode::OperatingMode};
pub use decision::{
    CategoryAllowList, Constraints, CostCeiling, Decision, DecisionContext, DecisionMaker,
    DecisionOption, DecisionStatus, DecisionValidator, MinConfidence, MinRationaleLength,
    ScoringWeights, ValidationReport, ValidationRule,
};
pub use event::{Event, EventKind, EventPriority};
pub use feedback::{CategoryStats, Feedback, FeedbackData, FeedbackFilter};
pub use learning::{CategoryLearning, LearningParams, LearningState};
pub use routing::{
    BudgetState, ModelTier, RoutingDecision, RoutingStage, TaskComplexity, TaskDescriptor,
};
pub use workflow::{CompletionPolicy, SubTaskSpec, WorkflowSpec, WorkflowStatus};
