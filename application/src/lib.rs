//! Application layer for agora
//!
//! Coordination services composing the domain layer into a running core:
//! the event bus, the agent registry, the decision pipeline, cost-aware
//! inference routing, and the workflow orchestrator. Everything that talks
//! to the outside world does so through the ports in [`ports`];
//! implementations live in the infrastructure layer.
//!
//! # Concurrency model
//!
//! The two shared mutable entities — learning state and budget — live
//! behind single-writer actors ([`pipeline::LearningEngine`],
//! [`routing::BudgetKeeper`]) reached only by message passing. Everything
//! else is either immutable, guarded by one lock, or owned by a single
//! task.

pub mod bus;
pub mod config;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod routing;

pub use bus::{BusConfig, EventBus, Subscription, TypePattern};
pub use config::{BudgetConfig, CoordinationConfig, ValidationConfig};
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, SubTaskOutcome, SubTaskReport, WorkflowReport,
};
pub use pipeline::{
    DecisionPipeline, DecisionTracker, FeedbackProcessor, LearningEngine, LearningHandle,
    TrackerMetrics,
};
pub use registry::{AgentRegistry, Candidate, RegistryConfig, SweeperHandle};
pub use routing::{BudgetHandle, BudgetKeeper, ModelRouter, RoutedInference, RouterConfig, RoutingError};
