//! Agent domain types
//!
//! Agents are independently schedulable units holding one or more
//! capabilities. The registry (application layer) resolves capabilities to
//! live agents; this module holds the pure descriptor, health, and fitness
//! logic.

pub mod capability;
pub mod entities;
pub mod fitness;

pub use capability::Capability;
pub use entities::{AgentDescriptor, AgentStatus, HeartbeatPolicy};
pub use fitness::{FitnessWeights, fitness_score};
