//! Routing domain types
//!
//! Cost/quality inference tiers, task classification, budget arithmetic, and
//! the per-request routing record. The single-writer budget discipline and
//! the escalation loop live in the application layer's router.

pub mod budget;
pub mod entities;
pub mod tier;

pub use budget::BudgetState;
pub use entities::{RoutingDecision, RoutingStage};
pub use tier::{ModelTier, TaskComplexity, TaskDescriptor};
