//! Cost-aware inference routing
//!
//! Tier selection under a rolling budget with automatic quality escalation.
//! The budget is the second of the two shared mutable entities; like the
//! learning state it lives behind a single-writer actor.

pub mod budget_actor;
pub mod router;

pub use budget_actor::{BudgetHandle, BudgetKeeper};
pub use router::{ModelRouter, RoutedInference, RouterConfig, RoutingError};
