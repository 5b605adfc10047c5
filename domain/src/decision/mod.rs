//! Decision domain types
//!
//! A Decision is a tracked, validated choice among options with an explicit
//! lifecycle. This module holds the entities, the lifecycle state machine,
//! the scoring algorithm (Decision Maker), and the pluggable validation
//! rules (Decision Validator). Lifecycle enforcement and durability live in
//! the application layer's tracker.

pub mod entities;
pub mod maker;
pub mod validation;

pub use entities::{Constraints, Decision, DecisionContext, DecisionOption, DecisionStatus};
pub use maker::{DecisionMaker, ScoringWeights};
pub use validation::{
    CategoryAllowList, CostCeiling, DecisionValidator, MinConfidence, MinRationaleLength,
    ValidationReport, ValidationRule,
};
