//! Domain error types
//!
//! The coordination pipeline reports its conditions as typed results, never as
//! panics. Only `StoreUnavailable` represents a truly exceptional condition
//! (unreachable durable store); everything else is a branch the caller is
//! expected to handle.

use thiserror::Error;

/// Errors produced by the decision-coordination pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinationError {
    /// A decision failed one or more validation rules.
    ///
    /// Carries the full failure report so the caller can explain "why"
    /// without inspecting pipeline internals.
    #[error("Decision blocked by validation: {}", messages.join("; "))]
    ValidationFailure { messages: Vec<String> },

    /// An inference request would breach the rolling budget window.
    #[error("Budget exceeded: requested {requested:.4}, remaining {remaining:.4}")]
    BudgetExceeded { requested: f64, remaining: f64 },

    /// No healthy agent holds the requested capability.
    #[error("No healthy agent available for capability '{capability}'")]
    CapacityUnavailable { capability: String },

    /// An illegal decision-lifecycle move. Always a programming or
    /// integration error, never retried.
    #[error("Illegal status transition: {from} -> {to}")]
    TransitionViolation { from: String, to: String },

    /// A reference to an entity that was never tracked.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The durable store is unreachable. Callers queue writes locally and
    /// flush on reconnect.
    #[error("Durable store unavailable: {0}")]
    StoreUnavailable(String),

    /// Work was cancelled (workflow timeout or explicit cancellation).
    #[error("Operation cancelled")]
    Cancelled,
}

impl CoordinationError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoordinationError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoordinationError::Cancelled)
    }

    /// Check if the condition is worth retrying with backoff
    /// (capacity and store outages are transient; the rest are not).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoordinationError::CapacityUnavailable { .. }
                | CoordinationError::StoreUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failure_display_joins_messages() {
        let error = CoordinationError::ValidationFailure {
            messages: vec!["confidence too low".into(), "rationale too short".into()],
        };
        assert_eq!(
            error.to_string(),
            "Decision blocked by validation: confidence too low; rationale too short"
        );
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(CoordinationError::Cancelled.is_cancelled());
        assert!(
            !CoordinationError::TransitionViolation {
                from: "Pending".into(),
                to: "Completed".into()
            }
            .is_cancelled()
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            CoordinationError::CapacityUnavailable {
                capability: "pricing".into()
            }
            .is_transient()
        );
        assert!(CoordinationError::StoreUnavailable("io".into()).is_transient());
        assert!(!CoordinationError::Cancelled.is_transient());
        assert!(
            !CoordinationError::BudgetExceeded {
                requested: 1.0,
                remaining: 0.5
            }
            .is_transient()
        );
    }
}
