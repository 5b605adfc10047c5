//! Inference backend port
//!
//! One implementation per tier, keyed by [`ModelTier`]. The contract is
//! `call(task) -> (result, observed_cost, observed_quality_signal)`.

use agora_domain::{ModelTier, TaskDescriptor};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from an inference backend
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,
}

/// Result of one inference call
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    pub content: String,
    /// Actual cost observed (may differ from the tier's nominal cost)
    pub observed_cost: f64,
    /// Quality signal in [0, 1], compared against the escalation floor
    pub observed_quality: f64,
}

/// A tier-keyed inference backend
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn tier(&self) -> ModelTier;

    async fn call(&self, task: &TaskDescriptor) -> Result<InferenceOutcome, InferenceError>;
}
