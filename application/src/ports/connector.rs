//! Action executor port
//!
//! Marketplace/business connectors are opaque executors invoked as leaf
//! actions after a decision is Approved. They return success/failure plus
//! observed cost; business-level correctness is their problem, not the
//! core's.

use agora_domain::Decision;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from an action executor
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Connector unavailable: {0}")]
    Unavailable(String),

    #[error("Action rejected by the marketplace: {0}")]
    Rejected(String),
}

/// Outcome of executing an approved decision
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub success: bool,
    pub cost: f64,
    /// Outcome quality signal in [0, 1], usable as feedback
    pub quality_signal: f64,
    pub detail: String,
}

impl ExecutionReport {
    pub fn succeeded(cost: f64, quality_signal: f64, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            cost,
            quality_signal: quality_signal.clamp(0.0, 1.0),
            detail: detail.into(),
        }
    }

    pub fn failed(cost: f64, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            cost,
            quality_signal: 0.0,
            detail: detail.into(),
        }
    }
}

/// Executes approved decisions against the outside world
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, decision: &Decision) -> Result<ExecutionReport, ExecutorError>;
}
