//! Simulated action executor
//!
//! Executes approved decisions deterministically. An option carrying the
//! `simulate_failure` attribute fails, which is how demos and tests exercise
//! the failure and backup-retry paths without a real marketplace.

use agora_application::ports::connector::{ActionExecutor, ExecutionReport, ExecutorError};
use agora_domain::Decision;
use async_trait::async_trait;
use tracing::debug;

/// Attribute key that makes the simulated execution fail
pub const SIMULATE_FAILURE_KEY: &str = "simulate_failure";

/// Deterministic executor for demos and tests
pub struct SimulatedConnector {
    quality_signal: f64,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self { quality_signal: 0.8 }
    }

    /// Pin the quality signal reported for successful executions.
    pub fn with_quality_signal(mut self, quality_signal: f64) -> Self {
        self.quality_signal = quality_signal.clamp(0.0, 1.0);
        self
    }
}

impl Default for SimulatedConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for SimulatedConnector {
    async fn execute(&self, decision: &Decision) -> Result<ExecutionReport, ExecutorError> {
        let option = decision.chosen_option.as_ref().ok_or_else(|| {
            ExecutorError::Rejected("decision carries no chosen option".into())
        })?;

        debug!(decision = %decision.id, option = %option.id, "Simulated execution");
        if option.attributes.contains_key(SIMULATE_FAILURE_KEY) {
            return Ok(ExecutionReport::failed(
                option.estimated_cost,
                format!("option '{}' flagged to fail", option.id),
            ));
        }
        Ok(ExecutionReport::succeeded(
            option.estimated_cost,
            self.quality_signal,
            format!("executed option '{}'", option.id),
        ))
    }
}
