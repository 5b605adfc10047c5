//! Simulated inference backends
//!
//! Deterministic stand-ins for real model providers, one per tier. The
//! observed quality defaults to the tier's typical quality and can be pinned
//! for demos that exercise escalation.

use agora_application::ports::inference::{InferenceBackend, InferenceError, InferenceOutcome};
use agora_domain::{ModelTier, TaskDescriptor, util::truncate_str};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A deterministic inference backend for one tier
pub struct SimulatedBackend {
    tier: ModelTier,
    quality: f64,
    latency: Duration,
}

impl SimulatedBackend {
    pub fn new(tier: ModelTier) -> Self {
        Self {
            tier,
            quality: tier.typical_quality(),
            latency: Duration::from_millis(5),
        }
    }

    /// Pin the quality signal this backend reports.
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality.clamp(0.0, 1.0);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// One simulated backend per tier, at each tier's typical quality.
    pub fn full_set() -> Vec<Arc<dyn InferenceBackend>> {
        ModelTier::all()
            .iter()
            .map(|tier| Arc::new(SimulatedBackend::new(*tier)) as Arc<dyn InferenceBackend>)
            .collect()
    }
}

#[async_trait]
impl InferenceBackend for SimulatedBackend {
    fn tier(&self) -> ModelTier {
        self.tier
    }

    async fn call(&self, task: &TaskDescriptor) -> Result<InferenceOutcome, InferenceError> {
        tokio::time::sleep(self.latency).await;
        debug!(tier = %self.tier, task = %task.id, "Simulated inference call");
        Ok(InferenceOutcome {
            content: format!(
                "[{}] assessment: {}",
                self.tier,
                truncate_str(&task.description, 80)
            ),
            observed_cost: self.tier.cost_per_call(),
            observed_quality: self.quality,
        })
    }
}
