//! Decision pipeline facade
//!
//! Composes the Decision Maker, Validator, Tracker, and Learning Engine into
//! the propose → validate flow. The tracker's transition graph makes the
//! validation gate structural: Executing is only reachable through Approved,
//! and Approved only through a passed validation here.

use crate::pipeline::learning::LearningHandle;
use crate::pipeline::tracker::DecisionTracker;
use agora_domain::{
    Constraints, CoordinationError, Decision, DecisionContext, DecisionMaker, DecisionOption,
    DecisionStatus, DecisionValidator, OperatingMode, ValidationReport,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Propose/validate entry point for agents and the orchestrator
pub struct DecisionPipeline {
    maker: DecisionMaker,
    validator: DecisionValidator,
    tracker: Arc<DecisionTracker>,
    learning: LearningHandle,
}

impl DecisionPipeline {
    pub fn new(
        maker: DecisionMaker,
        validator: DecisionValidator,
        tracker: Arc<DecisionTracker>,
        learning: LearningHandle,
    ) -> Self {
        Self {
            maker,
            validator,
            tracker,
            learning,
        }
    }

    pub fn tracker(&self) -> &Arc<DecisionTracker> {
        &self.tracker
    }

    /// Score the options under the current learning snapshot and track the
    /// resulting decision.
    ///
    /// A decision with no feasible option comes back already `Rejected`;
    /// the caller branches on status instead of an error.
    pub async fn propose(
        &self,
        context: DecisionContext,
        options: &[DecisionOption],
        constraints: &Constraints,
        mode: OperatingMode,
    ) -> Result<Decision, CoordinationError> {
        let learning = self.learning.snapshot().await?;
        let decision = self.maker.propose(context, options, constraints, &learning, mode);
        debug!(
            decision = %decision.id,
            status = %decision.status,
            confidence = decision.confidence,
            "Decision proposed"
        );
        self.tracker.track(decision.clone(), mode).await;
        Ok(decision)
    }

    /// Run the rule gate: `Pending -> Validating -> Approved | Rejected`.
    ///
    /// All rules run without short-circuiting; the returned report carries
    /// every failure message. A failed validation permanently blocks the
    /// Executing transition for this decision instance.
    pub async fn validate(
        &self,
        decision_id: &str,
        mode: OperatingMode,
    ) -> Result<ValidationReport, CoordinationError> {
        let decision = self
            .tracker
            .get(decision_id)
            .await
            .ok_or_else(|| CoordinationError::not_found("Decision", decision_id))?;

        self.tracker
            .update_status(decision_id, DecisionStatus::Validating, mode)
            .await?;

        let report = self.validator.validate(&decision);
        let verdict = if report.is_valid {
            DecisionStatus::Approved
        } else {
            DecisionStatus::Rejected
        };
        self.tracker.update_status(decision_id, verdict, mode).await?;

        if !report.is_valid {
            info!(decision = %decision_id, messages = ?report.messages, "Decision rejected by validation");
        }
        Ok(report)
    }
}
