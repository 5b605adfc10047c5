//! Learning engine actor
//!
//! The learning state is one of only two shared mutable entities in the
//! system (the other is the budget). It is owned by a single-writer task and
//! reached exclusively through message passing, so its invariants hold under
//! any degree of concurrency.

use agora_domain::{CoordinationError, Feedback, LearningParams, LearningState, OperatingMode};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

enum LearningCommand {
    Learn {
        batch: Vec<Feedback>,
        mode: OperatingMode,
    },
    Snapshot {
        reply: oneshot::Sender<LearningState>,
    },
    Reset {
        category: Option<String>,
    },
}

/// Spawns and owns the single-writer learning task
pub struct LearningEngine;

impl LearningEngine {
    /// Spawn the actor; the returned handle is cheap to clone.
    pub fn spawn(params: LearningParams) -> LearningHandle {
        let (tx, mut rx) = mpsc::channel::<LearningCommand>(64);

        tokio::spawn(async move {
            let mut state = LearningState::new();
            while let Some(command) = rx.recv().await {
                match command {
                    LearningCommand::Learn { batch, mode } => {
                        debug!(items = batch.len(), mode = %mode, "Learning from feedback batch");
                        state.learn(&batch, &params, mode);
                    }
                    LearningCommand::Snapshot { reply } => {
                        let _ = reply.send(state.clone());
                    }
                    LearningCommand::Reset { category } => {
                        info!(category = category.as_deref().unwrap_or("<all>"), "Learning state reset");
                        state.reset(category.as_deref());
                    }
                }
            }
        });

        LearningHandle { tx }
    }
}

/// Message-passing handle to the learning actor
#[derive(Clone)]
pub struct LearningHandle {
    tx: mpsc::Sender<LearningCommand>,
}

impl LearningHandle {
    /// Apply a feedback batch to the learned weights.
    pub async fn learn(
        &self,
        batch: Vec<Feedback>,
        mode: OperatingMode,
    ) -> Result<(), CoordinationError> {
        self.tx
            .send(LearningCommand::Learn { batch, mode })
            .await
            .map_err(|_| CoordinationError::Cancelled)
    }

    /// Read a consistent snapshot for scoring.
    pub async fn snapshot(&self) -> Result<LearningState, CoordinationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LearningCommand::Snapshot { reply })
            .await
            .map_err(|_| CoordinationError::Cancelled)?;
        rx.await.map_err(|_| CoordinationError::Cancelled)
    }

    /// Clear one category, or everything when `None`.
    pub async fn reset(&self, category: Option<String>) -> Result<(), CoordinationError> {
        self.tx
            .send(LearningCommand::Reset { category })
            .await
            .map_err(|_| CoordinationError::Cancelled)
    }
}
