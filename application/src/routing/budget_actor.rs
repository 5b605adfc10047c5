//! Single-writer budget actor
//!
//! All budget mutation flows through one task, so concurrent inference
//! calls cannot jointly overspend through a stale read. The handle exposes
//! message-passing operations only — no shared mutable fields.

use agora_domain::{BudgetState, CoordinationError, util::current_timestamp};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

enum BudgetCommand {
    TryReserve {
        amount: f64,
        override_limit: bool,
        reply: oneshot::Sender<Result<(), CoordinationError>>,
    },
    Release {
        amount: f64,
    },
    Snapshot {
        reply: oneshot::Sender<BudgetState>,
    },
}

/// Spawns and owns the single-writer budget task
pub struct BudgetKeeper;

impl BudgetKeeper {
    pub fn spawn(daily_limit: f64, per_request_max: f64) -> BudgetHandle {
        let (tx, mut rx) = mpsc::channel::<BudgetCommand>(64);

        tokio::spawn(async move {
            let mut state = BudgetState::new(daily_limit, per_request_max, current_timestamp());
            while let Some(command) = rx.recv().await {
                match command {
                    BudgetCommand::TryReserve {
                        amount,
                        override_limit,
                        reply,
                    } => {
                        let result = state.try_reserve(amount, override_limit, current_timestamp());
                        debug!(amount, spent = state.spent, ok = result.is_ok(), "Budget reservation");
                        let _ = reply.send(result);
                    }
                    BudgetCommand::Release { amount } => {
                        state.release(amount);
                    }
                    BudgetCommand::Snapshot { reply } => {
                        let _ = reply.send(state.clone());
                    }
                }
            }
        });

        BudgetHandle { tx }
    }
}

/// Message-passing handle to the budget actor
#[derive(Clone)]
pub struct BudgetHandle {
    tx: mpsc::Sender<BudgetCommand>,
}

impl BudgetHandle {
    /// Atomically reserve `amount` against the window.
    pub async fn try_reserve(
        &self,
        amount: f64,
        override_limit: bool,
    ) -> Result<(), CoordinationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BudgetCommand::TryReserve {
                amount,
                override_limit,
                reply,
            })
            .await
            .map_err(|_| CoordinationError::Cancelled)?;
        rx.await.map_err(|_| CoordinationError::Cancelled)?
    }

    /// Refund a reservation whose call never happened.
    pub async fn release(&self, amount: f64) -> Result<(), CoordinationError> {
        self.tx
            .send(BudgetCommand::Release { amount })
            .await
            .map_err(|_| CoordinationError::Cancelled)
    }

    pub async fn snapshot(&self) -> Result<BudgetState, CoordinationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BudgetCommand::Snapshot { reply })
            .await
            .map_err(|_| CoordinationError::Cancelled)?;
        rx.await.map_err(|_| CoordinationError::Cancelled)
    }
}
