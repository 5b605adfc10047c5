//! Rolling inference budget

use crate::core::error::CoordinationError;
use serde::{Deserialize, Serialize};

/// Length of the budget window: one day, in milliseconds.
pub const BUDGET_WINDOW_MS: u64 = 24 * 60 * 60 * 1000;

/// Rolling spend window for inference calls (Entity)
///
/// Mutated only inside the budget actor's single-writer loop, so concurrent
/// routing calls can never jointly overspend through a stale read. `spent`
/// is monotonically non-decreasing within a window and never exceeds
/// `daily_limit` unless a reservation carries the explicit override flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetState {
    /// Milliseconds since epoch when the current window opened
    pub window_start: u64,
    pub spent: f64,
    pub daily_limit: f64,
    /// Hard cap on any single reservation
    pub per_request_max: f64,
}

impl BudgetState {
    pub fn new(daily_limit: f64, per_request_max: f64, now: u64) -> Self {
        Self {
            window_start: now,
            spent: 0.0,
            daily_limit,
            per_request_max,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.daily_limit - self.spent).max(0.0)
    }

    /// Roll the window over if a full day has elapsed. Returns true on reset.
    pub fn maybe_rollover(&mut self, now: u64) -> bool {
        if now.saturating_sub(self.window_start) >= BUDGET_WINDOW_MS {
            self.window_start = now;
            self.spent = 0.0;
            true
        } else {
            false
        }
    }

    /// Reserve `amount` against the window, charging it to `spent`.
    ///
    /// Rejects with `BudgetExceeded` — leaving `spent` untouched — when the
    /// amount breaches the per-request cap or the daily limit, unless
    /// `override_limit` is set (the explicit operator escape hatch).
    pub fn try_reserve(
        &mut self,
        amount: f64,
        override_limit: bool,
        now: u64,
    ) -> Result<(), CoordinationError> {
        self.maybe_rollover(now);

        if !override_limit {
            if amount > self.per_request_max {
                return Err(CoordinationError::BudgetExceeded {
                    requested: amount,
                    remaining: self.per_request_max,
                });
            }
            if self.spent + amount > self.daily_limit {
                return Err(CoordinationError::BudgetExceeded {
                    requested: amount,
                    remaining: self.remaining(),
                });
            }
        }

        self.spent += amount;
        Ok(())
    }

    /// Refund a reservation whose call never happened (e.g. backend error).
    pub fn release(&mut self, amount: f64) {
        self.spent = (self.spent - amount).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_charges_spent() {
        let mut budget = BudgetState::new(1.0, 0.5, 0);
        budget.try_reserve(0.3, false, 10).unwrap();
        assert_eq!(budget.spent, 0.3);
        assert!((budget.remaining() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_rejection_leaves_spent_unchanged() {
        let mut budget = BudgetState::new(1.0, 1.0, 0);
        budget.try_reserve(0.9, false, 10).unwrap();

        let err = budget.try_reserve(0.2, false, 20).unwrap_err();
        assert!(matches!(err, CoordinationError::BudgetExceeded { .. }));
        assert_eq!(budget.spent, 0.9);
    }

    #[test]
    fn test_per_request_cap() {
        let mut budget = BudgetState::new(10.0, 0.1, 0);
        assert!(budget.try_reserve(0.2, false, 10).is_err());
        assert_eq!(budget.spent, 0.0);
    }

    #[test]
    fn test_override_flag_permits_overspend() {
        let mut budget = BudgetState::new(1.0, 0.5, 0);
        budget.try_reserve(0.9, true, 10).unwrap();
        budget.try_reserve(0.9, true, 20).unwrap();
        assert!((budget.spent - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_window_rollover_resets_spent() {
        let mut budget = BudgetState::new(1.0, 1.0, 0);
        budget.try_reserve(0.9, false, 10).unwrap();

        // Within the window: still full
        assert!(budget.try_reserve(0.5, false, 1_000).is_err());

        // A day later: window resets and the reservation fits
        assert!(budget.try_reserve(0.5, false, BUDGET_WINDOW_MS + 1).is_ok());
        assert_eq!(budget.spent, 0.5);
        assert_eq!(budget.window_start, BUDGET_WINDOW_MS + 1);
    }

    #[test]
    fn test_release_refunds() {
        let mut budget = BudgetState::new(1.0, 1.0, 0);
        budget.try_reserve(0.4, false, 10).unwrap();
        budget.release(0.4);
        assert_eq!(budget.spent, 0.0);
        // Never goes negative
        budget.release(0.4);
        assert_eq!(budget.spent, 0.0);
    }
}
