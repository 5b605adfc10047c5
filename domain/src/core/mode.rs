//! Operating mode value object
//!
//! Degraded/constrained behavior is threaded as an explicit parameter into
//! every call that needs it (Decision Maker, Tracker, Learning Engine) rather
//! than read from an ambient flag, so correctness never depends on which mode
//! happens to be active.

use serde::{Deserialize, Serialize};

/// Operating mode for the coordination pipeline (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Full-fidelity operation.
    #[default]
    Normal,
    /// Resource-constrained operation: scoring favors cheaper options,
    /// learning uses the single-pass update.
    Constrained,
}

impl OperatingMode {
    pub fn is_constrained(&self) -> bool {
        matches!(self, OperatingMode::Constrained)
    }

    pub fn as_str(&self) -> &str {
        match self {
            OperatingMode::Normal => "normal",
            OperatingMode::Constrained => "constrained",
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
