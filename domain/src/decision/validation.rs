//! Decision Validator
//!
//! An ordered, pluggable set of named rules gating decisions before
//! execution. All rules run without short-circuiting so the caller receives
//! the complete failure report in one pass.

use super::entities::Decision;
use std::collections::HashSet;

/// A single named validation rule
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &str;

    /// `Err` carries the human-readable failure message.
    fn check(&self, decision: &Decision) -> Result<(), String>;
}

/// Outcome of running every rule against a decision
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// One message per failed rule, prefixed with the rule name
    pub messages: Vec<String>,
}

impl ValidationReport {
    pub fn passed() -> Self {
        Self {
            is_valid: true,
            messages: Vec::new(),
        }
    }
}

/// Requires confidence at or above a floor
pub struct MinConfidence {
    pub min: f64,
}

impl ValidationRule for MinConfidence {
    fn name(&self) -> &str {
        "min_confidence"
    }

    fn check(&self, decision: &Decision) -> Result<(), String> {
        if decision.confidence < self.min {
            return Err(format!(
                "confidence {:.3} below minimum {:.3}",
                decision.confidence, self.min
            ));
        }
        Ok(())
    }
}

/// Requires a rationale of at least `min_chars` characters
pub struct MinRationaleLength {
    pub min_chars: usize,
}

impl ValidationRule for MinRationaleLength {
    fn name(&self) -> &str {
        "min_rationale_length"
    }

    fn check(&self, decision: &Decision) -> Result<(), String> {
        let len = decision.rationale.chars().count();
        if len < self.min_chars {
            return Err(format!(
                "rationale has {} characters, minimum is {}",
                len, self.min_chars
            ));
        }
        Ok(())
    }
}

/// Restricts decisions to an allow-listed set of categories
pub struct CategoryAllowList {
    pub allowed: HashSet<String>,
}

impl ValidationRule for CategoryAllowList {
    fn name(&self) -> &str {
        "category_allow_list"
    }

    fn check(&self, decision: &Decision) -> Result<(), String> {
        if self.allowed.contains(&decision.category) {
            Ok(())
        } else {
            Err(format!("category '{}' is not allow-listed", decision.category))
        }
    }
}

/// Caps the chosen option's estimated cost
pub struct CostCeiling {
    pub max_cost: f64,
}

impl ValidationRule for CostCeiling {
    fn name(&self) -> &str {
        "cost_ceiling"
    }

    fn check(&self, decision: &Decision) -> Result<(), String> {
        match &decision.chosen_option {
            Some(option) if option.estimated_cost > self.max_cost => Err(format!(
                "estimated cost {:.4} exceeds ceiling {:.4}",
                option.estimated_cost, self.max_cost
            )),
            _ => Ok(()),
        }
    }
}

/// Runs an ordered set of rules against decisions
pub struct DecisionValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl DecisionValidator {
    pub fn new(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Standard rule set: minimum confidence and a non-trivial rationale.
    pub fn standard(min_confidence: f64, min_rationale_chars: usize) -> Self {
        Self::new(vec![
            Box::new(MinConfidence { min: min_confidence }),
            Box::new(MinRationaleLength {
                min_chars: min_rationale_chars,
            }),
        ])
    }

    pub fn push(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule; never short-circuits.
    pub fn validate(&self, decision: &Decision) -> ValidationReport {
        let messages: Vec<String> = self
            .rules
            .iter()
            .filter_map(|rule| {
                rule.check(decision)
                    .err()
                    .map(|msg| format!("{}: {}", rule.name(), msg))
            })
            .collect();

        ValidationReport {
            is_valid: messages.is_empty(),
            messages,
        }
    }
}
