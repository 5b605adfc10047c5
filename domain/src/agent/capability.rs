//! Capability value object
//!
//! Capabilities form a closed set of named skills. Dispatch across agent
//! kinds is polymorphic over this set via the registry, never via runtime
//! type inspection.

use serde::{Deserialize, Serialize};

/// A named skill an agent offers (Value Object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create and revise marketplace listings
    Listing,
    /// Price-point analysis and repricing
    Pricing,
    /// Stock-level tracking and reorder proposals
    Inventory,
    /// Candidate-product discovery
    Sourcing,
    /// Order routing and shipping choices
    Fulfillment,
    /// Offer/counter-offer handling
    Negotiation,
    /// Sales and performance analysis
    Analytics,
}

impl Capability {
    pub fn as_str(&self) -> &str {
        match self {
            Capability::Listing => "listing",
            Capability::Pricing => "pricing",
            Capability::Inventory => "inventory",
            Capability::Sourcing => "sourcing",
            Capability::Fulfillment => "fulfillment",
            Capability::Negotiation => "negotiation",
            Capability::Analytics => "analytics",
        }
    }

    /// All capabilities, in a stable order
    pub fn all() -> &'static [Capability] {
        &[
            Capability::Listing,
            Capability::Pricing,
            Capability::Inventory,
            Capability::Sourcing,
            Capability::Fulfillment,
            Capability::Negotiation,
            Capability::Analytics,
        ]
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::all()
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown capability: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_via_str() {
        for capability in Capability::all() {
            let parsed: Capability = capability.as_str().parse().unwrap();
            assert_eq!(*capability, parsed);
        }
    }

    #[test]
    fn test_unknown_capability_rejected() {
        assert!("teleportation".parse::<Capability>().is_err());
    }
}
