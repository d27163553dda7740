//! Shared data model (§3): the index, manifest, signature envelope,
//! trusted key set, installed/intent/lockfile entries, and the
//! marketplace catalog projection.

pub mod catalog;
pub mod index;
pub mod installed;
pub mod intent;
pub mod lockfile;
pub mod manifest;
pub mod signature;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Package kind. Inferred for catalog items (§4.5), declared explicitly
/// in manifests (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Connector,
    Template,
    Policy,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Connector => "connector",
            Kind::Template => "template",
            Kind::Policy => "policy",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connector" => Ok(Kind::Connector),
            "template" => Ok(Kind::Template),
            "policy" => Ok(Kind::Policy),
            other => Err(format!("unknown kind: {other}")),
        }
    }
}

/// Coarse risk label surfaced for user consent (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Medium
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            // Non-standard risk labels fall back to the documented default
            // rather than rejecting the whole version record (§4.5).
            _ => Ok(RiskLevel::Medium),
        }
    }
}

impl RiskLevel {
    /// Sort rank used by the catalog's `risk_desc` mode (§4.5).
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::High => 3,
            RiskLevel::Medium => 2,
            RiskLevel::Low => 1,
        }
    }
}

/// Subscription tier gating install eligibility (§3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    None,
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    /// `rank(current) >= rank(required)` is the tier-gate check (§4.7).
    /// `Ord` already gives us this directly via the declaration order
    /// above, but a named method keeps call sites self-documenting.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::None
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::None => "none",
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Tier::None),
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_matches_spec() {
        assert!(Tier::None < Tier::Free);
        assert!(Tier::Free < Tier::Pro);
        assert!(Tier::Pro < Tier::Enterprise);
    }

    #[test]
    fn risk_rank_orders_high_first() {
        assert!(RiskLevel::High.rank() > RiskLevel::Medium.rank());
        assert!(RiskLevel::Medium.rank() > RiskLevel::Low.rank());
    }

    #[test]
    fn kind_round_trips_through_display_and_from_str() {
        for k in [Kind::Connector, Kind::Template, Kind::Policy] {
            let s = k.to_string();
            assert_eq!(Kind::from_str(&s).unwrap(), k);
        }
    }

    #[test]
    fn unknown_risk_level_defaults_to_medium() {
        assert_eq!(RiskLevel::from_str("unheard-of").unwrap(), RiskLevel::Medium);
    }
}
