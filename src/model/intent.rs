//! Install-intent snapshots (§3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signature::SignatureSummary;
use super::{Kind, RiskLevel, Tier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsSummary {
    pub required_capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effect_types: Option<Vec<String>>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSummary {
    pub required: Tier,
    pub current: Tier,
    pub allowed: bool,
}

impl TierSummary {
    /// `rank(current) >= rank(required)`; `none` required is always allowed (§4.7 step 5).
    pub fn evaluate(required: Tier, current: Tier) -> Self {
        Self {
            required,
            current,
            allowed: required == Tier::None || current.rank() >= required.rank(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publisher {
    pub name: String,
    pub key_id: String,
    pub verified: bool,
}

/// A resolved install preview, keyed by a minted idempotency key (§3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentEntry {
    pub kind: Kind,
    pub id: String,
    pub resolved_version: String,
    pub manifest_summary: String,
    pub permissions_summary: PermissionsSummary,
    pub signature_summary: SignatureSummary,
    pub publisher: Publisher,
    pub tier_summary: TierSummary,
    pub expires_at: DateTime<Utc>,
}

impl IntentEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn tier_summary_allows_none_requirement_regardless_of_current() {
        let s = TierSummary::evaluate(Tier::None, Tier::None);
        assert!(s.allowed);
    }

    #[test]
    fn tier_summary_denies_insufficient_rank() {
        let s = TierSummary::evaluate(Tier::Pro, Tier::Free);
        assert!(!s.allowed);
    }

    #[test]
    fn tier_summary_allows_sufficient_rank() {
        let s = TierSummary::evaluate(Tier::Pro, Tier::Enterprise);
        assert!(s.allowed);
    }

    #[test]
    fn is_expired_compares_against_now() {
        let now = Utc::now();
        let entry = IntentEntry {
            kind: Kind::Connector,
            id: "conn.github".into(),
            resolved_version: "1.0.0".into(),
            manifest_summary: "conn.github@1.0.0".into(),
            permissions_summary: PermissionsSummary {
                required_capabilities: vec![],
                side_effect_types: None,
                risk_level: RiskLevel::Low,
            },
            signature_summary: super::super::signature::SignatureSummary::verified("dev".into()),
            publisher: Publisher {
                name: "Github".into(),
                key_id: "dev".into(),
                verified: true,
            },
            tier_summary: TierSummary::evaluate(Tier::None, Tier::Free),
            expires_at: now - Duration::seconds(1),
        };
        assert!(entry.is_expired(now));
    }
}
