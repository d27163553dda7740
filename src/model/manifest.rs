//! Manifest structure (§3, §4.2 — parsing/validation lives in `crate::manifest`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{Kind, RiskLevel};

/// A connector/template/policy manifest as parsed from `manifest.json`.
///
/// Unknown fields are preserved in `extra` for surface display but never
/// consulted during verification (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub kind: Kind,
    pub id: String,
    pub version: String,
    pub package_hash: String,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effect_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Manifest {
    /// Capabilities required but not present in `accepted`, in declared order.
    pub fn missing_capabilities(&self, accepted: &[String]) -> Vec<String> {
        self.required_capabilities
            .iter()
            .filter(|c| !accepted.contains(c))
            .cloned()
            .collect()
    }

    /// True if every capability in `self.required_capabilities` is covered
    /// by `previously_accepted` (§4.7 step 9, permission-drift check).
    pub fn capabilities_subset_of(&self, previously_accepted: &[String]) -> bool {
        self.required_capabilities
            .iter()
            .all(|c| previously_accepted.contains(c))
    }
}
