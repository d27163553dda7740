//! Detached signature envelope (§3, §6).

use serde::{Deserialize, Serialize};

/// `manifest.sig`: a detached Ed25519 signature over the exact manifest bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    pub key_id: String,
    pub algorithm: String,
    pub signature: String,
}

impl SignatureEnvelope {
    pub fn is_ed25519(&self) -> bool {
        self.algorithm == "ed25519"
    }
}

/// Outcome of running a manifest through the signature verifier (C3).
/// Carried in an intent snapshot's `signature_summary` (§3) and recorded
/// into an installed connector's `verified_by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureSummary {
    pub signed: bool,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    pub status: String,
}

impl SignatureSummary {
    pub fn unsigned_dev_mode() -> Self {
        Self {
            signed: false,
            verified: false,
            key_id: None,
            status: "unsigned (dev mode allowed)".to_string(),
        }
    }

    pub fn verified(key_id: String) -> Self {
        Self {
            signed: true,
            verified: true,
            key_id: Some(key_id),
            status: "verified".to_string(),
        }
    }

    pub fn failed(status: impl Into<String>) -> Self {
        Self {
            signed: true,
            verified: false,
            key_id: None,
            status: status.into(),
        }
    }

    /// Like `failed`, but keeps the offending key id around for callers
    /// that need to report it (e.g. `RegistryError::UntrustedKey`).
    pub fn untrusted_key(key_id: String) -> Self {
        Self {
            signed: true,
            verified: false,
            key_id: Some(key_id),
            status: "untrusted-key".to_string(),
        }
    }

    /// Production mode requires a status ending in `"verified"` (§4.7 step 7).
    pub fn is_production_acceptable(&self) -> bool {
        self.status.ends_with("verified") && self.verified
    }
}
