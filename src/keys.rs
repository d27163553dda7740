//! Trusted key loader (C9, §4.9).
//!
//! Reads a JSON object mapping `key_id` to a base64-encoded 32-byte
//! Ed25519 public key. Loaded once at startup; the returned snapshot is
//! immutable for the lifetime of the process (§9 — global mutable state
//! is limited to this snapshot and the `allow_unsigned` predicate).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ed25519_dalek::VerifyingKey;

use crate::crypto;
use crate::error::{RegistryError, Result};

/// Immutable snapshot of trusted signing keys, keyed by `key_id`.
#[derive(Debug, Clone, Default)]
pub struct TrustedKeys {
    keys: HashMap<String, VerifyingKey>,
}

impl TrustedKeys {
    /// Loads and validates the trusted keys file at `path`. A missing file
    /// yields an empty, still-valid snapshot (useful for dev-mode-only setups).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses the `{ key_id: base64_pubkey, ... }` document directly,
    /// rejecting any entry whose decoded key is not exactly 32 bytes.
    pub fn parse(raw: &str) -> Result<Self> {
        let map: HashMap<String, String> = serde_json::from_str(raw)?;
        let mut keys = HashMap::with_capacity(map.len());
        for (key_id, b64) in map {
            let vk = crypto::decode_public_key(&b64).map_err(|reason| {
                RegistryError::InvalidManifest(format!(
                    "trusted key {key_id} is not a valid 32-byte ed25519 public key: {reason}"
                ))
            })?;
            keys.insert(key_id, vk);
        }
        Ok(Self { keys })
    }

    /// Looks up a key by id. `None` means `untrusted-key` at the call site.
    pub fn get(&self, key_id: &str) -> Option<&VerifyingKey> {
        self.keys.get(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
