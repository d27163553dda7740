//! Intent table (C6, §4.6).
//!
//! Maps a 128-bit idempotency key to a resolved install intent. `put` and
//! `consume` both acquire the exclusive lock described in §5; this module
//! itself only owns the map and the sweep, the surrounding lock lives on
//! the facade (`crate::registry::Registry`).

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use rand::RngCore;

use crate::model::intent::IntentEntry;

/// Generates a fresh 32-hex-char idempotency key from a cryptographic RNG.
pub fn mint_key() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeError {
    NotFound,
    Expired,
}

/// In-memory store of live intents. Not thread-safe on its own — callers
/// hold the facade's exclusive lock around every mutation.
#[derive(Debug, Default)]
pub struct IntentTable {
    entries: HashMap<String, IntentEntry>,
}

impl IntentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entry` under `key`, then opportunistically sweeps anything
    /// already expired (§4.6).
    pub fn put(&mut self, key: String, entry: IntentEntry) {
        self.entries.insert(key, entry);
        self.sweep();
    }

    /// Atomic look-up-and-remove. Expired entries are removed and reported
    /// as `Expired` rather than `NotFound` so callers can distinguish
    /// "never existed" from "too late".
    pub fn consume(&mut self, key: &str) -> Result<IntentEntry, ConsumeError> {
        let now = Utc::now();
        match self.entries.remove(key) {
            None => Err(ConsumeError::NotFound),
            Some(entry) if entry.is_expired(now) => Err(ConsumeError::Expired),
            Some(entry) => Ok(entry),
        }
    }

    /// Read-only peek used by debugging/introspection call sites; does not
    /// consume the key.
    pub fn peek(&self, key: &str) -> Option<&IntentEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep(&mut self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}

/// Default TTL applied by callers minting a new intent (§4.6).
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
