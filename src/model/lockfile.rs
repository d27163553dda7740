//! Lockfile on-disk shape (§3, §4.8).

use serde::{Deserialize, Serialize};

/// One entry in `reach.lock.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockEntry {
    pub id: String,
    pub version: String,
    pub hash: String,
}

/// `{"packages": [...]}` sorted by `id` ascending (invariant enforced by
/// `crate::lockfile`, not by this type itself).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LockDocument {
    pub packages: Vec<LockEntry>,
}
