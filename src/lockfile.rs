//! Lockfile store (C8, §4.8).
//!
//! Atomic on-disk persistence for the installed set: write to `<path>.tmp`,
//! fsync, rename over the target. A missing file reads as an empty list.

use std::fs::{self, File};
use std::path::Path;

use crate::error::Result;
use crate::model::lockfile::{LockDocument, LockEntry};

/// Loads `reach.lock.json`; a missing file is equivalent to an empty list.
pub fn load(path: &Path) -> Result<LockDocument> {
    if !path.exists() {
        return Ok(LockDocument::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Writes `entries` (sorted by `id` ascending, per §3/§4.8) atomically.
pub fn save(path: &Path, mut entries: Vec<LockEntry>) -> Result<()> {
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    let doc = LockDocument { packages: entries };
    let json = serde_json::to_string_pretty(&doc)?;

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp_path)?;
        use std::io::Write;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
