//! Manifest parser (C2, §4.2).
//!
//! Strict decode of `manifest.json` bytes: rejects missing required
//! fields, an out-of-set `kind`, a malformed `package_hash`, or a version
//! string that fails semantic parsing. Byte-exact preservation between
//! fetch and signature verification is the caller's responsibility — this
//! module never mutates the bytes it is handed.

use crate::crypto::is_lower_hex_64;
use crate::error::{RegistryError, Result};
use crate::model::manifest::Manifest;
use crate::version::ParsedVersion;

/// Parses and validates manifest bytes as delivered by the fetcher.
pub fn parse(bytes: &[u8]) -> Result<Manifest> {
    let manifest: Manifest = serde_json::from_slice(bytes)
        .map_err(|e| RegistryError::InvalidManifest(format!("malformed manifest json: {e}")))?;

    if manifest.id.is_empty() {
        return Err(RegistryError::InvalidManifest("manifest id is empty".into()));
    }
    if !is_lower_hex_64(&manifest.package_hash) {
        return Err(RegistryError::InvalidManifest(format!(
            "package_hash must be 64 lowercase hex characters, got {}",
            manifest.package_hash
        )));
    }
    ParsedVersion::parse(&manifest.version).map_err(|_| {
        RegistryError::InvalidManifest(format!(
            "manifest version {} is not valid semver",
            manifest.version
        ))
    })?;

    Ok(manifest)
}

/// Checks the manifest's declared `id`/`version` against the version
/// record that pointed to it (§3 invariant).
pub fn validate_matches(manifest: &Manifest, expected_id: &str, expected_version: &str) -> Result<()> {
    if manifest.id != expected_id || manifest.version != expected_version {
        return Err(RegistryError::InvalidManifest(format!(
            "manifest {}@{} does not match requested {}@{}",
            manifest.id, manifest.version, expected_id, expected_version
        )));
    }
    Ok(())
}
