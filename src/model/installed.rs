//! Installed connector records (§3).

use serde::{Deserialize, Serialize};

use super::manifest::Manifest;

/// A package currently installed on disk (`<installed_root>/<id>/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledConnector {
    pub id: String,
    pub pinned_version: String,
    pub sha256: String,
    pub verified_by: String,
    pub manifest: Manifest,
    /// Capabilities the user most recently consented to for this id;
    /// the permission-drift check compares a would-be upgrade against this.
    #[serde(default)]
    pub accepted_capabilities: Vec<String>,
}

impl InstalledConnector {
    /// Sentinel `verified_by` used when signature verification was skipped
    /// under the dev-mode bypass (§4.3).
    pub const UNSIGNED: &'static str = "unsigned";
    /// Sentinel `verified_by` used for entries rehydrated from the lockfile
    /// without re-running signature verification (§4.8).
    pub const FROM_LOCKFILE: &'static str = "lockfile";
}
