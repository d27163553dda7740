//! Process-wide configuration (C11).
//!
//! Loaded once at startup and shared immutably via `Arc` by the facade.
//! Everything the core needs beyond the index/manifest content itself
//! lives here: filesystem roots, the dev-mode signature bypass, the
//! current subscription tier, and cache/intent TTLs.

use std::path::PathBuf;
use std::time::Duration;

use crate::model::Tier;

/// Default catalog cache TTL (§4.5).
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(120);
/// Default install-intent TTL (§4.6).
pub const DEFAULT_INTENT_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Root that relative `manifest_url`/`bundle_url`/`signature_url` entries resolve against.
    pub registry_root: PathBuf,
    /// Root under which `<id>/{manifest.json,bundle.tgz}` are written on install.
    pub installed_root: PathBuf,
    /// Root for the best-effort remote-fetch mirror cache.
    pub cache_root: PathBuf,
    /// Path to `reach.lock.json`.
    pub lockfile_path: PathBuf,
    /// Path to the trusted keys file.
    pub trusted_keys_path: PathBuf,
    /// Dev-mode bypass: allow unsigned manifests to install (§4.3).
    pub allow_unsigned: bool,
    /// Current subscription tier, used for tier gating (§4.7).
    pub current_tier: Tier,
    /// Catalog cache TTL (§4.5).
    pub catalog_ttl: Duration,
    /// Install-intent TTL (§4.6).
    pub intent_ttl: Duration,
    /// User-Agent sent on remote fetches.
    pub http_user_agent: String,
}

impl RegistryConfig {
    /// Builds a config rooted at `root`, with every path nested underneath it.
    /// Used directly by tests; `from_env` layers environment overrides on top.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            installed_root: root.join("installed"),
            cache_root: root.join("cache"),
            lockfile_path: root.join("reach.lock.json"),
            trusted_keys_path: root.join("trusted_keys.json"),
            registry_root: root,
            allow_unsigned: false,
            current_tier: Tier::Free,
            catalog_ttl: DEFAULT_CATALOG_TTL,
            intent_ttl: DEFAULT_INTENT_TTL,
            http_user_agent: "reach-registry/0.1".to_string(),
        }
    }

    /// Reads `REACH_*` environment variables, falling back to
    /// `rooted_at(".")` defaults for anything unset.
    pub fn from_env() -> Self {
        let mut cfg = Self::rooted_at(
            std::env::var("REACH_REGISTRY_ROOT").unwrap_or_else(|_| ".".to_string()),
        );
        if let Ok(v) = std::env::var("REACH_INSTALLED_ROOT") {
            cfg.installed_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REACH_CACHE_ROOT") {
            cfg.cache_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REACH_LOCKFILE_PATH") {
            cfg.lockfile_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REACH_TRUSTED_KEYS_PATH") {
            cfg.trusted_keys_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REACH_ALLOW_UNSIGNED") {
            cfg.allow_unsigned = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("REACH_CURRENT_TIER") {
            if let Ok(tier) = v.parse() {
                cfg.current_tier = tier;
            }
        }
        if let Ok(v) = std::env::var("REACH_CATALOG_TTL_SECS") {
            if let Ok(secs) = v.parse() {
                cfg.catalog_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("REACH_INTENT_TTL_SECS") {
            if let Ok(secs) = v.parse() {
                cfg.intent_ttl = Duration::from_secs(secs);
            }
        }
        cfg
    }
}
