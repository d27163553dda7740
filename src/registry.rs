//! Public contract (C10, §5, §6).
//!
//! `Registry` is the single shared-state owner: one `RwLock` guards the
//! installed map, the intent table, the catalog cache, and the current
//! tier, exactly as described in §5. Every public method here either
//! takes the read half for a pure lookup or follows the
//! snapshot-under-lock → I/O unlocked → re-validate-and-commit pattern
//! for anything that mutates state or touches the network/disk.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::catalog::{self, CatalogCache, CatalogFilter};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::install_engine::{self, ResolvedPackage};
use crate::intent_table::{self, ConsumeError, IntentTable};
use crate::keys::TrustedKeys;
use crate::lockfile;
use crate::model::catalog::{CatalogPage, MarketplaceItem};
use crate::model::index::PackageIndex;
use crate::model::installed::InstalledConnector;
use crate::model::intent::{IntentEntry, Publisher};
use crate::model::lockfile::LockEntry;
use crate::model::{Kind, Tier};

struct SharedState {
    installed: std::collections::BTreeMap<String, InstalledConnector>,
    intents: IntentTable,
    catalog_cache: CatalogCache,
    current_tier: Tier,
}

/// Facade aggregating C1–C9 behind one lock. Cheap to clone (an `Arc`
/// internally) so it can be handed to multiple HTTP handler tasks.
#[derive(Clone)]
pub struct Registry {
    config: Arc<RegistryConfig>,
    trusted_keys: Arc<TrustedKeys>,
    http_client: reqwest::Client,
    state: Arc<RwLock<SharedState>>,
}

/// Response shape for `InstallIntent` (§6).
pub struct IntentResponse {
    pub idempotency_key: String,
    pub entry: IntentEntry,
}

impl Registry {
    /// Loads trusted keys and the on-disk lockfile, rehydrating installed
    /// manifests where possible (§4.8).
    pub fn open(config: RegistryConfig) -> Result<Self> {
        let trusted_keys = TrustedKeys::load(&config.trusted_keys_path)?;
        let http_client = crate::fetcher::build_client(&config.http_user_agent)?;

        let lock_doc = lockfile::load(&config.lockfile_path)?;
        let mut installed = std::collections::BTreeMap::new();
        for entry in lock_doc.packages {
            match rehydrate(&config, &entry) {
                Ok(conn) => {
                    installed.insert(entry.id.clone(), conn);
                }
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "skipping unreadable installed manifest");
                }
            }
        }

        let state = SharedState {
            installed,
            intents: IntentTable::new(),
            catalog_cache: CatalogCache::empty(config.catalog_ttl),
            current_tier: config.current_tier,
        };

        Ok(Self {
            config: Arc::new(config),
            trusted_keys: Arc::new(trusted_keys),
            http_client,
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// `ListInstalled` (§6): a snapshot sorted by id ascending.
    #[tracing::instrument(skip(self))]
    pub async fn list_installed(&self) -> Vec<InstalledConnector> {
        let state = self.state.read().await;
        state.installed.values().cloned().collect()
    }

    /// `Available` (§6): the raw index package ids, without catalog derivation.
    #[tracing::instrument(skip(self))]
    pub async fn available(&self) -> Result<Vec<String>> {
        let index = self.load_index().await?;
        Ok(index.packages.into_iter().map(|p| p.id).collect())
    }

    /// `SetCurrentTier` (§6).
    #[tracing::instrument(skip(self))]
    pub async fn set_current_tier(&self, tier: Tier) {
        let mut state = self.state.write().await;
        state.current_tier = tier;
    }

    /// `SetCatalogTTL` (§6). Rebuilds the cache with the new TTL; existing
    /// cached items are dropped rather than reinterpreted under a new window.
    #[tracing::instrument(skip(self))]
    pub async fn set_catalog_ttl(&self, ttl: Duration) {
        let mut state = self.state.write().await;
        state.catalog_cache = CatalogCache::empty(ttl);
    }

    /// `ListMarketplaceCatalog` (§6, §4.5).
    #[tracing::instrument(skip(self, filter))]
    pub async fn list_marketplace_catalog(&self, filter: &CatalogFilter) -> Result<CatalogPage> {
        let index = self.load_index().await?;
        let source = self.index_source();

        let mut state = self.state.write().await;
        let (items, stale) = if source.contains("://") {
            state.catalog_cache.refresh_remote(&self.http_client, &source).await?
        } else {
            (state.catalog_cache.refresh_local(&source, &index), false)
        };
        let mut page = catalog::paginate(items, filter);
        page.stale = stale;
        Ok(page)
    }

    /// `GetMarketplaceItem` (§6).
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn get_marketplace_item(&self, kind: Kind, id: &str) -> Result<MarketplaceItem> {
        let index = self.load_index().await?;
        let pkg = index
            .find(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let item = catalog::derive_item(pkg).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if item.kind != kind {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        Ok(item)
    }

    /// `InstallIntent` (§4.7, §6).
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn install_intent(&self, kind: Kind, id: &str, version: Option<&str>) -> Result<IntentResponse> {
        let index = self.load_index().await?;
        let pkg = index
            .find(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let item = catalog::derive_item(pkg).ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if item.kind != kind {
            return Err(RegistryError::NotFound(id.to_string()));
        }

        let constraint = version.unwrap_or(">=0.0.0");
        let (record, manifest, _bytes, signature_summary) =
            install_engine::resolve_and_verify_manifest(&self.config, &self.http_client, &self.trusted_keys, pkg, constraint)
                .await?;

        let current_tier = { self.state.read().await.current_tier };
        let (permissions, tier_summary) = install_engine::build_preview(&manifest, &record, current_tier);

        let publisher = Publisher {
            name: item.publisher.name.clone(),
            key_id: item.publisher.key_id.clone(),
            verified: item.publisher.verified,
        };

        let entry = IntentEntry {
            kind,
            id: id.to_string(),
            resolved_version: record.version.clone(),
            manifest_summary: format!("{}@{}", manifest.id, manifest.version),
            permissions_summary: permissions,
            signature_summary,
            publisher,
            tier_summary,
            expires_at: Utc::now() + chrono::Duration::from_std(self.config.intent_ttl).unwrap_or(chrono::Duration::minutes(10)),
        };

        let key = intent_table::mint_key();
        {
            let mut state = self.state.write().await;
            state.intents.put(key.clone(), entry.clone());
        }

        Ok(IntentResponse { idempotency_key: key, entry })
    }

    /// `InstallMarketplace` (§4.7 steps 1-10, §6). `allow_upgrade` doubles
    /// as `UpdateMarketplace` when set to `true`.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self, idempotency_key, accepted_capabilities), fields(id = %id))]
    pub async fn install_marketplace(
        &self,
        kind: Kind,
        id: &str,
        version: &str,
        idempotency_key: &str,
        accepted_risk: bool,
        accepted_capabilities: &[String],
        allow_upgrade: bool,
    ) -> Result<InstalledConnector> {
        if id.is_empty() || version.is_empty() || idempotency_key.is_empty() {
            return Err(RegistryError::InvalidManifest("missing required install field".to_string()));
        }
        if !accepted_risk {
            return Err(RegistryError::RiskNotAccepted { id: id.to_string() });
        }

        let consumed = {
            let mut state = self.state.write().await;
            state.intents.consume(idempotency_key)
        };
        let intent = match consumed {
            Ok(entry) => entry,
            Err(ConsumeError::NotFound | ConsumeError::Expired) => {
                return Err(RegistryError::InvalidIdempotencyKey)
            }
        };

        if intent.kind != kind || intent.id != id || intent.resolved_version != version {
            return Err(RegistryError::IntentMismatch { id: id.to_string() });
        }
        if !intent.tier_summary.allowed {
            return Err(RegistryError::TierDenied {
                id: id.to_string(),
                required: intent.tier_summary.required.to_string(),
                current: intent.tier_summary.current.to_string(),
            });
        }
        let missing = intent
            .permissions_summary
            .required_capabilities
            .iter()
            .filter(|c| !accepted_capabilities.contains(c))
            .cloned()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(RegistryError::CapabilitiesNotAccepted { id: id.to_string(), missing });
        }

        let index = self.load_index().await?;
        let pkg = index
            .find(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let resolved =
            install_engine::resolve_pinned(&self.config, &self.http_client, &self.trusted_keys, pkg, version).await?;

        let existing_pinned = {
            let state = self.state.read().await;
            state.installed.get(id).map(|c| c.pinned_version.clone())
        };
        install_engine::check_pin(id, existing_pinned.as_deref(), &resolved.version_record.version, allow_upgrade)?;
        if allow_upgrade {
            install_engine::check_permission_drift(id, &resolved.manifest, accepted_capabilities)?;
        }

        let verified_by = verified_by_for(&resolved);
        let connector = InstalledConnector {
            id: id.to_string(),
            pinned_version: resolved.version_record.version.clone(),
            sha256: resolved.bundle_sha256.clone(),
            verified_by,
            manifest: resolved.manifest.clone(),
            accepted_capabilities: accepted_capabilities.to_vec(),
        };

        self.commit_install(connector, &resolved.bundle_bytes).await
    }

    /// `Install` (§4.7) — single-phase legacy path: no consent/tier checks,
    /// but still enforces signature verification and integrity.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn install(&self, id: &str, version_constraint: &str, allow_upgrade: bool) -> Result<InstalledConnector> {
        let index = self.load_index().await?;
        let pkg = index
            .find(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let record = crate::version::resolve(pkg, version_constraint)?.clone();
        let resolved =
            install_engine::resolve_pinned(&self.config, &self.http_client, &self.trusted_keys, pkg, &record.version).await?;

        let existing_pinned = {
            let state = self.state.read().await;
            state.installed.get(id).map(|c| c.pinned_version.clone())
        };
        install_engine::check_pin(id, existing_pinned.as_deref(), &resolved.version_record.version, allow_upgrade)?;

        let verified_by = verified_by_for(&resolved);
        let connector = InstalledConnector {
            id: id.to_string(),
            pinned_version: resolved.version_record.version.clone(),
            sha256: resolved.bundle_sha256.clone(),
            verified_by,
            manifest: resolved.manifest.clone(),
            accepted_capabilities: resolved.manifest.required_capabilities.clone(),
        };
        self.commit_install(connector, &resolved.bundle_bytes).await
    }

    /// `Upgrade` (§4.7) — shorthand for `install(id, ">=0.0.0", true)`.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn upgrade(&self, id: &str) -> Result<InstalledConnector> {
        self.install(id, ">=0.0.0", true).await
    }

    /// `Uninstall` (§6). Idempotent: removing an absent id still rewrites
    /// the lockfile (§4.7).
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn uninstall(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.installed.remove(id);
        let entries = lock_entries(&state.installed);
        drop(state);

        let dir = self.config.installed_root.join(id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        lockfile::save(&self.config.lockfile_path, entries)?;
        Ok(())
    }

    async fn commit_install(&self, connector: InstalledConnector, bundle_bytes: &[u8]) -> Result<InstalledConnector> {
        write_installed_artifacts(&self.config, &connector, bundle_bytes)?;

        let mut state = self.state.write().await;
        state.installed.insert(connector.id.clone(), connector.clone());
        let entries = lock_entries(&state.installed);
        drop(state);

        if let Err(e) = lockfile::save(&self.config.lockfile_path, entries) {
            let mut state = self.state.write().await;
            state.installed.remove(&connector.id);
            return Err(e);
        }

        Ok(connector)
    }

    async fn load_index(&self) -> Result<PackageIndex> {
        let source = self.index_source();
        let bytes = if source.contains("://") {
            match crate::fetcher::fetch_remote(&self.http_client, &source, crate::fetcher::MAX_MANIFEST_BYTES * 8, None).await? {
                crate::fetcher::FetchOutcome::Fresh { bytes, .. } => bytes,
                crate::fetcher::FetchOutcome::NotModified => {
                    return Err(RegistryError::FetchFailed {
                        url: source,
                        reason: "unexpected 304 on unconditional index fetch".to_string(),
                    })
                }
            }
        } else {
            crate::fetcher::fetch_local(&self.config.registry_root, "index.json", crate::fetcher::MAX_MANIFEST_BYTES * 8)?
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn index_source(&self) -> String {
        "index.json".to_string()
    }
}

fn verified_by_for(resolved: &ResolvedPackage) -> String {
    if resolved.signature_summary.verified {
        resolved.signature_summary.key_id.clone().unwrap_or_default()
    } else {
        InstalledConnector::UNSIGNED.to_string()
    }
}

fn lock_entries(installed: &std::collections::BTreeMap<String, InstalledConnector>) -> Vec<LockEntry> {
    installed
        .values()
        .map(|c| LockEntry {
            id: c.id.clone(),
            version: c.pinned_version.clone(),
            hash: c.sha256.clone(),
        })
        .collect()
}

fn write_installed_artifacts(config: &RegistryConfig, connector: &InstalledConnector, bundle_bytes: &[u8]) -> Result<()> {
    let dir = config.installed_root.join(&connector.id);
    std::fs::create_dir_all(&dir)?;
    let manifest_json = serde_json::to_vec_pretty(&connector.manifest)?;
    std::fs::write(dir.join("manifest.json"), manifest_json)?;
    std::fs::write(dir.join("bundle.tgz"), bundle_bytes)?;
    Ok(())
}

fn rehydrate(config: &RegistryConfig, entry: &LockEntry) -> Result<InstalledConnector> {
    let manifest_path = config.installed_root.join(&entry.id).join("manifest.json");
    let raw = std::fs::read(&manifest_path)?;
    let manifest = crate::manifest::parse(&raw)?;
    Ok(InstalledConnector {
        id: entry.id.clone(),
        pinned_version: entry.version.clone(),
        sha256: entry.hash.clone(),
        verified_by: InstalledConnector::FROM_LOCKFILE.to_string(),
        manifest,
        accepted_capabilities: Vec::new(),
    })
}
