//! Install engine (C7, §4.7).
//!
//! Holds the resolve→fetch→parse→verify pipeline shared by `install-intent`,
//! `complete-install`, and the legacy single-phase `install`/`upgrade`
//! calls, plus the pin-enforcement and permission-drift checks. The
//! two-phase state machine itself (intent minting, consent checks, the
//! installed map, and the exclusive lock) lives one layer up in
//! `crate::registry`, which is the only thing that touches shared state.

use crate::config::RegistryConfig;
use crate::crypto;
use crate::error::{RegistryError, Result};
use crate::fetcher::{self, FetchOutcome};
use crate::keys::TrustedKeys;
use crate::manifest;
use crate::model::index::{IndexPackage, VersionRecord};
use crate::model::intent::{PermissionsSummary, TierSummary};
use crate::model::manifest::Manifest;
use crate::model::signature::{SignatureEnvelope, SignatureSummary};
use crate::model::Tier;
use crate::signature_verifier;
use crate::version;

/// Everything gathered for one resolved package version, shared by the
/// intent preview and the pinned re-resolution at complete time.
pub struct ResolvedPackage {
    pub version_record: VersionRecord,
    pub manifest_bytes: Vec<u8>,
    pub manifest: Manifest,
    pub signature_summary: SignatureSummary,
    pub bundle_bytes: Vec<u8>,
    pub bundle_sha256: String,
}

/// Runs the C1→C4→C2→C3 pipeline against `constraint`, without hashing the
/// bundle (used for the intent preview, where the bundle itself is not
/// fetched — only manifest + signature, per §4.7 step 3).
pub async fn resolve_and_verify_manifest(
    config: &RegistryConfig,
    client: &reqwest::Client,
    trusted_keys: &TrustedKeys,
    pkg: &IndexPackage,
    constraint: &str,
) -> Result<(VersionRecord, Manifest, Vec<u8>, SignatureSummary)> {
    let record = version::resolve(pkg, constraint)?.clone();

    let manifest_bytes = fetch_blob(config, client, &record.manifest_url, fetcher::MAX_MANIFEST_BYTES).await?;
    let parsed = manifest::parse(&manifest_bytes)?;
    manifest::validate_matches(&parsed, &pkg.id, &record.version)?;

    let envelope = fetch_signature(config, client, &record).await?;
    let summary = signature_verifier::verify(
        &manifest_bytes,
        envelope.as_ref(),
        trusted_keys,
        record.signature_key_id.as_deref(),
        config.allow_unsigned,
    );

    Ok((record, parsed, manifest_bytes, summary))
}

/// Full pinned resolution used by `complete-install` (§4.7 step 7): fetches
/// manifest, signature, and bundle, verifies the signature in production
/// mode, and computes the bundle's SHA-256.
pub async fn resolve_pinned(
    config: &RegistryConfig,
    client: &reqwest::Client,
    trusted_keys: &TrustedKeys,
    pkg: &IndexPackage,
    exact_version: &str,
) -> Result<ResolvedPackage> {
    let (record, parsed, manifest_bytes, summary) =
        resolve_and_verify_manifest(config, client, trusted_keys, pkg, &format!("={exact_version}")).await?;

    if !config.allow_unsigned && !summary.is_production_acceptable() {
        return Err(match summary.status.as_str() {
            "signature-required" => RegistryError::SignatureRequired {
                id: pkg.id.clone(),
                version: record.version.clone(),
            },
            "untrusted-key" => RegistryError::UntrustedKey {
                key_id: summary.key_id.clone().unwrap_or_default(),
            },
            _ => RegistryError::SignatureInvalid {
                id: pkg.id.clone(),
                version: record.version.clone(),
                reason: summary.status.clone(),
            },
        });
    }

    let bundle_bytes = fetch_blob(config, client, &record.bundle_url, fetcher::MAX_BUNDLE_BYTES).await?;
    let bundle_sha256 = crypto::hex_lower(crypto::sha256(&bundle_bytes));

    if bundle_sha256 != record.sha256 {
        return Err(RegistryError::HashMismatch {
            id: pkg.id.clone(),
            version: record.version.clone(),
            expected: record.sha256.clone(),
            actual: bundle_sha256,
        });
    }
    if parsed.package_hash != record.sha256 {
        return Err(RegistryError::HashMismatch {
            id: pkg.id.clone(),
            version: record.version.clone(),
            expected: record.sha256.clone(),
            actual: parsed.package_hash.clone(),
        });
    }

    mirror_bundle(config, &pkg.id, &record.version, &bundle_bytes);

    Ok(ResolvedPackage {
        version_record: record,
        manifest_bytes,
        manifest: parsed,
        signature_summary: summary,
        bundle_bytes,
        bundle_sha256,
    })
}

fn mirror_bundle(config: &RegistryConfig, id: &str, version: &str, bytes: &[u8]) {
    let sanitized: String = id.chars().map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' }).collect();
    fetcher::mirror_to_cache(&config.cache_root, &sanitized, version, "bundle.tgz", bytes);
}

async fn fetch_blob(config: &RegistryConfig, client: &reqwest::Client, location: &str, max_bytes: u64) -> Result<Vec<u8>> {
    if location.contains("://") {
        match fetcher::fetch_remote(client, location, max_bytes, None).await? {
            FetchOutcome::Fresh { bytes, .. } => Ok(bytes),
            FetchOutcome::NotModified => Err(RegistryError::FetchFailed {
                url: location.to_string(),
                reason: "unexpected 304 on unconditional fetch".to_string(),
            }),
        }
    } else {
        fetcher::fetch_local(&config.registry_root, location, max_bytes)
    }
}

async fn fetch_signature(config: &RegistryConfig, client: &reqwest::Client, record: &VersionRecord) -> Result<Option<SignatureEnvelope>> {
    let Some(url) = &record.signature_url else {
        return Ok(None);
    };
    let bytes = fetch_blob(config, client, url, fetcher::MAX_SIGNATURE_BYTES).await?;
    let envelope: SignatureEnvelope = serde_json::from_slice(&bytes)
        .map_err(|e| RegistryError::InvalidManifest(format!("malformed signature envelope: {e}")))?;
    Ok(Some(envelope))
}

/// Builds the `permissions_summary`/`tier_summary` pair that goes into an
/// intent entry (§3, §4.7 steps 4-5). The publisher half of the preview is
/// already available on the derived catalog item, so it isn't recomputed here.
pub fn build_preview(manifest: &Manifest, record: &VersionRecord, current_tier: Tier) -> (PermissionsSummary, TierSummary) {
    let permissions = PermissionsSummary {
        required_capabilities: manifest.required_capabilities.clone(),
        side_effect_types: manifest.side_effect_types.clone(),
        risk_level: manifest.risk_level,
    };
    let tier = TierSummary::evaluate(record.tier_required, current_tier);
    (permissions, tier)
}

/// Pin enforcement (§4.7 step 9): reinstalling at a different version
/// without `allow_upgrade` is rejected outright.
pub fn check_pin(
    id: &str,
    installed_version: Option<&str>,
    resolved_version: &str,
    allow_upgrade: bool,
) -> Result<()> {
    if let Some(pinned) = installed_version {
        if !allow_upgrade && pinned != resolved_version {
            return Err(RegistryError::PinMismatch {
                id: id.to_string(),
                pinned: pinned.to_string(),
                resolved: resolved_version.to_string(),
            });
        }
    }
    Ok(())
}

/// Permission-drift check (§4.7 step 9): an upgrade's new required
/// capabilities must be a subset of what the user already accepted.
pub fn check_permission_drift(id: &str, manifest: &Manifest, previously_accepted: &[String]) -> Result<()> {
    if !manifest.capabilities_subset_of(previously_accepted) {
        return Err(RegistryError::PermissionDrift {
            id: id.to_string(),
            new_caps: manifest.missing_capabilities(previously_accepted),
        });
    }
    Ok(())
}
