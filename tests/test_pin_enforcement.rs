//! End-to-end coverage of §8 scenario 4: once a package is installed at a
//! version, re-resolving it through the legacy single-phase path must
//! reject any attempt to land on a different version without
//! `allow_upgrade`, and must reject a constraint the index can't satisfy
//! at all.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signer, SigningKey};
use tempfile::tempdir;

use reach_registry::{Registry, RegistryConfig, RegistryError};

fn write_version(root: &Path, sk: &SigningKey, version: &str) -> (String, String) {
    let bundle = format!("bundle-contents-{version}").into_bytes();
    let bundle_hash = reach_registry::crypto::hex_lower(reach_registry::crypto::sha256(&bundle));

    let manifest_json = format!(
        r#"{{"kind":"connector","id":"conn.github","version":"{version}","package_hash":"{bundle_hash}","required_capabilities":["filesystem:read"],"risk_level":"low"}}"#
    );
    let dir = root.join(format!("conn.github/{version}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("manifest.json"), &manifest_json).unwrap();
    fs::write(dir.join("bundle.tgz"), &bundle).unwrap();

    let sig = sk.sign(manifest_json.as_bytes());
    let sig_json = format!(
        r#"{{"key_id":"dev","algorithm":"ed25519","signature":"{}"}}"#,
        BASE64.encode(sig.to_bytes())
    );
    fs::write(dir.join("manifest.sig"), &sig_json).unwrap();

    (bundle_hash, manifest_json)
}

fn version_entry(version: &str, bundle_hash: &str) -> String {
    format!(
        r#"{{"version":"{version}","sha256":"{bundle_hash}","manifest_url":"conn.github/{version}/manifest.json","bundle_url":"conn.github/{version}/bundle.tgz","signature_url":"conn.github/{version}/manifest.sig","signature_key_id":"dev","risk_level":"low","tier_required":"none"}}"#
    )
}

fn write_trusted_keys(root: &Path, sk: &SigningKey) {
    let trusted = format!(r#"{{"dev":"{}"}}"#, BASE64.encode(sk.verifying_key().to_bytes()));
    fs::write(root.join("trusted_keys.json"), trusted).unwrap();
}

#[tokio::test]
async fn pin_mismatch_rejects_upgrade_without_allow_upgrade_flag() {
    let dir = tempdir().unwrap();
    let sk = SigningKey::from_bytes(&[7u8; 32]);

    let (hash_1_0, _) = write_version(dir.path(), &sk, "1.0.0");
    write_trusted_keys(dir.path(), &sk);
    let index = format!(
        r#"{{"packages":[{{"id":"conn.github","versions":[{}]}}]}}"#,
        version_entry("1.0.0", &hash_1_0)
    );
    fs::write(dir.path().join("index.json"), &index).unwrap();

    let registry = Registry::open(RegistryConfig::rooted_at(dir.path())).unwrap();
    let installed = registry.install("conn.github", ">=0.0.0", false).await.unwrap();
    assert_eq!(installed.pinned_version, "1.0.0");

    // Index still only offers 1.0.0: a disjoint constraint fails to resolve at all.
    let not_found = registry
        .install("conn.github", ">=2.0.0", false)
        .await
        .unwrap_err();
    assert!(matches!(not_found, RegistryError::VersionNotFound { .. }));

    // Now the index grows a 2.0.0: it resolves, but the pin still blocks it.
    let (hash_2_0, _) = write_version(dir.path(), &sk, "2.0.0");
    let index = format!(
        r#"{{"packages":[{{"id":"conn.github","versions":[{},{}]}}]}}"#,
        version_entry("1.0.0", &hash_1_0),
        version_entry("2.0.0", &hash_2_0)
    );
    fs::write(dir.path().join("index.json"), &index).unwrap();

    let pin_mismatch = registry
        .install("conn.github", ">=2.0.0", false)
        .await
        .unwrap_err();
    assert!(matches!(pin_mismatch, RegistryError::PinMismatch { .. }));

    // State is untouched by either failed attempt.
    let still_installed = registry.list_installed().await;
    assert_eq!(still_installed.len(), 1);
    assert_eq!(still_installed[0].pinned_version, "1.0.0");

    // With allow_upgrade the same constraint now succeeds.
    let upgraded = registry.install("conn.github", ">=2.0.0", true).await.unwrap();
    assert_eq!(upgraded.pinned_version, "2.0.0");
}
