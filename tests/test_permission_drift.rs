//! End-to-end coverage of §8 scenario 5: upgrading an installed package
//! whose new version declares capabilities beyond what was previously
//! accepted must fail `capabilities-not-accepted`, even though the
//! version itself resolves and the signature verifies cleanly.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signer, SigningKey};
use tempfile::tempdir;

use reach_registry::model::Kind;
use reach_registry::{Registry, RegistryConfig, RegistryError};

fn write_version(root: &Path, sk: &SigningKey, version: &str, capabilities: &[&str]) -> String {
    let bundle = format!("bundle-contents-{version}").into_bytes();
    let bundle_hash = reach_registry::crypto::hex_lower(reach_registry::crypto::sha256(&bundle));
    let caps_json = capabilities
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(",");

    let manifest_json = format!(
        r#"{{"kind":"connector","id":"conn.github","version":"{version}","package_hash":"{bundle_hash}","required_capabilities":[{caps_json}],"risk_level":"low"}}"#
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

    bundle_hash
}

fn version_entry(version: &str, bundle_hash: &str) -> String {
    format!(
        r#"{{"version":"{version}","sha256":"{bundle_hash}","manifest_url":"conn.github/{version}/manifest.json","bundle_url":"conn.github/{version}/bundle.tgz","signature_url":"conn.github/{version}/manifest.sig","signature_key_id":"dev","risk_level":"low","tier_required":"none"}}"#
    )
}

#[tokio::test]
async fn upgrade_with_undeclared_new_capability_is_rejected() {
    let dir = tempdir().unwrap();
    let sk = SigningKey::from_bytes(&[11u8; 32]);

    let hash_1_0 = write_version(dir.path(), &sk, "1.0.0", &["filesystem:read"]);
    let trusted = format!(r#"{{"dev":"{}"}}"#, BASE64.encode(sk.verifying_key().to_bytes()));
    fs::write(dir.path().join("trusted_keys.json"), trusted).unwrap();
    let index = format!(
        r#"{{"packages":[{{"id":"conn.github","versions":[{}]}}]}}"#,
        version_entry("1.0.0", &hash_1_0)
    );
    fs::write(dir.path().join("index.json"), &index).unwrap();

    let registry = Registry::open(RegistryConfig::rooted_at(dir.path())).unwrap();

    let intent = registry
        .install_intent(Kind::Connector, "conn.github", None)
        .await
        .unwrap();
    let installed = registry
        .install_marketplace(
            Kind::Connector,
            "conn.github",
            "1.0.0",
            &intent.idempotency_key,
            true,
            &["filesystem:read".to_string()],
            false,
        )
        .await
        .unwrap();
    assert_eq!(installed.pinned_version, "1.0.0");

    // 1.1.0 adds network:outbound on top of the original filesystem:read.
    let hash_1_1 = write_version(dir.path(), &sk, "1.1.0", &["filesystem:read", "network:outbound"]);
    let index = format!(
        r#"{{"packages":[{{"id":"conn.github","versions":[{},{}]}}]}}"#,
        version_entry("1.0.0", &hash_1_0),
        version_entry("1.1.0", &hash_1_1)
    );
    fs::write(dir.path().join("index.json"), &index).unwrap();

    let upgrade_intent = registry
        .install_intent(Kind::Connector, "conn.github", Some(">=1.1.0"))
        .await
        .unwrap();
    assert_eq!(upgrade_intent.entry.resolved_version, "1.1.0");

    let err = registry
        .install_marketplace(
            Kind::Connector,
            "conn.github",
            "1.1.0",
            &upgrade_intent.idempotency_key,
            true,
            // Only re-accepting the capability already accepted for 1.0.0.
            &["filesystem:read".to_string()],
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::CapabilitiesNotAccepted { .. }));

    // The old pinned version is untouched by the rejected upgrade.
    let still_installed = registry.list_installed().await;
    assert_eq!(still_installed.len(), 1);
    assert_eq!(still_installed[0].pinned_version, "1.0.0");
}
