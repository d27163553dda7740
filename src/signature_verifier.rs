//! Signature verifier (C3, §4.3).

use crate::crypto;
use crate::keys::TrustedKeys;
use crate::model::signature::{SignatureEnvelope, SignatureSummary};

/// Verifies `manifest_bytes` against an optional detached signature.
///
/// `expected_key_id` is the index's `signature_key_id`, when present —
/// a mismatch against the envelope's own key id is rejected before any
/// cryptographic work happens. `allow_unsigned` is the process-wide
/// dev-mode bypass predicate (§4.3); it never causes a signed-but-invalid
/// signature to be accepted, only a missing one.
pub fn verify(
    manifest_bytes: &[u8],
    envelope: Option<&SignatureEnvelope>,
    trusted: &TrustedKeys,
    expected_key_id: Option<&str>,
    allow_unsigned: bool,
) -> SignatureSummary {
    let envelope = match envelope {
        Some(e) => e,
        None => {
            return if allow_unsigned {
                SignatureSummary::unsigned_dev_mode()
            } else {
                SignatureSummary::failed("signature-required")
            };
        }
    };

    if !envelope.is_ed25519() {
        return SignatureSummary::failed("unsupported-algorithm");
    }

    if let Some(expected) = expected_key_id {
        if !expected.is_empty() && expected != envelope.key_id {
            return SignatureSummary::failed("key-mismatch");
        }
    }

    let key = match trusted.get(&envelope.key_id) {
        Some(k) => k,
        None => return SignatureSummary::untrusted_key(envelope.key_id.clone()),
    };

    let sig = match crypto::decode_signature(&envelope.signature) {
        Ok(s) => s,
        Err(_) => return SignatureSummary::failed("verification-failed"),
    };

    if crypto::ed25519_verify(key, manifest_bytes, &sig) {
        SignatureSummary::verified(envelope.key_id.clone())
    } else {
        SignatureSummary::failed("verification-failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use ed25519_dalek::{Signer, SigningKey};

    fn trusted_with(key_id: &str, sk: &SigningKey) -> TrustedKeys {
        let raw = format!(
            r#"{{"{}": "{}"}}"#,
            key_id,
            BASE64.encode(sk.verifying_key().to_bytes())
        );
        TrustedKeys::parse(&raw).unwrap()
    }

    fn envelope_for(key_id: &str, sk: &SigningKey, msg: &[u8]) -> SignatureEnvelope {
        let sig = sk.sign(msg);
        SignatureEnvelope {
            key_id: key_id.to_string(),
            algorithm: "ed25519".to_string(),
            signature: BASE64.encode(sig.to_bytes()),
        }
    }

    #[test]
    fn missing_signature_without_dev_mode_fails_required() {
        let trusted = TrustedKeys::default();
        let summary = verify(b"manifest", None, &trusted, None, false);
        assert_eq!(summary.status, "signature-required");
        assert!(!summary.verified);
    }

    #[test]
    fn missing_signature_with_dev_mode_is_unsigned_but_not_blocking() {
        let trusted = TrustedKeys::default();
        let summary = verify(b"manifest", None, &trusted, None, true);
        assert!(!summary.signed);
        assert!(!summary.verified);
        assert_eq!(summary.status, "unsigned (dev mode allowed)");
    }

    #[test]
    fn valid_signature_from_trusted_key_verifies() {
        let sk = SigningKey::from_bytes(&[3u8; 32]);
        let trusted = trusted_with("dev", &sk);
        let msg = b"manifest bytes";
        let env = envelope_for("dev", &sk, msg);
        let summary = verify(msg, Some(&env), &trusted, None, false);
        assert!(summary.verified);
        assert_eq!(summary.key_id.as_deref(), Some("dev"));
    }

    #[test]
    fn untrusted_key_id_fails() {
        let sk = SigningKey::from_bytes(&[4u8; 32]);
        let trusted = TrustedKeys::default();
        let msg = b"manifest bytes";
        let env = envelope_for("unknown", &sk, msg);
        let summary = verify(msg, Some(&env), &trusted, None, false);
        assert_eq!(summary.status, "untrusted-key");
    }

    #[test]
    fn tampered_message_fails_verification() {
        let sk = SigningKey::from_bytes(&[5u8; 32]);
        let trusted = trusted_with("dev", &sk);
        let env = envelope_for("dev", &sk, b"original");
        let summary = verify(b"tampered", Some(&env), &trusted, None, false);
        assert_eq!(summary.status, "verification-failed");
    }

    #[test]
    fn expected_key_id_mismatch_is_rejected_before_crypto() {
        let sk = SigningKey::from_bytes(&[6u8; 32]);
        let trusted = trusted_with("dev", &sk);
        let msg = b"manifest bytes";
        let env = envelope_for("dev", &sk, msg);
        let summary = verify(msg, Some(&env), &trusted, Some("someone-else"), false);
        assert_eq!(summary.status, "key-mismatch");
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let env = SignatureEnvelope {
            key_id: "dev".to_string(),
            algorithm: "rsa".to_string(),
            signature: "AAAA".to_string(),
        };
        let trusted = TrustedKeys::default();
        let summary = verify(b"manifest", Some(&env), &trusted, None, false);
        assert_eq!(summary.status, "unsupported-algorithm");
    }
}
