//! Centralized cryptographic operations: SHA-256 content hashing and
//! Ed25519 signature verification. All crypto in the crate should go
//! through here rather than reaching for the underlying crates directly.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of `input`.
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Encodes a 32-byte digest as lowercase hex (no prefix — the index and
/// manifest formats both use bare lowercase hex for `sha256`/`package_hash`).
pub fn hex_lower(bytes: [u8; 32]) -> String {
    hex::encode(bytes)
}

/// Validates that `s` is exactly 64 lowercase hex characters.
pub fn is_lower_hex_64(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Decodes a base64-encoded 32-byte Ed25519 public key.
pub fn decode_public_key(b64: &str) -> Result<VerifyingKey, String> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| format!("invalid base64 public key: {e}"))?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "public key must be exactly 32 bytes".to_string())?;
    VerifyingKey::from_bytes(&array).map_err(|e| format!("invalid ed25519 public key: {e}"))
}

/// Decodes a base64-encoded 64-byte Ed25519 signature.
pub fn decode_signature(b64: &str) -> Result<Signature, String> {
    let bytes = BASE64
        .decode(b64)
        .map_err(|e| format!("invalid base64 signature: {e}"))?;
    let array: [u8; 64] = bytes
        .try_into()
        .map_err(|_| "signature must be exactly 64 bytes".to_string())?;
    Ok(Signature::from_bytes(&array))
}

/// Verifies an Ed25519 signature over `message`. Returns `false` (never
/// panics) on any cryptographic mismatch.
pub fn ed25519_verify(key: &VerifyingKey, message: &[u8], sig: &Signature) -> bool {
    key.verify(message, sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn sha256_is_deterministic() {
        let a = sha256(b"hello world");
        let b = sha256(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn hex_lower_round_trips_with_is_lower_hex_64() {
        let digest = sha256(b"bundle contents");
        let hex = hex_lower(digest);
        assert!(is_lower_hex_64(&hex));
    }

    #[test]
    fn rejects_uppercase_or_wrong_length_hash() {
        assert!(!is_lower_hex_64("ABCD"));
        assert!(!is_lower_hex_64(&"a".repeat(63)));
        assert!(!is_lower_hex_64(&"A".repeat(64)));
    }

    #[test]
    fn ed25519_round_trip() {
        let sk = SigningKey::from_bytes(&[7u8; 32]);
        let vk = sk.verifying_key();
        let msg = b"manifest bytes";
        let sig = sk.sign(msg);
        assert!(ed25519_verify(&vk, msg, &sig));
        assert!(!ed25519_verify(&vk, b"tampered", &sig));
    }

    #[test]
    fn decode_public_key_rejects_wrong_length() {
        let short = BASE64.encode([1u8; 16]);
        assert!(decode_public_key(&short).is_err());
    }

    #[test]
    fn decode_signature_rejects_wrong_length() {
        let short = BASE64.encode([1u8; 10]);
        assert!(decode_signature(&short).is_err());
    }
}
