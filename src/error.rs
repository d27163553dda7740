//! Error taxonomy for reach-registry.
//!
//! One variant per kind named in the design's error handling section.
//! Uses `thiserror` for derive macros, same as the rest of the stack.

use thiserror::Error;

/// The single error type returned by every public operation.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("version not found: {id} does not satisfy {constraint}")]
    VersionNotFound { id: String, constraint: String },

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("hash mismatch for {id}@{version}: expected {expected}, got {actual}")]
    HashMismatch {
        id: String,
        version: String,
        expected: String,
        actual: String,
    },

    #[error("signature required for {id}@{version}")]
    SignatureRequired { id: String, version: String },

    #[error("signature invalid for {id}@{version}: {reason}")]
    SignatureInvalid {
        id: String,
        version: String,
        reason: String,
    },

    #[error("untrusted key: {key_id}")]
    UntrustedKey { key_id: String },

    #[error("insecure scheme in url: {0}")]
    InsecureScheme(String),

    #[error("payload too large: {actual} bytes exceeds cap of {limit} bytes")]
    PayloadTooLarge { actual: u64, limit: u64 },

    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("invalid idempotency key")]
    InvalidIdempotencyKey,

    #[error("intent mismatch: snapshot does not match request for {id}")]
    IntentMismatch { id: String },

    #[error("risk not accepted for {id}")]
    RiskNotAccepted { id: String },

    #[error("capabilities not accepted for {id}: missing {missing:?}")]
    CapabilitiesNotAccepted { id: String, missing: Vec<String> },

    #[error("tier denied for {id}: requires {required}, current is {current}")]
    TierDenied {
        id: String,
        required: String,
        current: String,
    },

    #[error("pin mismatch for {id}: pinned at {pinned}, resolved {resolved}")]
    PinMismatch {
        id: String,
        pinned: String,
        resolved: String,
    },

    #[error("permission drift for {id}: new capabilities {new_caps:?} exceed accepted set")]
    PermissionDrift { id: String, new_caps: Vec<String> },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;
