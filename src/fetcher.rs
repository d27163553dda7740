//! Fetcher (C4, §4.4).
//!
//! Local reads are direct file reads relative to a registry root; remote
//! reads go through `reqwest` with TLS-only enforcement, a host denylist,
//! bounded reads, timeouts, and a small fixed retry/backoff schedule.
//! Follows the same client-builder-plus-tracing shape as the OData client
//! this codebase talks to elsewhere in the stack.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::{RegistryError, Result};

/// Per-call size caps (§4.4).
pub const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;
pub const MAX_BUNDLE_BYTES: u64 = 50 * 1024 * 1024;
pub const MAX_SIGNATURE_BYTES: u64 = 1024 * 1024;

const TIMEOUT: Duration = Duration::from_secs(8);
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_UNIT: Duration = Duration::from_millis(100);

const HOST_DENYLIST: &[&str] = &["localhost", "0.0.0.0", "127.0.0.1", "::1"];

/// Result of a conditional or unconditional fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fresh {
        bytes: Vec<u8>,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    NotModified,
}

/// Headers to forward on a conditional GET (§4.4 — catalog refresh).
#[derive(Debug, Clone, Default)]
pub struct ConditionalHeaders {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// Builds the shared HTTP client used for all remote fetches.
pub fn build_client(user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(TIMEOUT)
        .user_agent(user_agent.to_string())
        .build()
        .map_err(|e| RegistryError::FetchFailed {
            url: String::new(),
            reason: format!("failed to build http client: {e}"),
        })
}

/// Reads a local file relative to `root`, enforcing the same size cap
/// remote fetches use.
pub fn fetch_local(root: &Path, relative: &str, max_bytes: u64) -> Result<Vec<u8>> {
    let path = root.join(relative);
    let bytes = std::fs::read(&path)?;
    if bytes.len() as u64 > max_bytes {
        return Err(RegistryError::PayloadTooLarge {
            actual: bytes.len() as u64,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Rejects non-HTTPS schemes and denylisted hosts before any network call.
fn validate_remote_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| RegistryError::FetchFailed { url: url.to_string(), reason: e.to_string() })?;
    if parsed.scheme() != "https" {
        return Err(RegistryError::InsecureScheme(url.to_string()));
    }
    if let Some(host) = parsed.host_str() {
        if HOST_DENYLIST.contains(&host) {
            return Err(RegistryError::InsecureScheme(format!(
                "{url} resolves to a denylisted host ({host})"
            )));
        }
    }
    Ok(())
}

/// Fetches `url` over HTTPS with up to 3 attempts, 100ms × attempt backoff,
/// and a bounded read against `max_bytes`. Honors conditional GET headers
/// when provided and returns `NotModified` on a `304`.
pub async fn fetch_remote(
    client: &Client,
    url: &str,
    max_bytes: u64,
    conditional: Option<&ConditionalHeaders>,
) -> Result<FetchOutcome> {
    validate_remote_url(url)?;

    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match try_fetch_once(client, url, max_bytes, conditional).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => {
                tracing::debug!(url, attempt, error = %e, "fetch attempt failed");
                last_err = Some(e);
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(BACKOFF_UNIT * attempt).await;
                }
            }
        }
    }

    Err(RegistryError::FetchFailed {
        url: url.to_string(),
        reason: last_err.map(|e| e.to_string()).unwrap_or_default(),
    })
}

async fn try_fetch_once(
    client: &Client,
    url: &str,
    max_bytes: u64,
    conditional: Option<&ConditionalHeaders>,
) -> Result<FetchOutcome> {
    let mut req = client.get(url);
    if let Some(cond) = conditional {
        if let Some(etag) = &cond.if_none_match {
            req = req.header("If-None-Match", etag);
        }
        if let Some(ts) = &cond.if_modified_since {
            req = req.header("If-Modified-Since", ts);
        }
    }

    let response = req.send().await.map_err(|e| RegistryError::FetchFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if response.status() == StatusCode::NOT_MODIFIED {
        return Ok(FetchOutcome::NotModified);
    }

    if !response.status().is_success() {
        return Err(RegistryError::FetchFailed {
            url: url.to_string(),
            reason: format!("http status {}", response.status()),
        });
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(RegistryError::PayloadTooLarge { actual: len, limit: max_bytes });
        }
    }

    let etag = response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let last_modified = response
        .headers()
        .get("last-modified")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await.map_err(|e| RegistryError::FetchFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if bytes.len() as u64 > max_bytes {
        return Err(RegistryError::PayloadTooLarge {
            actual: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    Ok(FetchOutcome::Fresh {
        bytes: bytes.to_vec(),
        etag,
        last_modified,
    })
}

/// Best-effort mirror of fetched bundle bytes into the content cache
/// (§4.4). Failures are logged, never propagated.
pub fn mirror_to_cache(cache_root: &Path, sanitized_id: &str, version: &str, filename: &str, bytes: &[u8]) {
    let dir = cache_root.join(sanitized_id).join(version);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(?dir, error = %e, "failed to create cache directory");
        return;
    }
    if let Err(e) = std::fs::write(dir.join(filename), bytes) {
        tracing::warn!(?dir, filename, error = %e, "failed to mirror fetch to cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_https_scheme() {
        let err = validate_remote_url("http://example.com/index.json").unwrap_err();
        assert!(matches!(err, RegistryError::InsecureScheme(_)));
    }

    #[test]
    fn rejects_denylisted_localhost() {
        let err = validate_remote_url("https://localhost/index.json").unwrap_err();
        assert!(matches!(err, RegistryError::InsecureScheme(_)));
    }

    #[test]
    fn accepts_a_plain_https_url() {
        assert!(validate_remote_url("https://example.com/index.json").is_ok());
    }

    #[test]
    fn fetch_local_enforces_size_cap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 10]).unwrap();
        let err = fetch_local(dir.path(), "big.bin", 5).unwrap_err();
        assert!(matches!(err, RegistryError::PayloadTooLarge { .. }));
    }

    #[test]
    fn fetch_local_reads_within_cap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("small.bin"), b"hello").unwrap();
        let bytes = fetch_local(dir.path(), "small.bin", 1024).unwrap();
        assert_eq!(bytes, b"hello");
    }
}
