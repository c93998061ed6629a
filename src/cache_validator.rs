//! Integrity wrapper for cached upstream response bodies.
//!
//! Each body is stored next to its SHA-256 digest and re-hashed on the way out.
//! A mismatch drops the entry and forces a fresh call to the gated content API.

use sha2::{Digest, Sha256};

/// A cached response body together with its checksum.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// Raw JSON body as returned upstream.
    pub body: String,
    /// Hex-encoded SHA-256 of `body`.
    pub checksum: String,
}

impl ValidatedCacheEntry {
    /// Wraps a body, computing its checksum.
    pub fn seal(body: String) -> Self {
        let checksum = Self::digest(&body);
        Self { body, checksum }
    }

    fn digest(body: &str) -> String {
        hex::encode(Sha256::digest(body.as_bytes()))
    }

    pub fn is_valid(&self) -> bool {
        Self::digest(&self.body) == self.checksum
    }

    /// Serialized form stored in the cache.
    pub fn to_cache_value(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parses a cached value and returns the body only if the checksum holds.
    pub fn open(cached: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(cached).ok()?;

        if entry.is_valid() {
            Some(entry.body)
        } else {
            tracing::warn!(
                "Cached upstream response failed checksum validation (expected {}, {} bytes)",
                entry.checksum,
                entry.body.len()
            );
            None
        }
    }
}
