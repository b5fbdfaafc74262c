//! Content fingerprints used as cache key material

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 hex digest of raw file bytes
///
/// Two files with identical bytes share a digest no matter where they live in the
/// tree, and therefore share every cache entry keyed on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Digest over several inputs, each followed by a NUL separator so that
    /// `("ab", "c")` and `("a", "bc")` never collide.
    pub fn of_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
            hasher.update([0u8]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Accepts a 64-character lowercase hex string
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let valid = hex_str.len() == 64
            && hex_str
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(hex_str.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
