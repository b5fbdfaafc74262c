//! Content-addressable cache for stage results
//!
//! Keys are `(kind, digest)` pairs rendered as `"<kind>:<hexdigest>"`; values are
//! UTF-8 JSON. There is no expiry and no schema version: changing the shape of a
//! stage's response requires a flush or a new kind name.

mod digest;
mod file;
mod memory;

pub use digest::ContentDigest;
pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Cache namespace, one per cacheable stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Metadata,
    Context,
    ReportVulnerability,
    ReportCompliance,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Metadata,
        StageKind::Context,
        StageKind::ReportVulnerability,
        StageKind::ReportCompliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Metadata => "metadata",
            StageKind::Context => "context",
            StageKind::ReportVulnerability => "report_vulnerability",
            StageKind::ReportCompliance => "report_compliance",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid cache kind: {}. Valid options: metadata, context, report_vulnerability, report_compliance",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: StageKind,
    pub digest: ContentDigest,
}

impl CacheKey {
    pub fn new(kind: StageKind, digest: ContentDigest) -> Self {
        Self { kind, digest }
    }

    /// Parses the persisted `"<kind>:<hexdigest>"` form
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, hex) = s.split_once(':')?;
        Some(Self {
            kind: kind.parse().ok()?,
            digest: ContentDigest::from_hex(hex)?,
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.digest)
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache entry {key} is not valid JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
}

/// Number of stored entries per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: BTreeMap<StageKind, usize>,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.entries.values().sum()
    }
}

/// Backing key/value store
///
/// Implementations need no ordering or transactions. Concurrent writers to the same
/// key resolve last-writer-wins.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError>;

    fn set(&self, key: &CacheKey, value: &Value) -> Result<(), CacheError>;

    /// Removes every entry of `kind`, or everything when `kind` is `None`
    fn clear(&self, kind: Option<StageKind>) -> Result<usize, CacheError>;

    fn stats(&self) -> Result<CacheStats, CacheError>;

    fn name(&self) -> &str;
}

/// Cache handle used by the pipeline
///
/// Store failures never surface to callers: a failed read is a miss and a failed
/// write is logged and dropped. A disabled cache misses on every lookup.
#[derive(Clone)]
pub struct ResponseCache {
    store: Option<Arc<dyn CacheStore>>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let store = self.store.as_ref()?;
        match store.get(key) {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, store = store.name(), error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    pub fn set(&self, key: &CacheKey, value: &Value) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = store.set(key, value) {
            warn!(key = %key, store = store.name(), error = %e, "Cache write failed, continuing");
        }
    }

    pub fn store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}
