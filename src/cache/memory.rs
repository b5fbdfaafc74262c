//! In-process cache store

use super::{CacheError, CacheKey, CacheStats, CacheStore, StageKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Keeps serialized JSON text in a map, mirroring what the file store persists
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> CacheError {
        CacheError::Unavailable("memory store lock poisoned".to_string())
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        entries
            .get(key)
            .map(|text| {
                serde_json::from_str(text).map_err(|source| CacheError::Corrupt {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn set(&self, key: &CacheKey, value: &Value) -> Result<(), CacheError> {
        let text = serde_json::to_string(value).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        self.entries
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(key.clone(), text);
        Ok(())
    }

    fn clear(&self, kind: Option<StageKind>) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let before = entries.len();
        match kind {
            Some(kind) => entries.retain(|key, _| key.kind != kind),
            None => entries.clear(),
        }
        Ok(before - entries.len())
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let mut stats = CacheStats::default();
        for key in entries.keys() {
            *stats.entries.entry(key.kind).or_insert(0) += 1;
        }
        Ok(stats)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
