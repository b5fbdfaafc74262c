//! On-disk cache store that survives process restarts

use super::{CacheError, CacheKey, CacheStats, CacheStore, ContentDigest, StageKind};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One JSON file per key, laid out as `<root>/<kind>/<hexdigest>.json`
pub struct FileCacheStore {
    root: PathBuf,
}

impl FileCacheStore {
    /// Opens (and creates if needed) a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| CacheError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: StageKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.kind_dir(key.kind)
            .join(format!("{}.json", key.digest.as_str()))
    }

    /// Lists the digests stored for `kind`, ignoring stray files
    fn digests(&self, kind: StageKind) -> Result<Vec<ContentDigest>, CacheError> {
        let dir = self.kind_dir(kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(CacheError::Io { path: dir, source }),
        };

        let mut digests = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(digest) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(ContentDigest::from_hex)
            {
                digests.push(digest);
            }
        }
        Ok(digests)
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let path = self.entry_path(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn set(&self, key: &CacheKey, value: &Value) -> Result<(), CacheError> {
        let dir = self.kind_dir(key.kind);
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;

        let contents = serde_json::to_string(value).map_err(|source| CacheError::Corrupt {
            key: key.to_string(),
            source,
        })?;

        // Readers only ever see a complete file; concurrent writers race on the rename.
        let path = self.entry_path(key);
        let tmp = dir.join(format!(
            "{}.{}.tmp",
            key.digest.as_str(),
            uuid::Uuid::new_v4().simple()
        ));
        fs::write(&tmp, contents).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            CacheError::Io {
                path: path.clone(),
                source,
            }
        })?;

        debug!(key = %key, path = %path.display(), "Cache entry written");
        Ok(())
    }

    fn clear(&self, kind: Option<StageKind>) -> Result<usize, CacheError> {
        let kinds: Vec<StageKind> = match kind {
            Some(kind) => vec![kind],
            None => StageKind::ALL.to_vec(),
        };

        let mut removed = 0;
        for kind in kinds {
            for digest in self.digests(kind)? {
                let path = self.entry_path(&CacheKey::new(kind, digest));
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(source) => return Err(CacheError::Io { path, source }),
                }
            }
        }
        Ok(removed)
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for kind in StageKind::ALL {
            let count = self.digests(kind)?.len();
            if count > 0 {
                stats.entries.insert(kind, count);
            }
        }
        Ok(stats)
    }

    fn name(&self) -> &str {
        "file"
    }
}
