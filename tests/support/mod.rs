//! Shared helpers for pipeline integration tests

#![allow(dead_code)]

use repoaudit::cache::{CacheError, CacheKey, CacheStats, CacheStore, ResponseCache, StageKind};
use repoaudit::fs::RealFileSystem;
use repoaudit::pipeline::{BatchRunner, PipelineConfig, PipelineContext};
use repoaudit::MockInferenceClient;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Writes `files` (relative path, content) under a fresh temp dir
pub fn repo_with(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    for (path, content) in files {
        write_file(&root, path, content);
    }
    (dir, root)
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn config(max_files: usize) -> PipelineConfig {
    PipelineConfig::new()
        .with_max_files(max_files)
        .with_stage_timeout(Duration::from_secs(5))
        .with_sast(false)
}

/// Runner over the real file system with the given inference mock and cache
pub fn runner(
    inference: Arc<MockInferenceClient>,
    cache: ResponseCache,
    max_files: usize,
) -> BatchRunner {
    BatchRunner::new(PipelineContext::new(
        inference,
        cache,
        Arc::new(RealFileSystem),
        config(max_files),
    ))
}

/// A store whose every operation fails
pub struct BrokenStore;

impl CacheStore for BrokenStore {
    fn get(&self, _key: &CacheKey) -> Result<Option<Value>, CacheError> {
        Err(CacheError::Unavailable("store unavailable".to_string()))
    }

    fn set(&self, _key: &CacheKey, _value: &Value) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("store unavailable".to_string()))
    }

    fn clear(&self, _kind: Option<StageKind>) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("store unavailable".to_string()))
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        Err(CacheError::Unavailable("store unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "broken"
    }
}
