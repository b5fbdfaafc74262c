use crate::cache::StageKind;
use crate::error::BackendError;
use crate::inference::RepoAnalysisMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// One file's result in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Repository-relative path
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// `None` when the report stage was reached but produced nothing
    pub report: Option<Value>,
}

impl ReportEntry {
    pub fn has_report(&self) -> bool {
        self.report.is_some()
    }
}

/// How a stage ended for one file
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// Served from the cache
    Cached(T),
    /// Computed by the inference service and written to the cache
    Fresh(T),
    /// No result; downstream stages do not run
    Skipped(BackendError),
}

impl<T> StageOutcome<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            StageOutcome::Cached(value) | StageOutcome::Fresh(value) => Some(value),
            StageOutcome::Skipped(_) => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, StageOutcome::Cached(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StageOutcome::Skipped(_))
    }
}

/// Counters collected over one run
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Files yielded by discovery or requested in a subset
    pub files_discovered: usize,
    /// Files that entered the pipeline
    pub files_attempted: usize,
    /// Entries with a non-null report
    pub reports: usize,
    pub cache_hits: BTreeMap<StageKind, usize>,
    pub cache_misses: BTreeMap<StageKind, usize>,
    pub stages_skipped: BTreeMap<StageKind, usize>,
    /// Requests sent to the inference service
    pub collaborator_calls: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn start() -> Self {
        Self {
            files_discovered: 0,
            files_attempted: 0,
            reports: 0,
            cache_hits: BTreeMap::new(),
            cache_misses: BTreeMap::new(),
            stages_skipped: BTreeMap::new(),
            collaborator_calls: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_hit(&mut self, stage: StageKind) {
        *self.cache_hits.entry(stage).or_default() += 1;
    }

    pub fn record_miss(&mut self, stage: StageKind) {
        *self.cache_misses.entry(stage).or_default() += 1;
    }

    pub fn record_skip(&mut self, stage: StageKind) {
        *self.stages_skipped.entry(stage).or_default() += 1;
    }

    pub fn total_hits(&self) -> usize {
        self.cache_hits.values().sum()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

/// Everything a batch run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub reports: Vec<ReportEntry>,
    pub analysis_map: RepoAnalysisMap,
    /// Set when the cap stopped a full-tree run; pass back as `resume_after`
    pub next_cursor: Option<String>,
    pub stats: RunStats,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Repository path does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Repository path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}
