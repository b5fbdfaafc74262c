//! Static-analysis findings spliced into report bundles
//!
//! An analyzer is an external tool run against a single file. Tools that are not
//! installed report [`SastError::Unavailable`]; files in languages the tool does
//! not handle are simply not applicable.

mod bandit;
pub mod parser;

pub use bandit::BanditAnalyzer;

use crate::discovery::FileRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// One issue reported by a static analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub issue: String,
    pub severity: String,
    pub confidence: String,
    pub cwe: String,
    pub cwe_url: String,
    pub more_info: String,
    pub location: String,
    pub line_number: Option<usize>,
    /// Source lines around `line_number`
    pub code_snippet: String,
}

impl Finding {
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issue: issue.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum SastError {
    #[error("Static analyzer '{tool}' is not installed")]
    Unavailable { tool: String },

    #[error("Static analyzer '{tool}' failed: {message}")]
    Failed { tool: String, message: String },

    #[error("Static analyzer '{tool}' timed out after {seconds} seconds")]
    Timeout { tool: String, seconds: u64 },
}

#[async_trait]
pub trait StaticAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether files with this (lowercased, dotted) extension can be analyzed
    fn applies_to(&self, extension: &str) -> bool;

    /// Runs the tool against `path`; `source` is the file content used for snippets
    async fn analyze(&self, path: &Path, source: &str) -> Result<Vec<Finding>, SastError>;
}

/// Findings for `record`, or `None` when the analyzer does not handle its language
pub async fn findings_for(
    analyzer: &dyn StaticAnalyzer,
    record: &FileRecord,
) -> Result<Option<Vec<Finding>>, SastError> {
    if !analyzer.applies_to(&record.extension) {
        return Ok(None);
    }
    analyzer
        .analyze(&record.path, &record.content)
        .await
        .map(Some)
}
