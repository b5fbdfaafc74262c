//! Source-control collaborator
//!
//! Used by the `clone` and `commit` commands: fetch a repository, bring it up to date and list the
//! files touched by its latest commit so that only those are analysed.

mod git;

pub use git::GitCli;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScmError {
    #[error("{tool} is not installed or not on PATH")]
    Unavailable { tool: String },

    #[error("`{command}` failed: {message}")]
    Failed { command: String, message: String },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unexpected git output: {0}")]
    UnexpectedOutput(String),
}

/// HTTPS credentials; the token doubles as the password
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"***")
            .finish()
    }
}

/// Head commit of a checkout and the files it touched
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub committed_at: DateTime<Utc>,
    pub files: Vec<String>,
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn clone_repository(
        &self,
        url: &str,
        destination: &Path,
        credentials: Option<&Credentials>,
        branch: Option<&str>,
    ) -> Result<(), ScmError>;

    async fn pull_latest(
        &self,
        destination: &Path,
        credentials: Option<&Credentials>,
        branch: Option<&str>,
    ) -> Result<(), ScmError>;

    async fn latest_commit(
        &self,
        destination: &Path,
        branch: Option<&str>,
    ) -> Result<CommitInfo, ScmError>;

    /// Paths changed by the latest commit, relative to the repository root
    ///
    /// Diffs against the first parent, or against the empty tree for a root commit.
    async fn affected_files_of_latest_commit(
        &self,
        destination: &Path,
        branch: Option<&str>,
    ) -> Result<Vec<String>, ScmError> {
        Ok(self.latest_commit(destination, branch).await?.files)
    }
}
