//! `git` command-line adapter

use super::{CommitInfo, Credentials, ScmError, SourceControl};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

const DEFAULT_BINARY: &str = "git";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

pub struct GitCli {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_BINARY)
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Embeds credentials into an HTTPS URL
    ///
    /// Non-HTTP URLs (ssh, local paths) are returned unchanged.
    pub fn authenticated_url(url: &str, credentials: Option<&Credentials>) -> Result<String, ScmError> {
        let Some(creds) = credentials else {
            return Ok(url.to_string());
        };

        let mut parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) if !url.contains("://") => return Ok(url.to_string()),
            Err(e) => {
                return Err(ScmError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return Ok(url.to_string());
        }

        let invalid = |reason: &str| ScmError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        parsed
            .set_username(&creds.username)
            .map_err(|_| invalid("cannot carry a username"))?;
        parsed
            .set_password(Some(&creds.token))
            .map_err(|_| invalid("cannot carry a password"))?;

        Ok(parsed.to_string())
    }

    async fn run<I, S>(
        &self,
        cwd: Option<&Path>,
        args: I,
        credentials: Option<&Credentials>,
    ) -> Result<String, ScmError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args
            .into_iter()
            .map(|a| a.as_ref().to_os_string())
            .collect();
        let command_line = redact(
            &format!(
                "{} {}",
                self.binary.display(),
                args.iter()
                    .map(|a| a.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            credentials,
        );

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        debug!(command = %command_line, "Running git");

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(ScmError::Timeout {
                    command: command_line,
                    seconds: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ScmError::Unavailable {
                    tool: self.binary.display().to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(ScmError::Failed {
                    command: command_line,
                    message: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScmError::Failed {
                command: command_line,
                message: redact(stderr.trim(), credentials),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn current_branch(&self, destination: &Path) -> Result<String, ScmError> {
        let out = self
            .run(Some(destination), ["rev-parse", "--abbrev-ref", "HEAD"], None)
            .await?;
        Ok(out.trim().to_string())
    }

    async fn origin_url(&self, destination: &Path) -> Result<String, ScmError> {
        let out = self
            .run(Some(destination), ["remote", "get-url", "origin"], None)
            .await?;
        Ok(out.trim().to_string())
    }
}

fn redact(text: &str, credentials: Option<&Credentials>) -> String {
    match credentials {
        Some(creds) if !creds.token.is_empty() => text.replace(&creds.token, "***"),
        _ => text.to_string(),
    }
}

/// Parses `git show -s --format=%H%n%P%n%ct` output
fn parse_commit_header(output: &str) -> Result<(String, Option<String>, DateTime<Utc>), ScmError> {
    let mut lines = output.lines();
    let hash = lines
        .next()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ScmError::UnexpectedOutput(output.to_string()))?
        .to_string();
    let first_parent = lines
        .next()
        .and_then(|parents| parents.split_whitespace().next())
        .map(str::to_string);
    let committed_at = lines
        .next()
        .and_then(|ts| ts.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| ScmError::UnexpectedOutput(output.to_string()))?;

    Ok((hash, first_parent, committed_at))
}

/// Splits NUL-terminated `--name-only -z` output
fn parse_name_list(output: &str) -> Vec<String> {
    output
        .split('\0')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SourceControl for GitCli {
    async fn clone_repository(
        &self,
        url: &str,
        destination: &Path,
        credentials: Option<&Credentials>,
        branch: Option<&str>,
    ) -> Result<(), ScmError> {
        let remote = Self::authenticated_url(url, credentials)?;

        let mut args: Vec<&OsStr> = vec![OsStr::new("clone")];
        if let Some(branch) = branch {
            args.push(OsStr::new("--branch"));
            args.push(OsStr::new(branch));
        }
        args.push(OsStr::new(&remote));
        args.push(destination.as_os_str());

        self.run(None, args, credentials).await?;
        info!(url = %url, destination = %destination.display(), "Repository cloned");
        Ok(())
    }

    async fn pull_latest(
        &self,
        destination: &Path,
        credentials: Option<&Credentials>,
        branch: Option<&str>,
    ) -> Result<(), ScmError> {
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self.current_branch(destination).await?,
        };

        let remote = match credentials {
            Some(_) => {
                let origin = self.origin_url(destination).await?;
                Self::authenticated_url(&origin, credentials)?
            }
            None => "origin".to_string(),
        };

        self.run(
            Some(destination),
            ["pull", "--ff-only", remote.as_str(), branch.as_str()],
            credentials,
        )
        .await?;
        info!(destination = %destination.display(), branch = %branch, "Repository updated");
        Ok(())
    }

    async fn latest_commit(
        &self,
        destination: &Path,
        branch: Option<&str>,
    ) -> Result<CommitInfo, ScmError> {
        let rev = branch.unwrap_or("HEAD");
        let header = self
            .run(
                Some(destination),
                ["show", "-s", "--format=%H%n%P%n%ct", rev],
                None,
            )
            .await?;
        let (hash, first_parent, committed_at) = parse_commit_header(&header)?;

        let names = match &first_parent {
            Some(parent) => {
                self.run(
                    Some(destination),
                    [
                        "diff-tree",
                        "--no-commit-id",
                        "--name-only",
                        "-r",
                        "-z",
                        parent.as_str(),
                        hash.as_str(),
                    ],
                    None,
                )
                .await?
            }
            None => {
                self.run(
                    Some(destination),
                    [
                        "diff-tree",
                        "--no-commit-id",
                        "--name-only",
                        "-r",
                        "-z",
                        "--root",
                        hash.as_str(),
                    ],
                    None,
                )
                .await?
            }
        };

        let files = parse_name_list(&names);
        debug!(commit = %hash, files = files.len(), "Resolved latest commit");
        Ok(CommitInfo {
            hash,
            committed_at,
            files,
        })
    }
}
