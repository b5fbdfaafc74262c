//! Bandit (Python) static analyzer adapter

use super::parser::parse_report;
use super::{Finding, SastError, StaticAnalyzer};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_BINARY: &str = "bandit";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Runs `bandit -f txt <file>` and parses its text report
pub struct BanditAnalyzer {
    binary: PathBuf,
    snippet_radius: usize,
    timeout: Duration,
}

impl BanditAnalyzer {
    pub fn new(snippet_radius: usize) -> Self {
        Self::with_binary(DEFAULT_BINARY, snippet_radius)
    }

    pub fn with_binary(binary: impl Into<PathBuf>, snippet_radius: usize) -> Self {
        Self {
            binary: binary.into(),
            snippet_radius,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn tool_name(&self) -> String {
        self.binary.display().to_string()
    }
}

#[async_trait]
impl StaticAnalyzer for BanditAnalyzer {
    fn name(&self) -> &str {
        "bandit"
    }

    fn applies_to(&self, extension: &str) -> bool {
        extension.eq_ignore_ascii_case(".py")
    }

    async fn analyze(&self, path: &Path, source: &str) -> Result<Vec<Finding>, SastError> {
        debug!(path = %path.display(), "Running bandit");

        let mut command = Command::new(&self.binary);
        command
            .arg("-f")
            .arg("txt")
            .arg(path)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(SastError::Timeout {
                    tool: self.tool_name(),
                    seconds: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(SastError::Unavailable {
                    tool: self.tool_name(),
                })
            }
            Ok(Err(e)) => {
                return Err(SastError::Failed {
                    tool: self.tool_name(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        // 0 = clean, 1 = issues found; anything else is a tool failure
        match output.status.code() {
            Some(0) | Some(1) => {}
            code => {
                return Err(SastError::Failed {
                    tool: self.tool_name(),
                    message: format!(
                        "exit status {:?}: {}",
                        code,
                        String::from_utf8_lossy(&output.stderr).trim()
                    ),
                })
            }
        }

        let report = String::from_utf8_lossy(&output.stdout);
        let findings = parse_report(&report, source, self.snippet_radius);
        debug!(path = %path.display(), findings = findings.len(), "Bandit finished");
        Ok(findings)
    }
}
