//! Output formatting for multiple formats
//!
//! Run outcomes, configuration, cache statistics and health checks each render as JSON,
//! YAML or human-readable text.
//!
//! # Example
//!
//! ```ignore
//! use repoaudit::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! let output = formatter.format_outcome(&outcome, false)?;
//! println!("{}", output);
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

use crate::cache::{CacheStats, StageKind};
use crate::config::RepoauditConfig;
use crate::pipeline::RunOutcome;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a run outcome; the analysis map is only included on request
    pub fn format_outcome(&self, outcome: &RunOutcome, include_map: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&outcome_view(outcome, include_map))
                .context("Failed to serialize run outcome to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&outcome_view(outcome, include_map))
                .context("Failed to serialize run outcome to YAML"),
            OutputFormat::Human => self.format_outcome_human(outcome),
        }
    }

    pub fn format_config(&self, config: &RepoauditConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config.to_display_map())
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&config.to_display_map())
                .context("Failed to serialize config to YAML"),
            OutputFormat::Human => Ok(self.format_config_human(config)),
        }
    }

    pub fn format_cache_stats(&self, stats: &CacheStats, location: &Path) -> Result<String> {
        let view = json!({
            "location": location.display().to_string(),
            "entries": stats.entries,
            "total": stats.total(),
        });
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&view)
                .context("Failed to serialize cache stats to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&view).context("Failed to serialize cache stats to YAML")
            }
            OutputFormat::Human => Ok(self.format_cache_stats_human(stats, location)),
        }
    }

    pub fn format_health(&self, status: &HealthStatus) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(status)
                .context("Failed to serialize health status to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(status).context("Failed to serialize health status to YAML")
            }
            OutputFormat::Human => Ok(self.format_health_human(status)),
        }
    }

    fn format_outcome_human(&self, outcome: &RunOutcome) -> Result<String> {
        let mut output = String::new();

        output.push_str("Repository Audit\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        if outcome.reports.is_empty() {
            output.push_str("No files analysed.\n");
        }

        for entry in &outcome.reports {
            match &entry.report {
                Some(report) => {
                    output.push_str(&format!("\u{2713} {}\n", entry.file_path));
                    let rendered = serde_json::to_string_pretty(report)
                        .context("Failed to render report")?;
                    for line in rendered.lines() {
                        output.push_str("    ");
                        output.push_str(line);
                        output.push('\n');
                    }
                }
                None => {
                    output.push_str(&format!("\u{2717} {} (no report)\n", entry.file_path));
                }
            }
            output.push('\n');
        }

        let stats = &outcome.stats;
        output.push_str("Summary:\n");
        output.push_str(&format!(
            "\u{251C}\u{2500} Files attempted:  {}\n",
            stats.files_attempted
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Reports:          {}\n",
            stats.reports
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Cache hits:       {}\n",
            stats.total_hits()
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Service calls:    {}\n",
            stats.collaborator_calls
        ));
        let skipped: usize = stats.stages_skipped.values().sum();
        if skipped > 0 {
            let detail = stats
                .stages_skipped
                .iter()
                .map(|(stage, count)| format!("{} {}", count, stage))
                .collect::<Vec<_>>()
                .join(", ");
            output.push_str(&format!(
                "\u{251C}\u{2500} Skipped stages:   {} ({})\n",
                skipped, detail
            ));
        }
        match stats.finished_at {
            Some(finished) => {
                let elapsed = (finished - stats.started_at).num_milliseconds().max(0);
                output.push_str(&format!("\u{2514}\u{2500} Elapsed:          {}ms\n", elapsed));
            }
            None => output.push_str("\u{2514}\u{2500} Elapsed:          (running)\n"),
        }

        if let Some(cursor) = &outcome.next_cursor {
            output.push_str(&format!(
                "\n\u{26A0} Report cap reached. Continue with: --resume-after {}\n",
                cursor
            ));
        }

        Ok(output)
    }

    fn format_config_human(&self, config: &RepoauditConfig) -> String {
        let mut output = String::new();

        output.push_str("repoaudit Configuration\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        let map = config.to_display_map();
        let get = |key: &str| map.get(key).map(String::as_str).unwrap_or("-");

        output.push_str("Inference Service:\n");
        output.push_str(&format!("  URL: {}\n", get("inference_url")));
        output.push_str(&format!("  Timeout: {}s\n", get("request_timeout_secs")));

        output.push_str("\nCache:\n");
        output.push_str(&format!("  Enabled: {}\n", get("cache_enabled")));
        output.push_str(&format!("  Directory: {}\n", get("cache_dir")));

        output.push_str("\nAnalysis:\n");
        output.push_str(&format!("  Max Files: {}\n", get("max_files")));
        output.push_str(&format!("  Snippet Radius: {}\n", get("snippet_radius")));
        output.push_str(&format!("  SAST Enabled: {}\n", get("sast_enabled")));
        output.push_str(&format!("  Bandit Binary: {}\n", get("bandit_bin")));

        output.push_str("\nLogging:\n");
        output.push_str(&format!("  Level: {}\n", get("log_level")));

        output
    }

    fn format_cache_stats_human(&self, stats: &CacheStats, location: &Path) -> String {
        let mut output = String::new();

        output.push_str("Response Cache\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Location: {}\n\n", location.display()));

        for kind in StageKind::ALL {
            let count = stats.entries.get(&kind).copied().unwrap_or(0);
            output.push_str(&format!("  {:<22} {}\n", kind.as_str(), count));
        }
        output.push_str(&format!("\n  {:<22} {}\n", "total", stats.total()));

        output
    }

    fn format_health_human(&self, status: &HealthStatus) -> String {
        let mut output = String::new();

        output.push_str("Inference Service Health\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        let symbol = if status.available { "\u{2713}" } else { "\u{2717}" };
        output.push_str(&format!("{} {}\n", symbol, status.endpoint));
        output.push_str(&format!(
            "  Status: {}\n",
            if status.available {
                "Available"
            } else {
                "Unavailable"
            }
        ));
        output.push_str(&format!("  Message: {}\n", status.message));
        if let Some(details) = &status.details {
            output.push_str(&format!("  Details: {}\n", details));
        }

        output
    }
}

fn outcome_view(outcome: &RunOutcome, include_map: bool) -> Value {
    let mut view = json!({
        "reports": outcome.reports,
        "nextCursor": outcome.next_cursor,
        "stats": outcome.stats,
    });
    if include_map {
        view["analysisMap"] = json!(outcome.analysis_map);
    }
    view
}

/// Health status of the inference service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub endpoint: String,
    pub available: bool,
    pub message: String,
    pub details: Option<String>,
}

impl HealthStatus {
    pub fn available(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            available: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn unavailable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            available: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
