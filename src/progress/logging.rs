//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { repo_path, mode } => {
                info!(repo = %repo_path, mode = %mode, "Starting analysis run");
            }
            ProgressEvent::FileStarted { path, index } => {
                info!(file = %path, index, "Analyzing file");
            }
            ProgressEvent::StageCompleted {
                path,
                stage,
                cached,
                duration,
            } => {
                debug!(
                    file = %path,
                    stage = %stage,
                    cached,
                    duration_ms = duration.as_millis() as u64,
                    "Stage complete"
                );
            }
            ProgressEvent::StageSkipped {
                path,
                stage,
                reason,
            } => {
                warn!(file = %path, stage = %stage, reason = %reason, "Stage skipped");
            }
            ProgressEvent::FileCompleted {
                path,
                has_report,
                duration,
            } => {
                info!(
                    file = %path,
                    has_report,
                    duration_ms = duration.as_millis() as u64,
                    "File complete"
                );
            }
            ProgressEvent::CapReached { cap, next_cursor } => {
                info!(
                    cap,
                    next_cursor = %next_cursor,
                    "File cap reached; rerun with --resume-after to continue"
                );
            }
            ProgressEvent::RunCompleted {
                files_attempted,
                reports,
                total_time,
            } => {
                info!(
                    files = files_attempted,
                    reports,
                    total_time_ms = total_time.as_millis() as u64,
                    "Analysis run complete"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StageKind;
    use crate::progress::RunMode;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::RunStarted {
                repo_path: "/test".to_string(),
                mode: RunMode::FullTree,
            },
            ProgressEvent::FileStarted {
                path: "a.py".to_string(),
                index: 1,
            },
            ProgressEvent::StageCompleted {
                path: "a.py".to_string(),
                stage: StageKind::Context,
                cached: false,
                duration: Duration::from_millis(10),
            },
            ProgressEvent::StageSkipped {
                path: "a.py".to_string(),
                stage: StageKind::ReportVulnerability,
                reason: "timeout".to_string(),
            },
            ProgressEvent::FileCompleted {
                path: "a.py".to_string(),
                has_report: false,
                duration: Duration::from_millis(30),
            },
            ProgressEvent::CapReached {
                cap: 5,
                next_cursor: "src/e.py".to_string(),
            },
            ProgressEvent::RunCompleted {
                files_attempted: 1,
                reports: 0,
                total_time: Duration::from_secs(1),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
