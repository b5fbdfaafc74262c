//! Progress handler trait and events

use crate::cache::StageKind;
use std::time::Duration;

/// Events emitted while a batch run makes progress
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started over `repo_path`
    RunStarted { repo_path: String, mode: RunMode },

    /// A file entered the pipeline (1-based `index` among attempted files)
    FileStarted { path: String, index: usize },

    /// A stage produced a result
    StageCompleted {
        path: String,
        stage: StageKind,
        cached: bool,
        duration: Duration,
    },

    /// A stage produced nothing for this file
    StageSkipped {
        path: String,
        stage: StageKind,
        reason: String,
    },

    /// A file left the pipeline
    FileCompleted {
        path: String,
        has_report: bool,
        duration: Duration,
    },

    /// The full-tree cap stopped the run; `next_cursor` resumes after it
    CapReached { cap: usize, next_cursor: String },

    /// Run finished
    RunCompleted {
        files_attempted: usize,
        reports: usize,
        total_time: Duration,
    },
}

/// Which batch entry point produced the events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    FullTree,
    Subset,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::FullTree => write!(f, "full-tree"),
            RunMode::Subset => write!(f, "subset"),
        }
    }
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_handler() {
        NoOpHandler.on_progress(&ProgressEvent::RunStarted {
            repo_path: "/test".to_string(),
            mode: RunMode::FullTree,
        });
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::RunStarted {
            repo_path: "/test".to_string(),
            mode: RunMode::Subset,
        });
        handler.on_progress(&ProgressEvent::StageCompleted {
            path: "a.py".to_string(),
            stage: StageKind::Metadata,
            cached: true,
            duration: Duration::from_millis(1),
        });
        handler.on_progress(&ProgressEvent::RunCompleted {
            files_attempted: 1,
            reports: 1,
            total_time: Duration::from_secs(1),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_run_mode_display() {
        assert_eq!(RunMode::FullTree.to_string(), "full-tree");
        assert_eq!(RunMode::Subset.to_string(), "subset");
    }
}
