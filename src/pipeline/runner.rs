use super::context::PipelineContext;
use super::controller::StageController;
use super::types::{PipelineError, ReportEntry, RunOutcome, RunStats};
use crate::discovery::{Discovery, FileRecord};
use crate::inference::{RepoAnalysisMap, ReportKind};
use crate::progress::{ProgressEvent, RunMode};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives the stage controller over a whole tree or an explicit file list
///
/// Files are processed one at a time, so a file's context request only ever sees
/// metadata for files already handled in this run.
pub struct BatchRunner {
    ctx: PipelineContext,
}

/// Mutable state threaded through one run
struct RunState {
    map: RepoAnalysisMap,
    reports: Vec<ReportEntry>,
    stats: RunStats,
    started: Instant,
}

impl RunState {
    fn new() -> Self {
        Self {
            map: RepoAnalysisMap::new(),
            reports: Vec::new(),
            stats: RunStats::start(),
            started: Instant::now(),
        }
    }
}

impl BatchRunner {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Analyses every eligible file under `root` in discovery order
    ///
    /// Stops once `max_files` files have a report. When `resume_after` is set,
    /// files up to and including that repository-relative path in walk order are
    /// skipped, whether or not the cursor file still exists.
    pub async fn run_full(
        &self,
        root: &Path,
        kind: &ReportKind,
        resume_after: Option<&str>,
    ) -> Result<RunOutcome, PipelineError> {
        self.check_root(root)?;
        info!("Starting full-tree analysis for: {}", root.display());
        self.emit(ProgressEvent::RunStarted {
            repo_path: root.display().to_string(),
            mode: RunMode::FullTree,
        });

        let controller = StageController::new(&self.ctx, root, kind);
        let cap = self.ctx.config.max_files;
        let mut state = RunState::new();
        let mut next_cursor = None;
        let resume_after = resume_after.map(Path::new);

        let files = Discovery::with_file_system(
            self.ctx.file_system.clone(),
            root,
            self.ctx.allow_list.clone(),
        );
        for record in files {
            state.stats.files_discovered += 1;

            // The cursor file may be gone, so compare positions in walk order
            if resume_after.is_some_and(|cursor| Path::new(&record.relative_path) <= cursor) {
                debug!(file = %record.relative_path, "Skipping (before resume cursor)");
                continue;
            }

            self.process(&controller, &record, &mut state).await;

            if state.stats.reports >= cap {
                info!("Reached cap of {} reported files", cap);
                self.emit(ProgressEvent::CapReached {
                    cap,
                    next_cursor: record.relative_path.clone(),
                });
                next_cursor = Some(record.relative_path);
                break;
            }
        }

        Ok(self.finish(state, next_cursor))
    }

    /// Analyses the listed repository-relative paths, with no cap
    ///
    /// Paths that do not exist, are outside the extension allow-list, or do not
    /// stay inside `root` are skipped.
    pub async fn run_subset<S: AsRef<str>>(
        &self,
        root: &Path,
        paths: &[S],
        kind: &ReportKind,
    ) -> Result<RunOutcome, PipelineError> {
        self.check_root(root)?;
        info!(
            "Starting subset analysis of {} file(s) in: {}",
            paths.len(),
            root.display()
        );
        self.emit(ProgressEvent::RunStarted {
            repo_path: root.display().to_string(),
            mode: RunMode::Subset,
        });

        let controller = StageController::new(&self.ctx, root, kind);
        let mut state = RunState::new();

        for raw in paths {
            let raw = raw.as_ref();
            state.stats.files_discovered += 1;

            let Some(record) = self.load(root, raw) else {
                continue;
            };
            self.process(&controller, &record, &mut state).await;
        }

        Ok(self.finish(state, None))
    }

    fn load(&self, root: &Path, raw: &str) -> Option<FileRecord> {
        let Some(path) = repository_path(root, raw) else {
            warn!(path = %raw, "Skipping (path is outside the repository)");
            return None;
        };
        let fs = self.ctx.file_system.as_ref();

        if !fs.is_file(&path) {
            warn!(path = %raw, "Skipping (file does not exist)");
            return None;
        }
        let Some(extension) = self.ctx.allow_list.match_path(&path) else {
            debug!(path = %raw, "Skipping (not a programming file)");
            return None;
        };

        match fs.read(&path) {
            Ok(bytes) => Some(FileRecord::from_bytes(root, &path, extension, &bytes)),
            Err(e) => {
                warn!(path = %raw, error = %e, "Skipping unreadable file");
                None
            }
        }
    }

    async fn process(
        &self,
        controller: &StageController<'_>,
        record: &FileRecord,
        state: &mut RunState,
    ) {
        state.stats.files_attempted += 1;
        let started = Instant::now();
        self.emit(ProgressEvent::FileStarted {
            path: record.relative_path.clone(),
            index: state.stats.files_attempted,
        });

        let entry = controller
            .process_file(record, &mut state.map, &mut state.stats)
            .await;

        let has_report = entry.as_ref().is_some_and(ReportEntry::has_report);
        if has_report {
            state.stats.reports += 1;
        }
        if let Some(entry) = entry {
            state.reports.push(entry);
        }

        self.emit(ProgressEvent::FileCompleted {
            path: record.relative_path.clone(),
            has_report,
            duration: started.elapsed(),
        });
    }

    fn finish(&self, mut state: RunState, next_cursor: Option<String>) -> RunOutcome {
        state.stats.finish();
        info!(
            "Analysis complete: {} report(s) from {} file(s)",
            state.stats.reports, state.stats.files_attempted
        );
        self.emit(ProgressEvent::RunCompleted {
            files_attempted: state.stats.files_attempted,
            reports: state.stats.reports,
            total_time: state.started.elapsed(),
        });

        RunOutcome {
            reports: state.reports,
            analysis_map: state.map,
            next_cursor,
            stats: state.stats,
        }
    }

    fn check_root(&self, root: &Path) -> Result<(), PipelineError> {
        let fs = self.ctx.file_system.as_ref();
        if !fs.exists(root) {
            return Err(PipelineError::RootNotFound(root.to_path_buf()));
        }
        if !fs.is_dir(root) {
            return Err(PipelineError::NotADirectory(root.to_path_buf()));
        }
        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        self.ctx.progress.on_progress(&event);
    }
}

/// Joins a repository-relative path onto `root`, folding `.` and `..`
///
/// Absolute paths and paths that climb above the root return `None`.
fn repository_path(root: &Path, raw: &str) -> Option<PathBuf> {
    let mut parts = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.into_iter().fold(root.to_path_buf(), |path, part| path.join(part)))
}
