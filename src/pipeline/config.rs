use std::time::Duration;

pub const DEFAULT_MAX_FILES: usize = 5;
pub const DEFAULT_SNIPPET_RADIUS: usize = 3;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Full-tree runs stop once this many files have a report
    pub max_files: usize,
    /// Upper bound on each collaborator call
    pub stage_timeout: Duration,
    /// Lines of context on each side of a static finding
    pub snippet_radius: usize,
    pub sast_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            stage_timeout: Duration::from_secs(300),
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
            sast_enabled: true,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = stage_timeout;
        self
    }

    pub fn with_snippet_radius(mut self, snippet_radius: usize) -> Self {
        self.snippet_radius = snippet_radius;
        self
    }

    pub fn with_sast(mut self, enabled: bool) -> Self {
        self.sast_enabled = enabled;
        self
    }
}
