//! Pipeline context for managing dependencies

use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::discovery::ExtensionAllowList;
use crate::fs::FileSystem;
use crate::inference::InferenceClient;
use crate::progress::{NoOpHandler, ProgressHandler};
use crate::sast::StaticAnalyzer;

use super::config::PipelineConfig;

/// Context that owns all long-lived pipeline dependencies
///
/// Everything a run touches outside its own state is reachable from here, so
/// tests can swap the inference service, cache store and file system.
pub struct PipelineContext {
    /// Inference service answering the three stages
    pub inference: Arc<dyn InferenceClient>,

    /// Content-addressed response cache
    pub cache: ResponseCache,

    /// Optional static analyzer for report bundles
    pub static_analyzer: Option<Arc<dyn StaticAnalyzer>>,

    /// Reads related files while bundling
    pub file_system: Arc<dyn FileSystem>,

    /// Which files are analysed at all
    pub allow_list: ExtensionAllowList,

    /// Pipeline configuration
    pub config: PipelineConfig,

    /// Receives run/file/stage events
    pub progress: Arc<dyn ProgressHandler>,
}

impl PipelineContext {
    /// Create a context with the default allow-list, no static analyzer and no progress output
    pub fn new(
        inference: Arc<dyn InferenceClient>,
        cache: ResponseCache,
        file_system: Arc<dyn FileSystem>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            inference,
            cache,
            static_analyzer: None,
            file_system,
            allow_list: ExtensionAllowList::default(),
            config,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_static_analyzer(mut self, analyzer: Arc<dyn StaticAnalyzer>) -> Self {
        self.static_analyzer = Some(analyzer);
        self
    }

    pub fn with_allow_list(mut self, allow_list: ExtensionAllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// The analyzer to use, honouring `sast_enabled`
    pub fn active_analyzer(&self) -> Option<&Arc<dyn StaticAnalyzer>> {
        if !self.config.sast_enabled {
            return None;
        }
        self.static_analyzer.as_ref()
    }
}
