//! Configuration management for repoaudit
//!
//! Settings are loaded from environment variables with sensible defaults, then
//! turned into the collaborators a pipeline run needs.
//!
//! # Environment Variables
//!
//! - `REPOAUDIT_INFERENCE_URL`: Inference service base URL - default: "http://localhost:8000"
//! - `REPOAUDIT_REQUEST_TIMEOUT`: Per-stage timeout in seconds - default: "300"
//! - `REPOAUDIT_CACHE_ENABLED`: Enable the response cache (true|false) - default: "true"
//! - `REPOAUDIT_CACHE_DIR`: Cache directory - default: platform cache dir + "repoaudit"
//! - `REPOAUDIT_MAX_FILES`: Reported-file cap for full-tree runs - default: "5"
//! - `REPOAUDIT_SNIPPET_RADIUS`: Lines around each static finding - default: "3"
//! - `REPOAUDIT_SAST_ENABLED`: Run the static analyzer on Python files - default: "true"
//! - `REPOAUDIT_BANDIT_BIN`: Static analyzer executable - default: "bandit"
//! - `REPOAUDIT_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use repoaudit::RepoauditConfig;
//!
//! let config = RepoauditConfig::default();
//! config.validate().expect("Invalid configuration");
//! let pipeline = config.pipeline_config();
//! ```

use crate::cache::{FileCacheStore, ResponseCache};
use crate::error::BackendError;
use crate::fs::RealFileSystem;
use crate::inference::{HttpInferenceClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::pipeline::config::{DEFAULT_MAX_FILES, DEFAULT_SNIPPET_RADIUS};
use crate::pipeline::{PipelineConfig, PipelineContext};
use crate::progress::ProgressHandler;
use crate::sast::BanditAnalyzer;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_CACHE_ENABLED: bool = true;
const DEFAULT_SAST_ENABLED: bool = true;
const DEFAULT_BANDIT_BIN: &str = "bandit";
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;
const MAX_FILES_LIMIT: usize = 10_000;
const MAX_SNIPPET_RADIUS: usize = 50;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Inference client could not be built
    #[error("Inference client initialization failed: {0}")]
    ClientInitError(#[from] BackendError),
}

#[derive(Debug, Clone)]
pub struct RepoauditConfig {
    /// Base URL of the inference service
    pub inference_url: String,

    /// Per-stage request timeout in seconds
    pub request_timeout_secs: u64,

    pub cache_enabled: bool,

    /// Where the file cache lives
    pub cache_dir: PathBuf,

    /// Reported-file cap for full-tree runs
    pub max_files: usize,

    /// Lines of context on each side of a static finding
    pub snippet_radius: usize,

    pub sast_enabled: bool,

    /// Static analyzer executable
    pub bandit_bin: PathBuf,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Platform cache directory, or the temp dir when there is none
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("repoaudit"))
        .unwrap_or_else(|| env::temp_dir().join("repoaudit-cache"))
}

impl Default for RepoauditConfig {
    /// Loads REPOAUDIT_* environment variables, falling back to defaults for
    /// anything missing or unparseable
    fn default() -> Self {
        let inference_url =
            env::var("REPOAUDIT_INFERENCE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let request_timeout_secs =
            env_parse("REPOAUDIT_REQUEST_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_SECS);

        let cache_enabled = env_parse("REPOAUDIT_CACHE_ENABLED").unwrap_or(DEFAULT_CACHE_ENABLED);

        let cache_dir = env::var("REPOAUDIT_CACHE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_dir);

        let max_files = env_parse("REPOAUDIT_MAX_FILES").unwrap_or(DEFAULT_MAX_FILES);
        let snippet_radius =
            env_parse("REPOAUDIT_SNIPPET_RADIUS").unwrap_or(DEFAULT_SNIPPET_RADIUS);
        let sast_enabled = env_parse("REPOAUDIT_SAST_ENABLED").unwrap_or(DEFAULT_SAST_ENABLED);

        let bandit_bin = env::var("REPOAUDIT_BANDIT_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BANDIT_BIN));

        let log_level = env::var("REPOAUDIT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            inference_url,
            request_timeout_secs,
            cache_enabled,
            cache_dir,
            max_files,
            snippet_radius,
            sast_enabled,
            bandit_bin,
            log_level,
        }
    }
}

impl RepoauditConfig {
    /// Checks ranges, URL scheme and log level
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.inference_url.starts_with("http://") && !self.inference_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Inference URL must start with http:// or https://: {}",
                self.inference_url
            )));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(format!(
                "Request timeout must be between 1 and {} seconds",
                MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        if self.max_files == 0 || self.max_files > MAX_FILES_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max files must be between 1 and {}",
                MAX_FILES_LIMIT
            )));
        }

        if self.snippet_radius > MAX_SNIPPET_RADIUS {
            return Err(ConfigError::ValidationFailed(format!(
                "Snippet radius cannot exceed {} lines",
                MAX_SNIPPET_RADIUS
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_max_files(self.max_files)
            .with_stage_timeout(self.request_timeout())
            .with_snippet_radius(self.snippet_radius)
            .with_sast(self.sast_enabled)
    }

    pub fn create_inference_client(&self) -> Result<Arc<HttpInferenceClient>, ConfigError> {
        let client = HttpInferenceClient::with_timeout(&self.inference_url, self.request_timeout())?;
        Ok(Arc::new(client))
    }

    /// Opens the file cache; an unusable cache directory disables caching for the run
    pub fn create_cache(&self) -> ResponseCache {
        if !self.cache_enabled {
            return ResponseCache::disabled();
        }
        match FileCacheStore::new(&self.cache_dir) {
            Ok(store) => ResponseCache::new(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "Cache directory unusable, continuing without cache");
                ResponseCache::disabled()
            }
        }
    }

    /// Wires every collaborator for a run against the real file system
    pub fn create_pipeline_context(
        &self,
        progress: Arc<dyn ProgressHandler>,
    ) -> Result<PipelineContext, ConfigError> {
        let context = PipelineContext::new(
            self.create_inference_client()?,
            self.create_cache(),
            Arc::new(RealFileSystem),
            self.pipeline_config(),
        )
        .with_static_analyzer(Arc::new(BanditAnalyzer::with_binary(
            &self.bandit_bin,
            self.snippet_radius,
        )))
        .with_progress(progress);

        Ok(context)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert("inference_url".to_string(), self.inference_url.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("cache_enabled".to_string(), self.cache_enabled.to_string());
        map.insert(
            "cache_dir".to_string(),
            self.cache_dir.display().to_string(),
        );
        map.insert("max_files".to_string(), self.max_files.to_string());
        map.insert(
            "snippet_radius".to_string(),
            self.snippet_radius.to_string(),
        );
        map.insert("sast_enabled".to_string(), self.sast_enabled.to_string());
        map.insert(
            "bandit_bin".to_string(),
            self.bandit_bin.display().to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for RepoauditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repoaudit Configuration:")?;
        writeln!(f, "  Inference URL: {}", self.inference_url)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Cache Enabled: {}", self.cache_enabled)?;
        writeln!(f, "  Cache Dir: {}", self.cache_dir.display())?;
        writeln!(f, "  Max Files: {}", self.max_files)?;
        writeln!(f, "  Snippet Radius: {}", self.snippet_radius)?;
        writeln!(f, "  SAST Enabled: {}", self.sast_enabled)?;
        writeln!(f, "  Bandit Binary: {}", self.bandit_bin.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    const ALL_VARS: [&str; 9] = [
        "REPOAUDIT_INFERENCE_URL",
        "REPOAUDIT_REQUEST_TIMEOUT",
        "REPOAUDIT_CACHE_ENABLED",
        "REPOAUDIT_CACHE_DIR",
        "REPOAUDIT_MAX_FILES",
        "REPOAUDIT_SNIPPET_RADIUS",
        "REPOAUDIT_SAST_ENABLED",
        "REPOAUDIT_BANDIT_BIN",
        "REPOAUDIT_LOG_LEVEL",
    ];

    fn clear_all() -> Vec<EnvGuard> {
        ALL_VARS.iter().map(|k| EnvGuard::unset(k)).collect()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = clear_all();

        let config = RepoauditConfig::default();

        assert_eq!(config.inference_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.cache_enabled, DEFAULT_CACHE_ENABLED);
        assert_eq!(config.cache_dir, default_cache_dir());
        assert_eq!(config.max_files, 5);
        assert_eq!(config.snippet_radius, 3);
        assert!(config.sast_enabled);
        assert_eq!(config.bandit_bin, PathBuf::from("bandit"));
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _cleared = clear_all();
        let _guards = vec![
            EnvGuard::set("REPOAUDIT_INFERENCE_URL", "https://audit.internal:9000"),
            EnvGuard::set("REPOAUDIT_REQUEST_TIMEOUT", "60"),
            EnvGuard::set("REPOAUDIT_CACHE_ENABLED", "false"),
            EnvGuard::set("REPOAUDIT_CACHE_DIR", "/tmp/ra-cache"),
            EnvGuard::set("REPOAUDIT_MAX_FILES", "25"),
            EnvGuard::set("REPOAUDIT_SNIPPET_RADIUS", "0"),
            EnvGuard::set("REPOAUDIT_SAST_ENABLED", "false"),
            EnvGuard::set("REPOAUDIT_BANDIT_BIN", "/opt/bandit"),
            EnvGuard::set("REPOAUDIT_LOG_LEVEL", "DEBUG"),
        ];

        let config = RepoauditConfig::default();

        assert_eq!(config.inference_url, "https://audit.internal:9000");
        assert_eq!(config.request_timeout_secs, 60);
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/ra-cache"));
        assert_eq!(config.max_files, 25);
        assert_eq!(config.snippet_radius, 0);
        assert!(!config.sast_enabled);
        assert_eq!(config.bandit_bin, PathBuf::from("/opt/bandit"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_unparseable_values_fall_back() {
        let _cleared = clear_all();
        let _guards = vec![
            EnvGuard::set("REPOAUDIT_MAX_FILES", "lots"),
            EnvGuard::set("REPOAUDIT_CACHE_ENABLED", "maybe"),
        ];

        let config = RepoauditConfig::default();
        assert_eq!(config.max_files, DEFAULT_MAX_FILES);
        assert!(config.cache_enabled);
    }

    #[test]
    #[serial]
    fn test_validation_ranges() {
        let _cleared = clear_all();
        let base = RepoauditConfig::default();

        let mut config = base.clone();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.request_timeout_secs = 3601;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.max_files = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.snippet_radius = 51;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = base;
        config.inference_url = "ftp://x".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    #[serial]
    fn test_pipeline_config_mapping() {
        let _cleared = clear_all();
        let mut config = RepoauditConfig::default();
        config.max_files = 9;
        config.request_timeout_secs = 12;
        config.sast_enabled = false;

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.max_files, 9);
        assert_eq!(pipeline.stage_timeout, Duration::from_secs(12));
        assert!(!pipeline.sast_enabled);
    }

    #[test]
    #[serial]
    fn test_create_cache() {
        let _cleared = clear_all();
        let temp = TempDir::new().unwrap();
        let mut config = RepoauditConfig::default();
        config.cache_dir = temp.path().join("cache");

        assert!(config.create_cache().is_enabled());
        assert!(temp.path().join("cache").is_dir());

        config.cache_enabled = false;
        assert!(!config.create_cache().is_enabled());

        // A regular file where the directory should be
        let blocked = temp.path().join("blocked");
        std::fs::write(&blocked, "x").unwrap();
        config.cache_enabled = true;
        config.cache_dir = blocked;
        assert!(!config.create_cache().is_enabled());
    }

    #[test]
    #[serial]
    fn test_display_and_map() {
        let _cleared = clear_all();
        let config = RepoauditConfig::default();

        let display = format!("{}", config);
        assert!(display.contains("Repoaudit Configuration:"));
        assert!(display.contains("Inference URL: http://localhost:8000"));

        let map = config.to_display_map();
        assert_eq!(map.get("max_files").map(String::as_str), Some("5"));
        assert_eq!(map.len(), 9);
    }
}
