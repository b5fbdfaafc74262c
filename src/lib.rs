//! repoaudit - staged, cached security and compliance review of source repositories
//!
//! Every eligible source file goes through three stages against an external inference
//! service: a metadata summary, a context pass that names related files, and a
//! vulnerability or compliance report built from a bundle of the file, its related files
//! and any static-analysis findings. Each stage result is cached by content digest, so an
//! unchanged file is never sent twice.
//!
//! # Example Usage
//!
//! ```ignore
//! use repoaudit::{BatchRunner, ReportKind, RepoauditConfig};
//! use repoaudit::progress::LoggingHandler;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! async fn audit(root: &Path) -> anyhow::Result<()> {
//!     let config = RepoauditConfig::default();
//!     config.validate()?;
//!     let runner = BatchRunner::new(config.create_pipeline_context(Arc::new(LoggingHandler))?);
//!
//!     let outcome = runner.run_full(root, &ReportKind::Vulnerability, None).await?;
//!     for entry in &outcome.reports {
//!         println!("{}: {:?}", entry.file_path, entry.report);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`discovery`]: lazy walk of eligible files
//! - [`cache`]: content-addressable response cache
//! - [`inference`]: inference service client and its mock
//! - [`pipeline`]: stage controller, context bundler and batch runner
//! - [`sast`]: static analyzer adapter
//! - [`scm`]: git collaborator for clone and commit runs

pub mod cache;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fs;
pub mod inference;
pub mod pipeline;
pub mod progress;
pub mod sast;
pub mod scm;
pub mod util;

pub use cache::{CacheStore, ContentDigest, FileCacheStore, MemoryCacheStore, ResponseCache, StageKind};
pub use config::{ConfigError, RepoauditConfig};
pub use discovery::{Discovery, ExtensionAllowList, FileRecord};
pub use error::BackendError;
pub use inference::{HttpInferenceClient, InferenceClient, MockInferenceClient, ReportKind};
pub use pipeline::{BatchRunner, PipelineConfig, PipelineContext, ReportEntry, RunOutcome};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
