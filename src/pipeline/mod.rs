//! Staged analysis pipeline
//!
//! [`BatchRunner`] feeds files to a [`StageController`], which runs the metadata,
//! context and report stages against the inference service, consulting the
//! response cache at every step. All collaborators come from [`PipelineContext`].

pub mod bundle;
pub mod config;
pub mod context;
pub mod controller;
pub mod runner;
pub mod types;

pub use bundle::{CodeBundle, BANNER};
pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use controller::StageController;
pub use runner::BatchRunner;
pub use types::{PipelineError, ReportEntry, RunOutcome, RunStats, StageOutcome};
