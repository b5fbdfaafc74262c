//! Progress reporting for analysis runs

mod handler;
mod logging;

pub use handler::{NoOpHandler, ProgressEvent, ProgressHandler, RunMode};
pub use logging::LoggingHandler;
