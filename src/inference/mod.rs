//! Client side of the remote inference service
//!
//! The service exposes one endpoint per analysis stage. [`InferenceClient`] is
//! the seam: [`HttpInferenceClient`] talks to a real deployment and
//! [`MockInferenceClient`] scripts answers for tests.

mod client;
mod http;
mod mock;
pub mod types;

pub use client::{endpoint_for, parse_context_entries, InferenceClient};
pub use http::{HttpInferenceClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use mock::{MockInferenceClient, MockResponse, RecordedCall};
pub use types::{
    ContextEntry, ContextRequest, MetadataRequest, RepoAnalysisMap, ReportKind, ReportRequest,
};
