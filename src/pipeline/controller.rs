//! Per-file stage sequencing: metadata, then context, then report
//!
//! Each stage is looked up in the cache first. On a miss the inference service
//! is called under the stage timeout, and only a fresh success is written back.
//! A skipped metadata or context stage ends the file's pass without an entry; a
//! skipped report stage still yields an entry with a null report.

use super::bundle::{collect_related, CodeBundle};
use super::context::PipelineContext;
use super::types::{ReportEntry, RunStats, StageOutcome};
use crate::cache::{CacheKey, ContentDigest, StageKind};
use crate::discovery::FileRecord;
use crate::error::BackendError;
use crate::inference::{
    parse_context_entries, ContextEntry, ContextRequest, MetadataRequest, RepoAnalysisMap,
    ReportKind, ReportRequest,
};
use crate::progress::ProgressEvent;
use crate::sast::{findings_for, Finding, SastError};
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

pub struct StageController<'a> {
    ctx: &'a PipelineContext,
    root: &'a Path,
    report_kind: &'a ReportKind,
    sast_unavailable_reported: AtomicBool,
}

impl<'a> StageController<'a> {
    pub fn new(ctx: &'a PipelineContext, root: &'a Path, report_kind: &'a ReportKind) -> Self {
        Self {
            ctx,
            root,
            report_kind,
            sast_unavailable_reported: AtomicBool::new(false),
        }
    }

    /// Runs all three stages for `record`
    ///
    /// The file's metadata is added to `map` before its context stage runs, so the
    /// context request sees every earlier file plus this one.
    pub async fn process_file(
        &self,
        record: &FileRecord,
        map: &mut RepoAnalysisMap,
        stats: &mut RunStats,
    ) -> Option<ReportEntry> {
        let path = record.relative_path.as_str();

        let metadata = self
            .run_stage(
                StageKind::Metadata,
                CacheKey::new(StageKind::Metadata, record.digest.clone()),
                path,
                stats,
                require_value,
                Value::clone,
                async {
                    let request = MetadataRequest {
                        file_name: record.file_name.clone(),
                        file_path: record.relative_path.clone(),
                        file_content: record.content.clone(),
                    };
                    self.ctx.inference.extract_metadata(&request).await
                },
            )
            .await
            .into_value()?;
        map.insert(record.relative_path.clone(), metadata);

        let f_map: &RepoAnalysisMap = map;
        let entries = self
            .run_stage(
                StageKind::Context,
                CacheKey::new(StageKind::Context, record.digest.clone()),
                path,
                stats,
                parse_context_entries,
                |entries| serde_json::to_value(entries).unwrap_or_default(),
                async {
                    let request = ContextRequest {
                        file_name: record.file_name.clone(),
                        file_content: record.content.clone(),
                        f_map,
                    };
                    self.ctx.inference.resolve_context(&request).await
                },
            )
            .await
            .into_value()?;

        let report_stage = self.report_kind.stage_kind();
        let report = self
            .run_stage(
                report_stage,
                self.report_key(record),
                path,
                stats,
                require_value,
                Value::clone,
                async {
                    let bundle = self.build_bundle(record, &entries).await;
                    let request = ReportRequest {
                        file_name: record.file_name.clone(),
                        file_content: bundle.into_string(),
                        user_defined_policies: self.report_kind.policies().map(str::to_string),
                    };
                    self.ctx
                        .inference
                        .generate_report(self.report_kind, &request)
                        .await
                },
            )
            .await
            .into_value();

        Some(ReportEntry {
            file_name: record.file_name.clone(),
            file_path: record.relative_path.clone(),
            report,
        })
    }

    /// Cache key for the report stage; compliance keys also cover the policy text
    pub fn report_key(&self, record: &FileRecord) -> CacheKey {
        let stage = self.report_kind.stage_kind();
        match self.report_kind.policies() {
            None => CacheKey::new(stage, record.digest.clone()),
            Some(policies) => CacheKey::new(
                stage,
                ContentDigest::of_parts(&[record.digest.as_str().as_bytes(), policies.as_bytes()]),
            ),
        }
    }

    /// Builds the report payload for `record` from its context entries
    pub async fn build_bundle(&self, record: &FileRecord, entries: &[ContextEntry]) -> CodeBundle {
        let findings = self.static_findings(record).await;
        let related = collect_related(self.ctx.file_system.as_ref(), self.root, entries);

        let mut builder = CodeBundle::builder(&record.file_name, &record.content);
        if let Some(findings) = findings.as_deref() {
            builder = builder.static_findings(findings);
        }
        builder.related_files(related).build()
    }

    async fn static_findings(&self, record: &FileRecord) -> Option<Vec<Finding>> {
        let analyzer = self.ctx.active_analyzer()?;
        match findings_for(analyzer.as_ref(), record).await {
            Ok(findings) => findings,
            Err(SastError::Unavailable { tool }) => {
                if !self.sast_unavailable_reported.swap(true, Ordering::Relaxed) {
                    warn!(tool = %tool, "Static analyzer not installed, reports will not include SAST findings");
                }
                None
            }
            Err(e) => {
                warn!(file = %record.relative_path, error = %e, "Static analysis failed");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stage<T, Fut>(
        &self,
        stage: StageKind,
        key: CacheKey,
        path: &str,
        stats: &mut RunStats,
        decode: impl Fn(Value) -> Result<T, BackendError>,
        encode: impl Fn(&T) -> Value,
        call: Fut,
    ) -> StageOutcome<T>
    where
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let start = Instant::now();

        if let Some(cached) = self.ctx.cache.get(&key) {
            match decode(cached) {
                Ok(value) => {
                    stats.record_hit(stage);
                    self.emit(ProgressEvent::StageCompleted {
                        path: path.to_string(),
                        stage,
                        cached: true,
                        duration: start.elapsed(),
                    });
                    return StageOutcome::Cached(value);
                }
                Err(e) => warn!(key = %key, error = %e, "Ignoring unusable cache entry"),
            }
        }

        stats.record_miss(stage);
        stats.collaborator_calls += 1;
        debug!(file = %path, stage = %stage, "Calling inference service");

        let timeout = self.ctx.config.stage_timeout;
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::timeout(timeout)),
        };

        match result {
            Ok(value) => {
                let encoded = encode(&value);
                if !encoded.is_null() {
                    self.ctx.cache.set(&key, &encoded);
                }
                self.emit(ProgressEvent::StageCompleted {
                    path: path.to_string(),
                    stage,
                    cached: false,
                    duration: start.elapsed(),
                });
                StageOutcome::Fresh(value)
            }
            Err(error) => {
                stats.record_skip(stage);
                self.emit(ProgressEvent::StageSkipped {
                    path: path.to_string(),
                    stage,
                    reason: error.to_string(),
                });
                StageOutcome::Skipped(error)
            }
        }
    }

    fn emit(&self, event: ProgressEvent) {
        self.ctx.progress.on_progress(&event);
    }
}

fn require_value(value: Value) -> Result<Value, BackendError> {
    if value.is_null() {
        return Err(BackendError::invalid_response("cached value is null", None));
    }
    Ok(value)
}
