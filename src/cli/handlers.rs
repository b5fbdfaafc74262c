//! Command handlers
//!
//! Each handler returns the process exit code; failures are logged here and nowhere else.

use super::commands::{
    AuditOptions, CacheAction, CacheArgs, CloneArgs, CommitArgs, FilesArgs, FormatArgs, ReportArg,
    ScanArgs,
};
use super::output::{HealthStatus, OutputFormatter};
use crate::cache::{CacheStore, FileCacheStore};
use crate::config::RepoauditConfig;
use crate::inference::ReportKind;
use crate::pipeline::{BatchRunner, RunOutcome};
use crate::progress::LoggingHandler;
use crate::scm::{Credentials, GitCli, SourceControl};
use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const GIT_TOKEN_VAR: &str = "REPOAUDIT_GIT_TOKEN";

fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

pub async fn handle_scan(args: &ScanArgs) -> i32 {
    exit_code(run_scan(args).await)
}

async fn run_scan(args: &ScanArgs) -> Result<()> {
    let root = repository_root(args.repository_path.as_deref());
    let mut config = load_config(&args.options);
    if let Some(max_files) = args.max_files {
        config.max_files = max_files;
    }

    let kind = report_kind(&args.options)?;
    let runner = build_runner(&config)?;
    let outcome = runner
        .run_full(&root, &kind, args.resume_after.as_deref())
        .await?;

    emit_outcome(&args.options, &outcome)
}

pub async fn handle_files(args: &FilesArgs) -> i32 {
    exit_code(run_files(args).await)
}

async fn run_files(args: &FilesArgs) -> Result<()> {
    let config = load_config(&args.options);
    let kind = report_kind(&args.options)?;
    let runner = build_runner(&config)?;
    let outcome = runner
        .run_subset(&args.repository_path, args.files.as_slice(), &kind)
        .await?;

    emit_outcome(&args.options, &outcome)
}

pub async fn handle_commit(args: &CommitArgs) -> i32 {
    exit_code(run_commit(args).await)
}

async fn run_commit(args: &CommitArgs) -> Result<()> {
    let root = repository_root(args.repository_path.as_deref());
    let credentials = git_credentials(args.username.as_deref())?;
    let git = GitCli::new();
    let branch = args.branch.as_deref();

    if args.pull {
        git.pull_latest(&root, credentials.as_ref(), branch)
            .await
            .context("Failed to pull latest changes")?;
    }

    let files = git
        .affected_files_of_latest_commit(&root, branch)
        .await
        .context("Failed to list files of the latest commit")?;
    info!(files = files.len(), "Latest commit touched {} file(s)", files.len());
    debug!(?files, "Affected files");

    let config = load_config(&args.options);
    let kind = report_kind(&args.options)?;
    let runner = build_runner(&config)?;
    let outcome = runner.run_subset(&root, files.as_slice(), &kind).await?;

    emit_outcome(&args.options, &outcome)
}

pub async fn handle_clone(args: &CloneArgs) -> i32 {
    exit_code(run_clone(args).await)
}

async fn run_clone(args: &CloneArgs) -> Result<()> {
    if args.destination.exists()
        && fs::read_dir(&args.destination)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(true)
    {
        bail!(
            "Destination {} already exists and is not empty",
            args.destination.display()
        );
    }

    let credentials = git_credentials(args.username.as_deref())?;
    GitCli::new()
        .clone_repository(
            &args.url,
            &args.destination,
            credentials.as_ref(),
            args.branch.as_deref(),
        )
        .await
        .context("Clone failed")?;

    println!("Cloned {} into {}", args.url, args.destination.display());
    Ok(())
}

pub fn handle_cache(args: &CacheArgs) -> i32 {
    exit_code(run_cache(args))
}

fn run_cache(args: &CacheArgs) -> Result<()> {
    let config = RepoauditConfig::default();
    let store = FileCacheStore::new(&config.cache_dir).with_context(|| {
        format!("Failed to open cache at {}", config.cache_dir.display())
    })?;

    match &args.action {
        CacheAction::Stats(format) => {
            let stats = store.stats().context("Failed to read cache statistics")?;
            let output = OutputFormatter::new(format.format.into())
                .format_cache_stats(&stats, store.root())?;
            println!("{}", output);
        }
        CacheAction::Clear { kind } => {
            let removed = store.clear(*kind).context("Failed to clear cache")?;
            match kind {
                Some(kind) => info!(kind = %kind, removed, "Cleared cache entries"),
                None => info!(removed, "Cleared all cache entries"),
            }
            println!("Removed {} cache entr{}", removed, if removed == 1 { "y" } else { "ies" });
        }
    }
    Ok(())
}

pub fn handle_config(args: &FormatArgs) -> i32 {
    exit_code(run_config(args))
}

fn run_config(args: &FormatArgs) -> Result<()> {
    let config = RepoauditConfig::default();
    if let Err(e) = config.validate() {
        warn!("{}", e);
    }

    let output = OutputFormatter::new(args.format.into()).format_config(&config)?;
    println!("{}", output);
    Ok(())
}

pub async fn handle_health(args: &FormatArgs) -> i32 {
    let config = RepoauditConfig::default();

    let status = match config.create_inference_client() {
        Ok(client) => match client.health_check().await {
            Ok(true) => HealthStatus::available(client.base_url(), "Service is reachable"),
            Ok(false) => HealthStatus::unavailable(client.base_url(), "Service is not responding"),
            Err(e) => HealthStatus::unavailable(client.base_url(), "Health check failed")
                .with_details(e.to_string()),
        },
        Err(e) => HealthStatus::unavailable(&config.inference_url, "Invalid configuration")
            .with_details(e.to_string()),
    };

    match OutputFormatter::new(args.format.into()).format_health(&status) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("{:#}", e);
            return 1;
        }
    }

    if status.available {
        0
    } else {
        1
    }
}

fn repository_root(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Environment configuration with the command-line overrides applied
fn load_config(options: &AuditOptions) -> RepoauditConfig {
    let mut config = RepoauditConfig::default();
    if let Some(timeout) = options.timeout {
        config.request_timeout_secs = timeout;
    }
    if options.no_cache {
        config.cache_enabled = false;
    }
    if options.no_sast {
        config.sast_enabled = false;
    }
    config
}

fn report_kind(options: &AuditOptions) -> Result<ReportKind> {
    match options.report {
        ReportArg::Vulnerability => Ok(ReportKind::Vulnerability),
        ReportArg::Compliance => {
            let path = options
                .policy_file
                .as_ref()
                .context("Compliance reports need --policy-file")?;
            let policies = fs::read_to_string(path)
                .with_context(|| format!("Failed to read policy file {}", path.display()))?;
            Ok(ReportKind::Compliance { policies })
        }
    }
}

fn build_runner(config: &RepoauditConfig) -> Result<BatchRunner> {
    config.validate()?;
    debug!("{}", config);
    let ctx = config.create_pipeline_context(Arc::new(LoggingHandler))?;
    Ok(BatchRunner::new(ctx))
}

fn git_credentials(username: Option<&str>) -> Result<Option<Credentials>> {
    let Some(username) = username else {
        return Ok(None);
    };
    let token = env::var(GIT_TOKEN_VAR)
        .with_context(|| format!("--username requires {} to be set", GIT_TOKEN_VAR))?;
    Ok(Some(Credentials::new(username, token)))
}

fn emit_outcome(options: &AuditOptions, outcome: &RunOutcome) -> Result<()> {
    let output =
        OutputFormatter::new(options.format.into()).format_outcome(outcome, options.include_map)?;

    match &options.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Wrote {} report(s) to {}", outcome.reports.len(), path.display());
        }
        None => println!("{}", output),
    }
    Ok(())
}
