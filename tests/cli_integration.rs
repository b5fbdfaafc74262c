//! CLI integration tests
//!
//! These run the built binary and check parsing, output formats and exit codes. The
//! inference service is pointed at a closed local port so nothing leaves the machine.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const UNREACHABLE_SERVICE: &str = "http://127.0.0.1:9";

fn repoaudit(cache_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_repoaudit"));
    cmd.env("REPOAUDIT_INFERENCE_URL", UNREACHABLE_SERVICE)
        .env("REPOAUDIT_CACHE_DIR", cache_dir)
        .env("REPOAUDIT_SAST_ENABLED", "false")
        .env_remove("REPOAUDIT_REQUEST_TIMEOUT")
        .env_remove("REPOAUDIT_MAX_FILES")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn test_cli_help() {
    let cache = TempDir::new().unwrap();
    let output = repoaudit(cache.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["scan", "files", "commit", "clone", "cache", "config", "health"] {
        assert!(stdout.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_cli_version() {
    let cache = TempDir::new().unwrap();
    let output = repoaudit(cache.path()).arg("--version").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_json_reflects_environment() {
    let cache = TempDir::new().unwrap();
    let output = repoaudit(cache.path())
        .env("REPOAUDIT_MAX_FILES", "7")
        .args(["config", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let config = stdout_json(&output);
    assert_eq!(config["max_files"], "7");
    assert_eq!(config["inference_url"], UNREACHABLE_SERVICE);
    assert_eq!(config["sast_enabled"], "false");
}

#[test]
fn test_scan_missing_repository_fails() {
    let cache = TempDir::new().unwrap();
    let output = repoaudit(cache.path())
        .args(["scan", "/nonexistent/repo/path"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_scan_invalid_configuration_fails() {
    let cache = TempDir::new().unwrap();
    let repo = TempDir::new().unwrap();
    let output = repoaudit(cache.path())
        .env("REPOAUDIT_REQUEST_TIMEOUT", "0")
        .arg("scan")
        .arg(repo.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_scan_with_unreachable_service_reports_nothing() {
    let cache = TempDir::new().unwrap();
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("app.py"), "print('hello')\n").unwrap();
    fs::write(repo.path().join("NOTES.txt"), "not code\n").unwrap();

    let output = repoaudit(cache.path())
        .arg("scan")
        .arg(repo.path())
        .args(["--format", "json", "--timeout", "5"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let outcome = stdout_json(&output);
    assert_eq!(outcome["reports"], serde_json::json!([]));
    assert_eq!(outcome["stats"]["files_attempted"], 1);
    assert!(outcome["nextCursor"].is_null());
}

#[test]
fn test_scan_writes_output_file() {
    let cache = TempDir::new().unwrap();
    let repo = TempDir::new().unwrap();
    let target = cache.path().join("report.yaml");

    let output = repoaudit(cache.path())
        .arg("scan")
        .arg(repo.path())
        .args(["--format", "yaml", "--no-cache", "-o"])
        .arg(&target)
        .output()
        .unwrap();

    assert!(output.status.success());
    let written = fs::read_to_string(&target).unwrap();
    assert!(written.contains("reports: []"));
}

#[test]
fn test_compliance_without_policy_file_is_rejected() {
    let cache = TempDir::new().unwrap();
    let output = repoaudit(cache.path())
        .args(["scan", ".", "--report", "compliance"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--policy-file"));
}

#[test]
fn test_cache_stats_and_clear() {
    let cache = TempDir::new().unwrap();

    let output = repoaudit(cache.path())
        .args(["cache", "stats", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["total"], 0);

    let output = repoaudit(cache.path())
        .args(["cache", "clear", "--kind", "metadata"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Removed 0 cache entries"));
}

#[test]
fn test_health_reports_unreachable_service() {
    let cache = TempDir::new().unwrap();
    let output = repoaudit(cache.path())
        .args(["health", "--format", "json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let status = stdout_json(&output);
    assert_eq!(status["available"], false);
    assert_eq!(status["endpoint"], UNREACHABLE_SERVICE);
}
