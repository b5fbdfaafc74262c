//! Structured logging setup for repoaudit
//!
//! Logs always go to stderr so that reports written to stdout stay machine-readable.
//! `RUST_LOG`, when set, takes precedence over the configured level.
//!
//! # Example
//!
//! ```no_run
//! use repoaudit::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!("Application started");
//! ```

use std::env;
use std::sync::Once;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Crates whose debug output drowns out ours
const NOISY_CRATES: [&str; 3] = ["h2", "hyper", "reqwest"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level for repoaudit's own targets
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., repoaudit::pipeline) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Level chosen from CLI flags, falling back to `REPOAUDIT_LOG_LEVEL`
    ///
    /// An explicit `--log-level` wins over `-v`/`-q`.
    pub fn from_flags(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = if let Some(level_str) = log_level {
            parse_level(level_str)
        } else if verbose {
            Level::DEBUG
        } else if quiet {
            Level::ERROR
        } else {
            let level_str = env::var("REPOAUDIT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        Self {
            level,
            use_json: json_from_env(),
            ..Default::default()
        }
    }
}

/// Parses a log level from a string, defaulting to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn json_from_env() -> bool {
    env::var("REPOAUDIT_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false)
}

/// Builds the filter used when `RUST_LOG` is not set
pub fn default_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::default().add_directive(LevelFilter::from_level(level).into());
    for krate in NOISY_CRATES {
        if let Ok(directive) = format!("{}=warn", krate).parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initializes the logging system; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = if env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            default_filter(config.level)
        };

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Initializes logging from `REPOAUDIT_LOG_LEVEL` and `REPOAUDIT_LOG_JSON`
pub fn init_from_env() {
    init_logging(LoggingConfig::from_flags(None, false, false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("info"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_case_insensitive() {
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("invalid"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
        assert!(!config.include_location);
    }

    #[test]
    #[serial]
    fn test_from_flags_precedence() {
        assert_eq!(
            LoggingConfig::from_flags(Some("warn"), true, false).level,
            Level::WARN
        );
        assert_eq!(LoggingConfig::from_flags(None, true, false).level, Level::DEBUG);
        assert_eq!(LoggingConfig::from_flags(None, false, true).level, Level::ERROR);
    }

    #[test]
    #[serial]
    fn test_from_flags_reads_env() {
        let old = env::var("REPOAUDIT_LOG_LEVEL").ok();
        env::set_var("REPOAUDIT_LOG_LEVEL", "trace");
        let level = LoggingConfig::from_flags(None, false, false).level;
        match old {
            Some(v) => env::set_var("REPOAUDIT_LOG_LEVEL", v),
            None => env::remove_var("REPOAUDIT_LOG_LEVEL"),
        }
        assert_eq!(level, Level::TRACE);
    }

    #[test]
    fn test_default_filter_caps_noisy_crates() {
        let rendered = default_filter(Level::DEBUG).to_string();
        assert!(rendered.contains("debug"));
        assert!(rendered.contains("hyper=warn"));
        assert!(rendered.contains("reqwest=warn"));
    }
}
