use crate::cache::StageKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Staged security and compliance review of source repositories
#[derive(Parser, Debug)]
#[command(
    name = "repoaudit",
    about = "Staged security and compliance review of source repositories",
    version,
    author,
    long_about = "repoaudit walks a repository, asks an inference service to summarise each source \
                  file, resolve its related files and write a vulnerability or compliance report. \
                  Every stage result is cached by content digest, so unchanged files are never \
                  analysed twice."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyse a whole repository tree",
        long_about = "Walks the repository, analysing eligible files in a stable order until the \
                      report cap is reached. Rerun with --resume-after to continue.\n\n\
                      Examples:\n  \
                      repoaudit scan\n  \
                      repoaudit scan /path/to/repo --max-files 20\n  \
                      repoaudit scan --report compliance --policy-file policies.txt\n  \
                      repoaudit scan --resume-after src/app.py --format json"
    )]
    Scan(ScanArgs),

    #[command(
        about = "Analyse an explicit list of files",
        long_about = "Analyses only the named repository-relative files; no cap applies.\n\n\
                      Examples:\n  \
                      repoaudit files . src/app.py src/db.py"
    )]
    Files(FilesArgs),

    #[command(
        about = "Analyse the files touched by the latest commit",
        long_about = "Lists the files changed by the latest commit (against its first parent) and \
                      analyses those.\n\n\
                      Examples:\n  \
                      repoaudit commit /path/to/checkout\n  \
                      repoaudit commit --branch main --pull"
    )]
    Commit(CommitArgs),

    #[command(
        about = "Clone a repository",
        long_about = "Clones a repository, embedding credentials into HTTPS URLs when a username \
                      is given. The token is read from REPOAUDIT_GIT_TOKEN.\n\n\
                      Examples:\n  \
                      repoaudit clone https://github.com/acme/app.git ./app\n  \
                      repoaudit clone https://github.com/acme/app.git ./app --username ci --branch dev"
    )]
    Clone(CloneArgs),

    #[command(about = "Inspect or clear the response cache")]
    Cache(CacheArgs),

    #[command(about = "Show the effective configuration")]
    Config(FormatArgs),

    #[command(
        about = "Check inference service availability",
        long_about = "Probes the configured inference service.\n\n\
                      Examples:\n  \
                      repoaudit health\n  \
                      repoaudit health --format json"
    )]
    Health(FormatArgs),
}

/// Options shared by every analysing command
#[derive(Args, Debug, Clone)]
pub struct AuditOptions {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'r',
        long,
        value_enum,
        default_value = "vulnerability",
        help = "Kind of report to generate"
    )]
    pub report: ReportArg,

    #[arg(
        long,
        value_name = "FILE",
        required_if_eq("report", "compliance"),
        help = "Plain-text policies for compliance reports"
    )]
    pub policy_file: Option<PathBuf>,

    #[arg(long, help = "Disable result caching")]
    pub no_cache: bool,

    #[arg(long, help = "Skip static analysis splicing")]
    pub no_sast: bool,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Per-stage request timeout in seconds (overrides REPOAUDIT_REQUEST_TIMEOUT)"
    )]
    pub timeout: Option<u64>,

    #[arg(long, help = "Include the repository analysis map in JSON/YAML output")]
    pub include_map: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'n',
        long,
        value_name = "COUNT",
        help = "Stop after this many reported files (overrides REPOAUDIT_MAX_FILES)"
    )]
    pub max_files: Option<usize>,

    #[arg(
        long,
        value_name = "PATH",
        help = "Skip files up to and including this repository-relative path"
    )]
    pub resume_after: Option<String>,

    #[command(flatten)]
    pub options: AuditOptions,
}

#[derive(Parser, Debug, Clone)]
pub struct FilesArgs {
    #[arg(value_name = "ROOT", help = "Repository root")]
    pub repository_path: PathBuf,

    #[arg(
        value_name = "FILE",
        required = true,
        help = "Repository-relative files to analyse"
    )]
    pub files: Vec<String>,

    #[command(flatten)]
    pub options: AuditOptions,
}

#[derive(Parser, Debug, Clone)]
pub struct CommitArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the checkout (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(short = 'b', long, help = "Branch whose head commit is analysed")]
    pub branch: Option<String>,

    #[arg(long, help = "Pull the latest changes before analysing")]
    pub pull: bool,

    #[arg(long, help = "Username for HTTPS remotes (token from REPOAUDIT_GIT_TOKEN)")]
    pub username: Option<String>,

    #[command(flatten)]
    pub options: AuditOptions,
}

#[derive(Parser, Debug, Clone)]
pub struct CloneArgs {
    #[arg(value_name = "URL", help = "Repository URL")]
    pub url: String,

    #[arg(value_name = "DEST", help = "Destination directory")]
    pub destination: PathBuf,

    #[arg(short = 'b', long, help = "Branch to check out")]
    pub branch: Option<String>,

    #[arg(long, help = "Username for HTTPS remotes (token from REPOAUDIT_GIT_TOKEN)")]
    pub username: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    #[command(about = "Show entry counts per stage")]
    Stats(FormatArgs),

    #[command(about = "Remove cached entries")]
    Clear {
        #[arg(
            long,
            value_parser = parse_stage_kind,
            help = "Only clear this stage (metadata, context, report_vulnerability, report_compliance)"
        )]
        kind: Option<StageKind>,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct FormatArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportArg {
    Vulnerability,
    Compliance,
}

fn parse_stage_kind(s: &str) -> Result<StageKind, String> {
    s.to_lowercase().parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_scan_args() {
        let args = CliArgs::parse_from(["repoaudit", "scan"]);
        match args.command {
            Commands::Scan(scan) => {
                assert!(scan.repository_path.is_none());
                assert!(scan.max_files.is_none());
                assert!(scan.resume_after.is_none());
                assert_eq!(scan.options.format, OutputFormatArg::Human);
                assert_eq!(scan.options.report, ReportArg::Vulnerability);
                assert!(scan.options.policy_file.is_none());
                assert!(!scan.options.no_cache);
                assert!(!scan.options.no_sast);
                assert!(scan.options.timeout.is_none());
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_scan_with_options() {
        let args = CliArgs::parse_from([
            "repoaudit",
            "scan",
            "/tmp/repo",
            "--max-files",
            "20",
            "--resume-after",
            "src/app.py",
            "--format",
            "json",
            "--no-cache",
            "--no-sast",
            "--timeout",
            "45",
            "-o",
            "out.json",
        ]);

        match args.command {
            Commands::Scan(scan) => {
                assert_eq!(scan.repository_path, Some(PathBuf::from("/tmp/repo")));
                assert_eq!(scan.max_files, Some(20));
                assert_eq!(scan.resume_after.as_deref(), Some("src/app.py"));
                assert_eq!(scan.options.format, OutputFormatArg::Json);
                assert!(scan.options.no_cache);
                assert!(scan.options.no_sast);
                assert_eq!(scan.options.timeout, Some(45));
                assert_eq!(scan.options.output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_compliance_requires_policy_file() {
        let result = CliArgs::try_parse_from(["repoaudit", "scan", "--report", "compliance"]);
        assert!(result.is_err());

        let args = CliArgs::parse_from([
            "repoaudit",
            "scan",
            "--report",
            "compliance",
            "--policy-file",
            "policies.txt",
        ]);
        match args.command {
            Commands::Scan(scan) => {
                assert_eq!(scan.options.report, ReportArg::Compliance);
                assert_eq!(
                    scan.options.policy_file,
                    Some(PathBuf::from("policies.txt"))
                );
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_files_command() {
        let args = CliArgs::parse_from(["repoaudit", "files", ".", "a.py", "lib/b.js"]);
        match args.command {
            Commands::Files(files) => {
                assert_eq!(files.repository_path, PathBuf::from("."));
                assert_eq!(files.files, vec!["a.py", "lib/b.js"]);
            }
            _ => panic!("Expected Files command"),
        }
    }

    #[test]
    fn test_files_requires_at_least_one_file() {
        assert!(CliArgs::try_parse_from(["repoaudit", "files", "."]).is_err());
    }

    #[test]
    fn test_commit_command() {
        let args = CliArgs::parse_from(["repoaudit", "commit", "--branch", "main", "--pull"]);
        match args.command {
            Commands::Commit(commit) => {
                assert!(commit.repository_path.is_none());
                assert_eq!(commit.branch.as_deref(), Some("main"));
                assert!(commit.pull);
                assert!(commit.username.is_none());
            }
            _ => panic!("Expected Commit command"),
        }
    }

    #[test]
    fn test_clone_command() {
        let args = CliArgs::parse_from([
            "repoaudit",
            "clone",
            "https://github.com/acme/app.git",
            "./app",
            "--username",
            "ci",
        ]);
        match args.command {
            Commands::Clone(clone) => {
                assert_eq!(clone.url, "https://github.com/acme/app.git");
                assert_eq!(clone.destination, PathBuf::from("./app"));
                assert_eq!(clone.username.as_deref(), Some("ci"));
                assert!(clone.branch.is_none());
            }
            _ => panic!("Expected Clone command"),
        }
    }

    #[test]
    fn test_cache_clear_kind() {
        let args = CliArgs::parse_from(["repoaudit", "cache", "clear", "--kind", "metadata"]);
        match args.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear { kind },
            }) => assert_eq!(kind, Some(StageKind::Metadata)),
            _ => panic!("Expected cache clear"),
        }

        assert!(CliArgs::try_parse_from(["repoaudit", "cache", "clear", "--kind", "bogus"]).is_err());
    }

    #[test]
    fn test_health_command() {
        let args = CliArgs::parse_from(["repoaudit", "health", "--format", "yaml"]);
        match args.command {
            Commands::Health(health) => assert_eq!(health.format, OutputFormatArg::Yaml),
            _ => panic!("Expected Health command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["repoaudit", "-v", "scan"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["repoaudit", "-q", "config"]);
        assert!(args.quiet);

        let args = CliArgs::parse_from(["repoaudit", "--log-level", "debug", "health"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["repoaudit", "-v", "-q", "scan"]).is_err());
    }
}
