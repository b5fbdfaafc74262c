use repoaudit::cli::commands::{CliArgs, Commands};
use repoaudit::cli::handlers::{
    handle_cache, handle_clone, handle_commit, handle_config, handle_files, handle_health,
    handle_scan,
};
use repoaudit::util::{init_logging, LoggingConfig};
use repoaudit::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_flags(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("repoaudit v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Scan(scan_args) => handle_scan(scan_args).await,
        Commands::Files(files_args) => handle_files(files_args).await,
        Commands::Commit(commit_args) => handle_commit(commit_args).await,
        Commands::Clone(clone_args) => handle_clone(clone_args).await,
        Commands::Cache(cache_args) => handle_cache(cache_args),
        Commands::Config(format_args) => handle_config(format_args),
        Commands::Health(format_args) => handle_health(format_args).await,
    };

    std::process::exit(exit_code);
}
