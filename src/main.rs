use mcpship::cli::commands::{CliArgs, Commands};
use mcpship::cli::handlers::{handle_plan, handle_run, handle_tag};
use mcpship::util::logging::{init_logging, json_requested, parse_level, LoggingConfig, LOG_LEVEL_ENV};
use mcpship::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(logging_from_args(&args));

    debug!("mcpship v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args).await,
        Commands::Plan(plan_args) => handle_plan(plan_args).await,
        Commands::Tag(tag_args) => handle_tag(tag_args).await,
    };

    std::process::exit(exit_code);
}

fn logging_from_args(args: &CliArgs) -> LoggingConfig {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        let level_str = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        parse_level(&level_str)
    };

    LoggingConfig {
        use_json: json_requested(),
        ..LoggingConfig::with_level(level)
    }
}
