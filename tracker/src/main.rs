mod config;
mod logging;
mod statsd;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Relay client-side error reports to the logging backend
    ErrorTracker(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::ErrorTracker(args) => run_error_tracker(&args),
    }
}

fn run_error_tracker(args: &RunArgs) -> ExitCode {
    let config = match config::Config::from_file(&args.config_file_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let _sentry = match logging::init(config.common.logging.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = statsd::init(config.common.metrics.as_ref()) {
        tracing::error!(error = %e, "Could not set up metrics");
        return ExitCode::FAILURE;
    }

    let Some(tracker_config) = config.error_tracker else {
        tracing::error!("Missing error_tracker section in config");
        return ExitCode::FAILURE;
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Could not start runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(error_tracker::run(tracker_config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Error tracker stopped");
            ExitCode::FAILURE
        }
    }
}
