//! sigbind CLI
//!
//! Command-line front end of the binding generator.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, error};

use sigbind::cli::commands::{self, RunStatus};
use sigbind::cli::{Cli, Commands, DiscoverArgs};
use sigbind::config::GeneratorConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("sigbind v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(RunStatus::Success) => ExitCode::SUCCESS,
        Ok(RunStatus::Failure) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<RunStatus> {
    match cli.command {
        Commands::Generate(args) => {
            let config = args.to_config();
            commands::generate(&config, cli.verbose).with_context(|| {
                format!("generation into {} failed", config.output_dir.display())
            })
        }
        Commands::Discover(args) => {
            let config = discovery_config(&args);
            commands::discover(&config).context("discovery failed")
        }
        Commands::Classify { names } => Ok(commands::classify_names(&names)),
    }
}

fn discovery_config(args: &DiscoverArgs) -> GeneratorConfig {
    let mut config = GeneratorConfig::from_env();
    args.apply(&mut config);
    config
}
