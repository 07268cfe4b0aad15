//! unictl - command-line entry point
//!
//! Builds the runtime context from the command line, configuration file and
//! environment, then runs the requested command with it.

use clap::Parser;
use tracing::{error, info};
use unictl::cli::Cli;
use unictl::log::Logger;
use unictl::{CliOptions, Host, Result};

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Used until configuration decides on something better
    let default_logger = Logger::fallback();

    if let Err(e) = run(cli, default_logger.clone()).await {
        default_logger.in_scope(|| error!("Error: {}", e));
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, default_logger: Logger) -> Result<()> {
    let mut opts = CliOptions::new(Host::new(default_logger));
    let options = cli.startup_options(opts.host().env())?;
    opts.apply(options)?;

    if let Some(logger) = opts.logger() {
        logger.install()?;
    }
    info!("Starting unictl");

    // Execute the command
    cli.execute(&opts).await?;

    Ok(())
}
