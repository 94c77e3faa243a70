#![doc = include_str!("../README.md")]

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = commands::helpers::analysis_options(&cli);

    match cli.command {
        Commands::Compile { network, out } => {
            commands::compile::run_compile_command(&network, out.as_deref())?;
        }
        Commands::Simulate {
            network,
            minutes,
            only,
        } => {
            commands::simulate::run_simulate_command(&network, minutes, &only, &options)?;
        }
        Commands::Smc { network, query } => {
            commands::smc::run_smc_command(&network, &query, &options)?;
        }
        Commands::Formulas { network } => {
            commands::formulas::run_formulas_command(&network)?;
        }
    }
    Ok(())
}
