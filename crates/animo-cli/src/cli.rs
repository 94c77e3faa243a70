//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "animo")]
#[command(about = "Analyse ANIMO signalling networks with UPPAAL timed automata")]
#[command(version)]
pub(crate) struct Cli {
    /// Path to verifyta, used for simulations (and SMC unless --smc-verifier is set)
    #[arg(long, global = true, env = "ANIMO_VERIFYTA", default_value = "verifyta")]
    pub(crate) verifier: PathBuf,

    /// Path to an SMC-capable verifyta
    #[arg(long, global = true)]
    pub(crate) smc_verifier: Option<PathBuf>,

    /// Kill the verifier after this many seconds (0 disables)
    #[arg(long, global = true, default_value_t = 0)]
    pub(crate) timeout_secs: u64,

    /// Keep the generated model, query and output files
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) keep_files: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Write the UPPAAL model for a network
    Compile {
        /// Network description (JSON)
        network: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Simulate a network and print the level series as JSON
    Simulate {
        /// Network description (JSON)
        network: PathBuf,

        /// Length of the simulation in minutes
        #[arg(long)]
        minutes: f64,

        /// Only report these reactants (external ids, comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },

    /// Answer a statistical query and print the verdict as JSON
    Smc {
        /// Network description (JSON)
        network: PathBuf,

        /// Query over reactant aliases, with time bounds in minutes
        #[arg(long)]
        query: String,
    },

    /// List the scenarios available to a network
    Formulas {
        /// Network description (JSON)
        network: PathBuf,
    },
}
