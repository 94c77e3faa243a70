//! Shared plumbing for the subcommands.

use std::path::Path;

use animo_engine::orchestrator::timeout::overall_timeout_duration;
use animo_engine::{assemble_model, AnalysisOptions, NetworkDescription, VerifierConfig};
use animo_model::Model;
use miette::IntoDiagnostic;
use tracing::debug;

use crate::cli::Cli;

pub(crate) fn analysis_options(cli: &Cli) -> AnalysisOptions {
    let mut verifier = VerifierConfig::new(&cli.verifier);
    if let Some(smc) = &cli.smc_verifier {
        verifier = verifier.with_smc_verifier(smc);
    }
    AnalysisOptions {
        verifier,
        timeout: overall_timeout_duration(cli.timeout_secs),
        keep_files: cli.keep_files,
        ..AnalysisOptions::default()
    }
}

pub(crate) fn load_network(path: &Path) -> miette::Result<NetworkDescription> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Cannot read {}: {e}", path.display()))?;
    NetworkDescription::from_json(&text)
        .map_err(|e| miette::miette!("Invalid network description {}: {e}", path.display()))
}

/// Load a network and assemble its model, time tables included.
pub(crate) fn load_model(path: &Path) -> miette::Result<(NetworkDescription, Model)> {
    let desc = load_network(path)?;
    let registry = desc
        .scenario_registry()
        .map_err(|e| miette::miette!("Invalid user formulas: {e}"))?;
    let model = assemble_model(&desc, &registry).map_err(|e| miette::miette!("{e}"))?;
    debug!(
        reactants = model.reactant_count(),
        reactions = model.reaction_count(),
        "Model assembled"
    );
    Ok((desc, model))
}

/// Compiled id to external id and alias, for labelling results.
pub(crate) fn reactant_legend(model: &Model) -> serde_json::Value {
    let legend: serde_json::Map<String, serde_json::Value> = model
        .enabled_reactants()
        .map(|r| {
            (
                r.id.clone(),
                serde_json::json!({ "id": r.external_id, "alias": r.alias }),
            )
        })
        .collect();
    serde_json::Value::Object(legend)
}

pub(crate) fn print_json(value: &serde_json::Value) -> miette::Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{text}");
    Ok(())
}
