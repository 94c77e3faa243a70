use std::path::Path;

use animo_engine::compiler::{PERCENTAGE_SUFFIX, QUANTITY_SUFFIX};
use animo_engine::{simulate_minutes, AnalysisOptions, NeverCancel};
use animo_model::Model;

use super::helpers::{load_model, print_json, reactant_legend};

/// Result variable names belonging to the reactants with external ids `only`.
fn selected_variables(model: &Model, only: &[String]) -> miette::Result<Vec<String>> {
    let mut names = Vec::new();
    for external in only {
        let r = model
            .reactant_by_external_id(external)
            .ok_or_else(|| miette::miette!("Unknown reactant '{external}'"))?;
        names.push(r.id.clone());
        names.push(format!("{}{QUANTITY_SUFFIX}", r.id));
        names.push(format!("{}{PERCENTAGE_SUFFIX}", r.id));
    }
    Ok(names)
}

pub(crate) fn run_simulate_command(
    network: &Path,
    minutes: f64,
    only: &[String],
    options: &AnalysisOptions,
) -> miette::Result<()> {
    let (_, model) = load_model(network)?;
    let selected = selected_variables(&model, only)?;
    let (result, scale) = simulate_minutes(&model, minutes, options, &NeverCancel)
        .map_err(|e| miette::miette!("{e}"))?;
    let result = if selected.is_empty() {
        result
    } else {
        result.filter(&selected)
    };
    print_json(&serde_json::json!({
        "minutes": minutes,
        "minutes_per_unit": scale,
        "reactants": reactant_legend(&model),
        "series": result,
    }))
}
