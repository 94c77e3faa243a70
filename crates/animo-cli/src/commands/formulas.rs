use std::path::Path;

use animo_scenario::{FormulaVariable, Scenario};

use super::helpers::{load_network, print_json};

fn describe(scenario: &Scenario) -> serde_json::Value {
    let linked: Vec<&str> = match scenario {
        Scenario::User(formula) => formula
            .linked_variables()
            .map(FormulaVariable::name)
            .collect(),
        _ => Vec::new(),
    };
    serde_json::json!({
        "name": scenario.name(),
        "formula": scenario.formula(),
        "user_defined": scenario.is_user_formula(),
        "parameters": scenario.default_parameters(),
        "linked_variables": linked,
    })
}

pub(crate) fn run_formulas_command(network: &Path) -> miette::Result<()> {
    let desc = load_network(network)?;
    let registry = desc
        .scenario_registry()
        .map_err(|e| miette::miette!("Invalid user formulas: {e}"))?;
    let scenarios: Vec<serde_json::Value> = registry.iter().map(describe).collect();
    print_json(&serde_json::Value::Array(scenarios))
}
