use std::path::Path;

use animo_engine::{analyze_smc, translate_query, AnalysisOptions, NeverCancel};
use tracing::info;

use super::helpers::{load_model, print_json};

pub(crate) fn run_smc_command(
    network: &Path,
    query: &str,
    options: &AnalysisOptions,
) -> miette::Result<()> {
    let (_, model) = load_model(network)?;
    let translated = translate_query(query, &model).map_err(|e| miette::miette!("{e}"))?;
    info!(query = %translated, "Translated query");
    let result = analyze_smc(&model, &translated, options, &NeverCancel)
        .map_err(|e| miette::miette!("{e}"))?;
    print_json(&serde_json::json!({
        "query": query,
        "translated_query": translated,
        "result": result,
        "summary": result.to_string(),
    }))
}
