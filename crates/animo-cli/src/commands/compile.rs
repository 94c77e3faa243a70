use std::path::Path;

use animo_engine::compile;
use miette::IntoDiagnostic;
use tracing::info;

use super::helpers::load_model;

pub(crate) fn run_compile_command(network: &Path, out: Option<&Path>) -> miette::Result<()> {
    let (_, model) = load_model(network)?;
    let compiled = compile(&model).map_err(|e| miette::miette!("{e}"))?;
    match out {
        Some(path) => {
            std::fs::write(path, &compiled.text).into_diagnostic()?;
            info!(path = %path.display(), bytes = compiled.text.len(), "Model written");
        }
        None => print!("{}", compiled.text),
    }
    Ok(())
}
