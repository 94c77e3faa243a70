//! Analysis entry points: compile, run the verifier, interpret.

use std::time::Duration;

use animo_model::{LevelResult, Model, SmcResult};
use tracing::info;

use crate::compiler::{compile_model, CompiledModel};
use crate::error::{AnalysisError, ParseError, ProcessError};
use crate::interpreter::{parse_smc, parse_trace};
use crate::orchestrator::{CancelCheck, PollIntervals, Verifier, VerifierConfig, VerifierMode};
use crate::query::{simulation_horizon, simulation_query};

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub verifier: VerifierConfig,
    /// `None` lets the verifier run until it finishes or is cancelled.
    pub timeout: Option<Duration>,
    pub poll: PollIntervals,
    /// Keep the generated model, query and output files for inspection.
    pub keep_files: bool,
}

impl AnalysisOptions {
    fn verifier(&self) -> Result<Verifier, ProcessError> {
        Ok(Verifier::new(&self.verifier)?
            .with_poll(self.poll)
            .with_timeout(self.timeout)
            .keep_files(self.keep_files))
    }
}

pub fn compile(model: &Model) -> Result<CompiledModel, AnalysisError> {
    Ok(compile_model(model)?)
}

/// Simulate `model` for `time_to` model time units.
pub fn analyze(
    model: &Model,
    time_to: i64,
    options: &AnalysisOptions,
    cancel: &dyn CancelCheck,
) -> Result<LevelResult, AnalysisError> {
    let verifier = options.verifier()?;
    let compiled = compile(model)?;
    let query = simulation_query(time_to);
    info!(time_to, "Starting simulation");
    let trace = verifier.run(VerifierMode::Simulation, &compiled.text, &query, cancel)?;
    let result = parse_trace(model, trace.as_bytes(), time_to)?;
    if result.is_empty() {
        return Err(ParseError::output("The verifier produced no usable trace", &trace).into());
    }
    Ok(result)
}

/// Answer an already translated SMC `query` on `model`.
pub fn analyze_smc(
    model: &Model,
    query: &str,
    options: &AnalysisOptions,
    cancel: &dyn CancelCheck,
) -> Result<SmcResult, AnalysisError> {
    let verifier = options.verifier()?;
    let compiled = compile(model)?;
    info!(query, "Starting SMC analysis");
    let report = verifier.run(VerifierMode::Smc, &compiled.text, query, cancel)?;
    let result = parse_smc(report.as_bytes())?;
    info!(result = %result, "SMC analysis done");
    Ok(result)
}

/// Simulate `model` for `minutes` of real time. Also returns the minutes each
/// model time unit stands for.
pub fn simulate_minutes(
    model: &Model,
    minutes: f64,
    options: &AnalysisOptions,
    cancel: &dyn CancelCheck,
) -> Result<(LevelResult, f64), AnalysisError> {
    let (time_to, scale) = simulation_horizon(minutes, model.settings.seconds_per_point);
    if time_to <= 0 {
        return Err(AnalysisError::Horizon { minutes });
    }
    let result = analyze(model, time_to, options, cancel)?;
    Ok((result, scale))
}
