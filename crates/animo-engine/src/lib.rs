#![doc = include_str!("../README.md")]

//! ANIMO analysis engine.
//!
//! Errors from every stage funnel into [`AnalysisError`]; callers that only
//! want to tell a user abort apart from a failure can match on
//! [`AnalysisError::Cancelled`].

pub mod compiler;
pub mod error;
pub mod interpreter;
pub mod network;
pub mod orchestrator;
pub mod pipeline;
pub mod query;

pub use compiler::{compile_model, CompiledModel};
pub use error::{AnalysisError, CompilationError, ParseError, ProcessError};
pub use interpreter::{parse_smc, parse_trace};
pub use network::{assemble_model, NetworkDescription, ReactantDescription, ReactionDescription};
pub use orchestrator::{
    CancelCheck, CancellationToken, NeverCancel, PollIntervals, Verifier, VerifierConfig,
    VerifierMode,
};
pub use pipeline::{analyze, analyze_smc, compile, simulate_minutes, AnalysisOptions};
pub use query::{simulation_horizon, simulation_query, translate_query};
