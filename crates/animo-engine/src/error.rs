use std::path::PathBuf;
use std::time::Duration;

use animo_model::{ModelError, TableError};
use animo_scenario::ScenarioError;
use thiserror::Error;

/// Unparsed verifier output kept in an error is capped at this many bytes.
pub const REMAINDER_LIMIT: usize = 4096;

/// A model problem report keeps this many characters from each end.
const EXCERPT_EDGE: usize = 100;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Compilation error: {0}")]
    Compilation(#[from] CompilationError),
    #[error("Verifier error: {0}")]
    Process(#[from] ProcessError),
    #[error("Output parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Analysis cancelled by the user")]
    Cancelled,
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("a simulation of {minutes} minutes is shorter than one model time unit")]
    Horizon { minutes: f64 },
}

impl AnalysisError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }
}

/// The model cannot be turned into a well-formed specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    #[error("The number of dimensions for the reaction {reaction} is not {expected} as expected (found {found})")]
    Dimensions {
        reaction: String,
        expected: usize,
        found: usize,
    },
    #[error("reaction {reaction} has no time table")]
    MissingTable { reaction: String },
    #[error("time table of reaction {reaction} has shape {found:?}, expected {expected:?}")]
    TableShape {
        reaction: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("reaction {reaction} refers to unknown reactant '{reactant}'")]
    UnknownReactant { reaction: String, reactant: String },
    #[error("reaction {reaction} is enabled but reactant '{reactant}' is not")]
    DisabledReactant { reaction: String, reactant: String },
    #[error("reaction {reaction} lists {targets} influenced properties but {values} influence values")]
    InfluenceValues {
        reaction: String,
        targets: usize,
        values: usize,
    },
    #[error("reaction {reaction} influences no reactant")]
    NoInfluence { reaction: String },
    #[error("reaction {reaction} cannot change '{target}': only activity and quantity can be influenced")]
    UnsupportedInfluence { reaction: String, target: String },
    #[error("template {template} is needed with different shapes by {first} and {second}")]
    TemplateConflict {
        template: String,
        first: String,
        second: String,
    },
    #[error("invalid time table: {0}")]
    Table(#[from] TableError),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("verifier not found: {path}")]
    VerifierNotFound { path: PathBuf },
    #[error("cannot start verifier: {0}")]
    Spawn(String),
    #[error("I/O error while talking to the verifier: {0}")]
    Io(#[from] std::io::Error),
    #[error("[{model_file}] Verify result: {code}\n{stderr}\n(current directory: {cwd})")]
    Failed {
        model_file: String,
        code: i32,
        stderr: String,
        cwd: String,
    },
    #[error("verifier timed out after {after:?}")]
    TimedOut { after: Duration },
}

/// Verifier output that matches none of the known shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{message}\nUnparsed output:\n{remainder}")]
    Output { message: String, remainder: String },
    #[error("the verifier reported a problem with the model: {excerpt}")]
    ModelProblem { excerpt: String },
    #[error("cannot translate query '{query}': {message}")]
    Query { query: String, message: String },
}

impl ParseError {
    pub fn output(message: impl Into<String>, remainder: &str) -> Self {
        ParseError::Output {
            message: message.into(),
            remainder: bound_remainder(remainder),
        }
    }

    pub fn model_problem(text: &str) -> Self {
        ParseError::ModelProblem {
            excerpt: excerpt(text),
        }
    }
}

fn floor_boundary(s: &str, mut at: usize) -> usize {
    while !s.is_char_boundary(at) {
        at -= 1;
    }
    at
}

fn ceil_boundary(s: &str, mut at: usize) -> usize {
    while !s.is_char_boundary(at) {
        at += 1;
    }
    at
}

/// Keep the head and tail of `text` within [`REMAINDER_LIMIT`] bytes.
pub fn bound_remainder(text: &str) -> String {
    if text.len() <= REMAINDER_LIMIT {
        return text.to_string();
    }
    let half = REMAINDER_LIMIT / 2;
    let head = floor_boundary(text, half);
    let tail = ceil_boundary(text, text.len() - half);
    format!(
        "{}\n[... {} bytes omitted ...]\n{}",
        &text[..head],
        tail - head,
        &text[tail..]
    )
}

fn excerpt(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 2 * EXCERPT_EDGE {
        return text.to_string();
    }
    let head: String = chars[..EXCERPT_EDGE].iter().collect();
    let tail: String = chars[chars.len() - EXCERPT_EDGE..].iter().collect();
    format!("{head} [...] {tail}")
}
