//! Turning verifier output back into results.

mod smc;
mod trace;

pub use smc::parse_smc;
pub use trace::parse_trace;

use std::io;

use crate::error::{AnalysisError, ProcessError};

fn next_line<I>(lines: &mut I) -> Result<Option<String>, AnalysisError>
where
    I: Iterator<Item = io::Result<String>>,
{
    Ok(lines.next().transpose().map_err(ProcessError::Io)?)
}

/// `current` followed by every line still left in `lines`.
fn rest_of_stream<I>(current: &str, lines: &mut I) -> Result<String, AnalysisError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut rest = format!("{current}\n");
    while let Some(line) = next_line(lines)? {
        rest.push_str(&line);
        rest.push('\n');
    }
    Ok(rest)
}
