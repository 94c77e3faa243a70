use std::io::{self, BufRead};

use animo_model::SmcResult;
use tracing::{debug, info};

use super::{next_line, rest_of_stream};
use crate::error::{AnalysisError, ParseError};

const PROPERTY_MARKER: &str = "-- Property is";
const CONFIDENCE_MARKER: &str = "with confidence ";
const TRUE_MARKERS: [&str; 2] = ["runs) H", "runs) Pr(..)/Pr(..)"];

/// Parse the report of a statistical query.
///
/// A `NOT` on the property line means false; one of the hypothesis-test
/// markers on the next line means true; anything else on that line must be a
/// `[lower, upper]` probability interval.
pub fn parse_smc(reader: impl BufRead) -> Result<SmcResult, AnalysisError> {
    info!("Parsing SMC result");
    let mut lines = reader.lines();
    let mut seen = String::new();

    while let Some(line) = next_line(&mut lines)? {
        if !line.contains(PROPERTY_MARKER) {
            seen.push_str(&line);
            seen.push('\n');
            continue;
        }
        if line.contains("NOT") {
            let confidence = find_confidence(&line, &mut lines)?;
            return Ok(SmcResult::boolean(false, confidence));
        }
        let Some(next) = next_line(&mut lines)? else {
            return Ok(SmcResult::boolean(true, 1.0));
        };
        if TRUE_MARKERS.iter().any(|m| next.contains(m)) {
            let confidence = find_confidence(&next, &mut lines)?;
            return Ok(SmcResult::boolean(true, confidence));
        }
        let Some((lower, upper)) = interval(&next) else {
            let rest = rest_of_stream(&next, &mut lines)?;
            return Err(ParseError::output(
                format!("Unable to understand probability bounds for the result \"{next}\""),
                &rest,
            )
            .into());
        };
        let confidence = find_confidence(&next, &mut lines)?;
        debug!(lower, upper, confidence, "SMC interval");
        return Ok(SmcResult::interval(lower, upper, confidence));
    }

    Err(ParseError::output("Unable to understand verifier SMC output", &seen).into())
}

fn interval(line: &str) -> Option<(f64, f64)> {
    let open = line.find('[')?;
    let comma = line.rfind(',')?;
    let close = line.rfind(']')?;
    if !(open < comma && comma < close) {
        return None;
    }
    let lower = line[open + 1..comma].trim().parse().ok()?;
    let upper = line[comma + 1..close].trim().parse().ok()?;
    Some((lower, upper))
}

/// Find the `with confidence <value>` trailer, starting at `current`.
///
/// A `State` dump on the way means the verifier rejected the model.
fn find_confidence<I>(current: &str, lines: &mut I) -> Result<f64, AnalysisError>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut saved = format!("{current}\n");
    let mut found = current.contains(CONFIDENCE_MARKER).then(|| current.to_string());
    let mut model_problem = false;
    while found.is_none() {
        let Some(line) = next_line(lines)? else {
            break;
        };
        saved.push_str(&line);
        saved.push('\n');
        if line.contains(CONFIDENCE_MARKER) {
            found = Some(line);
        } else if line.starts_with("State") {
            model_problem = true;
        }
    }

    if model_problem {
        return Err(ParseError::model_problem(&saved).into());
    }
    let Some(line) = found else {
        return Err(ParseError::output("Unable to understand verifier SMC output", &saved).into());
    };
    let value = line
        .find(CONFIDENCE_MARKER)
        .map(|at| &line[at + CONFIDENCE_MARKER.len()..])
        .unwrap_or_default();
    let value = value.trim().strip_suffix('.').unwrap_or(value.trim());
    Ok(value.trim().parse().unwrap_or(-1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::REMAINDER_LIMIT;
    use animo_model::SmcVerdict;

    fn parse(text: &str) -> Result<SmcResult, AnalysisError> {
        parse_smc(text.as_bytes())
    }

    #[test]
    fn hypothesis_true() {
        let text = "Verifying formula 1 at line 1\n -- Property is satisfied.\n (35 runs) H0: Pr(..) >= 0.5 accepted with confidence 0.95.\n";
        assert_eq!(parse(text).unwrap(), SmcResult::boolean(true, 0.95));
    }

    #[test]
    fn comparison_true_with_confidence_on_a_later_line() {
        let text = " -- Property is satisfied.\n (70 runs) Pr(..)/Pr(..) >= 1.2\n with confidence 0.9.\n";
        assert_eq!(parse(text).unwrap(), SmcResult::boolean(true, 0.9));
    }

    #[test]
    fn not_satisfied() {
        let text = " -- Property is NOT satisfied with confidence 0.99.\n";
        assert_eq!(parse(text).unwrap(), SmcResult::boolean(false, 0.99));
    }

    #[test]
    fn probability_interval() {
        let text = " -- Property is satisfied.\n Pr(<> ...) in [0.10,0.42] with confidence 0.95.\n";
        assert_eq!(parse(text).unwrap(), SmcResult::interval(0.10, 0.42, 0.95));
    }

    #[test]
    fn end_of_input_after_property_line() {
        assert_eq!(
            parse(" -- Property is satisfied.").unwrap(),
            SmcResult::boolean(true, 1.0)
        );
    }

    #[test]
    fn unreadable_confidence_is_minus_one() {
        let text = " -- Property is NOT satisfied with confidence high.\n";
        let result = parse(text).unwrap();
        assert_eq!(result.verdict, SmcVerdict::Boolean(false));
        assert_eq!(result.confidence, -1.0);
    }

    #[test]
    fn state_dump_is_a_model_problem() {
        let text = " -- Property is NOT satisfied.\nState:\n( P0.start )\nR0=1 globalTime=0\n with confidence 0.9.\n";
        let err = parse(text).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Parse(ParseError::ModelProblem { .. })
        ));
    }

    #[test]
    fn unknown_output_is_an_error_with_the_text() {
        let err = parse("syntax error at line 3\n").unwrap_err();
        let AnalysisError::Parse(ParseError::Output { remainder, .. }) = err else {
            panic!("expected an output error");
        };
        assert!(remainder.contains("syntax error at line 3"));
    }

    #[test]
    fn malformed_interval_is_an_error() {
        let text = " -- Property is satisfied.\n Pr(<> ...) in 0.10 to 0.42\n";
        assert!(matches!(
            parse(text).unwrap_err(),
            AnalysisError::Parse(ParseError::Output { .. })
        ));
    }

    #[test]
    fn malformed_interval_keeps_the_unread_output() {
        let text = "Verifying formula 1\n -- Property is satisfied.\n garbage line without bounds\n trailing text\n";
        let AnalysisError::Parse(ParseError::Output { message, remainder }) = parse(text).unwrap_err()
        else {
            panic!("expected an output error");
        };
        assert!(message.contains("garbage line without bounds"));
        assert_eq!(remainder, " garbage line without bounds\n trailing text\n");
    }

    #[test]
    fn long_unread_output_is_bounded() {
        let mut text = String::from(" -- Property is satisfied.\n no bounds here\n");
        for i in 0..2000 {
            text.push_str(&format!(" runs so far {i}\n"));
        }
        text.push_str(" final line\n");
        let AnalysisError::Parse(ParseError::Output { remainder, .. }) = parse(&text).unwrap_err()
        else {
            panic!("expected an output error");
        };
        assert!(remainder.len() < REMAINDER_LIMIT + 64, "len={}", remainder.len());
        assert!(remainder.starts_with(" no bounds here\n"));
        assert!(remainder.ends_with(" final line\n"));
    }
}
