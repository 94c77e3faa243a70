use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::sync::OnceLock;
use std::time::Instant;

use animo_model::{LevelResult, Model, ReactantProperty, Series, TimeKey};
use regex::Regex;
use tracing::{debug, info, warn};

use super::{next_line, rest_of_stream};
use crate::compiler::{variable_name, PERCENTAGE_SUFFIX};
use crate::error::{AnalysisError, ParseError};

const IGNORED_NAMES: [&str; 5] = ["c", "r", "r1", "r2", "globalTime"];
const IGNORED_PREFIXES: [&str; 2] = ["input_reactant_", "output_reactant_"];
const IGNORED_SUFFIXES: [&str; 2] = ["_qty_max", "_sem"];
const IGNORED_FRAGMENTS: [&str; 3] = ["_nonofficial", "counter", "metro"];

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([A-Za-z0-9_]+) *= *([0-9]+)").expect("valid assignment pattern")
    })
}

fn global_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"globalTime=([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)")
            .expect("valid globalTime pattern")
    })
}

fn is_auxiliary(name: &str) -> bool {
    IGNORED_NAMES.contains(&name)
        || IGNORED_PREFIXES.iter().any(|p| name.starts_with(p))
        || IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s))
        || IGNORED_FRAGMENTS.iter().any(|f| name.contains(f))
}

/// How a raw integer of a tracked variable becomes a reported value.
#[derive(Debug, Clone, Copy)]
enum Unit {
    Scaled(f64),
    /// Per-mille, reported as percent.
    Percentage,
}

impl Unit {
    fn apply(self, raw: i64) -> f64 {
        match self {
            Unit::Scaled(step) => raw as f64 * step,
            Unit::Percentage => raw as f64 / 10.0,
        }
    }
}

struct Tracked {
    unit: Unit,
    series: Series,
}

/// Variables of `model` a trace may report, with their unit and t = 0 value.
fn owned_variables(model: &Model) -> HashMap<String, (Unit, f64)> {
    let mut owned = HashMap::new();
    for r in model.enabled_reactants() {
        let step = r.step_size;
        owned.insert(
            variable_name(&r.id, ReactantProperty::Activity),
            (Unit::Scaled(step), f64::from(r.initial_level) * step),
        );
        owned.insert(
            variable_name(&r.id, ReactantProperty::Quantity),
            (Unit::Scaled(step), f64::from(r.initial_quantity) * step),
        );
        let percentage = if r.initial_quantity == 0 {
            0.0
        } else {
            100.0 * f64::from(r.initial_level) / f64::from(r.initial_quantity)
        };
        owned.insert(
            format!("{}{PERCENTAGE_SUFFIX}", r.id),
            (Unit::Percentage, percentage),
        );
    }
    owned
}

fn assignments(line: &str) -> impl Iterator<Item = (&str, &str)> {
    assignment_pattern().captures_iter(line).filter_map(|caps| {
        let name = caps.get(1)?.as_str();
        let value = caps.get(2)?.as_str();
        Some((name, value))
    })
}

/// Read the variable line of the next `State` block: the marker line is
/// followed by the process locations, then the assignments.
fn next_state<I>(lines: &mut I) -> Result<Option<String>, AnalysisError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    while let Some(line) = next_line(lines)? {
        if !line.starts_with("State") {
            continue;
        }
        if next_line(lines)?.is_none() {
            return Ok(None);
        }
        return next_line(lines);
    }
    Ok(None)
}

/// Parse a concrete trace printed by the verifier into per-variable series.
///
/// The first state fixes which variables are tracked; their t = 0 values come
/// from the model's initial settings. Every later state must carry a
/// `globalTime`, and states that go back in time are ignored. At equal times
/// the last state wins. Every series ends with a point at `time_to`.
pub fn parse_trace(
    model: &Model,
    reader: impl BufRead,
    time_to: i64,
) -> Result<LevelResult, AnalysisError> {
    info!("Parsing trace");
    let started = Instant::now();
    let mut lines = reader.lines();
    let owned = owned_variables(model);

    let mut tracked: BTreeMap<String, Tracked> = BTreeMap::new();
    if let Some(first) = next_state(&mut lines)? {
        for (name, _) in assignments(&first) {
            if is_auxiliary(name) || tracked.contains_key(name) {
                continue;
            }
            let Some(&(unit, initial)) = owned.get(name) else {
                warn!(variable = name, "Trace variable belongs to no reactant");
                continue;
            };
            let mut series = Series::new();
            series.insert(TimeKey(0.0), initial);
            tracked.insert(name.to_string(), Tracked { unit, series });
        }
    }
    debug!(variables = tracked.len(), "Tracked trace variables");

    let mut time: i64 = 0;
    let mut states = 0usize;
    while let Some(line) = next_state(&mut lines)? {
        states += 1;
        let Some(value) = global_time_pattern()
            .captures(&line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        else {
            let rest = rest_of_stream(&line, &mut lines)?;
            return Err(ParseError::output(
                format!("New state without globalTime. Offending line: \"{line}\""),
                &rest,
            )
            .into());
        };
        // A negative time is earlier than any recorded one, so its state is
        // skipped like any other step back.
        let new_time = value.round() as i64;
        if new_time < time {
            continue;
        }
        time = new_time;
        for (name, raw) in assignments(&line) {
            let Some(entry) = tracked.get_mut(name) else {
                continue;
            };
            let Ok(raw) = raw.parse::<i64>() else {
                continue;
            };
            let level = entry.unit.apply(raw);
            let last = entry.series.values().next_back().copied();
            if last != Some(level) {
                entry.series.insert(TimeKey(time as f64), level);
            }
        }
    }

    let series: BTreeMap<String, Series> = tracked
        .into_iter()
        .map(|(name, mut t)| {
            if let Some(&last) = t.series.values().next_back() {
                t.series.insert(TimeKey(time_to as f64), last);
            }
            (name, t.series)
        })
        .collect();
    info!(
        states,
        series = series.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Trace parsed"
    );
    Ok(LevelResult::new(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::REMAINDER_LIMIT;
    use animo_model::{ModelSettings, Reactant};

    fn model() -> Model {
        let mut m = Model::new(ModelSettings::default());
        let mut a = Reactant::new("R0", "n1", 15).with_initial(5, 15);
        a.step_size = 2.0;
        m.add_reactant(a).unwrap();
        m.add_reactant(Reactant::new("R1", "n2", 15).with_initial(0, 15)).unwrap();
        m
    }

    fn trace(blocks: &[(&str, &str)]) -> String {
        let mut out = String::from("Options for the verification:\n");
        for (time, vars) in blocks {
            out.push_str("State:\n( P0.start P1.reacting )\n");
            out.push_str(&format!("{vars} globalTime={time}\n\nTransitions:\n"));
        }
        out
    }

    #[test]
    fn levels_are_scaled_and_extended_to_the_end() {
        let text = trace(&[
            ("0", "R0=5 R1=0 c=1"),
            ("40", "R0=6 R1=0 c=2"),
            ("100", "R0=6 R1=3 c=3"),
        ]);
        let result = parse_trace(&model(), text.as_bytes(), 200).unwrap();
        assert_eq!(result.reactant_ids(), vec!["R0", "R1"]);
        assert_eq!(result.concentration("R0", 0.0), Some(10.0));
        assert_eq!(result.concentration("R0", 40.0), Some(12.0));
        assert_eq!(result.concentration("R1", 99.0), Some(0.0));
        assert_eq!(result.concentration("R1", 100.0), Some(3.0));
        assert_eq!(result.concentration("R1", 200.0), Some(3.0));
        assert_eq!(result.time_indices(), vec![0.0, 40.0, 100.0, 200.0]);
    }

    #[test]
    fn auxiliary_variables_are_not_tracked() {
        let text = trace(&[(
            "0",
            "R0=5 R0_qty=15 R0_qty_max=15 R0_sem=0 input_reactant_0=1 counter_x=2 r1=0 c=0",
        )]);
        let result = parse_trace(&model(), text.as_bytes(), 10).unwrap();
        assert_eq!(result.reactant_ids(), vec!["R0", "R0_qty"]);
        assert_eq!(result.concentration("R0_qty", 0.0), Some(30.0));
    }

    #[test]
    fn last_state_wins_at_equal_times_and_earlier_states_are_ignored() {
        let text = trace(&[
            ("0", "R0=5"),
            ("50", "R0=7"),
            ("50", "R0=8"),
            ("30", "R0=1"),
        ]);
        let result = parse_trace(&model(), text.as_bytes(), 60).unwrap();
        assert_eq!(result.concentration("R0", 50.0), Some(16.0));
        assert_eq!(result.concentration("R0", 60.0), Some(16.0));
    }

    #[test]
    fn percentages_are_reported_in_percent() {
        let text = trace(&[("0", "R0_perc=333"), ("10", "R0_perc=500")]);
        let result = parse_trace(&model(), text.as_bytes(), 10).unwrap();
        let initial = result.concentration("R0_perc", 0.0).unwrap();
        assert!((initial - 100.0 * 5.0 / 15.0).abs() < 1e-9);
        assert_eq!(result.concentration("R0_perc", 10.0), Some(50.0));
    }

    #[test]
    fn state_without_time_is_an_error() {
        let text = "State:\n( P0.start )\nR0=5\nState:\n( P0.start )\nR0=6\n";
        let err = parse_trace(&model(), text.as_bytes(), 10).unwrap_err();
        assert!(err.to_string().contains("New state without globalTime"));
    }

    #[test]
    fn state_without_time_keeps_the_rest_of_the_output() {
        let mut text = trace(&[("0", "R0=5 R1=0")]);
        text.push_str("State:\n( P0.start )\nR0=3\n");
        text.push_str(&trace(&[("20", "R0=4")]));
        text.push_str("trailing junk\n");
        let err = parse_trace(&model(), text.as_bytes(), 30).unwrap_err();
        let AnalysisError::Parse(ParseError::Output { message, remainder }) = err else {
            panic!("expected an output error");
        };
        assert!(message.contains("\"R0=3\""));
        assert!(remainder.starts_with("R0=3\n"), "remainder={remainder}");
        assert!(remainder.contains("R0=4 globalTime=20"));
        assert!(remainder.ends_with("trailing junk\n"));
    }

    #[test]
    fn long_remainders_are_bounded() {
        let mut text = trace(&[("0", "R0=5")]);
        text.push_str("State:\n( P0.start )\nR0=3\n");
        for i in 0..2000 {
            text.push_str(&format!("filler line {i}\n"));
        }
        text.push_str("last line\n");
        let err = parse_trace(&model(), text.as_bytes(), 30).unwrap_err();
        let AnalysisError::Parse(ParseError::Output { remainder, .. }) = err else {
            panic!("expected an output error");
        };
        assert!(text.len() > 2 * REMAINDER_LIMIT);
        assert!(remainder.len() < REMAINDER_LIMIT + 64, "len={}", remainder.len());
        assert!(remainder.starts_with("R0=3\n"));
        assert!(remainder.ends_with("last line\n"));
        assert!(remainder.contains("bytes omitted"));
    }

    #[test]
    fn negative_times_count_as_going_back() {
        let text = trace(&[("0", "R0=5"), ("-20", "R0=9"), ("10", "R0=6")]);
        let result = parse_trace(&model(), text.as_bytes(), 30).unwrap();
        assert_eq!(result.time_indices(), vec![0.0, 10.0, 30.0]);
        assert_eq!(result.concentration("R0", 5.0), Some(10.0));
        assert_eq!(result.concentration("R0", 10.0), Some(12.0));
    }

    #[test]
    fn exponent_times_are_rounded() {
        let text = trace(&[("0", "R0=5"), ("1.5e+01", "R0=9")]);
        let result = parse_trace(&model(), text.as_bytes(), 20).unwrap();
        assert_eq!(result.concentration("R0", 15.0), Some(18.0));
        assert_eq!(result.concentration("R0", 14.0), Some(10.0));
    }

    #[test]
    fn unknown_variables_are_skipped() {
        let text = trace(&[("0", "R7=5 R0=5")]);
        let result = parse_trace(&model(), text.as_bytes(), 10).unwrap();
        assert_eq!(result.reactant_ids(), vec!["R0"]);
    }

    #[test]
    fn output_without_states_gives_an_empty_result() {
        let result = parse_trace(&model(), "nothing here\n".as_bytes(), 10).unwrap();
        assert!(result.is_empty());
    }
}
