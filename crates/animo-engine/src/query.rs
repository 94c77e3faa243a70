//! Queries handed to the verifier.

use std::sync::OnceLock;

use animo_model::Model;
use regex::Regex;

use crate::error::ParseError;

fn time_bound_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Pr\[(<=?)([^\]]*)\]").expect("valid time bound pattern"))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `E<>`, `A[]` and friends: a name right before `<>` or `[]` is a path
/// quantifier, not a reactant.
fn is_path_quantifier(after: &str) -> bool {
    after.starts_with("<>") || after.starts_with("[]")
}

/// Rewrite a user query over reactant aliases and minutes into one over
/// compiled ids and model time units.
///
/// Aliases only match as whole names (not inside a longer identifier); when
/// several match at the same place the longest wins. Every `Pr[<=T]` or
/// `Pr[<T]` bound is converted from minutes with the model's seconds per
/// point.
pub fn translate_query(query: &str, model: &Model) -> Result<String, ParseError> {
    let mut aliases: Vec<(&str, &str)> = model
        .enabled_reactants()
        .filter(|r| !r.alias.is_empty())
        .map(|r| (r.alias.as_str(), r.id.as_str()))
        .collect();
    aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

    let mut renamed = String::with_capacity(query.len());
    let mut rest = query;
    let mut prev: Option<char> = None;
    'scan: while let Some(c) = rest.chars().next() {
        if !prev.is_some_and(is_ident_char) {
            for (alias, id) in &aliases {
                if let Some(after) = rest.strip_prefix(alias) {
                    if !after.chars().next().is_some_and(is_ident_char)
                        && !is_path_quantifier(after)
                    {
                        renamed.push_str(id);
                        prev = alias.chars().last();
                        rest = after;
                        continue 'scan;
                    }
                }
            }
        }
        renamed.push(c);
        prev = Some(c);
        rest = &rest[c.len_utf8()..];
    }

    rescale_time_bounds(&renamed, model.settings.seconds_per_point).map_err(|message| {
        ParseError::Query {
            query: query.to_string(),
            message,
        }
    })
}

fn rescale_time_bounds(query: &str, seconds_per_point: f64) -> Result<String, String> {
    let mut out = String::with_capacity(query.len());
    let mut last = 0;
    for caps in time_bound_pattern().captures_iter(query) {
        let (Some(whole), Some(op), Some(time)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let text = time.as_str().trim();
        let minutes: f64 = text
            .parse()
            .map_err(|_| format!("Problems with the identification of time string \"{text}\""))?;
        let units = (minutes * 60.0 / seconds_per_point) as i64;
        out.push_str(&query[last..whole.start()]);
        out.push_str(&format!("Pr[{}{units}]", op.as_str()));
        last = whole.end();
    }
    out.push_str(&query[last..]);
    Ok(out)
}

/// Model time units covering `minutes`, and the minutes each unit stands
/// for. The scale is 0 when the horizon is shorter than one unit.
pub fn simulation_horizon(minutes: f64, seconds_per_point: f64) -> (i64, f64) {
    let time_to = (minutes * 60.0 / seconds_per_point) as i64;
    let scale = if time_to > 0 {
        minutes / time_to as f64
    } else {
        0.0
    };
    (time_to, scale)
}

/// Reachability query that makes the verifier run a trace up to `time_to`.
pub fn simulation_query(time_to: i64) -> String {
    format!("E<> (globalTime > {time_to})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use animo_model::{ModelSettings, Reactant};

    fn model() -> Model {
        let mut m = Model::new(ModelSettings::default());
        m.add_reactant(Reactant::new("R0", "n1", 15).with_alias("MK2")).unwrap();
        m.add_reactant(Reactant::new("R1", "n2", 15).with_alias("MK2P")).unwrap();
        m.add_reactant(Reactant::new("R2", "n3", 15).with_alias("E")).unwrap();
        m
    }

    #[test]
    fn aliases_and_minutes_are_translated() {
        let q = translate_query("Pr[<=240](<> MK2 > 40)", &model()).unwrap();
        assert_eq!(q, "Pr[<=1200](<> R0 > 40)");
    }

    #[test]
    fn longest_alias_wins_and_prefixes_are_untouched() {
        let q = translate_query("Pr[<60]([] MK2P >= MK2 && E < 3)", &model()).unwrap();
        assert_eq!(q, "Pr[<300]([] R1 >= R0 && R2 < 3)");
    }

    #[test]
    fn alias_inside_identifier_is_kept() {
        let q = translate_query("E<> Ex > 1", &model()).unwrap();
        assert_eq!(q, "E<> Ex > 1");
    }

    #[test]
    fn non_numeric_time_is_an_error() {
        let err = translate_query("Pr[<=soon](<> MK2 > 1)", &model()).unwrap_err();
        assert!(matches!(err, ParseError::Query { .. }));
        assert!(err.to_string().contains("\"soon\""));
    }

    #[test]
    fn horizon_and_scale() {
        assert_eq!(simulation_horizon(120.0, 12.0), (600, 0.2));
        assert_eq!(simulation_horizon(0.1, 12.0), (0, 0.0));
        assert_eq!(simulation_query(600), "E<> (globalTime > 600)");
    }
}
