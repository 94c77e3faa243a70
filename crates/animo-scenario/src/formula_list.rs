//! Flat string-list encoding of user formulas, as embedded in networks.
//!
//! Layout: `(name, formula, variable*, ";")* "#"`, where each variable is
//! written `name=P:<default>` or `name=V:<reactant.property>`.

use crate::errors::ScenarioError;
use crate::scenario::{FormulaVariable, UserFormula};

pub const VARIABLES_SEPARATOR: &str = ";";
pub const LIST_END: &str = "#";

/// Decode every formula in `list`. A list that does not end with the end
/// marker is incomplete and rejected.
pub fn read_formulae(list: &[String]) -> Result<Vec<UserFormula>, ScenarioError> {
    if list.last().map(String::as_str) != Some(LIST_END) {
        return Err(ScenarioError::MalformedFormulaList(
            "list does not end with the end marker".into(),
        ));
    }

    let mut formulas = Vec::new();
    let mut it = list.iter().map(String::as_str);
    while let Some(name) = it.next() {
        if name == LIST_END {
            break;
        }
        let source = it.next().ok_or_else(|| {
            ScenarioError::MalformedFormulaList(format!("formula '{name}' has no text"))
        })?;
        let mut variables = Vec::new();
        loop {
            match it.next() {
                Some(VARIABLES_SEPARATOR) => break,
                Some(LIST_END) | None => {
                    return Err(ScenarioError::MalformedFormulaList(format!(
                        "formula '{name}' is not terminated by '{VARIABLES_SEPARATOR}'"
                    )))
                }
                Some(entry) => variables.push(entry.parse::<FormulaVariable>()?),
            }
        }
        formulas.push(UserFormula::new(name, source, variables)?);
    }
    Ok(formulas)
}

fn encode(formula: &UserFormula) -> Vec<String> {
    let mut out = vec![formula.name().to_string(), formula.source().to_string()];
    out.extend(formula.variables().iter().map(ToString::to_string));
    out.push(VARIABLES_SEPARATOR.to_string());
    out
}

/// Start offset of the entry called `name`, and the offset just past its
/// separator.
fn locate(list: &[String], name: &str) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < list.len() && list[i] != LIST_END {
        let start = i;
        let end = list[i..]
            .iter()
            .position(|s| s == VARIABLES_SEPARATOR)
            .map(|p| i + p + 1)?;
        if list[start] == name {
            return Some((start, end));
        }
        i = end;
    }
    None
}

/// Insert `formula` before the end marker, creating the list if needed.
pub fn add_formula(list: Option<Vec<String>>, formula: &UserFormula) -> Vec<String> {
    let mut list = list.unwrap_or_default();
    let at = match list.iter().position(|s| s == LIST_END) {
        Some(p) => p,
        None => {
            list.push(LIST_END.to_string());
            list.len() - 1
        }
    };
    list.splice(at..at, encode(formula));
    list
}

/// Replace the entry called `old_name` with `formula`, keeping its position.
pub fn update_formula(
    mut list: Vec<String>,
    old_name: &str,
    formula: &UserFormula,
) -> Result<Vec<String>, ScenarioError> {
    let (start, end) =
        locate(&list, old_name).ok_or_else(|| ScenarioError::UnknownFormula(old_name.into()))?;
    list.splice(start..end, encode(formula));
    Ok(list)
}

pub fn delete_formula(mut list: Vec<String>, name: &str) -> Result<Vec<String>, ScenarioError> {
    let (start, end) =
        locate(&list, name).ok_or_else(|| ScenarioError::UnknownFormula(name.into()))?;
    list.drain(start..end);
    Ok(list)
}
