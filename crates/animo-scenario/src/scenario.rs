//! Kinetic scenarios: built-in rate laws and user formulas.

use std::fmt;
use std::str::FromStr;

use animo_model::ReactantParameter;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::Expr;
use crate::errors::{FormulaError, ScenarioError};
use crate::eval::Bindings;
use crate::parser::parse_formula;

/// Named kinetic constants, e.g. `k = 0.01`.
pub type Parameters = IndexMap<String, f64>;

/// Catalyst activity level in the built-in laws.
pub const CATALYST_VARIABLE: &str = "E";
/// Substrate's unreacted level in the built-in laws.
pub const SUBSTRATE_VARIABLE: &str = "S";

/// Rate laws that ship with every registry.
///
/// `E` is the catalyst level, `S` the substrate's unreacted level (the row
/// of the Bi table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinScenario {
    /// `k * E`
    Linear,
    /// `k * E * S`
    MassAction,
    /// `k2 * E * S / (km + S)`, with `S` rescaled onto `Stot`.
    MichaelisMenten,
}

impl BuiltinScenario {
    pub const ALL: [BuiltinScenario; 3] = [
        BuiltinScenario::Linear,
        BuiltinScenario::MassAction,
        BuiltinScenario::MichaelisMenten,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinScenario::Linear => "Scenario 1",
            BuiltinScenario::MassAction => "Scenario 2",
            BuiltinScenario::MichaelisMenten => "Scenario 3",
        }
    }

    pub fn formula(self) -> &'static str {
        match self {
            BuiltinScenario::Linear => "k * E",
            BuiltinScenario::MassAction => "k * E * S",
            BuiltinScenario::MichaelisMenten => "k2 * E * S / (km + S)",
        }
    }

    pub fn default_parameters(self) -> &'static [(&'static str, f64)] {
        match self {
            BuiltinScenario::Linear => &[("k", 0.01)],
            BuiltinScenario::MassAction => &[("k", 0.001)],
            BuiltinScenario::MichaelisMenten => &[("k2", 0.01), ("km", 10.0), ("Stot", 15.0)],
        }
    }

    /// Rate at catalyst level `e` and substrate row `s`, for a substrate
    /// table with `n_s` rows.
    pub fn compute_rate(
        self,
        params: &Parameters,
        e: usize,
        s: usize,
        n_s: usize,
    ) -> Result<f64, ScenarioError> {
        let get = |name: &str| -> Result<f64, ScenarioError> {
            params
                .get(name)
                .copied()
                .ok_or_else(|| ScenarioError::MissingParameter {
                    scenario: self.name().to_string(),
                    parameter: name.to_string(),
                })
        };
        let e = e as f64;
        let s = s as f64;
        Ok(match self {
            BuiltinScenario::Linear => get("k")? * e,
            BuiltinScenario::MassAction => get("k")? * e * s,
            BuiltinScenario::MichaelisMenten => {
                let (k2, km, stot) = (get("k2")?, get("km")?, get("Stot")?);
                let s = if n_s == 0 {
                    stot
                } else {
                    stot - (s * stot / n_s as f64).round()
                };
                k2 * e * s / (km + s)
            }
        })
    }
}

/// Self-targeting law used by every Mono reaction: `k * A`.
pub struct MonoScenario;

impl MonoScenario {
    pub const PARAMETER: &'static str = "k";
    pub const DEFAULT_K: f64 = 0.01;

    pub const NAME: &'static str = "Mono";

    pub fn default_parameters() -> Parameters {
        Parameters::from([(Self::PARAMETER.to_string(), Self::DEFAULT_K)])
    }

    pub fn compute_rate(params: &Parameters, level: usize) -> Result<f64, ScenarioError> {
        let k = params
            .get(Self::PARAMETER)
            .copied()
            .ok_or_else(|| ScenarioError::MissingParameter {
                scenario: Self::NAME.to_string(),
                parameter: Self::PARAMETER.to_string(),
            })?;
        Ok(k * level as f64)
    }
}

/// A variable declared by a user formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormulaVariable {
    /// Constant with a default value, overridable per reaction.
    Parameter { name: String, default: f64 },
    /// Bound to a reactant property; it ranges over that reactant's levels.
    /// Unset in a registry entry, since the binding belongs to a reaction.
    Linked {
        name: String,
        reactant_property: Option<ReactantParameter>,
    },
}

impl FormulaVariable {
    const PARAMETER_TAG: &'static str = "P:";
    const LINKED_TAG: &'static str = "V:";

    pub fn parameter(name: impl Into<String>, default: f64) -> Self {
        FormulaVariable::Parameter {
            name: name.into(),
            default,
        }
    }

    pub fn linked(name: impl Into<String>, reactant_property: Option<ReactantParameter>) -> Self {
        FormulaVariable::Linked {
            name: name.into(),
            reactant_property,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormulaVariable::Parameter { name, .. } | FormulaVariable::Linked { name, .. } => name,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, FormulaVariable::Parameter { .. })
    }
}

impl fmt::Display for FormulaVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaVariable::Parameter { name, default } => {
                write!(f, "{name}={}{default}", Self::PARAMETER_TAG)
            }
            FormulaVariable::Linked {
                name,
                reactant_property,
            } => {
                write!(f, "{name}={}", Self::LINKED_TAG)?;
                if let Some(rp) = reactant_property {
                    write!(f, "{rp}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for FormulaVariable {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ScenarioError::MalformedFormulaList(format!("bad variable entry '{s}'"));
        let (name, rest) = s.split_once('=').ok_or_else(malformed)?;
        if name.is_empty() {
            return Err(malformed());
        }
        if let Some(value) = rest.strip_prefix(Self::PARAMETER_TAG) {
            let default = value.trim().parse::<f64>().map_err(|_| malformed())?;
            Ok(FormulaVariable::parameter(name, default))
        } else if let Some(link) = rest.strip_prefix(Self::LINKED_TAG) {
            let reactant_property = (!link.is_empty()).then(|| ReactantParameter::parse(link));
            Ok(FormulaVariable::linked(name, reactant_property))
        } else {
            Err(malformed())
        }
    }
}

impl TryFrom<String> for FormulaVariable {
    type Error = ScenarioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FormulaVariable> for String {
    fn from(value: FormulaVariable) -> Self {
        value.to_string()
    }
}

/// A rate law written by the user.
///
/// The text is parsed when the formula is built, so syntax errors and
/// undeclared names surface at registration rather than at table generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawUserFormula", into = "RawUserFormula")]
pub struct UserFormula {
    name: String,
    source: String,
    expr: Expr,
    variables: Vec<FormulaVariable>,
}

#[derive(Serialize, Deserialize)]
struct RawUserFormula {
    name: String,
    formula: String,
    #[serde(default)]
    variables: Vec<FormulaVariable>,
}

impl TryFrom<RawUserFormula> for UserFormula {
    type Error = FormulaError;

    fn try_from(raw: RawUserFormula) -> Result<Self, Self::Error> {
        UserFormula::new(raw.name, raw.formula, raw.variables)
    }
}

impl From<UserFormula> for RawUserFormula {
    fn from(f: UserFormula) -> Self {
        RawUserFormula {
            name: f.name,
            formula: f.source,
            variables: f.variables,
        }
    }
}

impl UserFormula {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        variables: Vec<FormulaVariable>,
    ) -> Result<Self, FormulaError> {
        let name = name.into();
        let source = source.into();
        let expr = parse_formula(&source, &name)?;

        for (i, v) in variables.iter().enumerate() {
            if variables[..i].iter().any(|w| w.name() == v.name()) {
                return Err(FormulaError::DuplicateVariable {
                    formula: name,
                    variable: v.name().to_string(),
                });
            }
        }
        for (used, span) in expr.variable_spans() {
            if !variables.iter().any(|v| v.name() == used) {
                return Err(FormulaError::undeclared(&name, used, span, &source));
            }
        }

        Ok(Self {
            name,
            source,
            expr,
            variables,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn variables(&self) -> &[FormulaVariable] {
        &self.variables
    }

    pub fn linked_variables(&self) -> impl Iterator<Item = &FormulaVariable> {
        self.variables.iter().filter(|v| !v.is_parameter())
    }

    pub fn default_parameters(&self) -> Parameters {
        self.variables
            .iter()
            .filter_map(|v| match v {
                FormulaVariable::Parameter { name, default } => Some((name.clone(), *default)),
                FormulaVariable::Linked { .. } => None,
            })
            .collect()
    }

    /// Evaluate the rate; `bindings` must cover parameters and linked variables.
    pub fn compute_rate(&self, bindings: &Bindings) -> Result<f64, ScenarioError> {
        self.expr
            .eval(bindings)
            .map_err(|unbound| ScenarioError::UnboundVariable {
                formula: self.name.clone(),
                variable: unbound.0,
            })
    }
}

/// Any scenario a reaction can name.
#[derive(Debug, Clone, PartialEq)]
pub enum Scenario {
    Builtin(BuiltinScenario),
    User(UserFormula),
}

impl Scenario {
    pub fn name(&self) -> &str {
        match self {
            Scenario::Builtin(b) => b.name(),
            Scenario::User(f) => f.name(),
        }
    }

    pub fn formula(&self) -> &str {
        match self {
            Scenario::Builtin(b) => b.formula(),
            Scenario::User(f) => f.source(),
        }
    }

    pub fn is_user_formula(&self) -> bool {
        matches!(self, Scenario::User(_))
    }

    pub fn default_parameters(&self) -> Parameters {
        match self {
            Scenario::Builtin(b) => b
                .default_parameters()
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            Scenario::User(f) => f.default_parameters(),
        }
    }

    /// Defaults overlaid with `overrides`. Keys the scenario does not know
    /// are dropped.
    pub fn resolve_parameters(&self, overrides: &IndexMap<String, f64>) -> Parameters {
        let mut params = self.default_parameters();
        for (name, value) in params.iter_mut() {
            if let Some(v) = overrides.get(name) {
                *value = *v;
            }
        }
        params
    }
}
