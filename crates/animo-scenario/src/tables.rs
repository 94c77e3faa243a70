//! Time-table generation.
//!
//! Every generator first produces raw times (`f64`, `+inf` for "never"), then
//! [`scale_times`] turns them into integer lower/upper bounds.

use animo_model::{Model, ReactantParameter, Table, TimeBounds, INFINITE_TIME};
use indexmap::IndexMap;
use tracing::debug;

use crate::errors::ScenarioError;
use crate::eval::Bindings;
use crate::scenario::{BuiltinScenario, FormulaVariable, MonoScenario, Parameters, UserFormula};

/// Rates at or below this are treated as "never fires".
pub const MIN_RATE: f64 = 1e-8;

/// `1 / rate`, or `+inf` when the rate is too small (negative included).
pub fn time_from_rate(rate: f64) -> Result<f64, ScenarioError> {
    if rate.is_nan() {
        return Err(ScenarioError::InvalidRate {
            context: String::new(),
        });
    }
    Ok(if rate > MIN_RATE { 1.0 / rate } else { f64::INFINITY })
}

fn time_at(rate: f64, scenario: &str, levels: &[usize]) -> Result<f64, ScenarioError> {
    time_from_rate(rate).map_err(|_| ScenarioError::InvalidRate {
        context: format!("in scenario '{scenario}' at levels {levels:?}"),
    })
}

/// Mono table: one entry per own activity level `0..=levels`.
pub fn mono_times(levels: u32, params: &Parameters) -> Result<Vec<f64>, ScenarioError> {
    (0..=levels as usize)
        .map(|a| time_at(MonoScenario::compute_rate(params, a)?, MonoScenario::NAME, &[a]))
        .collect()
}

/// Bi table, row-major `[n_s][n_e]`.
///
/// Row 0 (no unreacted substrate) and column 0 (no catalyst) never fire.
pub fn bi_times(
    scenario: BuiltinScenario,
    params: &Parameters,
    n_e: usize,
    n_s: usize,
) -> Result<Vec<f64>, ScenarioError> {
    let mut times = Vec::with_capacity(n_e * n_s);
    times.extend(std::iter::repeat(f64::INFINITY).take(n_e));
    for s in 1..n_s {
        times.push(f64::INFINITY);
        for e in 1..n_e {
            let rate = scenario.compute_rate(params, e, s, n_s)?;
            times.push(time_at(rate, scenario.name(), &[s, e])?);
        }
    }
    Ok(times)
}

/// A linked formula variable resolved against the model.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedDimension {
    pub variable: String,
    pub parameter: ReactantParameter,
    /// `1 + growth * levels` of the linked reactant.
    pub size: usize,
}

/// Resolve each linked variable of `formula` to a table dimension.
///
/// `links` holds the per-reaction bindings and wins over a binding stored in
/// the formula itself. Reactants are looked up by external id.
pub fn user_formula_dimensions(
    formula: &UserFormula,
    links: &IndexMap<String, ReactantParameter>,
    model: &Model,
) -> Result<Vec<LinkedDimension>, ScenarioError> {
    formula
        .linked_variables()
        .map(|v| {
            let stored = match v {
                FormulaVariable::Linked {
                    reactant_property, ..
                } => reactant_property.as_ref(),
                FormulaVariable::Parameter { .. } => None,
            };
            let parameter = links
                .get(v.name())
                .or(stored)
                .cloned()
                .ok_or_else(|| ScenarioError::UnboundVariable {
                    formula: formula.name().to_string(),
                    variable: v.name().to_string(),
                })?;
            if parameter.kind().is_none() {
                return Err(ScenarioError::UnsupportedProperty {
                    formula: formula.name().to_string(),
                    variable: v.name().to_string(),
                    property: parameter.property.clone(),
                });
            }
            let reactant = model
                .reactant_by_external_id(&parameter.reactant)
                .ok_or_else(|| ScenarioError::UnknownReactant {
                    formula: formula.name().to_string(),
                    variable: v.name().to_string(),
                    reactant: parameter.reactant.clone(),
                })?;
            Ok(LinkedDimension {
                variable: v.name().to_string(),
                size: reactant.table_extent(),
                parameter,
            })
        })
        .collect()
}

/// Evaluate `formula` over every combination of linked levels, last
/// dimension fastest.
pub fn user_formula_times(
    formula: &UserFormula,
    params: &Parameters,
    dims: &[LinkedDimension],
) -> Result<Vec<f64>, ScenarioError> {
    let mut bindings: Bindings = params.clone();
    for p in formula.variables().iter().filter(|v| v.is_parameter()) {
        if !bindings.contains_key(p.name()) {
            return Err(ScenarioError::MissingParameter {
                scenario: formula.name().to_string(),
                parameter: p.name().to_string(),
            });
        }
    }

    let total: usize = dims.iter().map(|d| d.size).product();
    let mut times = Vec::with_capacity(total);
    let mut index = vec![0usize; dims.len()];
    for _ in 0..total {
        for (d, &i) in dims.iter().zip(&index) {
            bindings.insert(d.variable.clone(), i as f64);
        }
        let rate = formula.compute_rate(&bindings)?;
        times.push(time_at(rate, formula.name(), &index)?);

        // Odometer increment, last dimension fastest.
        for k in (0..dims.len()).rev() {
            index[k] += 1;
            if index[k] < dims[k].size {
                break;
            }
            index[k] = 0;
        }
    }
    debug!(formula = formula.name(), cells = times.len(), "generated user formula times");
    Ok(times)
}

/// Factors applied when raw times become integer bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundScaling {
    /// Network-wide seconds-per-step compensation.
    pub time_scale: f64,
    /// Source / target levels scale factor of the reaction.
    pub levels_scale: f64,
    /// Percentage spread around each time.
    pub uncertainty: u32,
}

impl Default for BoundScaling {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            levels_scale: 1.0,
            uncertainty: 0,
        }
    }
}

impl BoundScaling {
    /// `(lower, upper)` for one raw time. Infinite times stay the sentinel;
    /// finite ones never drop below 1. Uncertainty above 100% and bounds past
    /// `i32::MAX` are rejected.
    pub fn bounds(&self, t: f64) -> Result<(i32, i32), ScenarioError> {
        if self.uncertainty > 100 {
            return Err(ScenarioError::UncertaintyOutOfRange(self.uncertainty));
        }
        if t.is_infinite() {
            return Ok((INFINITE_TIME, INFINITE_TIME));
        }
        let base = self.time_scale * self.levels_scale * t;
        let u = f64::from(self.uncertainty) / 100.0;
        let to_cell = |x: f64| {
            let value = x.round();
            if value > f64::from(i32::MAX) {
                return Err(ScenarioError::BoundOverflow { time: t, value });
            }
            Ok((value as i32).max(1))
        };
        Ok((to_cell(base * (1.0 - u))?, to_cell(base * (1.0 + u))?))
    }
}

/// Turn raw times into lower/upper tables of shape `dimensions`.
pub fn scale_times(
    times: &[f64],
    dimensions: Vec<usize>,
    scaling: BoundScaling,
) -> Result<TimeBounds, ScenarioError> {
    let (lower, upper): (Vec<i32>, Vec<i32>) = times
        .iter()
        .map(|&t| scaling.bounds(t))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unzip();
    Ok(TimeBounds {
        lower: Table::from_values(dimensions.clone(), lower)?,
        upper: Table::from_values(dimensions, upper)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use animo_model::{ModelSettings, Reactant, ReactantProperty};

    fn params(pairs: &[(&str, f64)]) -> Parameters {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn time_from_rate_rules() {
        assert!((time_from_rate(0.05).unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(time_from_rate(0.0).unwrap(), f64::INFINITY);
        assert_eq!(time_from_rate(1e-8).unwrap(), f64::INFINITY);
        assert_eq!(time_from_rate(-3.0).unwrap(), f64::INFINITY);
        assert_eq!(time_from_rate(f64::INFINITY).unwrap(), 0.0);
        assert!(matches!(
            time_from_rate(f64::NAN),
            Err(ScenarioError::InvalidRate { .. })
        ));
    }

    #[test]
    fn linear_scenario_at_five_is_twenty() {
        let times = bi_times(BuiltinScenario::Linear, &params(&[("k", 0.01)]), 6, 2).unwrap();
        assert_eq!(times.len(), 12);
        assert!((times[6 + 5] - 20.0).abs() < 1e-9);
        assert_eq!(times[6], f64::INFINITY);
    }

    #[test]
    fn bi_first_row_and_column_never_fire() {
        let times = bi_times(BuiltinScenario::MassAction, &params(&[("k", 0.001)]), 4, 3).unwrap();
        for e in 0..4 {
            assert_eq!(times[e], f64::INFINITY);
        }
        for s in 0..3 {
            assert_eq!(times[s * 4], f64::INFINITY);
        }
        // s = 2, e = 3: 1 / (0.001 * 3 * 2)
        assert!((times[2 * 4 + 3] - 1.0 / 0.006).abs() < 1e-9);
    }

    #[test]
    fn mono_level_zero_never_fires() {
        let times = mono_times(4, &MonoScenario::default_parameters()).unwrap();
        assert_eq!(times.len(), 5);
        assert_eq!(times[0], f64::INFINITY);
        assert!((times[2] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_with_uncertainty() {
        let s = BoundScaling {
            time_scale: 2.0,
            levels_scale: 1.0,
            uncertainty: 10,
        };
        assert_eq!(s.bounds(10.0).unwrap(), (18, 22));
        assert_eq!(s.bounds(f64::INFINITY).unwrap(), (INFINITE_TIME, INFINITE_TIME));
        // Tiny times are floored to 1, never 0.
        assert_eq!(BoundScaling::default().bounds(0.2).unwrap(), (1, 1));
        assert_eq!(BoundScaling::default().bounds(0.0).unwrap(), (1, 1));
    }

    #[test]
    fn uncertainty_over_one_hundred_is_rejected() {
        let s = BoundScaling {
            uncertainty: 101,
            ..BoundScaling::default()
        };
        assert!(matches!(
            s.bounds(10.0),
            Err(ScenarioError::UncertaintyOutOfRange(101))
        ));
        let full = BoundScaling {
            uncertainty: 100,
            ..BoundScaling::default()
        };
        assert_eq!(full.bounds(10.0).unwrap(), (1, 20));
    }

    #[test]
    fn bounds_past_i32_are_rejected() {
        let s = BoundScaling {
            time_scale: 1.0e3,
            ..BoundScaling::default()
        };
        let err = s.bounds(1.0e7).unwrap_err();
        assert!(matches!(err, ScenarioError::BoundOverflow { .. }));
        assert_eq!(s.bounds(2.0e6).unwrap(), (2_000_000_000, 2_000_000_000));
    }

    #[test]
    fn scale_times_checks_shape() {
        let b = scale_times(&[f64::INFINITY, 4.4, 5.6], vec![3], BoundScaling::default()).unwrap();
        assert_eq!(b.lower.values(), &[INFINITE_TIME, 4, 6]);
        assert_eq!(b.lower, b.upper);
        assert!(matches!(
            scale_times(&[1.0], vec![2], BoundScaling::default()),
            Err(ScenarioError::Table(_))
        ));
    }

    fn model_with(levels: &[(&str, u32, u32)]) -> Model {
        let mut m = Model::new(ModelSettings::default());
        for (i, (ext, lv, growth)) in levels.iter().enumerate() {
            let mut r = Reactant::new(format!("R{i}"), *ext, *lv);
            r.max_quantity_growth = *growth;
            m.add_reactant(r).unwrap();
        }
        m
    }

    #[test]
    fn user_formula_dimensions_and_row_major_order() {
        let f = UserFormula::new(
            "mix",
            "k * A + B",
            vec![
                FormulaVariable::parameter("k", 10.0),
                FormulaVariable::linked("A", None),
                FormulaVariable::linked("B", None),
            ],
        )
        .unwrap();
        let model = model_with(&[("a", 2, 1), ("b", 1, 2)]);
        let mut links = IndexMap::new();
        links.insert("A".to_string(), ReactantParameter::new("a", ReactantProperty::Activity));
        links.insert("B".to_string(), ReactantParameter::new("b", ReactantProperty::Quantity));

        let dims = user_formula_dimensions(&f, &links, &model).unwrap();
        let sizes: Vec<usize> = dims.iter().map(|d| d.size).collect();
        assert_eq!(sizes, vec![3, 3]);

        let times = user_formula_times(&f, &f.default_parameters(), &dims).unwrap();
        assert_eq!(times.len(), 9);
        assert_eq!(times[0], f64::INFINITY); // A = 0, B = 0
        assert!((times[1] - 1.0).abs() < 1e-12); // A = 0, B = 1
        assert!((times[3] - 0.1).abs() < 1e-12); // A = 1, B = 0
        assert!((times[8] - 1.0 / 22.0).abs() < 1e-12); // A = 2, B = 2
    }

    #[test]
    fn user_formula_binding_errors() {
        let f = UserFormula::new(
            "g",
            "E",
            vec![FormulaVariable::linked("E", None)],
        )
        .unwrap();
        let model = model_with(&[("a", 2, 1)]);
        let none = IndexMap::new();
        assert!(matches!(
            user_formula_dimensions(&f, &none, &model),
            Err(ScenarioError::UnboundVariable { .. })
        ));

        let mut links = IndexMap::new();
        links.insert("E".to_string(), ReactantParameter::parse("a.Concentration"));
        assert!(matches!(
            user_formula_dimensions(&f, &links, &model),
            Err(ScenarioError::UnsupportedProperty { .. })
        ));

        links.insert("E".to_string(), ReactantParameter::parse("zz.Quantity"));
        assert!(matches!(
            user_formula_dimensions(&f, &links, &model),
            Err(ScenarioError::UnknownReactant { .. })
        ));
    }

    #[test]
    fn nan_cell_is_an_error() {
        let f = UserFormula::new(
            "nan",
            "E / E",
            vec![FormulaVariable::linked("E", Some(ReactantParameter::parse("a.Activity level")))],
        )
        .unwrap();
        let model = model_with(&[("a", 1, 1)]);
        let dims = user_formula_dimensions(&f, &IndexMap::new(), &model).unwrap();
        let err = user_formula_times(&f, &Parameters::new(), &dims).unwrap_err();
        assert!(err.to_string().contains("nan"), "{err}");
    }
}
