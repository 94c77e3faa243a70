//! Network descriptions as callers supply them, and their assembly into a
//! [`Model`] whose reactions carry time tables.

use animo_model::{
    keys, Influence, Model, ModelError, ModelSettings, Reactant, ReactantParameter,
    ReactantProperty, Reaction, TimeBounds,
};
use animo_scenario::tables::{
    bi_times, mono_times, user_formula_dimensions, user_formula_times,
};
use animo_scenario::{
    scale_times, BoundScaling, MonoScenario, Parameters, Scenario, ScenarioError,
    ScenarioRegistry, UserFormula,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AnalysisError, CompilationError};

/// Quantity growth of reactants whose quantity some reaction changes.
pub const QUANTITY_GROWTH: u32 = 10;

fn default_levels() -> u32 {
    ModelSettings::default().levels
}

fn default_seconds_per_point() -> f64 {
    ModelSettings::default().seconds_per_point
}

fn default_one() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_increment() -> i32 {
    1
}

/// User formulas embedded in a network, either as entries or as the flat
/// string list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormulaSource {
    Entries(Vec<UserFormula>),
    Flat(Vec<String>),
}

impl Default for FormulaSource {
    fn default() -> Self {
        FormulaSource::Entries(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDescription {
    #[serde(default = "default_levels")]
    pub levels: u32,
    #[serde(default = "default_seconds_per_point")]
    pub seconds_per_point: f64,
    #[serde(default = "default_one")]
    pub time_scale_factor: f64,
    #[serde(default)]
    pub formulas: FormulaSource,
    #[serde(default)]
    pub reactants: Vec<ReactantDescription>,
    #[serde(default)]
    pub reactions: Vec<ReactionDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactantDescription {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub levels: Option<u32>,
    #[serde(default)]
    pub initial_level: u32,
    #[serde(default)]
    pub initial_quantity: Option<u32>,
    #[serde(default = "default_one")]
    pub step_size: f64,
    #[serde(default = "default_one")]
    pub levels_scale_factor: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub plotted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionDescription {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub parameters: IndexMap<String, f64>,
    #[serde(default = "default_increment")]
    pub increment: i32,
    #[serde(default)]
    pub uncertainty: u32,
    #[serde(default)]
    pub influenced: Vec<ReactantParameter>,
    #[serde(default)]
    pub influence_values: Vec<i32>,
    /// Formula variable to `"reactant.property"`, user formulas only.
    #[serde(default)]
    pub linked: IndexMap<String, ReactantParameter>,
}

impl ReactantDescription {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: None,
            levels: None,
            initial_level: 0,
            initial_quantity: None,
            step_size: 1.0,
            levels_scale_factor: 1.0,
            enabled: true,
            plotted: true,
        }
    }
}

impl ReactionDescription {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
            enabled: true,
            scenario: None,
            parameters: IndexMap::new(),
            increment: 1,
            uncertainty: 0,
            influenced: Vec::new(),
            influence_values: Vec::new(),
            linked: IndexMap::new(),
        }
    }

    fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{} -> {}", self.source, self.target))
    }

    /// Influenced properties with their deltas; the target's activity moved
    /// by `increment` when none are listed.
    fn influences(&self) -> Result<Vec<Influence>, CompilationError> {
        if self.influenced.is_empty() {
            return Ok(vec![Influence {
                target: ReactantParameter::new(self.target.clone(), ReactantProperty::Activity),
                delta: self.increment,
            }]);
        }
        if self.influenced.len() != self.influence_values.len() {
            return Err(CompilationError::InfluenceValues {
                reaction: self.label(),
                targets: self.influenced.len(),
                values: self.influence_values.len(),
            });
        }
        Ok(self
            .influenced
            .iter()
            .zip(&self.influence_values)
            .map(|(target, &delta)| Influence {
                target: target.clone(),
                delta,
            })
            .collect())
    }
}

impl NetworkDescription {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn user_formulas(&self) -> Result<Vec<UserFormula>, ScenarioError> {
        match &self.formulas {
            FormulaSource::Entries(list) => Ok(list.clone()),
            FormulaSource::Flat(list) if list.is_empty() => Ok(Vec::new()),
            FormulaSource::Flat(list) => animo_scenario::formula_list::read_formulae(list),
        }
    }

    /// Built-in scenarios plus the formulas embedded in this network.
    pub fn scenario_registry(&self) -> Result<ScenarioRegistry, ScenarioError> {
        let mut registry = ScenarioRegistry::with_builtins();
        for formula in self.user_formulas()? {
            registry.register(formula);
        }
        Ok(registry)
    }

    /// Whether an enabled reaction changes the quantity of `reactant`.
    fn quantity_changes(&self, reactant: &str) -> bool {
        self.reactions.iter().filter(|r| r.enabled).any(|r| {
            r.influenced.iter().any(|p| {
                p.reactant == reactant && p.kind() == Some(ReactantProperty::Quantity)
            })
        })
    }
}

/// Build the model for `desc`, with every reaction's time bounds filled in.
///
/// Reactants are compiled as `R0, R1, ...` and reactions as `P0, P1, ...`,
/// both in description order.
pub fn assemble_model(
    desc: &NetworkDescription,
    registry: &ScenarioRegistry,
) -> Result<Model, AnalysisError> {
    info!(
        reactants = desc.reactants.len(),
        reactions = desc.reactions.len(),
        "Assembling model"
    );
    let mut model = Model::new(ModelSettings {
        levels: desc.levels,
        seconds_per_point: desc.seconds_per_point,
        time_scale_factor: desc.time_scale_factor,
    });
    model
        .properties
        .set(keys::SECONDS_PER_POINT, desc.seconds_per_point);
    model
        .properties
        .set(keys::SECS_POINT_SCALE_FACTOR, desc.time_scale_factor);

    for (i, r) in desc.reactants.iter().enumerate() {
        let levels = r.levels.unwrap_or(desc.levels);
        let mut reactant = Reactant::new(format!("R{i}"), r.id.clone(), levels)
            .with_alias(r.alias.clone().unwrap_or_else(|| r.id.clone()))
            .with_initial(r.initial_level, r.initial_quantity.unwrap_or(levels));
        reactant.step_size = r.step_size;
        reactant.levels_scale_factor = r.levels_scale_factor;
        reactant.enabled = r.enabled;
        reactant.plotted = r.plotted;
        if desc.quantity_changes(&r.id) {
            reactant.max_quantity_growth = QUANTITY_GROWTH;
        }
        reactant
            .properties
            .set(keys::MAXIMUM_QUANTITY_GROWTH, i64::from(reactant.max_quantity_growth));
        model.add_reactant(reactant)?;
    }

    for (i, r) in desc.reactions.iter().enumerate() {
        let reaction = assemble_reaction(&model, format!("P{i}"), r, registry)?;
        model.add_reaction(reaction)?;
    }
    Ok(model)
}

fn resolve<'m>(
    model: &'m Model,
    reaction: &str,
    external_id: &str,
) -> Result<&'m Reactant, ModelError> {
    model
        .reactant_by_external_id(external_id)
        .ok_or_else(|| ModelError::UnknownReactant {
            reaction: reaction.to_string(),
            reactant: external_id.to_string(),
        })
}

fn assemble_reaction(
    model: &Model,
    id: String,
    desc: &ReactionDescription,
    registry: &ScenarioRegistry,
) -> Result<Reaction, AnalysisError> {
    let label = desc.label();
    let source = resolve(model, &label, &desc.source)?;
    let target = resolve(model, &label, &desc.target)?;
    let scaling = BoundScaling {
        time_scale: model.settings.time_scale_factor,
        levels_scale: source.levels_scale_factor / target.levels_scale_factor,
        uncertainty: desc.uncertainty,
    };

    let (mut reaction, params, times, dims) = if source.id == target.id {
        let mut params = MonoScenario::default_parameters();
        if let Some(k) = desc.parameters.get(MonoScenario::PARAMETER) {
            params.insert(MonoScenario::PARAMETER.to_string(), *k);
        }
        let times = mono_times(target.levels, &params)?;
        let reaction = Reaction::mono(id, target.id.clone(), desc.increment);
        (reaction, params, times, vec![target.levels as usize + 1])
    } else {
        let name = desc
            .scenario
            .as_deref()
            .unwrap_or_else(|| registry.default_name());
        let scenario = registry.require(name)?;
        let params = scenario.resolve_parameters(&desc.parameters);
        match scenario {
            Scenario::Builtin(builtin) => {
                let (n_e, n_s) = (source.table_extent(), target.table_extent());
                let times = bi_times(*builtin, &params, n_e, n_s)?;
                let mut reaction =
                    Reaction::bi(id, source.id.clone(), target.id.clone(), desc.increment);
                let substrate = if desc.increment > 0 {
                    ReactantProperty::Inactivity
                } else {
                    ReactantProperty::Activity
                };
                reaction.influencing = vec![
                    ReactantParameter::new(source.external_id.clone(), ReactantProperty::Activity),
                    ReactantParameter::new(target.external_id.clone(), substrate),
                ];
                (reaction, params, times, vec![n_s, n_e])
            }
            Scenario::User(formula) => {
                let linked = user_formula_dimensions(formula, &desc.linked, model)?;
                let times = user_formula_times(formula, &params, &linked)?;
                let mut reaction = Reaction::user_formula(
                    id,
                    source.id.clone(),
                    target.id.clone(),
                    desc.increment,
                );
                reaction.influencing = linked.iter().map(|d| d.parameter.clone()).collect();
                for influence in desc.influences()? {
                    resolve(model, &label, &influence.target.reactant)?;
                    reaction.influenced.push(influence);
                }
                let dims = linked.iter().map(|d| d.size).collect();
                (reaction, params, times, dims)
            }
        }
    };

    if reaction.influenced.is_empty() {
        reaction.influenced = vec![Influence {
            target: ReactantParameter::new(target.external_id.clone(), ReactantProperty::Activity),
            delta: desc.increment,
        }];
    }
    let bounds: TimeBounds = scale_times(&times, dims, scaling).map_err(|e| match e {
        ScenarioError::Table(table) => AnalysisError::from(CompilationError::from(table)),
        other => other.into(),
    })?;
    debug!(
        reaction = %reaction.id,
        describe = %reaction.describe(),
        finite = bounds.lower.finite_count(),
        "assembled time table"
    );

    reaction.enabled = desc.enabled;
    reaction.uncertainty = desc.uncertainty;
    record_parameters(&mut reaction, desc, &params);
    Ok(reaction.with_bounds(bounds))
}

fn record_parameters(reaction: &mut Reaction, desc: &ReactionDescription, params: &Parameters) {
    let bag = &mut reaction.properties;
    bag.set(keys::INCREMENT, desc.increment);
    bag.set(keys::UNCERTAINTY, i64::from(desc.uncertainty));
    if let Some(name) = &desc.scenario {
        bag.set(keys::SCENARIO, name.as_str());
    }
    for (name, value) in params {
        bag.set(name, *value);
    }
}
