//! UPPAAL model generation.
//!
//! The output is one self-contained XML document: global declarations, one
//! template per distinct reaction template name, the time tables and process
//! instantiations, and the `system` line.

pub mod matrix;
pub mod templates;

use animo_model::{Model, Reactant, ReactantProperty, Reaction, ReactionKind, TimeBounds};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::CompilationError;
use templates::{FormulaShape, Template};

pub const ACTIVITY_SUFFIX: &str = "";
pub const QUANTITY_SUFFIX: &str = "_qty";
pub const MAX_QUANTITY_SUFFIX: &str = "_qty_max";
pub const PERCENTAGE_SUFFIX: &str = "_perc";

const XML_HEADER: &str = "<?xml version='1.0' encoding='utf-8'?>\n<!DOCTYPE nta PUBLIC '-//Uppaal Team//DTD Flat System 1.1//EN' 'http://www.it.uu.se/research/group/darts/uppaal/flat-1_1.dtd'>\n";

const HELPER_FUNCTIONS: &str = "//Round a (one decimal digit, scaled by 10) to the nearest integer
int round(int a) {
\tint res = a / 10;
\tint m = a % 10;
\tif (m > 4) {
\t\tres = res + 1;
\t}
\treturn res;
}

//Percentage of a with respect to b, scaled by 10
int percentage(int a, int b) {
\tif (b == 0) return 0;
\telse return 10 * round(a * 100 * 10 / b);
}
";

/// The generated specification plus the naming it used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledModel {
    pub text: String,
    /// External reactant id to compiled id, enabled reactants only.
    pub id_map: IndexMap<String, String>,
    /// Compiled id to position in `reaction_happening[]`.
    pub reactant_index: IndexMap<String, usize>,
}

struct Compiler<'m> {
    model: &'m Model,
    id_map: IndexMap<String, String>,
    reactant_index: IndexMap<String, usize>,
    /// Template name to (first reaction using it, rendered template).
    templates: IndexMap<String, (String, String)>,
    processes: String,
    instances: Vec<String>,
}

/// Compile every enabled reactant and reaction of `model`.
///
/// The output depends only on `model`, so compiling twice gives the same
/// text.
pub fn compile_model(model: &Model) -> Result<CompiledModel, CompilationError> {
    info!(
        reactants = model.reactant_count(),
        reactions = model.reaction_count(),
        "Compiling model"
    );
    let mut compiler = Compiler::new(model);
    for reaction in model.enabled_reactions() {
        compiler.reaction(reaction)?;
    }
    let text = compiler.finish();
    Ok(CompiledModel {
        text,
        id_map: compiler.id_map,
        reactant_index: compiler.reactant_index,
    })
}

impl<'m> Compiler<'m> {
    fn new(model: &'m Model) -> Self {
        let mut id_map = IndexMap::new();
        let mut reactant_index = IndexMap::new();
        for (i, r) in model.enabled_reactants().enumerate() {
            id_map.insert(r.external_id.clone(), r.id.clone());
            reactant_index.insert(r.id.clone(), i);
        }
        Self {
            model,
            id_map,
            reactant_index,
            templates: IndexMap::new(),
            processes: String::new(),
            instances: Vec::new(),
        }
    }

    fn finish(&self) -> String {
        let mut out = String::new();
        out.push_str(XML_HEADER);
        out.push_str("<nta>\n<declaration>\n");
        self.declarations(&mut out);
        out.push_str("</declaration>\n\n");
        for (_, rendered) in self.templates.values() {
            out.push_str(rendered);
            out.push('\n');
        }
        out.push_str("<system>\n");
        out.push_str(&self.processes);
        out.push_str(&format!("\nsystem {};\n\n", self.instances.join(", ")));
        out.push_str("</system>\n</nta>\n");
        out
    }

    fn declarations(&self, out: &mut String) {
        out.push_str("// Place global declarations here.\n");
        out.push_str("clock globalTime;\n");
        out.push_str(&format!(
            "const int INFINITE_TIME = {};\n",
            animo_model::INFINITE_TIME
        ));
        out.push_str(&format!("const int N_REACTANTS = {};\n", self.reactant_index.len()));
        out.push_str("broadcast chan reaction_happening[N_REACTANTS];\n\n");
        for r in self.model.enabled_reactants() {
            let id = &r.id;
            out.push_str(&format!("//{id} = {}\n", r.alias));
            out.push_str(&format!("int {id}{ACTIVITY_SUFFIX} := {};\n", r.initial_level));
            out.push_str(&format!("int {id}{QUANTITY_SUFFIX} := {};\n", r.initial_quantity));
            out.push_str(&format!("int {id}{MAX_QUANTITY_SUFFIX} := {};\n", r.max_quantity()));
            out.push_str(&format!(
                "int {id}{PERCENTAGE_SUFFIX} := {};\n\n",
                r.initial_per_mille()
            ));
        }
        out.push_str(HELPER_FUNCTIONS);
    }

    /// An enabled reactant of `reaction`, by compiled id.
    fn endpoint(
        &self,
        reaction: &Reaction,
        id: &str,
    ) -> Result<(&'m Reactant, usize), CompilationError> {
        let reactant = self
            .model
            .reactant(id)
            .ok_or_else(|| CompilationError::UnknownReactant {
                reaction: reaction.describe(),
                reactant: id.to_string(),
            })?;
        let index = self
            .reactant_index
            .get(id)
            .copied()
            .ok_or_else(|| CompilationError::DisabledReactant {
                reaction: reaction.describe(),
                reactant: id.to_string(),
            })?;
        Ok((reactant, index))
    }

    /// An enabled reactant referenced by external id, as formulas do.
    fn linked(
        &self,
        reaction: &Reaction,
        external_id: &str,
    ) -> Result<(&'m Reactant, usize), CompilationError> {
        match self.model.reactant_by_external_id(external_id) {
            Some(r) => self.endpoint(reaction, &r.id),
            None => Err(CompilationError::UnknownReactant {
                reaction: reaction.describe(),
                reactant: external_id.to_string(),
            }),
        }
    }

    fn add_template(
        &mut self,
        reaction: &Reaction,
        template: Template,
    ) -> Result<(), CompilationError> {
        let rendered = template.rendered();
        match self.templates.get(&template.name) {
            Some((first, existing)) if *existing != rendered => {
                Err(CompilationError::TemplateConflict {
                    template: template.name,
                    first: first.clone(),
                    second: reaction.id.clone(),
                })
            }
            Some(_) => Ok(()),
            None => {
                self.templates
                    .insert(template.name, (reaction.id.clone(), rendered));
                Ok(())
            }
        }
    }

    fn reaction(&mut self, reaction: &Reaction) -> Result<(), CompilationError> {
        let bounds = reaction
            .bounds
            .as_ref()
            .ok_or_else(|| CompilationError::MissingTable {
                reaction: reaction.describe(),
            })?;
        debug!(
            reaction = %reaction.id,
            kind = ?reaction.kind,
            finite = bounds.lower.finite_count(),
            "compiling reaction"
        );
        match reaction.kind {
            ReactionKind::Mono => self.mono(reaction, bounds)?,
            ReactionKind::Bi => self.bi(reaction, bounds)?,
            ReactionKind::UserFormula => self.user_formula(reaction, bounds)?,
        }
        self.instances.push(reaction.id.clone());
        Ok(())
    }

    fn check_shape(
        reaction: &Reaction,
        bounds: &TimeBounds,
        expected: &[usize],
    ) -> Result<(), CompilationError> {
        let found = bounds.dimensions();
        if found.len() != expected.len() {
            return Err(CompilationError::Dimensions {
                reaction: reaction.describe(),
                expected: expected.len(),
                found: found.len(),
            });
        }
        for table in [&bounds.lower, &bounds.upper] {
            if table.dimensions() != expected {
                return Err(CompilationError::TableShape {
                    reaction: reaction.describe(),
                    expected: expected.to_vec(),
                    found: table.dimensions().to_vec(),
                });
            }
        }
        Ok(())
    }

    fn mono(&mut self, reaction: &Reaction, bounds: &TimeBounds) -> Result<(), CompilationError> {
        let (reactant, index) = self.endpoint(reaction, &reaction.reactant)?;
        let id = &reactant.id;
        Self::check_shape(reaction, bounds, &[reactant.levels as usize + 1])?;

        let out = &mut self.processes;
        out.push_str(&format!("//Mono-reaction on {id} ({})\n", reactant.alias));
        for (suffix, table) in [("tLower", &bounds.lower), ("tUpper", &bounds.upper)] {
            out.push_str(&format!(
                "const int {id}_{suffix}[{}+1] := {};\n",
                reactant.levels,
                matrix::nested_string(table.values(), table.dimensions(), &format_time)
            ));
        }
        out.push_str(&format!(
            "{} = {}({id}{ACTIVITY_SUFFIX}, {id}_tLower, {id}_tUpper, {}, reaction_happening[{index}]);\n\n",
            reaction.id,
            templates::mono_template_name(id),
            reaction.increment
        ));

        self.add_template(reaction, templates::mono_template(id, reactant.levels))
    }

    fn bi(&mut self, reaction: &Reaction, bounds: &TimeBounds) -> Result<(), CompilationError> {
        let found = bounds.dimensions().len();
        if found < 2 {
            return Err(CompilationError::Dimensions {
                reaction: reaction.describe(),
                expected: 2,
                found,
            });
        }
        let (catalyst, c_index) = self.endpoint(reaction, &reaction.catalyst)?;
        let (substrate, s_index) = self.endpoint(reaction, &reaction.reactant)?;
        let (n_s, n_e) = (substrate.table_extent(), catalyst.table_extent());
        Self::check_shape(reaction, bounds, &[n_s, n_e])?;

        let (c, s) = (&catalyst.id, &substrate.id);
        let out = &mut self.processes;
        out.push_str(&format!(
            "//Reaction {c} ({}) {} {s} ({})\n",
            catalyst.alias,
            reaction.arrow(),
            substrate.alias
        ));
        for (suffix, table) in [("tLower", &bounds.lower), ("tUpper", &bounds.upper)] {
            out.push_str(&format!("const int {c}_{s}_r_{suffix}[{n_s}][{n_e}] := "));
            matrix::write_rows(out, table.values(), n_e, &format_time);
            out.push_str(";\n");
        }
        out.push_str(&format!(
            "{} = {}({c}{ACTIVITY_SUFFIX}, {s}{ACTIVITY_SUFFIX}, {s}{QUANTITY_SUFFIX}, {c}_{s}_r_tLower, {c}_{s}_r_tUpper, {}, reaction_happening[{c_index}], reaction_happening[{s_index}]);\n\n",
            reaction.id,
            templates::pair_template_name(c, s),
            reaction.increment
        ));

        let template =
            templates::bi_template(c, s, n_s, n_e, substrate.levels, reaction.is_activating());
        self.add_template(reaction, template)
    }

    fn user_formula(
        &mut self,
        reaction: &Reaction,
        bounds: &TimeBounds,
    ) -> Result<(), CompilationError> {
        if reaction.influenced.is_empty() {
            return Err(CompilationError::NoInfluence {
                reaction: reaction.describe(),
            });
        }
        let (catalyst, _) = self.endpoint(reaction, &reaction.catalyst)?;
        let (substrate, _) = self.endpoint(reaction, &reaction.reactant)?;

        let mut inputs = Vec::new();
        let mut expected = Vec::new();
        for p in &reaction.influencing {
            let (r, index) = self.linked(reaction, &p.reactant)?;
            let kind = p.kind().ok_or_else(|| CompilationError::UnsupportedInfluence {
                reaction: reaction.describe(),
                target: p.to_string(),
            })?;
            expected.push(r.table_extent());
            inputs.push((r, kind, index));
        }
        Self::check_shape(reaction, bounds, &expected)?;

        let mut outputs = Vec::new();
        for (i, influence) in reaction.influenced.iter().enumerate() {
            let kind = templates::output_kind(reaction, i).ok_or_else(|| {
                CompilationError::UnsupportedInfluence {
                    reaction: reaction.describe(),
                    target: influence.target.to_string(),
                }
            })?;
            let (r, index) = self.linked(reaction, &influence.target.reactant)?;
            outputs.push((r, kind, index, influence.delta));
        }

        let (c, s) = (&catalyst.id, &substrate.id);
        let dims: String = expected.iter().map(|d| format!("[{d}]")).collect();
        let out = &mut self.processes;
        out.push_str(&format!(
            "//Reaction {c} ({}) {} {s} ({})\n",
            catalyst.alias,
            reaction.arrow(),
            substrate.alias
        ));
        for (suffix, table) in [("tLower", &bounds.lower), ("tUpper", &bounds.upper)] {
            out.push_str(&format!(
                "const int {c}_{s}_r_{suffix}{dims} := {};\n",
                matrix::nested_string(table.values(), table.dimensions(), &format_time)
            ));
        }

        let mut args = Vec::new();
        for (r, _, _) in &inputs {
            args.push(format!("{}{QUANTITY_SUFFIX}", r.id));
            args.push(format!("{}{ACTIVITY_SUFFIX}", r.id));
        }
        for (r, _, _, _) in &outputs {
            for suffix in [
                QUANTITY_SUFFIX,
                ACTIVITY_SUFFIX,
                MAX_QUANTITY_SUFFIX,
                PERCENTAGE_SUFFIX,
            ] {
                args.push(format!("{}{suffix}", r.id));
            }
        }
        args.push(format!("{c}_{s}_r_tLower"));
        args.push(format!("{c}_{s}_r_tUpper"));
        args.extend(outputs.iter().map(|(_, _, _, delta)| delta.to_string()));
        args.extend(inputs.iter().map(|(_, _, i)| format!("reaction_happening[{i}]")));
        args.extend(outputs.iter().map(|(_, _, i, _)| format!("reaction_happening[{i}]")));
        out.push_str(&format!(
            "{} = {}({});\n\n",
            reaction.id,
            templates::pair_template_name(c, s),
            args.join(", ")
        ));

        let shape = FormulaShape {
            catalyst: c.clone(),
            substrate: s.clone(),
            inputs: inputs.iter().map(|(_, kind, _)| *kind).collect(),
            outputs: outputs.iter().map(|(_, kind, _, _)| *kind).collect(),
            dimensions: expected,
        };
        self.add_template(reaction, templates::formula_template(&shape))
    }
}

fn format_time(t: &i32) -> String {
    t.to_string()
}

/// Compiled variable holding `property` of the reactant compiled as `id`.
pub fn variable_name(id: &str, property: ReactantProperty) -> String {
    match property {
        ReactantProperty::Activity => format!("{id}{ACTIVITY_SUFFIX}"),
        ReactantProperty::Quantity => format!("{id}{QUANTITY_SUFFIX}"),
        ReactantProperty::Inactivity => format!("{id}{QUANTITY_SUFFIX} - {id}{ACTIVITY_SUFFIX}"),
    }
}
