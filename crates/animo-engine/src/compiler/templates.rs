//! Process templates for the three reaction shapes.
//!
//! Every template is the same four-location machine:
//!
//! - `start` (urgent, initial): decide whether the reaction can fire at all;
//! - `reacting`: wait for the clock to reach the lower bound, bounded above
//!   by the upper bound unless that is `INFINITE_TIME`;
//! - `not_reacting`: parked until a reactant it reads changes;
//! - `resetting` (urgent): re-evaluate after any such change.
//!
//! Changes are announced on the broadcast channel of the changed reactant,
//! so every reaction reading it moves to `resetting` in the same step.
//! Guards and labels are written in plain UPPAAL syntax here and escaped
//! when rendered.

use animo_model::{ReactantProperty, Reaction};

use super::{ACTIVITY_SUFFIX, MAX_QUANTITY_SUFFIX, PERCENTAGE_SUFFIX, QUANTITY_SUFFIX};

const NOT_REACTING: &str = "id0";
const RESETTING: &str = "id1";
const REACTING: &str = "id2";
const START: &str = "id3";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Location {
    id: String,
    name: Option<&'static str>,
    invariant: Option<String>,
    urgent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Transition {
    source: String,
    target: String,
    guard: Option<String>,
    sync: Option<String>,
    assign: Option<String>,
}

impl Transition {
    fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            ..Self::default()
        }
    }

    fn guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    fn sync(mut self, sync: impl Into<String>) -> Self {
        self.sync = Some(sync.into());
        self
    }

    fn assign(mut self, assign: impl Into<String>) -> Self {
        self.assign = Some(assign.into());
        self
    }
}

/// A timed-automaton template, ready to be rendered as UPPAAL XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    parameters: Vec<String>,
    declaration: String,
    locations: Vec<Location>,
    init: String,
    transitions: Vec<Transition>,
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

impl Template {
    fn new(name: String, parameters: Vec<String>, declaration: String) -> Self {
        Self {
            name,
            parameters,
            declaration,
            locations: Vec::new(),
            init: START.to_string(),
            transitions: Vec::new(),
        }
    }

    /// The four standard locations, with `invariant` on `reacting`.
    fn with_standard_locations(mut self, invariant: String) -> Self {
        let loc = |id: &str, name, invariant, urgent| Location {
            id: id.to_string(),
            name: Some(name),
            invariant,
            urgent,
        };
        self.locations.push(loc(NOT_REACTING, "not_reacting", None, false));
        self.locations.push(loc(RESETTING, "resetting", None, true));
        self.locations.push(loc(REACTING, "reacting", Some(invariant), false));
        self.locations.push(loc(START, "start", None, true));
        self
    }

    fn add_urgent(&mut self, id: String) {
        self.locations.push(Location {
            id,
            name: None,
            invariant: None,
            urgent: true,
        });
    }

    pub fn render(&self, out: &mut String) {
        out.push_str("<template>\n");
        out.push_str(&format!("  <name>{}</name>\n", escape_xml(&self.name)));
        out.push_str(&format!(
            "  <parameter>{}</parameter>\n",
            escape_xml(&self.parameters.join(", "))
        ));
        out.push_str(&format!(
            "  <declaration>{}</declaration>\n",
            escape_xml(&self.declaration)
        ));
        for l in &self.locations {
            out.push_str(&format!("  <location id=\"{}\">\n", l.id));
            if let Some(name) = l.name {
                out.push_str(&format!("    <name>{name}</name>\n"));
            }
            if let Some(inv) = &l.invariant {
                out.push_str(&format!(
                    "    <label kind=\"invariant\">{}</label>\n",
                    escape_xml(inv)
                ));
            }
            if l.urgent {
                out.push_str("    <urgent/>\n");
            }
            out.push_str("  </location>\n");
        }
        out.push_str(&format!("  <init ref=\"{}\"/>\n", self.init));
        for t in &self.transitions {
            out.push_str("  <transition>\n");
            out.push_str(&format!("    <source ref=\"{}\"/>\n", t.source));
            out.push_str(&format!("    <target ref=\"{}\"/>\n", t.target));
            for (kind, label) in [
                ("guard", &t.guard),
                ("synchronisation", &t.sync),
                ("assignment", &t.assign),
            ] {
                if let Some(label) = label {
                    out.push_str(&format!(
                        "    <label kind=\"{kind}\">{}</label>\n",
                        escape_xml(label)
                    ));
                }
            }
            out.push_str("  </transition>\n");
        }
        out.push_str("</template>\n");
    }

    pub fn rendered(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

const LOCAL_DECLARATION: &str = "// Place local declarations here.\nclock c;\n";

fn never(table: &str, index: &str) -> String {
    format!("{table}{index} == INFINITE_TIME")
}

fn finite(table: &str, index: &str) -> String {
    format!("{table}{index} != INFINITE_TIME")
}

fn reacting_invariant(index: &str) -> String {
    format!("timeU{index} == INFINITE_TIME || c<=timeU{index}")
}

/// Guard for resuming a reaction whose clock is still within its bounds.
fn continue_guard(index: &str) -> String {
    format!(
        "({} && {}) || ({} && c<=timeU{index})",
        never("timeU", index),
        finite("timeL", index),
        finite("timeU", index)
    )
}

/// Guard for resuming with the clock pulled back to a lowered upper bound.
fn shorten_guard(index: &str) -> String {
    format!("{} && c>timeU{index}", finite("timeU", index))
}

/// Firing transitions that move `var` by `delta`, clamped to `[0, max]`.
fn clamped_firing(
    local_index: &str,
    var: &str,
    max: u32,
    channel: &str,
) -> [Transition; 3] {
    let fired = format!("c>=timeL{local_index}");
    [
        Transition::new(REACTING, RESETTING)
            .guard(format!("{fired} && {var}+delta>{max}"))
            .sync(format!("{channel}!"))
            .assign(format!("{var}:={max}, c:=0")),
        Transition::new(REACTING, RESETTING)
            .guard(format!("{fired} && {var}+delta<0"))
            .sync(format!("{channel}!"))
            .assign(format!("{var}:=0, c:=0")),
        Transition::new(REACTING, RESETTING)
            .guard(format!("{fired} && {var}+delta>=0 && {var}+delta<={max}"))
            .sync(format!("{channel}!"))
            .assign(format!("{var}:={var}+delta, c:=0")),
    ]
}

pub fn mono_template_name(reactant: &str) -> String {
    format!("Reaction_{reactant}")
}

pub fn pair_template_name(catalyst: &str, substrate: &str) -> String {
    format!("Reaction2_{catalyst}_{substrate}")
}

/// Self-targeting reaction over one reactant with `levels` levels.
pub fn mono_template(reactant: &str, levels: u32) -> Template {
    let table = format!("[{levels}+1]");
    let mut t = Template::new(
        mono_template_name(reactant),
        vec![
            "int &reactant".into(),
            format!("const int timeL{table}"),
            format!("const int timeU{table}"),
            "const int delta".into(),
            "broadcast chan &inform_reacting".into(),
        ],
        format!("{LOCAL_DECLARATION}int r;"),
    )
    .with_standard_locations(reacting_invariant("[r]"));

    let now = "[reactant]";
    t.transitions
        .extend(clamped_firing("[r]", "reactant", levels, "inform_reacting"));
    t.transitions.extend([
        Transition::new(REACTING, RESETTING).sync("inform_reacting?"),
        Transition::new(NOT_REACTING, RESETTING)
            .sync("inform_reacting?")
            .assign("c:=0"),
        Transition::new(RESETTING, NOT_REACTING).guard(never("timeL", now)),
        Transition::new(START, NOT_REACTING).guard(never("timeL", now)),
        Transition::new(RESETTING, REACTING)
            .guard(shorten_guard(now))
            .assign("c:=timeU[reactant], r:=reactant"),
        Transition::new(RESETTING, REACTING)
            .guard(continue_guard(now))
            .assign("r:=reactant"),
        Transition::new(START, REACTING)
            .guard(finite("timeL", now))
            .assign("r := reactant, c:=0"),
    ]);
    t
}

/// Catalyst/substrate template.
///
/// The table is `[n_s][n_e]`. Activating reactions index rows by the
/// substrate's unreacted amount (`quantity - activity`), inhibiting ones by
/// its activity.
pub fn bi_template(
    catalyst: &str,
    substrate: &str,
    n_s: usize,
    n_e: usize,
    substrate_levels: u32,
    activating: bool,
) -> Template {
    let table = format!("[{n_s}][{n_e}]");
    let mut t = Template::new(
        pair_template_name(catalyst, substrate),
        vec![
            format!("int &reactant1{ACTIVITY_SUFFIX}"),
            format!("int &reactant2{ACTIVITY_SUFFIX}"),
            format!("int &reactant2{QUANTITY_SUFFIX}"),
            format!("const int timeL{table}"),
            format!("const int timeU{table}"),
            "const int delta".into(),
            "broadcast chan &r1_reacting".into(),
            "broadcast chan &r2_reacting".into(),
        ],
        format!("{LOCAL_DECLARATION}int r1, r2;"),
    )
    .with_standard_locations(reacting_invariant("[r2][r1]"));

    let row = if activating {
        format!("reactant2{QUANTITY_SUFFIX} - reactant2{ACTIVITY_SUFFIX}")
    } else {
        format!("reactant2{ACTIVITY_SUFFIX}")
    };
    let now = format!("[{row}][reactant1]");
    let remember = format!("r1:=reactant1, r2:={row}");

    for channel in ["r1_reacting", "r2_reacting"] {
        t.transitions.push(
            Transition::new(NOT_REACTING, RESETTING)
                .sync(format!("{channel}?"))
                .assign("c:=0"),
        );
        t.transitions
            .push(Transition::new(REACTING, RESETTING).sync(format!("{channel}?")));
    }
    t.transitions.extend(clamped_firing(
        "[r2][r1]",
        &format!("reactant2{ACTIVITY_SUFFIX}"),
        substrate_levels,
        "r2_reacting",
    ));
    t.transitions.extend([
        Transition::new(RESETTING, NOT_REACTING).guard(never("timeL", &now)),
        Transition::new(START, NOT_REACTING).guard(never("timeL", &now)),
        Transition::new(RESETTING, REACTING)
            .guard(shorten_guard(&now))
            .assign(format!("c:=timeU{now}, {remember}")),
        Transition::new(RESETTING, REACTING)
            .guard(continue_guard(&now))
            .assign(remember.clone()),
        Transition::new(START, REACTING)
            .guard(finite("timeL", &now))
            .assign(format!("{remember}, c:=0")),
    ]);
    t
}

/// Whether a user-formula output changes activity or quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Activity,
    Quantity,
}

/// Shape of an N-ary user-formula reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaShape {
    pub catalyst: String,
    pub substrate: String,
    /// Property read by each input, in table-dimension order.
    pub inputs: Vec<ReactantProperty>,
    pub outputs: Vec<OutputKind>,
    pub dimensions: Vec<usize>,
}

fn input(k: usize) -> String {
    format!("input_reactant{k}")
}

fn local(k: usize) -> String {
    format!("input_reactant_o{k}")
}

fn output(k: usize) -> String {
    format!("output_reactant{k}")
}

/// `[i1][i2]...` where each index reads the property of input `k` through
/// `var(k)`.
fn index_list(inputs: &[ReactantProperty], var: fn(usize) -> String) -> String {
    inputs
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let v = var(i + 1);
            match p {
                ReactantProperty::Activity => format!("[{v}{ACTIVITY_SUFFIX}]"),
                ReactantProperty::Quantity => format!("[{v}{QUANTITY_SUFFIX}]"),
                ReactantProperty::Inactivity => {
                    format!("[{v}{QUANTITY_SUFFIX} - {v}{ACTIVITY_SUFFIX}]")
                }
            }
        })
        .collect()
}

fn update_function(k: usize, kind: OutputKind) -> String {
    let act = format!("{}{ACTIVITY_SUFFIX}", output(k));
    let qty = format!("{}{QUANTITY_SUFFIX}", output(k));
    let perc = format!("{}{PERCENTAGE_SUFFIX}", output(k));
    match kind {
        OutputKind::Activity => format!(
            "void updateReactant{k}() {{\n\t{act} := {act} + delta{k};\n\t{perc} := percentage({act}, {qty});\n}}\n\n"
        ),
        OutputKind::Quantity => format!(
            "void updateReactant{k}() {{\n\t{qty} := {qty} + delta{k};\n\tif (delta{k} < 0) {{\n\t\t{act} := round({qty} * {perc} / 100);\n\t}}\n\t{perc} := percentage({act}, {qty});\n}}\n\n"
        ),
    }
}

fn limits_function(outputs: &[OutputKind]) -> String {
    let mut out = String::from("bool areWeAtTheLimits() {\n\tint res;\n");
    for (i, kind) in outputs.iter().enumerate() {
        let k = i + 1;
        let (var, max) = match kind {
            OutputKind::Activity => (
                format!("{}{ACTIVITY_SUFFIX}", output(k)),
                format!("{}{QUANTITY_SUFFIX}", output(k)),
            ),
            OutputKind::Quantity => (
                format!("{}{QUANTITY_SUFFIX}", output(k)),
                format!("{}{MAX_QUANTITY_SUFFIX}", output(k)),
            ),
        };
        out.push_str(&format!(
            "\n\tres := {var} + delta{k};\n\tif (res < 0 || res > {max}) {{\n\t\treturn true;\n\t}}"
        ));
    }
    out.push_str("\n\treturn false;\n}\n");
    out
}

/// Copies of the current input values, taken whenever the reaction
/// (re)starts so that firing uses the values it was scheduled with.
fn snapshot(n_inputs: usize) -> Vec<String> {
    (1..=n_inputs)
        .flat_map(|k| {
            [
                format!("{}{ACTIVITY_SUFFIX} := {}{ACTIVITY_SUFFIX}", local(k), input(k)),
                format!("{}{QUANTITY_SUFFIX} := {}{QUANTITY_SUFFIX}", local(k), input(k)),
            ]
        })
        .collect()
}

pub fn formula_template(shape: &FormulaShape) -> Template {
    let n_in = shape.inputs.len();
    let n_out = shape.outputs.len();
    let dims: String = shape.dimensions.iter().map(|d| format!("[{d}]")).collect();
    let now = index_list(&shape.inputs, input);
    let scheduled = index_list(&shape.inputs, local);

    let mut parameters = Vec::new();
    for k in 1..=n_in {
        parameters.push(format!("int &{}{QUANTITY_SUFFIX}", input(k)));
        parameters.push(format!("int &{}{ACTIVITY_SUFFIX}", input(k)));
    }
    for k in 1..=n_out {
        let o = output(k);
        parameters.push(format!("int &{o}{QUANTITY_SUFFIX}"));
        parameters.push(format!("int &{o}{ACTIVITY_SUFFIX}"));
        parameters.push(format!("int &{o}{MAX_QUANTITY_SUFFIX}"));
        parameters.push(format!("int &{o}{PERCENTAGE_SUFFIX}"));
    }
    parameters.push(format!("const int timeL{dims}"));
    parameters.push(format!("const int timeU{dims}"));
    parameters.extend((1..=n_out).map(|k| format!("const int delta{k}")));
    parameters.extend((1..=n_in).map(|k| format!("broadcast chan &input{k}_reacting")));
    parameters.extend((1..=n_out).map(|k| format!("broadcast chan &output{k}_reacting")));

    let locals: Vec<String> = (1..=n_in)
        .flat_map(|k| {
            [
                format!("{}{ACTIVITY_SUFFIX}", local(k)),
                format!("{}{QUANTITY_SUFFIX}", local(k)),
            ]
        })
        .collect();
    let mut declaration = format!("{LOCAL_DECLARATION}int {};\n\n", locals.join(", "));
    for (i, kind) in shape.outputs.iter().enumerate() {
        declaration.push_str(&update_function(i + 1, *kind));
    }
    declaration.push_str(&limits_function(&shape.outputs));

    let mut t = Template::new(
        pair_template_name(&shape.catalyst, &shape.substrate),
        parameters,
        declaration,
    )
    .with_standard_locations(reacting_invariant(&scheduled));
    for k in 1..n_out {
        t.add_urgent(format!("upd{k}"));
    }

    let channels: Vec<String> = (1..=n_in)
        .map(|k| format!("input{k}_reacting"))
        .chain((1..=n_out).map(|k| format!("output{k}_reacting")))
        .collect();
    for ch in &channels {
        t.transitions.push(
            Transition::new(NOT_REACTING, RESETTING)
                .sync(format!("{ch}?"))
                .assign("c:=0"),
        );
    }
    for ch in &channels {
        t.transitions
            .push(Transition::new(REACTING, RESETTING).sync(format!("{ch}?")));
    }

    let copies = snapshot(n_in);
    let blocked = format!("areWeAtTheLimits() || {}", never("timeL", &now));
    let mut start_assign = copies.clone();
    start_assign.push("c:=0".into());
    t.transitions.extend([
        Transition::new(START, REACTING)
            .guard(format!("!areWeAtTheLimits() && {}", finite("timeL", &now)))
            .assign(start_assign.join(", ")),
        Transition::new(START, NOT_REACTING).guard(blocked.clone()),
        Transition::new(RESETTING, NOT_REACTING).guard(blocked),
    ]);

    // Several outputs fire one at a time through urgent locations so each
    // change is announced on its own channel.
    let fired = format!("c>=timeL{scheduled}");
    if n_out > 1 {
        let mut prev = REACTING.to_string();
        for k in 1..n_out {
            let next = format!("upd{k}");
            let mut step = Transition::new(&prev, &next)
                .sync(format!("output{k}_reacting!"))
                .assign(format!("updateReactant{k}()"));
            if k == 1 {
                step = step.guard(fired.clone());
            }
            t.transitions.push(step);
            prev = next;
        }
        t.transitions.push(
            Transition::new(&prev, RESETTING)
                .sync(format!("output{n_out}_reacting!"))
                .assign(format!("c := 0, updateReactant{n_out}()")),
        );
    } else {
        t.transitions.push(
            Transition::new(REACTING, RESETTING)
                .guard(fired)
                .sync("output1_reacting!")
                .assign("updateReactant1(), c:=0"),
        );
    }

    let mut shorten_assign = vec![format!("c:=timeU{now}")];
    shorten_assign.extend(copies.iter().cloned());
    t.transitions.extend([
        Transition::new(RESETTING, REACTING)
            .guard(format!("!areWeAtTheLimits() && ({})", shorten_guard(&now)))
            .assign(shorten_assign.join(", ")),
        Transition::new(RESETTING, REACTING)
            .guard(format!("!areWeAtTheLimits() && ({})", continue_guard(&now)))
            .assign(copies.join(", ")),
    ]);
    t
}

/// Output kind for an influenced property, if it can be changed at all.
pub fn output_kind(reaction: &Reaction, index: usize) -> Option<OutputKind> {
    match reaction.influenced.get(index)?.target.kind()? {
        ReactantProperty::Activity => Some(OutputKind::Activity),
        ReactantProperty::Quantity => Some(OutputKind::Quantity),
        ReactantProperty::Inactivity => None,
    }
}
