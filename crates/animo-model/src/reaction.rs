//! Reactions and their time bounds.

use serde::{Deserialize, Serialize};

use crate::property::PropertyBag;
use crate::reactant::ReactantParameter;
use crate::table::Table;

/// Shape of a reaction, which decides how it is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionKind {
    /// Self-targeting reaction; the table is indexed by the reactant's own level.
    Mono,
    /// Catalyst acting on a substrate through a built-in scenario.
    Bi,
    /// N-ary reaction driven by a user formula.
    UserFormula,
}

/// Lower and upper time bounds, both with the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBounds {
    pub lower: Table,
    pub upper: Table,
}

impl TimeBounds {
    pub fn dimensions(&self) -> &[usize] {
        self.lower.dimensions()
    }
}

/// Effect of a reaction on one reactant property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Influence {
    pub target: ReactantParameter,
    pub delta: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub kind: ReactionKind,
    /// Compiled id of the driving reactant. Equal to `reactant` for Mono.
    pub catalyst: String,
    /// Compiled id of the target reactant (the substrate).
    pub reactant: String,
    /// Sign of the effect on the target: positive activates, negative inhibits.
    pub increment: i32,
    pub enabled: bool,
    /// Percentage spread applied around each computed time.
    pub uncertainty: u32,
    /// Inputs of the rate law, in table-dimension order.
    pub influencing: Vec<ReactantParameter>,
    pub influenced: Vec<Influence>,
    pub bounds: Option<TimeBounds>,
    pub properties: PropertyBag,
}

impl Reaction {
    pub fn mono(id: impl Into<String>, reactant: impl Into<String>, increment: i32) -> Self {
        let reactant = reactant.into();
        Self::new(id, ReactionKind::Mono, reactant.clone(), reactant, increment)
    }

    pub fn bi(
        id: impl Into<String>,
        catalyst: impl Into<String>,
        reactant: impl Into<String>,
        increment: i32,
    ) -> Self {
        Self::new(id, ReactionKind::Bi, catalyst.into(), reactant.into(), increment)
    }

    pub fn user_formula(
        id: impl Into<String>,
        catalyst: impl Into<String>,
        reactant: impl Into<String>,
        increment: i32,
    ) -> Self {
        Self::new(
            id,
            ReactionKind::UserFormula,
            catalyst.into(),
            reactant.into(),
            increment,
        )
    }

    fn new(
        id: impl Into<String>,
        kind: ReactionKind,
        catalyst: String,
        reactant: String,
        increment: i32,
    ) -> Self {
        let id = id.into();
        Self {
            properties: PropertyBag::new(format!("reaction {id}")),
            id,
            kind,
            catalyst,
            reactant,
            increment,
            enabled: true,
            uncertainty: 0,
            influencing: Vec::new(),
            influenced: Vec::new(),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: TimeBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn is_activating(&self) -> bool {
        self.increment > 0
    }

    /// `-->` for activation, `--|` for inhibition.
    pub fn arrow(&self) -> &'static str {
        if self.is_activating() {
            "-->"
        } else {
            "--|"
        }
    }

    /// Human-readable name used in diagnostics, e.g. `R0 --> R1`.
    pub fn describe(&self) -> String {
        match self.kind {
            ReactionKind::Mono => format!("{} {} {}", self.reactant, self.arrow(), self.reactant),
            _ => format!("{} {} {}", self.catalyst, self.arrow(), self.reactant),
        }
    }
}
