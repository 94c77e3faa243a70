#![doc = include_str!("../README.md")]

//! ANIMO domain model.
//!
//! Reactants and reactions are owned by exactly one [`Model`]; adding an
//! entity moves it into the model, so an entity can never be shared between
//! two models. Open-ended attributes live in a [`PropertyBag`], while the
//! fields the compiler depends on are typed.

pub mod keys;
pub mod model;
pub mod property;
pub mod reactant;
pub mod reaction;
pub mod result;
pub mod table;

pub use model::{Model, ModelError, ModelSettings};
pub use property::{PropertyBag, PropertyError, PropertyValue};
pub use reactant::{Reactant, ReactantParameter, ReactantProperty};
pub use reaction::{Influence, Reaction, ReactionKind, TimeBounds};
pub use result::{LevelResult, Series, SmcResult, SmcVerdict, TimeKey};
pub use table::{Table, TableError, INFINITE_TIME};
