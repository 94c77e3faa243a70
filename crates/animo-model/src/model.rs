//! The reaction network handed to the compiler.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::property::PropertyBag;
use crate::reactant::Reactant;
use crate::reaction::Reaction;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("reactant '{0}' is already part of the model")]
    DuplicateReactant(String),
    #[error("reaction '{0}' is already part of the model")]
    DuplicateReaction(String),
    #[error("reaction '{reaction}' refers to unknown reactant '{reactant}'")]
    UnknownReactant { reaction: String, reactant: String },
}

/// Network-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Default granularity for reactants that do not set their own.
    pub levels: u32,
    /// Real-life seconds represented by one model time unit.
    pub seconds_per_point: f64,
    /// Multiplier on every time bound, compensating changes to `seconds_per_point`.
    pub time_scale_factor: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            levels: 15,
            seconds_per_point: 12.0,
            time_scale_factor: 1.0,
        }
    }
}

/// Reactants and reactions keyed by compiled id, in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    reactants: IndexMap<String, Reactant>,
    reactions: IndexMap<String, Reaction>,
    pub settings: ModelSettings,
    pub properties: PropertyBag,
}

impl Model {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            reactants: IndexMap::new(),
            reactions: IndexMap::new(),
            settings,
            properties: PropertyBag::new("model"),
        }
    }

    /// Takes ownership of `reactant`. Ids are unique within a model.
    pub fn add_reactant(&mut self, reactant: Reactant) -> Result<(), ModelError> {
        if self.reactants.contains_key(&reactant.id) {
            return Err(ModelError::DuplicateReactant(reactant.id));
        }
        self.reactants.insert(reactant.id.clone(), reactant);
        Ok(())
    }

    /// Takes ownership of `reaction`; both endpoints must already be present.
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<(), ModelError> {
        if self.reactions.contains_key(&reaction.id) {
            return Err(ModelError::DuplicateReaction(reaction.id));
        }
        for endpoint in [&reaction.catalyst, &reaction.reactant] {
            if !self.reactants.contains_key(endpoint) {
                return Err(ModelError::UnknownReactant {
                    reaction: reaction.id.clone(),
                    reactant: endpoint.clone(),
                });
            }
        }
        self.reactions.insert(reaction.id.clone(), reaction);
        Ok(())
    }

    pub fn reactant(&self, id: &str) -> Option<&Reactant> {
        self.reactants.get(id)
    }

    pub fn reactant_mut(&mut self, id: &str) -> Option<&mut Reactant> {
        self.reactants.get_mut(id)
    }

    pub fn reactant_by_external_id(&self, external_id: &str) -> Option<&Reactant> {
        self.reactants
            .values()
            .find(|r| r.external_id == external_id)
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.get(id)
    }

    pub fn reactants(&self) -> impl Iterator<Item = &Reactant> {
        self.reactants.values()
    }

    pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.values()
    }

    pub fn enabled_reactants(&self) -> impl Iterator<Item = &Reactant> {
        self.reactants.values().filter(|r| r.enabled)
    }

    pub fn enabled_reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.values().filter(|r| r.enabled)
    }

    pub fn reactant_count(&self) -> usize {
        self.reactants.len()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_reactants() -> Model {
        let mut m = Model::new(ModelSettings::default());
        m.add_reactant(Reactant::new("R0", "kinase", 15)).unwrap();
        m.add_reactant(Reactant::new("R1", "substrate", 15)).unwrap();
        m
    }

    #[test]
    fn duplicate_reactant_rejected() {
        let mut m = two_reactants();
        let err = m.add_reactant(Reactant::new("R0", "other", 5)).unwrap_err();
        assert_eq!(err, ModelError::DuplicateReactant("R0".into()));
        assert_eq!(m.reactant_count(), 2);
    }

    #[test]
    fn reaction_endpoints_must_exist() {
        let mut m = two_reactants();
        let err = m.add_reaction(Reaction::bi("P0", "R0", "R9", 1)).unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownReactant {
                reaction: "P0".into(),
                reactant: "R9".into()
            }
        );
        m.add_reaction(Reaction::bi("P0", "R0", "R1", 1)).unwrap();
        assert_eq!(
            m.add_reaction(Reaction::mono("P0", "R1", -1)),
            Err(ModelError::DuplicateReaction("P0".into()))
        );
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut m = Model::new(ModelSettings::default());
        for id in ["R2", "R0", "R1"] {
            m.add_reactant(Reactant::new(id, id.to_lowercase(), 5)).unwrap();
        }
        let ids: Vec<&str> = m.reactants().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["R2", "R0", "R1"]);
    }

    #[test]
    fn enabled_filters_and_external_lookup() {
        let mut m = two_reactants();
        m.reactant_mut("R1").unwrap().enabled = false;
        let enabled: Vec<&str> = m.enabled_reactants().map(|r| r.id.as_str()).collect();
        assert_eq!(enabled, vec!["R0"]);
        assert_eq!(m.reactant_by_external_id("substrate").unwrap().id, "R1");
        assert!(m.reactant_by_external_id("missing").is_none());
    }
}
