//! Reactants and `reactant.property` references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::keys;
use crate::property::PropertyBag;

/// A discretised molecular species.
///
/// `id` is the compiled identifier used in the generated model; `external_id`
/// is the identifier the caller knows the reactant by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reactant {
    pub id: String,
    pub external_id: String,
    pub alias: String,
    pub levels: u32,
    pub initial_level: u32,
    pub initial_quantity: u32,
    pub step_size: f64,
    pub enabled: bool,
    pub plotted: bool,
    /// How many times the quantity may grow past `levels`. 1 unless some
    /// enabled reaction changes this reactant's quantity.
    pub max_quantity_growth: u32,
    pub levels_scale_factor: f64,
    pub properties: PropertyBag,
}

impl Reactant {
    pub fn new(id: impl Into<String>, external_id: impl Into<String>, levels: u32) -> Self {
        let id = id.into();
        let external_id = external_id.into();
        Self {
            properties: PropertyBag::new(format!("reactant {id}")),
            alias: external_id.clone(),
            id,
            external_id,
            levels,
            initial_level: 0,
            initial_quantity: levels,
            step_size: 1.0,
            enabled: true,
            plotted: true,
            max_quantity_growth: 1,
            levels_scale_factor: 1.0,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_initial(mut self, level: u32, quantity: u32) -> Self {
        self.initial_level = level;
        self.initial_quantity = quantity;
        self
    }

    /// Upper bound on the quantity variable: `levels * max_quantity_growth`.
    pub fn max_quantity(&self) -> u32 {
        self.levels.saturating_mul(self.max_quantity_growth)
    }

    /// Initial activity as a per-mille share of the initial quantity.
    pub fn initial_per_mille(&self) -> i64 {
        if self.initial_quantity == 0 {
            return 0;
        }
        (1000.0 * f64::from(self.initial_level) / f64::from(self.initial_quantity)).round() as i64
    }

    /// Number of table rows needed to index any value of this reactant's
    /// activity, quantity or inactivity.
    pub fn table_extent(&self) -> usize {
        self.max_quantity() as usize + 1
    }
}

/// Which numeric aspect of a reactant a reaction reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactantProperty {
    Activity,
    Quantity,
    /// Quantity minus activity.
    Inactivity,
}

impl ReactantProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            ReactantProperty::Activity => keys::ACTIVITY_LEVEL,
            ReactantProperty::Quantity => keys::QUANTITY,
            ReactantProperty::Inactivity => keys::INACTIVITY_LEVEL,
        }
    }
}

impl FromStr for ReactantProperty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            keys::ACTIVITY_LEVEL => Ok(ReactantProperty::Activity),
            keys::QUANTITY => Ok(ReactantProperty::Quantity),
            keys::INACTIVITY_LEVEL => Ok(ReactantProperty::Inactivity),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ReactantProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `reactant.property` reference, e.g. `ERK.Activity level`.
///
/// The reactant part is an external id. The property is kept as text because
/// references are parsed before anyone decides which properties are valid in
/// a given position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReactantParameter {
    pub reactant: String,
    pub property: String,
}

impl ReactantParameter {
    pub const SEPARATOR: char = '.';

    pub fn new(reactant: impl Into<String>, property: ReactantProperty) -> Self {
        Self {
            reactant: reactant.into(),
            property: property.as_str().to_string(),
        }
    }

    /// Split at the first `.`; without a separator the property is empty.
    pub fn parse(text: &str) -> Self {
        match text.split_once(Self::SEPARATOR) {
            Some((reactant, property)) => Self {
                reactant: reactant.to_string(),
                property: property.to_string(),
            },
            None => Self {
                reactant: text.to_string(),
                property: String::new(),
            },
        }
    }

    pub fn kind(&self) -> Option<ReactantProperty> {
        self.property.parse().ok()
    }
}

impl fmt::Display for ReactantParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.reactant, Self::SEPARATOR, self.property)
    }
}

impl TryFrom<String> for ReactantParameter {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self::parse(&value))
    }
}

impl From<ReactantParameter> for String {
    fn from(value: ReactantParameter) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_at_first_separator() {
        let p = ReactantParameter::parse("node.12.Activity level");
        assert_eq!(p.reactant, "node");
        assert_eq!(p.property, "12.Activity level");

        let p = ReactantParameter::parse("ERK.Quantity");
        assert_eq!(p.kind(), Some(ReactantProperty::Quantity));
        assert_eq!(p.to_string(), "ERK.Quantity");
    }

    #[test]
    fn parse_without_separator_has_empty_property() {
        let p = ReactantParameter::parse("MEK");
        assert_eq!(p.reactant, "MEK");
        assert!(p.property.is_empty());
        assert_eq!(p.kind(), None);
    }

    #[test]
    fn property_names_round_trip() {
        for prop in [
            ReactantProperty::Activity,
            ReactantProperty::Quantity,
            ReactantProperty::Inactivity,
        ] {
            assert_eq!(prop.as_str().parse::<ReactantProperty>(), Ok(prop));
        }
        assert!("Concentration".parse::<ReactantProperty>().is_err());
    }

    #[test]
    fn max_quantity_and_extent() {
        let mut r = Reactant::new("R0", "a", 15);
        assert_eq!(r.max_quantity(), 15);
        assert_eq!(r.table_extent(), 16);
        r.max_quantity_growth = 10;
        assert_eq!(r.max_quantity(), 150);
        assert_eq!(r.table_extent(), 151);
    }

    #[test]
    fn initial_per_mille_rounds_and_handles_zero_quantity() {
        let r = Reactant::new("R0", "a", 15).with_initial(5, 15);
        assert_eq!(r.initial_per_mille(), 333);
        let r = Reactant::new("R0", "a", 15).with_initial(2, 3);
        assert_eq!(r.initial_per_mille(), 667);
        let r = Reactant::new("R0", "a", 15).with_initial(0, 0);
        assert_eq!(r.initial_per_mille(), 0);
    }

    #[test]
    fn reactant_parameter_serializes_as_string() {
        let p = ReactantParameter::new("ERK", ReactantProperty::Inactivity);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"ERK.Inactive reactant\"");
        let back: ReactantParameter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
