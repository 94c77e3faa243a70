use indexmap::IndexMap;
use tracing::debug;

use crate::errors::ScenarioError;
use crate::formula_list::read_formulae;
use crate::scenario::{BuiltinScenario, Scenario, UserFormula};

/// Scenarios a reaction may name, built once per analysis.
///
/// Built-ins always come first, in their fixed order; user formulas follow in
/// registration order.
#[derive(Debug, Clone)]
pub struct ScenarioRegistry {
    scenarios: IndexMap<String, Scenario>,
}

impl ScenarioRegistry {
    pub fn with_builtins() -> Self {
        let scenarios = BuiltinScenario::ALL
            .iter()
            .map(|b| (b.name().to_string(), Scenario::Builtin(*b)))
            .collect();
        Self { scenarios }
    }

    /// Built-ins plus every formula decoded from a flat list.
    pub fn from_formula_list(list: &[String]) -> Result<Self, ScenarioError> {
        let mut registry = Self::with_builtins();
        for formula in read_formulae(list)? {
            registry.register(formula);
        }
        Ok(registry)
    }

    /// Add `formula`; a formula with the same name is replaced in place.
    pub fn register(&mut self, formula: UserFormula) {
        debug!(name = formula.name(), "registering user formula");
        self.scenarios
            .insert(formula.name().to_string(), Scenario::User(formula));
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Scenario, ScenarioError> {
        self.get(name)
            .ok_or_else(|| ScenarioError::UnknownScenario(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    /// Name used by reactions that do not pick a scenario.
    pub fn default_name(&self) -> &'static str {
        BuiltinScenario::ALL[0].name()
    }
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula_list::add_formula;
    use crate::scenario::FormulaVariable;

    fn user(name: &str, text: &str) -> UserFormula {
        UserFormula::new(name, text, vec![FormulaVariable::linked("A", None)]).unwrap()
    }

    #[test]
    fn builtins_first_in_order() {
        let r = ScenarioRegistry::with_builtins();
        let names: Vec<_> = r.names().collect();
        assert_eq!(names, vec!["Scenario 1", "Scenario 2", "Scenario 3"]);
        assert_eq!(r.default_name(), "Scenario 1");
    }

    #[test]
    fn register_replaces_same_name() {
        let mut r = ScenarioRegistry::with_builtins();
        r.register(user("mine", "A"));
        r.register(user("other", "A"));
        r.register(user("mine", "A * A"));
        let names: Vec<_> = r.names().collect();
        assert_eq!(names[3..], ["mine", "other"]);
        assert_eq!(r.require("mine").unwrap().formula(), "A * A");
    }

    #[test]
    fn unknown_scenario() {
        let r = ScenarioRegistry::default();
        assert!(matches!(
            r.require("Scenario 9"),
            Err(ScenarioError::UnknownScenario(_))
        ));
    }

    #[test]
    fn from_formula_list_appends_user_formulas() {
        let list = add_formula(None, &user("growth", "A / 2"));
        let r = ScenarioRegistry::from_formula_list(&list).unwrap();
        assert!(r.require("growth").unwrap().is_user_formula());
        assert_eq!(r.iter().count(), 4);
    }
}
