#![doc = include_str!("../README.md")]

pub mod ast;
pub mod errors;
pub mod eval;
pub mod formula_list;
pub mod parser;
pub mod registry;
pub mod scenario;
pub mod tables;

pub use errors::{FormulaError, ScenarioError};
pub use parser::parse_formula;
pub use registry::ScenarioRegistry;
pub use scenario::{
    BuiltinScenario, FormulaVariable, MonoScenario, Parameters, Scenario, UserFormula,
};
pub use tables::{scale_times, time_from_rate, BoundScaling};
