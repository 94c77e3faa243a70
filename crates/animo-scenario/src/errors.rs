#![allow(unused_assignments)]

use animo_model::TableError;
use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

/// Problems found while reading a formula's text.
#[derive(Debug, Error, Diagnostic)]
pub enum FormulaError {
    #[error("Syntax error in formula '{formula}': {message}")]
    #[diagnostic(code(animo::formula::syntax))]
    Syntax {
        formula: String,
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Formula '{formula}' uses undeclared variable '{variable}'")]
    #[diagnostic(
        code(animo::formula::undeclared),
        help("declare it as a parameter (P) or as a variable linked to a reactant (V)")
    )]
    Undeclared {
        formula: String,
        variable: String,
        #[label("not declared")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Formula '{formula}' declares '{variable}' twice")]
    #[diagnostic(code(animo::formula::duplicate))]
    DuplicateVariable { formula: String, variable: String },
}

impl FormulaError {
    pub fn syntax(formula: &str, message: impl Into<String>, span: Span, source: &str) -> Self {
        FormulaError::Syntax {
            formula: formula.to_string(),
            message: message.into(),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            src: miette::NamedSource::new(formula, source.to_owned()),
        }
    }

    pub fn undeclared(formula: &str, variable: &str, span: Span, source: &str) -> Self {
        FormulaError::Undeclared {
            formula: formula.to_string(),
            variable: variable.to_string(),
            span: (span.start, span.end - span.start).into(),
            src: miette::NamedSource::new(formula, source.to_owned()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("scenario '{scenario}' has no value for parameter '{parameter}'")]
    MissingParameter { scenario: String, parameter: String },

    #[error("in formula '{formula}', variable '{variable}' is not linked to any reactant property")]
    UnboundVariable { formula: String, variable: String },

    #[error(
        "in formula '{formula}', variable '{variable}' reads property '{property}'; \
         only activity, quantity and inactivity can be linked"
    )]
    UnsupportedProperty {
        formula: String,
        variable: String,
        property: String,
    },

    #[error("in formula '{formula}', variable '{variable}' is linked to unknown reactant '{reactant}'")]
    UnknownReactant {
        formula: String,
        variable: String,
        reactant: String,
    },

    #[error("invalid rate (NaN) {context}")]
    InvalidRate { context: String },

    #[error("malformed formula list: {0}")]
    MalformedFormulaList(String),

    #[error("there is no user formula called '{0}'")]
    UnknownFormula(String),

    #[error("uncertainty {0}% is outside 0..=100")]
    UncertaintyOutOfRange(u32),

    #[error("time bound {value} (from raw time {time}) does not fit a table cell")]
    BoundOverflow { time: f64, value: f64 },

    #[error(transparent)]
    Table(#[from] TableError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_carries_span() {
        let err = FormulaError::syntax("f", "unexpected token", Span::new(4, 5), "k * * E");
        match err {
            FormulaError::Syntax { span, .. } => {
                assert_eq!(span.offset(), 4);
                assert_eq!(span.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn messages_name_the_culprit() {
        let err = FormulaError::undeclared("growth", "q", Span::new(4, 5), "k * q");
        assert_eq!(err.to_string(), "Formula 'growth' uses undeclared variable 'q'");

        let err = ScenarioError::UnboundVariable {
            formula: "growth".into(),
            variable: "E".into(),
        };
        assert!(err.to_string().contains("'E' is not linked"));
    }

    #[test]
    fn formula_error_converts_transparently() {
        let inner = FormulaError::DuplicateVariable {
            formula: "f".into(),
            variable: "k".into(),
        };
        let msg = inner.to_string();
        let err: ScenarioError = inner.into();
        assert_eq!(err.to_string(), msg);
    }
}
