//! Evaluation of parsed rate expressions.

use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::Expr;

/// Values bound to formula names during evaluation.
pub type Bindings = IndexMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' has no value")]
pub struct UnboundName(pub String);

impl Expr {
    /// Evaluate over `f64`. Division by zero follows IEEE rules and yields
    /// an infinity or NaN rather than an error.
    pub fn eval(&self, bindings: &Bindings) -> Result<f64, UnboundName> {
        Ok(match self {
            Expr::Num(n) => *n,
            Expr::Var(name, _) => *bindings
                .get(name)
                .ok_or_else(|| UnboundName(name.clone()))?,
            Expr::Neg(e) => -e.eval(bindings)?,
            Expr::Add(l, r) => l.eval(bindings)? + r.eval(bindings)?,
            Expr::Sub(l, r) => l.eval(bindings)? - r.eval(bindings)?,
            Expr::Mul(l, r) => l.eval(bindings)? * r.eval(bindings)?,
            Expr::Div(l, r) => l.eval(bindings)? / r.eval(bindings)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn eval(src: &str, vars: &[(&str, f64)]) -> Result<f64, UnboundName> {
        let bindings: Bindings = vars.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        parse_formula(src, "t").unwrap().eval(&bindings)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("1 + 2 * 3", &[]), Ok(7.0));
        assert_eq!(eval("(1 + 2) * 3", &[]), Ok(9.0));
        assert_eq!(eval("-2 - -3", &[]), Ok(1.0));
        assert_eq!(eval("k * E", &[("k", 0.5), ("E", 4.0)]), Ok(2.0));
    }

    #[test]
    fn michaelis_menten() {
        let v = eval(
            "k2 * E * S / (km + S)",
            &[("k2", 0.01), ("E", 4.0), ("S", 10.0), ("km", 10.0)],
        )
        .unwrap();
        assert!((v - 0.02).abs() < 1e-12);
    }

    #[test]
    fn division_by_zero_is_ieee() {
        assert_eq!(eval("1 / x", &[("x", 0.0)]), Ok(f64::INFINITY));
        assert_eq!(eval("-1 / x", &[("x", 0.0)]), Ok(f64::NEG_INFINITY));
        assert!(eval("x / x", &[("x", 0.0)]).unwrap().is_nan());
    }

    #[test]
    fn unbound_name_reported() {
        assert_eq!(eval("k * E", &[("k", 1.0)]), Err(UnboundName("E".into())));
    }
}
