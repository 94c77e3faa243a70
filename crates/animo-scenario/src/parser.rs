use pest::Parser;
use pest_derive::Parser;

use crate::ast::{Expr, Span};
use crate::errors::FormulaError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct FormulaParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Parse the text of formula `name` into an expression tree.
pub fn parse_formula(source: &str, name: &str) -> Result<Expr, FormulaError> {
    let pairs = FormulaParser::parse(Rule::formula, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, p + 1),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        FormulaError::syntax(name, e.variant.message(), Span::new(start, end), source)
    })?;

    let ctx = Ctx { source, name };
    let formula = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ctx.error(Span::new(0, source.len()), "empty formula"))?;
    let expr = formula
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| ctx.error(Span::new(0, source.len()), "missing expression"))?;
    ctx.expr(expr)
}

struct Ctx<'s> {
    source: &'s str,
    name: &'s str,
}

impl Ctx<'_> {
    fn error(&self, span: Span, message: impl Into<String>) -> FormulaError {
        FormulaError::syntax(self.name, message, span, self.source)
    }

    fn operand(&self, next: Option<Pair<'_>>, after: &Pair<'_>) -> Result<Expr, FormulaError> {
        match next {
            Some(p) => self.expr(p),
            None => Err(self.error(span_from(after), "operator without right operand")),
        }
    }

    fn expr(&self, pair: Pair<'_>) -> Result<Expr, FormulaError> {
        let span = span_from(&pair);
        match pair.as_rule() {
            Rule::expr | Rule::term => {
                let mut inner = pair.into_inner();
                let first = inner
                    .next()
                    .ok_or_else(|| self.error(span, "empty expression"))?;
                let mut result = self.expr(first)?;
                while let Some(op) = inner.next() {
                    let rhs = self.operand(inner.next(), &op)?;
                    result = match op.as_str() {
                        "+" => Expr::Add(Box::new(result), Box::new(rhs)),
                        "-" => Expr::Sub(Box::new(result), Box::new(rhs)),
                        "*" => Expr::Mul(Box::new(result), Box::new(rhs)),
                        "/" => Expr::Div(Box::new(result), Box::new(rhs)),
                        other => {
                            return Err(self.error(span_from(&op), format!("unknown operator '{other}'")))
                        }
                    };
                }
                Ok(result)
            }
            Rule::unary => {
                let inner: Vec<_> = pair.into_inner().collect();
                match inner.as_slice() {
                    [op, operand] if op.as_rule() == Rule::neg_op => {
                        Ok(Expr::Neg(Box::new(self.expr(operand.clone())?)))
                    }
                    [operand] => self.expr(operand.clone()),
                    _ => Err(self.error(
                        span,
                        format!("unexpected unary expression shape ({} children)", inner.len()),
                    )),
                }
            }
            Rule::number => {
                let n: f64 = pair
                    .as_str()
                    .parse()
                    .map_err(|e| self.error(span, format!("invalid number literal: {e}")))?;
                Ok(Expr::Num(n))
            }
            Rule::ident => Ok(Expr::Var(pair.as_str().to_string(), span)),
            other => Err(self.error(span, format!("unexpected {other:?}"))),
        }
    }
}
