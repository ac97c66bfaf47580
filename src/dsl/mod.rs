//! The scoring expression language.
//!
//! Expressions go through three stages:
//!
//! ```text
//! source ─tokenize→ [Token] ─to_rpn→ [RpnItem] ─evaluate_rpn→ Value
//! ```
//!
//! Parsing finishes before anything is evaluated, so a syntax error never
//! leaves a half-applied calculation behind. A whole-expression aggregate
//! call (`AVG(score)`) is compiled separately and evaluated over a
//! collection of records.

pub mod aggregate;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;

use crate::error::ScoreError;
use crate::property::PropertyAccess;
use crate::value::Value;
use aggregate::{split_aggregate, AggregateFn};
use eval::{evaluate_rpn, NoScope, RecordScope, Scope};
use parser::RpnItem;

#[derive(Debug, Clone, PartialEq)]
enum Program {
    Plain(Vec<RpnItem>),
    Aggregate {
        function: AggregateFn,
        /// `None` for an empty call such as `COUNT()`.
        inner: Option<Vec<RpnItem>>,
    },
}

/// A parsed expression, reusable across evaluations.
///
/// # Examples
///
/// ```rust
/// use scorepipe::dsl::Expression;
/// use scorepipe::{Subject, Value};
///
/// let expr = Expression::parse("AVG(score)").unwrap();
/// let subjects: Vec<Subject> = [2.0, 4.0, 6.0]
///     .iter()
///     .enumerate()
///     .map(|(i, s)| {
///         let mut subject = Subject::new(i as u32 + 1);
///         subject.score = *s;
///         subject
///     })
///     .collect();
///
/// assert_eq!(expr.evaluate_over(&subjects).unwrap(), Value::Number(4.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    program: Program,
}

fn compile(source: &str) -> Result<Vec<RpnItem>, ScoreError> {
    parser::to_rpn(lexer::tokenize(source)?)
}

impl Expression {
    /// Parse `source`, raising every syntax error up front.
    pub fn parse(source: &str) -> Result<Self, ScoreError> {
        let program = match split_aggregate(source) {
            Some((function, inner)) if inner.trim().is_empty() => Program::Aggregate {
                function,
                inner: None,
            },
            Some((function, inner)) => Program::Aggregate {
                function,
                inner: Some(compile(inner)?),
            },
            None => Program::Plain(compile(source)?),
        };
        Ok(Self {
            source: source.to_string(),
            program,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.program, Program::Aggregate { .. })
    }

    /// Evaluate against `scope`. An aggregate reduces over an empty
    /// collection here.
    pub fn evaluate(&self, scope: &dyn Scope) -> Result<Value, ScoreError> {
        match &self.program {
            Program::Plain(program) => evaluate_rpn(program, scope),
            Program::Aggregate { .. } => {
                self.evaluate_over(std::iter::empty::<&crate::Context>())
            }
        }
    }

    /// Evaluate with each of `items` bound in turn as the current item.
    ///
    /// A plain expression ignores the collection and is evaluated once with
    /// no scope.
    pub fn evaluate_over<'a, R>(
        &self,
        items: impl IntoIterator<Item = &'a R>,
    ) -> Result<Value, ScoreError>
    where
        R: PropertyAccess + 'a,
    {
        let (function, inner) = match &self.program {
            Program::Plain(program) => return evaluate_rpn(program, &NoScope),
            Program::Aggregate { function, inner } => (*function, inner),
        };

        let Some(inner) = inner else {
            let size = items.into_iter().count();
            return Ok(Value::Number(size as f64));
        };

        let mut numbers = Vec::new();
        for item in items {
            if let Value::Number(n) = evaluate_rpn(inner, &RecordScope::new(item))? {
                if !n.is_nan() {
                    numbers.push(n);
                }
            }
        }
        Ok(Value::Number(function.reduce(&numbers)))
    }
}

/// Parse and evaluate `source` with no identifiers in scope.
///
/// # Examples
///
/// ```rust
/// use scorepipe::dsl::evaluate;
/// use scorepipe::Value;
///
/// assert_eq!(evaluate("2 + 3 * 4").unwrap(), Value::Number(14.0));
/// assert_eq!(evaluate("1 < 2 && 3 > 2").unwrap(), Value::Bool(true));
/// ```
pub fn evaluate(source: &str) -> Result<Value, ScoreError> {
    Expression::parse(source)?.evaluate(&NoScope)
}

/// Parse and evaluate `source` against `scope`.
pub fn evaluate_with(source: &str, scope: &dyn Scope) -> Result<Value, ScoreError> {
    Expression::parse(source)?.evaluate(scope)
}

/// Parse and evaluate `source` over a collection of records.
pub fn evaluate_aggregate<'a, R>(
    source: &str,
    items: impl IntoIterator<Item = &'a R>,
) -> Result<Value, ScoreError>
where
    R: PropertyAccess + 'a,
{
    Expression::parse(source)?.evaluate_over(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Subject;

    fn scored(scores: &[f64]) -> Vec<Subject> {
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| {
                let mut subject = Subject::new(i as u32 + 1);
                subject.score = *score;
                subject
            })
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), Value::Number(14.0));
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), Value::Number(20.0));
        assert_eq!(evaluate("1 < 2 && 3 > 2").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_count_short_circuits() {
        let subjects = scored(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            evaluate_aggregate("COUNT()", &subjects).unwrap(),
            Value::Number(5.0)
        );
        assert_eq!(
            evaluate_aggregate("COUNT(score > 2)", &subjects).unwrap(),
            Value::Number(0.0)
        );
        assert_eq!(
            evaluate_aggregate("COUNT(score)", &subjects).unwrap(),
            Value::Number(5.0)
        );
    }

    #[test]
    fn test_avg_and_std() {
        let subjects = scored(&[2.0, 4.0, 6.0]);
        assert_eq!(
            evaluate_aggregate("AVG(x)", &[Subject::new(1)]).unwrap(),
            Value::Number(0.0)
        );
        assert_eq!(
            evaluate_aggregate("AVG(score)", &subjects).unwrap(),
            Value::Number(4.0)
        );
        let std = evaluate_aggregate("STD(item.score)", &subjects)
            .unwrap()
            .to_number();
        assert!((std - 1.633).abs() < 1e-3);
    }

    #[test]
    fn test_aggregate_drops_non_numeric() {
        let mut subjects = scored(&[10.0, 20.0]);
        subjects[1].vars.insert("w".to_string(), Value::from("n/a"));
        subjects[0].vars.insert("w".to_string(), Value::from(3.0));
        assert_eq!(
            evaluate_aggregate("SUM(w)", &subjects).unwrap(),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_syntax_errors_raise_before_evaluation() {
        assert!(evaluate("1 +").is_err());
        assert!(Expression::parse("SUM(score +)").is_err());
        assert!(matches!(
            evaluate("(1"),
            Err(ScoreError::MismatchedParentheses(_))
        ));
    }

    #[test]
    fn test_aggregate_without_collection() {
        assert_eq!(evaluate("SUM(score)").unwrap(), Value::Number(0.0));
        assert!(Expression::parse("MIN(score)").unwrap().is_aggregate());
    }
}
