//! Stack-machine evaluation of RPN programs.

use super::parser::RpnItem;
use super::token::Operator;
use crate::error::ScoreError;
use crate::property::PropertyAccess;
use crate::value::Value;

/// Resolves identifiers that are neither literals nor numbers.
pub trait Scope {
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// Scope in which every identifier is unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScope;

impl Scope for NoScope {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Binds one record as the current item.
///
/// Both `score` and `item.score` address the record's `score` property.
pub struct RecordScope<'a, R: ?Sized> {
    record: &'a R,
}

impl<'a, R: PropertyAccess + ?Sized> RecordScope<'a, R> {
    pub fn new(record: &'a R) -> Self {
        Self { record }
    }
}

impl<R: PropertyAccess + ?Sized> Scope for RecordScope<'_, R> {
    fn resolve(&self, name: &str) -> Option<Value> {
        let key = name.strip_prefix("item.").unwrap_or(name);
        self.record
            .has_property(key)
            .then(|| self.record.get_property(key))
    }
}

fn is_numeric_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn resolve_identifier(name: &str, scope: &dyn Scope) -> Value {
    match name {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "NaN" => Value::Number(f64::NAN),
        _ if is_numeric_name(name) => name.parse().map(Value::Number).unwrap_or_default(),
        _ => scope.resolve(name).unwrap_or(Value::Unresolved),
    }
}

fn is_numeric_text(value: &Value) -> bool {
    !matches!(value, Value::Text(_)) || value.as_number().is_some()
}

fn binary(op: Operator, lhs: &Value, rhs: &Value) -> Value {
    match op {
        Operator::Add if !is_numeric_text(lhs) || !is_numeric_text(rhs) => {
            Value::Text(format!("{lhs}{rhs}"))
        }
        Operator::Add => Value::Number(lhs.to_number() + rhs.to_number()),
        Operator::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
        Operator::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
        Operator::Div | Operator::Mod => {
            let divisor = rhs.to_number();
            if divisor == 0.0 {
                return Value::Number(f64::NAN);
            }
            let dividend = lhs.to_number();
            Value::Number(if op == Operator::Div {
                dividend / divisor
            } else {
                dividend % divisor
            })
        }
        Operator::Eq => Value::Bool(lhs.loose_eq(rhs)),
        Operator::Ne => Value::Bool(!lhs.loose_eq(rhs)),
        Operator::Gt => Value::Bool(lhs.loose_cmp(rhs).is_some_and(|o| o.is_gt())),
        Operator::Ge => Value::Bool(lhs.loose_cmp(rhs).is_some_and(|o| o.is_ge())),
        Operator::Lt => Value::Bool(lhs.loose_cmp(rhs).is_some_and(|o| o.is_lt())),
        Operator::Le => Value::Bool(lhs.loose_cmp(rhs).is_some_and(|o| o.is_le())),
        Operator::And => Value::Bool(lhs.is_truthy() && rhs.is_truthy()),
        Operator::Or => Value::Bool(lhs.is_truthy() || rhs.is_truthy()),
        Operator::Not => Value::Bool(!rhs.is_truthy()),
    }
}

fn pop(stack: &mut Vec<Value>) -> Result<Value, ScoreError> {
    stack
        .pop()
        .ok_or_else(|| ScoreError::MalformedExpression("evaluation stack underflow".to_string()))
}

/// Run an RPN program against `scope`.
pub fn evaluate_rpn(program: &[RpnItem], scope: &dyn Scope) -> Result<Value, ScoreError> {
    let mut stack: Vec<Value> = Vec::with_capacity(program.len());
    for item in program {
        let value = match item {
            RpnItem::Number(n) => Value::Number(*n),
            RpnItem::Str(s) => Value::Text(s.clone()),
            RpnItem::Ident(name) => resolve_identifier(name, scope),
            RpnItem::Op(op) if op.is_unary() => {
                let operand = pop(&mut stack)?;
                Value::Bool(!operand.is_truthy())
            }
            RpnItem::Op(op) => {
                let rhs = pop(&mut stack)?;
                let lhs = pop(&mut stack)?;
                binary(*op, &lhs, &rhs)
            }
        };
        stack.push(value);
    }
    let result = pop(&mut stack)?;
    if !stack.is_empty() {
        return Err(ScoreError::MalformedExpression(
            "values left on the evaluation stack".to_string(),
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;
    use crate::dsl::parser::to_rpn;
    use crate::subject::Subject;

    fn eval(source: &str) -> Value {
        let program = to_rpn(tokenize(source).unwrap()).unwrap();
        evaluate_rpn(&program, &NoScope).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 3 * 4"), Value::Number(14.0));
        assert_eq!(eval("(2 + 3) * 4"), Value::Number(20.0));
        assert_eq!(eval("7 % 4"), Value::Number(3.0));
        assert!(eval("1 / 0").to_number().is_nan());
    }

    #[test]
    fn test_logic_and_comparison() {
        assert_eq!(eval("1 < 2 && 3 > 2"), Value::Bool(true));
        assert_eq!(eval("1 >= 2 || 2 <= 2"), Value::Bool(true));
        assert_eq!(eval("!(1 == 1)"), Value::Bool(false));
        assert_eq!(eval("'A' == 'A'"), Value::Bool(true));
        assert_eq!(eval("'B' > 'A'"), Value::Bool(true));
    }

    #[test]
    fn test_identifier_resolution() {
        assert_eq!(eval("true && !false"), Value::Bool(true));
        assert!(eval("unknown + 1").to_number().is_nan());
        assert_eq!(eval("unknown == 0"), Value::Bool(false));
        assert_eq!(eval("unknown != 0"), Value::Bool(true));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval("'grade ' + 3"), Value::from("grade 3"));
        assert_eq!(eval("'3' + 4"), Value::Number(7.0));
    }

    #[test]
    fn test_record_scope() {
        let mut subject = Subject::new(1);
        subject.score = 80.0;
        let program = to_rpn(tokenize("item.score / 2 + score").unwrap()).unwrap();
        let value = evaluate_rpn(&program, &RecordScope::new(&subject)).unwrap();
        assert_eq!(value, Value::Number(120.0));
    }
}
