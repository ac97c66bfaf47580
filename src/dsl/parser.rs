//! Shunting-yard conversion from tokens to reverse Polish notation.
//!
//! Operand/operator alternation is checked while converting, so every
//! syntax problem surfaces before evaluation starts.

use super::token::{Operator, Token};
use crate::error::ScoreError;

/// One step of an RPN program.
#[derive(Debug, Clone, PartialEq)]
pub enum RpnItem {
    Number(f64),
    Str(String),
    Ident(String),
    Op(Operator),
}

enum StackEntry {
    Op(Operator),
    LParen,
}

/// Convert infix tokens into an RPN program.
///
/// # Examples
///
/// ```rust
/// use scorepipe::dsl::lexer::tokenize;
/// use scorepipe::dsl::parser::{to_rpn, RpnItem};
/// use scorepipe::dsl::token::Operator;
///
/// let rpn = to_rpn(tokenize("2 + 3 * 4").unwrap()).unwrap();
/// assert_eq!(
///     rpn,
///     vec![
///         RpnItem::Number(2.0),
///         RpnItem::Number(3.0),
///         RpnItem::Number(4.0),
///         RpnItem::Op(Operator::Mul),
///         RpnItem::Op(Operator::Add),
///     ]
/// );
/// ```
pub fn to_rpn(tokens: Vec<Token>) -> Result<Vec<RpnItem>, ScoreError> {
    if tokens.is_empty() {
        return Err(ScoreError::MalformedExpression("empty expression".to_string()));
    }

    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<StackEntry> = Vec::new();
    // Whether the grammar expects an operand (or prefix operator) next.
    let mut expect_operand = true;

    for token in tokens {
        match token {
            Token::Number(n) => push_operand(&mut output, &mut expect_operand, RpnItem::Number(n))?,
            Token::Str(s) => push_operand(&mut output, &mut expect_operand, RpnItem::Str(s))?,
            Token::Ident(name) => {
                push_operand(&mut output, &mut expect_operand, RpnItem::Ident(name))?
            }
            Token::Op(op) if op.is_unary() => {
                if !expect_operand {
                    return Err(malformed(&format!("'{op}' must precede its operand")));
                }
                stack.push(StackEntry::Op(op));
            }
            Token::Op(op) => {
                if expect_operand {
                    return Err(malformed(&format!("operator '{op}' is missing an operand")));
                }
                while let Some(StackEntry::Op(top)) = stack.last() {
                    let top = *top;
                    let pops = top.precedence() > op.precedence()
                        || (top.precedence() == op.precedence() && !op.is_right_associative());
                    if !pops {
                        break;
                    }
                    stack.pop();
                    output.push(RpnItem::Op(top));
                }
                stack.push(StackEntry::Op(op));
                expect_operand = true;
            }
            Token::LParen => {
                if !expect_operand {
                    return Err(malformed("'(' cannot follow an operand"));
                }
                stack.push(StackEntry::LParen);
            }
            Token::RParen => {
                if expect_operand {
                    return Err(malformed("')' closes an incomplete expression"));
                }
                loop {
                    match stack.pop() {
                        Some(StackEntry::Op(op)) => output.push(RpnItem::Op(op)),
                        Some(StackEntry::LParen) => break,
                        None => {
                            return Err(ScoreError::MismatchedParentheses(
                                "unexpected ')'".to_string(),
                            ))
                        }
                    }
                }
            }
        }
    }

    if expect_operand {
        return Err(malformed("expression ends with an operator"));
    }

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Op(op) => output.push(RpnItem::Op(op)),
            StackEntry::LParen => {
                return Err(ScoreError::MismatchedParentheses("unclosed '('".to_string()))
            }
        }
    }

    Ok(output)
}

fn push_operand(
    output: &mut Vec<RpnItem>,
    expect_operand: &mut bool,
    item: RpnItem,
) -> Result<(), ScoreError> {
    if !*expect_operand {
        return Err(malformed("operands without an operator between them"));
    }
    *expect_operand = false;
    output.push(item);
    Ok(())
}

fn malformed(reason: &str) -> ScoreError {
    ScoreError::MalformedExpression(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;

    fn rpn(source: &str) -> Result<Vec<RpnItem>, ScoreError> {
        to_rpn(tokenize(source)?)
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(
            rpn("(2 + 3) * 4").unwrap(),
            vec![
                RpnItem::Number(2.0),
                RpnItem::Number(3.0),
                RpnItem::Op(Operator::Add),
                RpnItem::Number(4.0),
                RpnItem::Op(Operator::Mul),
            ]
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            rpn("8 - 3 - 1").unwrap(),
            vec![
                RpnItem::Number(8.0),
                RpnItem::Number(3.0),
                RpnItem::Op(Operator::Sub),
                RpnItem::Number(1.0),
                RpnItem::Op(Operator::Sub),
            ]
        );
    }

    #[test]
    fn test_not_binds_tightest_and_nests() {
        assert_eq!(
            rpn("!!a && b").unwrap(),
            vec![
                RpnItem::Ident("a".to_string()),
                RpnItem::Op(Operator::Not),
                RpnItem::Op(Operator::Not),
                RpnItem::Ident("b".to_string()),
                RpnItem::Op(Operator::And),
            ]
        );
    }

    #[test]
    fn test_mismatched_parentheses() {
        assert!(matches!(
            rpn("(1 + 2"),
            Err(ScoreError::MismatchedParentheses(_))
        ));
        assert!(matches!(rpn("()"), Err(ScoreError::MalformedExpression(_))));
        assert!(matches!(
            rpn("1 + 2)"),
            Err(ScoreError::MismatchedParentheses(_))
        ));
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(rpn("2 +"), Err(ScoreError::MalformedExpression(_))));
        assert!(matches!(rpn("2 3"), Err(ScoreError::MalformedExpression(_))));
        assert!(matches!(rpn(""), Err(ScoreError::MalformedExpression(_))));
        assert!(matches!(rpn("a !"), Err(ScoreError::MalformedExpression(_))));
        assert!(matches!(rpn("SUM(x)"), Err(ScoreError::MalformedExpression(_))));
    }
}
