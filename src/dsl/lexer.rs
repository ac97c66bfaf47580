//! Scans an expression string into tokens.
//!
//! Handles whitespace, numbers (a `-` in prefix position directly followed by
//! a digit is read as part of the literal), single-quoted strings with
//! backslash escapes, dotted identifiers and the one- and two-character
//! operators.

use super::token::{Operator, Token};
use crate::error::ScoreError;
use std::iter::Peekable;
use std::str::CharIndices;

struct Lexer<'a> {
    input: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
}

/// Tokenize `source` completely, failing on the first lexical error.
///
/// # Examples
///
/// ```rust
/// use scorepipe::dsl::lexer::tokenize;
/// use scorepipe::dsl::token::{Operator, Token};
///
/// let tokens = tokenize("a >= 'x'").unwrap();
/// assert_eq!(tokens[1], Token::Op(Operator::Ge));
/// assert_eq!(tokens[2], Token::Str("x".to_string()));
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScoreError> {
    let mut lexer = Lexer {
        input: source.char_indices().peekable(),
        tokens: Vec::new(),
    };
    while let Some(token) = lexer.next_token()? {
        lexer.tokens.push(token);
    }
    Ok(lexer.tokens)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

impl Lexer<'_> {
    fn next_token(&mut self) -> Result<Option<Token>, ScoreError> {
        self.skip_whitespace();

        let Some((position, ch)) = self.input.next() else {
            return Ok(None);
        };

        let token = match ch {
            '+' => Token::Op(Operator::Add),
            '-' if self.in_prefix_position() && self.peek_is_digit() => self.read_number('-')?,
            '-' => Token::Op(Operator::Sub),
            '*' => Token::Op(Operator::Mul),
            '/' => Token::Op(Operator::Div),
            '%' => Token::Op(Operator::Mod),
            '(' => Token::LParen,
            ')' => Token::RParen,
            '>' => Token::Op(self.with_equals(Operator::Gt, Operator::Ge)),
            '<' => Token::Op(self.with_equals(Operator::Lt, Operator::Le)),
            '!' => Token::Op(self.with_equals(Operator::Not, Operator::Ne)),
            '=' => Token::Op(self.doubled('=', Operator::Eq)?),
            '&' => Token::Op(self.doubled('&', Operator::And)?),
            '|' => Token::Op(self.doubled('|', Operator::Or)?),
            '\'' => self.read_string(position)?,
            ch if ch.is_ascii_digit() || (ch == '.' && self.peek_is_digit()) => {
                self.read_number(ch)?
            }
            ch if is_ident_start(ch) => self.read_identifier(ch),
            ch => return Err(ScoreError::UnexpectedCharacter { ch, position }),
        };
        Ok(Some(token))
    }

    fn skip_whitespace(&mut self) {
        while self.input.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
    }

    fn peek_is_digit(&mut self) -> bool {
        matches!(self.input.peek(), Some((_, ch)) if ch.is_ascii_digit() || *ch == '.')
    }

    /// An operand may start here: at the beginning, after an operator or
    /// after an opening parenthesis.
    fn in_prefix_position(&self) -> bool {
        matches!(
            self.tokens.last(),
            None | Some(Token::Op(_)) | Some(Token::LParen)
        )
    }

    /// `plain`, or `with_eq` when the next char is `=`.
    fn with_equals(&mut self, plain: Operator, with_eq: Operator) -> Operator {
        if self.input.next_if(|(_, ch)| *ch == '=').is_some() {
            with_eq
        } else {
            plain
        }
    }

    /// Two-character operators whose single form is not part of the language.
    fn doubled(&mut self, ch: char, op: Operator) -> Result<Operator, ScoreError> {
        if self.input.next_if(|(_, next)| *next == ch).is_some() {
            Ok(op)
        } else {
            Err(ScoreError::UnknownOperator(ch.to_string()))
        }
    }

    fn read_number(&mut self, first: char) -> Result<Token, ScoreError> {
        let mut text = String::from(first);
        while let Some((_, ch)) = self.input.next_if(|(_, ch)| ch.is_ascii_digit() || *ch == '.') {
            text.push(ch);
        }
        text.parse()
            .map(Token::Number)
            .map_err(|_| ScoreError::MalformedExpression(format!("invalid number literal '{text}'")))
    }

    fn read_string(&mut self, start: usize) -> Result<Token, ScoreError> {
        let mut result = String::new();
        while let Some((_, ch)) = self.input.next() {
            match ch {
                '\'' => return Ok(Token::Str(result)),
                '\\' => match self.input.next() {
                    Some((_, escaped)) => result.push(escaped),
                    None => break,
                },
                ch => result.push(ch),
            }
        }
        Err(ScoreError::UnterminatedString(start))
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        while let Some((_, ch)) = self.input.next_if(|(_, ch)| is_ident_continue(*ch)) {
            name.push(ch);
        }
        Token::Ident(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_arithmetic() {
        let tokens = tokenize("2 + 3.5*x").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(2.0),
                Token::Op(Operator::Add),
                Token::Number(3.5),
                Token::Op(Operator::Mul),
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_literal_only_in_prefix_position() {
        let tokens = tokenize("-3 - 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(-3.0),
                Token::Op(Operator::Sub),
                Token::Number(2.0)
            ]
        );
        let tokens = tokenize("(-1.5)").unwrap();
        assert_eq!(tokens[1], Token::Number(-1.5));
    }

    #[test]
    fn test_two_char_operators() {
        let tokens = tokenize("a != b && !c || d == e").unwrap();
        let ops: Vec<Operator> = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Op(op) => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                Operator::Ne,
                Operator::And,
                Operator::Not,
                Operator::Or,
                Operator::Eq
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r"'it\'s'").unwrap();
        assert_eq!(tokens, vec![Token::Str("it's".to_string())]);
    }

    #[test]
    fn test_dotted_identifier() {
        let tokens = tokenize("item.score").unwrap();
        assert_eq!(tokens, vec![Token::Ident("item.score".to_string())]);
    }

    #[test]
    fn test_lexical_errors() {
        assert_eq!(
            tokenize("1 $ 2"),
            Err(ScoreError::UnexpectedCharacter { ch: '$', position: 2 })
        );
        assert_eq!(tokenize("'abc"), Err(ScoreError::UnterminatedString(0)));
        assert_eq!(
            tokenize("a & b"),
            Err(ScoreError::UnknownOperator("&".to_string()))
        );
        assert_eq!(
            tokenize("a = b"),
            Err(ScoreError::UnknownOperator("=".to_string()))
        );
        assert!(matches!(
            tokenize("1.2.3"),
            Err(ScoreError::MalformedExpression(_))
        ));
    }
}
