//! Arithmetic expression evaluation for the calculator panel.
//!
//! [`calc`] accepts decimal numbers, `+ - * / %`, right-associative `^`,
//! unary signs, and parentheses. Results are rendered as strings so callers
//! can display them verbatim; integral values drop the fractional part.

mod token;

use token::{tokenize, Token, TokenKind};

/// Reasons an expression cannot be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected '{found}' at column {column}")]
    UnexpectedToken { found: String, column: usize },
    #[error("invalid character '{found}' at column {column}")]
    InvalidCharacter { found: char, column: usize },
    #[error("invalid number '{literal}' at column {column}")]
    InvalidNumber { literal: String, column: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
}

/// Evaluates `expr` and formats the result for display.
pub fn calc(expr: &str) -> Result<String, EvalError> {
    evaluate(expr).map(format_number)
}

/// Evaluates `expr` to a floating point value.
pub fn evaluate(expr: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser { tokens, cursor: 0 };
    let value = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(token.unexpected());
    }
    if !value.is_finite() {
        return Err(EvalError::NotFinite);
    }
    Ok(value)
}

/// Renders a value without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().map(|token| token.kind == kind).unwrap_or(false) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expression(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        loop {
            if self.eat(TokenKind::Plus) {
                value += self.term()?;
            } else if self.eat(TokenKind::Minus) {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.unary()?;
        loop {
            if self.eat(TokenKind::Star) {
                value *= self.unary()?;
            } else if self.eat(TokenKind::Slash) {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                value /= divisor;
            } else if self.eat(TokenKind::Percent) {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                value %= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, EvalError> {
        if self.eat(TokenKind::Minus) {
            return Ok(-self.unary()?);
        }
        if self.eat(TokenKind::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;
        if self.eat(TokenKind::Caret) {
            // Right-associative: the exponent may itself be signed or a power.
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        let token = self.advance().ok_or(EvalError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(value) => Ok(value),
            TokenKind::LParen => {
                let value = self.expression()?;
                match self.advance() {
                    Some(close) if close.kind == TokenKind::RParen => Ok(value),
                    Some(other) => Err(other.unexpected()),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            _ => Err(token.unexpected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_integers() {
        assert_eq!(calc("2 + 2").unwrap(), "4");
        assert_eq!(calc("2 + 3").unwrap(), "5");
    }

    #[test]
    fn respects_precedence_and_parentheses() {
        assert_eq!(calc("2 + 3 * 4").unwrap(), "14");
        assert_eq!(calc("(2 + 3) * 4").unwrap(), "20");
        assert_eq!(calc("10 - 4 - 3").unwrap(), "3");
        assert_eq!(calc("2 ^ 3 ^ 2").unwrap(), "512");
        assert_eq!(calc("-2 ^ 2").unwrap(), "-4");
        assert_eq!(calc("7 % 4").unwrap(), "3");
    }

    #[test]
    fn formats_fractional_results() {
        assert_eq!(calc("1 / 4").unwrap(), "0.25");
        assert_eq!(calc("1.5 * 3").unwrap(), "4.5");
        assert_eq!(calc(".5 + .5").unwrap(), "1");
    }

    #[test]
    fn dangling_operator_is_an_error() {
        let err = calc("2 +").unwrap_err();
        assert_eq!(err, EvalError::UnexpectedEnd);
        assert_eq!(format!("Error: {err}"), "Error: unexpected end of expression");
    }

    #[test]
    fn reports_unexpected_tokens_with_column() {
        assert_eq!(
            calc("2 3").unwrap_err(),
            EvalError::UnexpectedToken {
                found: "3".into(),
                column: 3
            }
        );
        assert_eq!(
            calc("(1 + 2").unwrap_err(),
            EvalError::UnexpectedEnd
        );
        assert_eq!(
            calc("1 + )").unwrap_err(),
            EvalError::UnexpectedToken {
                found: ")".into(),
                column: 5
            }
        );
    }

    #[test]
    fn rejects_invalid_input() {
        assert_eq!(calc("   ").unwrap_err(), EvalError::Empty);
        assert_eq!(
            calc("2 $ 2").unwrap_err(),
            EvalError::InvalidCharacter {
                found: '$',
                column: 3
            }
        );
        assert_eq!(calc("1 / 0").unwrap_err(), EvalError::DivisionByZero);
        assert_eq!(calc("1 % 0").unwrap_err(), EvalError::DivisionByZero);
        assert_eq!(calc("10 ^ 400").unwrap_err(), EvalError::NotFinite);
    }
}
