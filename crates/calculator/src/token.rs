use crate::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based column of the first character.
    pub column: usize,
}

impl Token {
    pub fn unexpected(&self) -> EvalError {
        EvalError::UnexpectedToken {
            found: self.text.clone(),
            column: self.column,
        }
    }
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        let column = index + 1;
        if ch.is_whitespace() {
            index += 1;
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let start = index;
            while index < chars.len() && (chars[index].is_ascii_digit() || chars[index] == '.') {
                index += 1;
            }
            let literal: String = chars[start..index].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| EvalError::InvalidNumber {
                    literal: literal.clone(),
                    column,
                })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                text: literal,
                column,
            });
            continue;
        }

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' | '×' => TokenKind::Star,
            '/' | '÷' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            other => {
                return Err(EvalError::InvalidCharacter {
                    found: other,
                    column,
                })
            }
        };
        tokens.push(Token {
            kind,
            text: ch.to_string(),
            column,
        });
        index += 1;
    }

    Ok(tokens)
}
