//! SJSON parser: JSON plus unquoted map keys and trailing commas.
//!
//! The grammar is deliberately small — it covers the game's data files and
//! everything [`super::ser`] emits, nothing more.

use super::value::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected end of input at line {line}, column {column}")]
    UnexpectedEof { line: usize, column: usize },

    #[error("unexpected character '{found}' at line {line}, column {column} (expected {expected})")]
    UnexpectedChar {
        found: char,
        expected: &'static str,
        line: usize,
        column: usize,
    },

    #[error("invalid number '{text}' at line {line}, column {column}")]
    InvalidNumber {
        text: String,
        line: usize,
        column: usize,
    },

    #[error("invalid string escape '\\{escape}' at line {line}, column {column}")]
    InvalidEscape {
        escape: char,
        line: usize,
        column: usize,
    },

    #[error("duplicate key '{key}' at line {line}, column {column}")]
    DuplicateKey {
        key: String,
        line: usize,
        column: usize,
    },

    #[error("trailing content at line {line}, column {column}")]
    TrailingContent { line: usize, column: usize },
}

/// Parse a complete SJSON document.
pub fn from_str(input: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.peek().is_some() {
        let (line, column) = parser.position();
        return Err(ParseError::TrailingContent { line, column });
    }
    Ok(value)
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn eof(&self) -> ParseError {
        ParseError::UnexpectedEof {
            line: self.line,
            column: self.column,
        }
    }

    fn unexpected(&mut self, expected: &'static str) -> ParseError {
        let (line, column) = self.position();
        match self.peek() {
            Some(found) => ParseError::UnexpectedChar {
                found,
                expected,
                line,
                column,
            },
            None => self.eof(),
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), ParseError> {
        if self.peek() == Some(c) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some('{') => self.parse_map(),
            Some('[') => self.parse_array(),
            Some('"') => Ok(Value::String(self.parse_string()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() => self.parse_keyword(),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_map(&mut self) -> Result<Value, ParseError> {
        self.expect('{', "'{'")?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Value::Map(map));
                }
                Some(_) => {
                    let (line, column) = self.position();
                    let key = self.parse_key()?;
                    if map.contains_key(&key) {
                        return Err(ParseError::DuplicateKey { key, line, column });
                    }
                    self.skip_whitespace();
                    self.expect(':', "':'")?;
                    self.skip_whitespace();
                    let value = self.parse_value()?;
                    map.insert(key, value);
                    self.skip_whitespace();
                    match self.peek() {
                        // Trailing comma before '}' is accepted.
                        Some(',') => {
                            self.bump();
                        }
                        Some('}') => {}
                        _ => return Err(self.unexpected("',' or '}'")),
                    }
                }
                None => return Err(self.eof()),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        self.expect('[', "'['")?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(_) => {
                    items.push(self.parse_value()?);
                    self.skip_whitespace();
                    match self.peek() {
                        Some(',') => {
                            self.bump();
                        }
                        Some(']') => {}
                        _ => return Err(self.unexpected("',' or ']'")),
                    }
                }
                None => return Err(self.eof()),
            }
        }
    }

    /// Map keys may be quoted strings or bare identifiers.
    fn parse_key(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some('"') => self.parse_string(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut key = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        key.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(key)
            }
            _ => Err(self.unexpected("a map key")),
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        self.expect('"', "'\"'")?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => {
                    let (line, column) = self.position();
                    match self.bump() {
                        Some('"') => out.push('"'),
                        Some('\\') => out.push('\\'),
                        Some('/') => out.push('/'),
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('b') => out.push('\u{0008}'),
                        Some('f') => out.push('\u{000C}'),
                        Some('u') => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = self.bump().ok_or_else(|| self.eof())?;
                                let digit = digit.to_digit(16).ok_or(ParseError::InvalidEscape {
                                    escape: 'u',
                                    line,
                                    column,
                                })?;
                                code = code * 16 + digit;
                            }
                            out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                        }
                        Some(escape) => {
                            return Err(ParseError::InvalidEscape {
                                escape,
                                line,
                                column,
                            })
                        }
                        None => return Err(self.eof()),
                    }
                }
                Some(c) => out.push(c),
                None => return Err(self.eof()),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let (line, column) = self.position();
        let mut text = String::new();
        let mut is_float = false;
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    text.push(c);
                    self.bump();
                }
                '.' | 'e' | 'E' | '+' | '-' => {
                    is_float = true;
                    text.push(c);
                    self.bump();
                }
                _ => break,
            }
        }
        let invalid = || ParseError::InvalidNumber {
            text: text.clone(),
            line,
            column,
        };
        if is_float {
            text.parse::<f64>().map(Value::Float).map_err(|_| invalid())
        } else {
            text.parse::<i64>().map(Value::Int).map_err(|_| invalid())
        }
    }

    fn parse_keyword(&mut self) -> Result<Value, ParseError> {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match word.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            _ => Err(self.unexpected("'true', 'false', or 'null'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let doc = from_str(r#"{"Back": {"Width": 1920, "Height": 1080}}"#).unwrap();
        let back = doc.as_map().unwrap().get("Back").unwrap().as_map().unwrap();
        assert_eq!(back.get("Width"), Some(&Value::Int(1920)));
        assert_eq!(back.get("Height"), Some(&Value::Int(1080)));
    }

    #[test]
    fn test_parse_unquoted_keys_and_trailing_commas() {
        let doc = from_str(
            r#"{
                Animations: [
                    { Name: "BloodFrame", ScaleX: 1.5, },
                    { Name: "LowHealthShroud" },
                ],
            }"#,
        )
        .unwrap();
        let animations = doc
            .as_map()
            .unwrap()
            .get("Animations")
            .unwrap()
            .as_array()
            .unwrap();
        assert_eq!(animations.len(), 2);
        assert_eq!(
            animations[0].as_map().unwrap().get("ScaleX"),
            Some(&Value::Float(1.5))
        );
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(from_str("true").unwrap(), Value::Bool(true));
        assert_eq!(from_str("null").unwrap(), Value::Null);
        assert_eq!(from_str("-12").unwrap(), Value::Int(-12));
        assert_eq!(from_str("2.5e2").unwrap(), Value::Float(250.0));
        assert_eq!(
            from_str(r#""a\"b""#).unwrap(),
            Value::String("a\"b".to_string())
        );
    }

    #[test]
    fn test_parse_preserves_key_order() {
        let doc = from_str("{Zeta: 1, Alpha: 2, Mid: 3}").unwrap();
        let keys: Vec<&str> = doc.as_map().unwrap().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = from_str("{A: 1, A: 2}").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateKey { .. }));
    }

    #[test]
    fn test_trailing_content_rejected() {
        let err = from_str("{} junk").unwrap_err();
        assert!(matches!(err, ParseError::TrailingContent { .. }));
    }

    #[test]
    fn test_error_carries_position() {
        let err = from_str("{A: }").unwrap_err();
        match err {
            ParseError::UnexpectedChar { found, line, .. } => {
                assert_eq!(found, '}');
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
