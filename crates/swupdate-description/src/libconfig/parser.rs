//! Recursive-descent parser producing the setting tree.

use super::lexer::{Lexer, Spanned, Token};
use super::{Setting, SettingType, Value};
use crate::ParseError;
use std::collections::HashSet;

/// Deepest nesting of groups, arrays and lists.
pub(super) const MAX_NESTING: usize = 256;

/// Parse a document into its top-level settings.
pub(super) fn parse(text: &str) -> Result<Vec<Setting>, ParseError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let settings = parser.setting_list(&Token::Eof)?;
    parser.expect(&Token::Eof)?;
    Ok(settings)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Aggregates currently open
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Spanned {
        // tokenize() always ends with Eof, so clamp onto it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let spanned = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        spanned
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.peek().token == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = self.peek();
        ParseError::UnexpectedToken {
            line: found.line,
            expected: expected.to_string(),
            found: found.token.describe(),
        }
    }

    fn setting_list(&mut self, end: &Token) -> Result<Vec<Setting>, ParseError> {
        let mut settings = Vec::new();
        let mut names = HashSet::new();
        while &self.peek().token != end {
            let setting = self.setting()?;
            if let Some(name) = setting.name() {
                if !names.insert(name.to_string()) {
                    return Err(ParseError::DuplicateSetting {
                        line: setting.line,
                        name: name.to_string(),
                    });
                }
            }
            settings.push(setting);
        }
        Ok(settings)
    }

    fn setting(&mut self) -> Result<Setting, ParseError> {
        let Spanned { token, line } = self.peek().clone();
        let Token::Name(name) = token else {
            return Err(self.unexpected("setting name"));
        };
        self.advance();
        self.expect(&Token::Assign)?;
        let value = self.value()?;
        if !self.eat(&Token::Semicolon) {
            self.eat(&Token::Comma);
        }
        Ok(Setting::new(Some(name), value, line))
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let Spanned { token, line } = self.advance();
        match token {
            Token::Int(v) => Ok(match i32::try_from(v) {
                Ok(small) => Value::Int(small),
                Err(_) => Value::Int64(v),
            }),
            Token::Int64(v) => Ok(Value::Int64(v)),
            Token::Float(v) => Ok(Value::Float(v)),
            Token::Str(first) => {
                let mut s = first;
                while let Token::Str(next) = &self.peek().token {
                    s.push_str(next);
                    self.advance();
                }
                Ok(Value::String(s))
            }
            Token::Name(n) if n.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Token::Name(n) if n.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Token::LBracket | Token::LParen | Token::LBrace => {
                self.depth += 1;
                if self.depth > MAX_NESTING {
                    return Err(ParseError::TooDeep {
                        line,
                        max: MAX_NESTING,
                    });
                }
                let value = match token {
                    Token::LBracket => self.array(line),
                    Token::LParen => self.list(),
                    _ => self.group(),
                };
                self.depth -= 1;
                value
            }
            other => Err(ParseError::UnexpectedToken {
                line,
                expected: "value".to_string(),
                found: other.describe(),
            }),
        }
    }

    fn elements(&mut self, end: &Token) -> Result<Vec<Setting>, ParseError> {
        let mut elements = Vec::new();
        while !self.eat(end) {
            let line = self.peek().line;
            elements.push(Setting::new(None, self.value()?, line));
            if !self.eat(&Token::Comma) {
                self.expect(end)?;
                break;
            }
        }
        Ok(elements)
    }

    fn array(&mut self, line: usize) -> Result<Value, ParseError> {
        let elements = self.elements(&Token::RBracket)?;
        let mut kinds = elements.iter().map(|e| scalar_class(e.setting_type()));
        if let Some(first) = kinds.next() {
            if first.is_none() || kinds.any(|k| k != first) {
                return Err(ParseError::MixedArray { line });
            }
        }
        Ok(Value::Array(elements))
    }

    fn group(&mut self) -> Result<Value, ParseError> {
        let members = self.setting_list(&Token::RBrace)?;
        self.expect(&Token::RBrace)?;
        Ok(Value::Group(members))
    }

    fn list(&mut self) -> Result<Value, ParseError> {
        Ok(Value::List(self.elements(&Token::RParen)?))
    }
}

/// Scalar class used for array homogeneity; 32/64-bit integers mix freely.
fn scalar_class(kind: SettingType) -> Option<u8> {
    match kind {
        SettingType::Int | SettingType::Int64 => Some(0),
        SettingType::Float => Some(1),
        SettingType::Bool => Some(2),
        SettingType::String => Some(3),
        SettingType::Array | SettingType::List | SettingType::Group => None,
    }
}
