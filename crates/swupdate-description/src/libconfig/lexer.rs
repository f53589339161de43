//! Tokenizer for libconfig text.

use crate::ParseError;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Name(String),
    Int(i64),
    /// Integer with an explicit `L`/`LL` suffix
    Int64(i64),
    Float(f64),
    Str(String),
    Assign,
    Semicolon,
    Comma,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Eof,
}

impl Token {
    pub(super) fn describe(&self) -> String {
        match self {
            Token::Name(n) => format!("name '{}'", n),
            Token::Int(v) | Token::Int64(v) => format!("integer {}", v),
            Token::Float(v) => format!("float {}", v),
            Token::Str(_) => "string".to_string(),
            Token::Assign => "'=' or ':'".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Comma => "','".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// A token and the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub(super) struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`.
    pub(super) fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.chars.peek().copied() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.next() {
                        Some('/') => self.skip_line(),
                        Some('*') => self.skip_block_comment()?,
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.line;
        self.bump();
        self.bump();
        let mut prev = '\0';
        while let Some(c) = self.bump() {
            if prev == '*' && c == '/' {
                return Ok(());
            }
            prev = c;
        }
        Err(ParseError::UnterminatedComment { line: start })
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        self.skip_trivia()?;
        let line = self.line;
        let Some(c) = self.chars.peek().copied() else {
            return Ok(Spanned {
                token: Token::Eof,
                line,
            });
        };

        let token = match c {
            '=' | ':' => self.single(Token::Assign),
            ';' => self.single(Token::Semicolon),
            ',' => self.single(Token::Comma),
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '"' => self.string()?,
            '@' => return Err(ParseError::IncludeUnsupported { line }),
            c if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => self.number()?,
            c if c.is_ascii_alphabetic() || c == '*' => self.name(),
            other => return Err(ParseError::UnexpectedChar { line, ch: other }),
        };

        Ok(Spanned { token, line })
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn name(&mut self) -> Token {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '*') {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::Name(name)
    }

    fn string(&mut self) -> Result<Token, ParseError> {
        let start = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString { line: start }),
                Some('"') => return Ok(Token::Str(out)),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, ParseError> {
        let line = self.line;
        match self.bump() {
            Some('\\') => Ok('\\'),
            Some('"') => Ok('"'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('f') => Ok('\x0c'),
            Some('x') => {
                let hex: String = (0..2).filter_map(|_| self.bump()).collect();
                u8::from_str_radix(&hex, 16)
                    .map(char::from)
                    .map_err(|_| ParseError::InvalidEscape {
                        line,
                        escape: format!("x{}", hex),
                    })
            }
            Some(other) => Err(ParseError::InvalidEscape {
                line,
                escape: other.to_string(),
            }),
            None => Err(ParseError::UnterminatedString { line }),
        }
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let line = self.line;
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        parse_number(&text).ok_or(ParseError::InvalidNumber { line, text })
    }
}

fn parse_number(text: &str) -> Option<Token> {
    let (body, forced_64) = match text.strip_suffix("LL").or_else(|| text.strip_suffix('L')) {
        Some(stripped) => (stripped, true),
        None => (text, false),
    };

    let (negative, unsigned) = match body.as_bytes().first()? {
        b'-' => (true, &body[1..]),
        b'+' => (false, &body[1..]),
        _ => (false, body),
    };

    if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        let magnitude = i64::try_from(u64::from_str_radix(hex, 16).ok()?).ok()?;
        let value = if negative { -magnitude } else { magnitude };
        return Some(int_token(value, forced_64));
    }

    let is_float = unsigned.contains(['.', 'e', 'E']);
    if is_float {
        if forced_64 || !unsigned.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        return body.parse::<f64>().ok().map(Token::Float);
    }

    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    body.parse::<i64>().ok().map(|v| int_token(v, forced_64))
}

fn int_token(value: i64, forced_64: bool) -> Token {
    if forced_64 {
        Token::Int64(value)
    } else {
        Token::Int(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        Lexer::new(text)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("1 -2 0x1F 10L 3.5 1e3 +4 .5"),
            vec![
                Token::Int(1),
                Token::Int(-2),
                Token::Int(31),
                Token::Int64(10),
                Token::Float(3.5),
                Token::Float(1000.0),
                Token::Int(4),
                Token::Float(0.5),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_number() {
        let err = Lexer::new("x = 12abc;").tokenize().unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { line: 1, .. }));
    }

    #[test]
    fn test_comments_and_lines() {
        let spanned = Lexer::new("# one\n// two\n/* three\n four */ name").tokenize().unwrap();
        assert_eq!(spanned[0].token, Token::Name("name".into()));
        assert_eq!(spanned[0].line, 4);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#""a\"b\n\x41""#),
            vec![Token::Str("a\"b\nA".into()), Token::Eof]
        );
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            Lexer::new("\"abc").tokenize(),
            Err(ParseError::UnterminatedString { line: 1 })
        ));
        assert!(matches!(
            Lexer::new("\n/* abc").tokenize(),
            Err(ParseError::UnterminatedComment { line: 2 })
        ));
    }

    #[test]
    fn test_include_rejected() {
        assert!(matches!(
            Lexer::new("@include \"other.cfg\"").tokenize(),
            Err(ParseError::IncludeUnsupported { line: 1 })
        ));
    }
}
