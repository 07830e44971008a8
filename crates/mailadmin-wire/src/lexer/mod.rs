//! Lexer for server response lines.
//!
//! Breaks one logical response line (as returned by
//! [`LineStream::read_line`](crate::LineStream::read_line), literals
//! included) into tokens. The grammar is the common subset of the mailbox
//! and script protocols: atoms, numbers, quoted strings, literals,
//! parentheses, brackets and `NIL`.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// Lexer state over a single response line.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining input.
    #[must_use]
    pub fn remaining(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or_default()
    }

    /// Returns true if at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b' ' => {
                self.advance();
                Ok(Token::Space)
            }
            b'(' => {
                self.advance();
                Ok(Token::LParen)
            }
            b')' => {
                self.advance();
                Ok(Token::RParen)
            }
            b'[' => {
                self.advance();
                Ok(Token::LBracket)
            }
            b']' => {
                self.advance();
                Ok(Token::RBracket)
            }
            b'*' => {
                self.advance();
                Ok(Token::Asterisk)
            }
            b'+' => {
                self.advance();
                Ok(Token::Plus)
            }
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            b'0'..=b'9' => self.read_number_or_atom(),
            _ if is_atom_char(byte) => self.read_atom(),
            _ => Err(self.error(&format!("Unexpected character: {byte:#04x}"))),
        }
    }

    /// Reads the next token that is not a space.
    pub fn next_significant(&mut self) -> Result<Token<'a>> {
        self.skip_spaces();
        self.next_token()
    }

    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.advance(); // opening quote

        let mut result = Vec::new();

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => result.push(c),
                    Some(c) => {
                        return Err(self.error(&format!("Invalid escape: \\{}", char::from(c))));
                    }
                    None => return Err(self.error("Unexpected end of line in quoted string")),
                },
                Some(c) => result.push(c),
                None => return Err(self.error("Unexpected end of line in quoted string")),
            }
        }

        let s =
            String::from_utf8(result).map_err(|_| self.error("Invalid UTF-8 in quoted string"))?;
        Ok(Token::QuotedString(s))
    }

    /// Reads `{n}` / `{n+}`, the CRLF after it, and the n literal bytes.
    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.advance(); // {

        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let size: usize = self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error("Invalid literal size"))?;

        if self.peek() == Some(b'+') {
            self.advance();
        }
        if self.advance() != Some(b'}') {
            return Err(self.error("Expected } after literal size"));
        }
        if self.peek() != Some(b'\r') || self.peek_at(1) != Some(b'\n') {
            return Err(self.error("Expected CRLF after literal size"));
        }
        self.skip(2);

        let data = self
            .pos
            .checked_add(size)
            .and_then(|end| self.input.as_bytes().get(self.pos..end))
            .ok_or_else(|| self.error("Incomplete literal data"))?;
        let end = self.pos + data.len();
        let s = String::from_utf8(data.to_vec())
            .map_err(|_| self.error("Invalid UTF-8 in literal"))?;
        self.pos = end;

        Ok(Token::Literal(s))
    }

    fn read_number_or_atom(&mut self) -> Result<Token<'a>> {
        let s = self.take_atom();

        if s.bytes().all(|b| b.is_ascii_digit()) {
            let n = s.parse().map_err(|_| self.error("Number too large"))?;
            Ok(Token::Number(n))
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let s = self.take_atom();

        if s.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(s))
        }
    }

    fn take_atom(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    /// Creates a parse error at the current position.
    fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Expects and consumes a specific token kind.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {expected:?}, got {token:?}")))
        }
    }

    /// Reads an astring (atom, quoted string or literal).
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) | Token::Literal(s) => Ok(s),
            token => Err(self.error(&format!("Expected astring, got {token:?}"))),
        }
    }

    /// Reads a nstring (NIL or string).
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) | Token::Literal(s) => Ok(Some(s)),
            token => Err(self.error(&format!("Expected nstring, got {token:?}"))),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u64> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("Expected number, got {token:?}"))),
        }
    }

    /// Consumes tokens up to and including the `)` that closes a list whose
    /// `(` was already read.
    pub fn skip_list(&mut self) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_token()? {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => return Err(self.error("Unterminated list")),
                _ => {}
            }
        }
        Ok(())
    }

    /// Skips optional spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.advance();
        }
    }
}

/// Returns true if the byte is a valid atom character.
///
/// Note: This includes `\` to handle flags like `\Seen` as single tokens.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21..=0x27 |  // ! " # $ % & '  (but not " which is 0x22)
        0x2B..=0x5A |  // + , - . / 0-9 : ; < = > ? @ A-Z
        0x5C |         // \ (for flags like \Seen)
        0x5E..=0x7A |  // ^ _ ` a-z
        0x7C |         // |
        0x7E           // ~
    ) && b != b'"'
        && b != b'%'
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_tokens() {
        let mut lexer = Lexer::new("* OK");

        assert_eq!(lexer.next_token().unwrap(), Token::Asterisk);
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("OK"));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_tagged_line() {
        let mut lexer = Lexer::new("A001 OK LOGIN completed");

        assert_eq!(lexer.next_token().unwrap(), Token::Atom("A001"));
        assert_eq!(lexer.next_significant().unwrap(), Token::Atom("OK"));
        assert_eq!(lexer.remaining(), " LOGIN completed");
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 5000 12ab");

        assert_eq!(lexer.next_token().unwrap(), Token::Number(42));
        assert_eq!(lexer.next_significant().unwrap(), Token::Number(5000));
        assert_eq!(lexer.next_significant().unwrap(), Token::Atom("12ab"));
    }

    #[test]
    fn test_quoted_string_escaped() {
        let mut lexer = Lexer::new(r#""say \"hi\" \\ bye""#);
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::QuotedString(r#"say "hi" \ bye"#.to_string())
        );
    }

    #[test]
    fn test_quoted_string_unterminated() {
        let mut lexer = Lexer::new("\"open");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_nil() {
        let mut lexer = Lexer::new("NIL nil");
        assert_eq!(lexer.next_token().unwrap(), Token::Nil);
        assert_eq!(lexer.next_significant().unwrap(), Token::Nil);
    }

    #[test]
    fn test_parentheses_and_flags() {
        let mut lexer = Lexer::new(r"(\HasChildren)");
        assert_eq!(lexer.next_token().unwrap(), Token::LParen);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom(r"\HasChildren"));
        assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    }

    #[test]
    fn test_literal() {
        let mut lexer = Lexer::new("{5}\r\nhello rest");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal("hello".to_string()));
        assert_eq!(lexer.remaining(), " rest");
    }

    #[test]
    fn test_literal_plus() {
        let mut lexer = Lexer::new("{2+}\r\nab");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal("ab".to_string()));
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_literal_incomplete() {
        let mut lexer = Lexer::new("{10}\r\nab");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_continuation() {
        let mut lexer = Lexer::new("+ ready");
        assert_eq!(lexer.next_token().unwrap(), Token::Plus);
    }

    #[test]
    fn test_skip_list() {
        let mut lexer = Lexer::new(r#"("a" ("b" "c")) tail"#);
        assert_eq!(lexer.next_token().unwrap(), Token::LParen);
        lexer.skip_list().unwrap();
        assert_eq!(lexer.remaining(), " tail");
    }

    #[test]
    fn test_read_astring_variants() {
        let mut lexer = Lexer::new("INBOX \"Sent Items\" {4}\r\nJunk 7");
        assert_eq!(lexer.read_astring().unwrap(), "INBOX");
        lexer.skip_spaces();
        assert_eq!(lexer.read_astring().unwrap(), "Sent Items");
        lexer.skip_spaces();
        assert_eq!(lexer.read_astring().unwrap(), "Junk");
        lexer.skip_spaces();
        assert_eq!(lexer.read_astring().unwrap(), "7");
    }

    #[test]
    fn test_literal_size_beyond_input() {
        let mut lexer = Lexer::new("{18446744073709551615}\r\nshort");
        let err = lexer.next_token().unwrap_err();
        assert!(err.to_string().contains("Incomplete literal data"));

        let mut lexer = Lexer::new("{9}\r\nshort");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_is_atom_char() {
        assert!(is_atom_char(b'A'));
        assert!(is_atom_char(b'\\'));
        assert!(is_atom_char(b'/'));
        assert!(!is_atom_char(b' '));
        assert!(!is_atom_char(b'('));
        assert!(!is_atom_char(b'"'));
        assert!(!is_atom_char(b'{'));
    }
}
