//! Response-line classification.
//!
//! A reply is any number of data lines followed by one status line
//! starting with `OK`, `NO` or `BYE`, optionally carrying a response code
//! in parentheses and a human-readable string.

use mailadmin_wire::{Lexer, Token};

/// Final status of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed.
    No,
    /// Server is closing the connection.
    Bye,
}

impl Status {
    /// Parses a status word, ignoring case.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bye => "BYE",
        })
    }
}

/// A parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// OK, NO or BYE.
    pub status: Status,
    /// Response code without its parentheses, e.g. `NONEXISTENT`.
    pub code: Option<String>,
    /// Human-readable text, unquoted.
    pub text: String,
}

impl StatusLine {
    /// Parses `line` as a status line. Returns `None` for data lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_start();
        let end = line
            .find(|c: char| c.is_ascii_whitespace() || c == '(')
            .unwrap_or(line.len());
        let status = Status::parse(&line[..end])?;
        let rest = line[end..].trim_start();

        let (code, text) = split_code(rest);
        Some(Self {
            status,
            code,
            text: unquote(text),
        })
    }

    /// Returns true for OK.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }
}

/// Splits a leading `(code)` from the rest of the line.
fn split_code(rest: &str) -> (Option<String>, &str) {
    if !rest.starts_with('(') {
        return (None, rest);
    }

    let mut lexer = Lexer::new(rest);
    let closed = lexer.next_token().is_ok() && lexer.skip_list().is_ok();
    if !closed {
        return (None, rest);
    }
    let end = lexer.position();
    (
        Some(rest[1..end - 1].to_string()),
        rest[end..].trim_start(),
    )
}

/// Returns the content of a quoted string or literal, or the raw text.
fn unquote(text: &str) -> String {
    let mut lexer = Lexer::new(text);
    match lexer.next_token() {
        Ok(Token::QuotedString(s) | Token::Literal(s)) => s,
        _ => text.trim_end().to_string(),
    }
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
    fn bare_ok() {
        let line = StatusLine::parse("OK").unwrap();
        assert_eq!(line.status, Status::Ok);
        assert_eq!(line.code, None);
        assert_eq!(line.text, "");
        assert!(line.is_ok());
    }

    #[test]
    fn quoted_text() {
        let line = StatusLine::parse(r#"ok "Authenticated.""#).unwrap();
        assert_eq!(line.status, Status::Ok);
        assert_eq!(line.text, "Authenticated.");
    }

    #[test]
    fn code_and_text() {
        let line = StatusLine::parse(r#"NO (NONEXISTENT) "There is no script by that name""#).unwrap();
        assert_eq!(line.status, Status::No);
        assert_eq!(line.code.as_deref(), Some("NONEXISTENT"));
        assert_eq!(line.text, "There is no script by that name");
        assert!(!line.is_ok());
    }

    #[test]
    fn nested_code() {
        let line = StatusLine::parse(r#"OK (SASL "cnNwYXV0aD1lYTQw")"#).unwrap();
        assert_eq!(line.code.as_deref(), Some(r#"SASL "cnNwYXV0aD1lYTQw""#));
        assert_eq!(line.text, "");
    }

    #[test]
    fn literal_text() {
        let line = StatusLine::parse("BYE {11}\r\nshutting\r\nx").unwrap();
        assert_eq!(line.status, Status::Bye);
        assert_eq!(line.text, "shutting\r\nx");
    }

    #[test]
    fn unquoted_text_kept() {
        let line = StatusLine::parse("NO bad things happened").unwrap();
        assert_eq!(line.text, "bad things happened");
    }

    #[test]
    fn data_lines_are_not_status() {
        assert!(StatusLine::parse(r#""IMPLEMENTATION" "Cyrus timsieved""#).is_none());
        assert!(StatusLine::parse(r#""vacation" ACTIVE"#).is_none());
        assert!(StatusLine::parse("{12}\r\nkeep;\r\nstop;").is_none());
        assert!(StatusLine::parse("OKAY").is_none());
        assert!(StatusLine::parse("").is_none());
    }
}
