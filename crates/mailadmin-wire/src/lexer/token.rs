//! Lexer tokens.

/// One token of a response line.
///
/// Strings that need unescaping or carry literal payloads are owned; atoms
/// borrow from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Run of atom characters that is neither a number nor `NIL`.
    Atom(&'a str),
    /// `"..."` with `\"` and `\\` unescaped.
    QuotedString(String),
    /// `{n}` or `{n+}` followed by CRLF and n bytes.
    Literal(String),
    /// Run of digits.
    Number(u64),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// A single space.
    Space,
    /// `*`, the untagged marker.
    Asterisk,
    /// `+`, the continuation marker.
    Plus,
    /// `NIL`, any case.
    Nil,
    /// End of input.
    Eof,
}
