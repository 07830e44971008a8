//! Argument serialization helpers.

/// Writes an astring: the bare atom when possible, otherwise a quoted string.
pub fn write_astring(buf: &mut String, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.push_str(s);
    }
}

/// Writes a quoted string, escaping `"` and `\`.
pub fn write_quoted(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            buf.push('\\');
        }
        buf.push(c);
    }
    buf.push('"');
}

/// Returns `s` as an astring.
#[must_use]
pub fn astring(s: &str) -> String {
    let mut buf = String::with_capacity(s.len() + 2);
    write_astring(&mut buf, s);
    buf
}

/// Returns `s` as a quoted string.
#[must_use]
pub fn quoted(s: &str) -> String {
    let mut buf = String::with_capacity(s.len() + 2);
    write_quoted(&mut buf, s);
    buf
}

/// Returns the first CR, LF or NUL in `s`.
///
/// None of these can appear inside a quoted string or atom, and CR or LF
/// would end the command line early.
#[must_use]
pub fn find_line_break(s: &str) -> Option<char> {
    s.chars().find(|c| matches!(c, '\r' | '\n' | '\0'))
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
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
    fn test_astring_atom() {
        assert_eq!(astring("INBOX/Sent"), "INBOX/Sent");
        assert_eq!(astring("user/jane@example.com"), "user/jane@example.com");
    }

    #[test]
    fn test_astring_needs_quotes() {
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("Sent Items"), "\"Sent Items\"");
        assert_eq!(astring("a*"), "\"a*\"");
    }

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(quoted(r#"my "rules""#), r#""my \"rules\"""#);
        assert_eq!(quoted(r"back\slash"), r#""back\\slash""#);
    }

    #[test]
    fn test_find_line_break() {
        assert_eq!(find_line_break("user/jane"), None);
        assert_eq!(find_line_break("Sent Items \"x\""), None);
        assert_eq!(find_line_break("evil\r\nA099 DELETE user/victim"), Some('\r'));
        assert_eq!(find_line_break("two\nlines"), Some('\n'));
        assert_eq!(find_line_break("nul\0"), Some('\0'));
    }
}
