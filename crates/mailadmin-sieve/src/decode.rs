//! Decoders for data lines.

use std::collections::BTreeMap;

use mailadmin_wire::{Lexer, Token};
use serde::Serialize;

use crate::error::{Error, Result};

/// Capabilities advertised in the greeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SieveCapabilities {
    /// Server implementation name.
    pub implementation: Option<String>,
    /// SASL mechanisms, uppercased.
    pub sasl: Vec<String>,
    /// Supported Sieve extensions.
    pub sieve: Vec<String>,
    /// STARTTLS offered.
    pub starttls: bool,
    /// Protocol version.
    pub version: Option<String>,
    /// Any other capability, keyed by uppercased name.
    pub other: BTreeMap<String, String>,
}

impl SieveCapabilities {
    /// Returns true if the SASL mechanism was advertised.
    #[must_use]
    pub fn supports_sasl(&self, mechanism: &str) -> bool {
        self.sasl.iter().any(|m| m.eq_ignore_ascii_case(mechanism))
    }
}

fn lex_error(reply: &'static str) -> impl Fn(mailadmin_wire::Error) -> Error {
    move |e| Error::decode(reply, e.to_string())
}

/// Decodes the `"NAME" ["value"]` lines of a greeting.
///
/// # Errors
///
/// Returns [`Error::Decode`] if a line is not a name with an optional
/// value.
pub fn capabilities(lines: &[String]) -> Result<SieveCapabilities> {
    const REPLY: &str = "CAPABILITY";
    let mut caps = SieveCapabilities::default();

    for line in lines {
        let (name, value) = capability_line(&mut Lexer::new(line)).map_err(lex_error(REPLY))?;
        let words = || {
            value
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        };

        match name.to_ascii_uppercase().as_str() {
            "IMPLEMENTATION" => caps.implementation.clone_from(&value),
            "SASL" => caps.sasl = words().into_iter().map(|m| m.to_ascii_uppercase()).collect(),
            "SIEVE" => caps.sieve = words(),
            "STARTTLS" => caps.starttls = true,
            "VERSION" => caps.version.clone_from(&value),
            upper => {
                caps.other
                    .insert(upper.to_string(), value.clone().unwrap_or_default());
            }
        }
    }

    Ok(caps)
}

fn capability_line(lexer: &mut Lexer<'_>) -> mailadmin_wire::Result<(String, Option<String>)> {
    let name = lexer.read_astring()?;
    lexer.skip_spaces();
    let value = if lexer.is_eof() {
        None
    } else {
        Some(lexer.read_astring()?)
    };
    expect_end(lexer)?;
    Ok((name, value))
}

fn expect_end(lexer: &mut Lexer<'_>) -> mailadmin_wire::Result<()> {
    match lexer.next_significant()? {
        Token::Eof => Ok(()),
        token => Err(mailadmin_wire::Error::Parse {
            position: lexer.position(),
            message: format!("trailing {token:?}"),
        }),
    }
}

/// Decodes LISTSCRIPTS lines into `(name, active)` pairs.
///
/// # Errors
///
/// Returns [`Error::Decode`] if a line is malformed or more than one script
/// is marked active.
pub fn scripts(lines: &[String]) -> Result<Vec<(String, bool)>> {
    const REPLY: &str = "LISTSCRIPTS";

    let scripts = lines
        .iter()
        .map(|line| script_line(&mut Lexer::new(line)).map_err(lex_error(REPLY)))
        .collect::<Result<Vec<_>>>()?;

    if scripts.iter().filter(|(_, active)| *active).count() > 1 {
        return Err(Error::decode(REPLY, "more than one active script"));
    }
    Ok(scripts)
}

fn script_line(lexer: &mut Lexer<'_>) -> mailadmin_wire::Result<(String, bool)> {
    let name = match lexer.next_token()? {
        Token::QuotedString(s) | Token::Literal(s) => s,
        token => {
            return Err(mailadmin_wire::Error::Parse {
                position: lexer.position(),
                message: format!("expected script name, got {token:?}"),
            });
        }
    };

    let active = match lexer.next_significant()? {
        Token::Eof => false,
        Token::Atom(word) if word.eq_ignore_ascii_case("ACTIVE") => {
            expect_end(lexer)?;
            true
        }
        token => {
            return Err(mailadmin_wire::Error::Parse {
                position: lexer.position(),
                message: format!("unexpected {token:?}"),
            });
        }
    };

    Ok((name, active))
}

/// Decodes a GETSCRIPT body from its string (literal or quoted) line.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the reply carries no string.
pub fn script_body(lines: &[String]) -> Result<String> {
    const REPLY: &str = "GETSCRIPT";
    let line = lines
        .first()
        .ok_or_else(|| Error::decode(REPLY, "no script data"))?;

    let mut lexer = Lexer::new(line);
    match lexer.next_token().map_err(lex_error(REPLY))? {
        Token::Literal(body) | Token::QuotedString(body) => {
            expect_end(&mut lexer).map_err(lex_error(REPLY))?;
            Ok(body)
        }
        token => Err(Error::decode(REPLY, format!("expected string, got {token:?}"))),
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

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    mod capability_tests {
        use super::*;

        #[test]
        fn cyrus_greeting() {
            let caps = capabilities(&lines(&[
                r#""IMPLEMENTATION" "Cyrus timsieved v3.8.1""#,
                r#""SASL" "plain LOGIN""#,
                r#""SIEVE" "fileinto reject envelope vacation""#,
                r#""STARTTLS""#,
                r#""UNAUTHENTICATE""#,
                r#""VERSION" "1.0""#,
                r#""MAXREDIRECTS" "5""#,
            ]))
            .unwrap();

            assert_eq!(
                caps.implementation.as_deref(),
                Some("Cyrus timsieved v3.8.1")
            );
            assert_eq!(caps.sasl, vec!["PLAIN", "LOGIN"]);
            assert!(caps.supports_sasl("plain"));
            assert!(!caps.supports_sasl("GSSAPI"));
            assert_eq!(caps.sieve.len(), 4);
            assert!(caps.starttls);
            assert_eq!(caps.version.as_deref(), Some("1.0"));
            assert_eq!(caps.other.get("MAXREDIRECTS").map(String::as_str), Some("5"));
            assert_eq!(caps.other.get("UNAUTHENTICATE").map(String::as_str), Some(""));
        }

        #[test]
        fn malformed_line() {
            assert!(matches!(
                capabilities(&lines(&[r#""SASL" "PLAIN" extra"#])),
                Err(Error::Decode { .. })
            ));
            assert!(capabilities(&lines(&["(weird"])).is_err());
        }

        #[test]
        fn empty_greeting() {
            assert_eq!(capabilities(&[]).unwrap(), SieveCapabilities::default());
        }
    }

    mod script_list_tests {
        use super::*;

        #[test]
        fn names_and_active_flag() {
            let scripts = scripts(&lines(&[
                r#""vacation""#,
                r#""main script" ACTIVE"#,
                "{8}\r\nweird\"nm",
            ]))
            .unwrap();
            assert_eq!(
                scripts,
                vec![
                    ("vacation".to_string(), false),
                    ("main script".to_string(), true),
                    ("weird\"nm".to_string(), false),
                ]
            );
        }

        #[test]
        fn active_is_case_insensitive() {
            let scripts = scripts(&lines(&[r#""a" active"#])).unwrap();
            assert!(scripts[0].1);
        }

        #[test]
        fn two_active_is_decode_error() {
            assert!(scripts(&lines(&[r#""a" ACTIVE"#, r#""b" ACTIVE"#])).is_err());
        }

        #[test]
        fn malformed() {
            assert!(scripts(&lines(&["bare"])).is_err());
            assert!(scripts(&lines(&[r#""a" INACTIVE"#])).is_err());
        }
    }

    mod script_body_tests {
        use super::*;

        #[test]
        fn literal_body() {
            let body = script_body(&lines(&["{12}\r\nkeep;\r\nstop;"])).unwrap();
            assert_eq!(body, "keep;\r\nstop;");
        }

        #[test]
        fn empty_literal_body() {
            assert_eq!(script_body(&lines(&["{0}\r\n"])).unwrap(), "");
        }

        #[test]
        fn quoted_body() {
            assert_eq!(script_body(&lines(&[r#""keep;""#])).unwrap(), "keep;");
        }

        #[test]
        fn missing_or_malformed() {
            assert!(script_body(&[]).is_err());
            assert!(script_body(&lines(&["keep;"])).is_err());
            assert!(script_body(&lines(&["{5}\r\nkeep; extra"])).is_err());
        }
    }
}
