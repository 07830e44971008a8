//! Decoders from accumulated untagged lines to structured values.
//!
//! Each decoder looks for the line carrying its response keyword, so the
//! order of unrelated untagged lines does not matter. Malformed lines are
//! [`Error::Decode`]; they are never mapped to zero values.

use mailadmin_wire::{Lexer, Token};

use super::response::ResponseLine;
use crate::error::{Error, Result};
use crate::types::{Capability, CapabilitySet, FolderState, Namespace, Namespaces, Quota};

fn find_keyword<'a>(lines: &'a [String], keyword: &str) -> Option<ResponseLine<'a>> {
    lines
        .iter()
        .map(|line| ResponseLine::parse(line))
        .find(|line| line.is_untagged() && line.has_keyword(keyword))
}

fn lex_error(reply: &'static str) -> impl Fn(mailadmin_wire::Error) -> Error {
    move |e| Error::decode(reply, e.to_string())
}

/// Decodes the `* CAPABILITY` line.
///
/// # Errors
///
/// Returns [`Error::Decode`] if no capability line was received.
pub fn capabilities(lines: &[String]) -> Result<CapabilitySet> {
    let line =
        find_keyword(lines, "CAPABILITY").ok_or_else(|| Error::decode("CAPABILITY", "no data"))?;
    Ok(line.rest.split_whitespace().map(Capability::parse).collect())
}

/// Decodes the `* NAMESPACE` line into personal and shared records.
///
/// The first group of each of the first two slots is used. A `NIL` slot
/// yields the empty record.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the line is missing, malformed or carries
/// fewer than two slots.
pub fn namespaces(lines: &[String]) -> Result<Namespaces> {
    const REPLY: &str = "NAMESPACE";
    let line = find_keyword(lines, REPLY).ok_or_else(|| Error::decode(REPLY, "no data"))?;

    let mut lexer = Lexer::new(line.rest);
    let mut slots = Vec::with_capacity(3);
    while let Some(slot) = namespace_slot(&mut lexer).map_err(lex_error(REPLY))? {
        slots.push(slot);
    }

    let mut slots = slots.into_iter();
    match (slots.next(), slots.next()) {
        (Some(personal), Some(shared)) => Ok(Namespaces { personal, shared }),
        _ => Err(Error::decode(REPLY, "fewer than two namespace groups")),
    }
}

/// Reads one slot: `NIL` or `((prefix delim ...) ...)`. Returns `None` at
/// end of line.
fn namespace_slot(lexer: &mut Lexer<'_>) -> mailadmin_wire::Result<Option<Namespace>> {
    match lexer.next_significant()? {
        Token::Eof => return Ok(None),
        Token::Nil => return Ok(Some(Namespace::default())),
        Token::LParen => {}
        token => return Err(unexpected(lexer, &token)),
    }

    lexer.skip_spaces();
    lexer.expect(Token::LParen)?;
    lexer.skip_spaces();
    let prefix = lexer.read_astring()?;
    lexer.skip_spaces();
    let delimiter = lexer.read_nstring()?.unwrap_or_default();
    // Extension data, then the group's closing paren.
    lexer.skip_list()?;

    loop {
        match lexer.next_significant()? {
            Token::LParen => lexer.skip_list()?,
            Token::RParen => break,
            token => return Err(unexpected(lexer, &token)),
        }
    }

    Ok(Some(Namespace { prefix, delimiter }))
}

fn unexpected(lexer: &Lexer<'_>, token: &Token<'_>) -> mailadmin_wire::Error {
    mailadmin_wire::Error::Parse {
        position: lexer.position(),
        message: format!("unexpected {token:?}"),
    }
}

/// Decodes the `* QUOTA root (STORAGE used total)` line.
///
/// An empty resource list, or no QUOTA line at all, means no limit.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the QUOTA line is malformed.
pub fn quota(lines: &[String]) -> Result<Quota> {
    const REPLY: &str = "QUOTA";
    let Some(line) = find_keyword(lines, REPLY) else {
        return Ok(Quota::Unset);
    };

    quota_resources(&mut Lexer::new(line.rest)).map_err(lex_error(REPLY))
}

fn quota_resources(lexer: &mut Lexer<'_>) -> mailadmin_wire::Result<Quota> {
    lexer.read_astring()?;
    lexer.skip_spaces();
    lexer.expect(Token::LParen)?;

    let mut quota = Quota::Unset;
    loop {
        match lexer.next_significant()? {
            Token::RParen => return Ok(quota),
            Token::Atom(resource) => {
                lexer.skip_spaces();
                let used = lexer.read_number()?;
                lexer.skip_spaces();
                let total = lexer.read_number()?;
                if resource.eq_ignore_ascii_case("STORAGE") {
                    quota = Quota::Set { used, total };
                }
            }
            token => return Err(unexpected(lexer, &token)),
        }
    }
}

/// Decodes the message count from `* STATUS mailbox (MESSAGES n)`.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the STATUS line or its MESSAGES item is
/// missing or malformed.
pub fn message_count(lines: &[String]) -> Result<u32> {
    const REPLY: &str = "STATUS";
    let line = find_keyword(lines, REPLY).ok_or_else(|| Error::decode(REPLY, "no data"))?;

    let messages = status_items(&mut Lexer::new(line.rest))
        .map_err(lex_error(REPLY))?
        .ok_or_else(|| Error::decode(REPLY, "no MESSAGES item"))?;
    u32::try_from(messages).map_err(|_| Error::decode(REPLY, format!("count {messages} too large")))
}

fn status_items(lexer: &mut Lexer<'_>) -> mailadmin_wire::Result<Option<u64>> {
    lexer.read_astring()?;
    lexer.skip_spaces();
    lexer.expect(Token::LParen)?;

    let mut messages = None;
    loop {
        match lexer.next_significant()? {
            Token::RParen => return Ok(messages),
            Token::Atom(item) => {
                lexer.skip_spaces();
                let value = lexer.read_number()?;
                if item.eq_ignore_ascii_case("MESSAGES") {
                    messages = Some(value);
                }
            }
            token => return Err(unexpected(lexer, &token)),
        }
    }
}

/// Decodes folder names from `* LIST (flags) "delim" name` lines.
///
/// # Errors
///
/// Returns [`Error::Decode`] if any LIST line is malformed.
pub fn folders(lines: &[String]) -> Result<Vec<String>> {
    const REPLY: &str = "LIST";

    lines
        .iter()
        .map(|line| ResponseLine::parse(line))
        .filter(|line| line.is_untagged() && line.has_keyword(REPLY))
        .map(|line| list_name(&mut Lexer::new(line.rest)).map_err(lex_error(REPLY)))
        .collect()
}

fn list_name(lexer: &mut Lexer<'_>) -> mailadmin_wire::Result<String> {
    lexer.expect(Token::LParen)?;
    lexer.skip_list()?;
    lexer.skip_spaces();
    lexer.read_nstring()?;
    lexer.skip_spaces();
    lexer.read_astring()
}

/// Decodes `* n EXISTS` and `* n RECENT` from a SELECT reply, keeping every
/// untagged line as info.
///
/// # Errors
///
/// Returns [`Error::Decode`] if EXISTS is missing or a count is not a
/// number.
pub fn folder_state(lines: &[String]) -> Result<FolderState> {
    const REPLY: &str = "SELECT";
    let mut exists = None;
    let mut recent = 0;

    for line in lines {
        let parsed = ResponseLine::parse(line);
        if !parsed.is_untagged() {
            continue;
        }
        let item = parsed.rest.split_whitespace().next().unwrap_or_default();
        let is_exists = item.eq_ignore_ascii_case("EXISTS");
        if !is_exists && !item.eq_ignore_ascii_case("RECENT") {
            continue;
        }

        let count: u32 = parsed
            .keyword
            .parse()
            .map_err(|_| Error::decode(REPLY, format!("bad count in {line:?}")))?;
        if is_exists {
            exists = Some(count);
        } else {
            recent = count;
        }
    }

    Ok(FolderState {
        message_count: exists.ok_or_else(|| Error::decode(REPLY, "no EXISTS line"))?,
        recent_count: recent,
        info: lines.to_vec(),
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    mod capability_tests {
        use super::*;

        #[test]
        fn decodes_tokens() {
            let caps = capabilities(&lines(&[
                "* CAPABILITY IMAP4rev1 LITERAL+ NAMESPACE QUOTA ACL AUTH=PLAIN",
            ]))
            .unwrap();
            assert!(caps.contains(&Capability::Quota));
            assert!(caps.contains(&Capability::LiteralPlus));
            assert!(caps.supports_auth("PLAIN"));
            assert_eq!(caps.len(), 6);
        }

        #[test]
        fn missing_line_is_decode_error() {
            assert!(matches!(
                capabilities(&[]),
                Err(Error::Decode {
                    reply: "CAPABILITY",
                    ..
                })
            ));
        }
    }

    mod namespace_tests {
        use super::*;

        #[test]
        fn uses_first_two_slots() {
            let ns = namespaces(&lines(&[
                r#"* NAMESPACE (("INBOX/" "/")) (("user/" "/")) (("" "/"))"#,
            ]))
            .unwrap();
            assert_eq!(ns.personal, Namespace::new("INBOX/", "/"));
            assert_eq!(ns.shared, Namespace::new("user/", "/"));
        }

        #[test]
        fn nil_personal_slot() {
            let ns =
                namespaces(&lines(&[r#"* NAMESPACE NIL (("user." ".")) NIL"#])).unwrap();
            assert_eq!(ns.personal, Namespace::default());
            assert_eq!(ns.shared, Namespace::new("user.", "."));
            assert_eq!(ns.delimiter(), ".");
        }

        #[test]
        fn extensions_and_extra_groups_skipped() {
            let ns = namespaces(&lines(&[
                r##"* NAMESPACE (("" "/" "X-PARAM" ("a" "b")) ("#mh/" "/")) (("~" "/")) NIL"##,
            ]))
            .unwrap();
            assert_eq!(ns.personal, Namespace::new("", "/"));
            assert_eq!(ns.shared, Namespace::new("~", "/"));
        }

        #[test]
        fn fewer_than_two_slots() {
            assert!(matches!(
                namespaces(&lines(&[r#"* NAMESPACE (("INBOX/" "/"))"#])),
                Err(Error::Decode { .. })
            ));
        }

        #[test]
        fn garbage_is_decode_error() {
            assert!(matches!(
                namespaces(&lines(&["* NAMESPACE INBOX/ /"])),
                Err(Error::Decode { .. })
            ));
            assert!(namespaces(&lines(&["* OK nothing here"])).is_err());
        }
    }

    mod quota_tests {
        use super::*;

        #[test]
        fn empty_resource_list_is_unset() {
            let q = quota(&lines(&["* QUOTAROOT user/x user/x", "* QUOTA user/x () "])).unwrap();
            assert_eq!(q, Quota::Unset);
            assert_eq!((q.used(), q.total(), q.percent()), (0, 0, 0.0));
        }

        #[test]
        fn storage_figures() {
            let q = quota(&lines(&[
                "* QUOTAROOT user/x user/x",
                "* QUOTA user/x (STORAGE 7 5000)",
            ]))
            .unwrap();
            assert_eq!(q, Quota::Set { used: 7, total: 5000 });
            assert_eq!(q.percent(), 0.14);
        }

        #[test]
        fn other_resources_ignored() {
            let q = quota(&lines(&[
                r#"* QUOTA "user/x" (MESSAGE 3 100 STORAGE 10 20)"#,
            ]))
            .unwrap();
            assert_eq!(q, Quota::Set { used: 10, total: 20 });

            let q = quota(&lines(&["* QUOTA user/x (MESSAGE 3 100)"])).unwrap();
            assert_eq!(q, Quota::Unset);
        }

        #[test]
        fn no_quota_line_is_unset() {
            assert_eq!(
                quota(&lines(&["* QUOTAROOT user/x"])).unwrap(),
                Quota::Unset
            );
        }

        #[test]
        fn bad_numbers_are_decode_errors() {
            assert!(matches!(
                quota(&lines(&["* QUOTA user/x (STORAGE seven 5000)"])),
                Err(Error::Decode { reply: "QUOTA", .. })
            ));
            assert!(quota(&lines(&["* QUOTA user/x (STORAGE 7"])).is_err());
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn message_count_decoded() {
            assert_eq!(
                message_count(&lines(&["* STATUS user/jane (MESSAGES 229)"])).unwrap(),
                229
            );
            assert_eq!(
                message_count(&lines(&[r#"* STATUS "user/jane doe" (UNSEEN 2 MESSAGES 4)"#]))
                    .unwrap(),
                4
            );
        }

        #[test]
        fn missing_or_malformed_is_decode_error() {
            assert!(message_count(&[]).is_err());
            assert!(message_count(&lines(&["* STATUS user/jane (UNSEEN 2)"])).is_err());
            assert!(message_count(&lines(&["* STATUS user/jane (MESSAGES x)"])).is_err());
            assert!(
                message_count(&lines(&["* STATUS user/jane (MESSAGES 99999999999)"])).is_err()
            );
        }
    }

    mod list_tests {
        use super::*;

        #[test]
        fn folder_names() {
            let names = folders(&lines(&[
                r#"* LIST (\HasChildren) "/" "INBOX""#,
                r#"* LIST (\HasNoChildren) "/" "INBOX/Sent""#,
            ]))
            .unwrap();
            assert_eq!(names, vec!["INBOX", "INBOX/Sent"]);
        }

        #[test]
        fn atom_names_nil_delimiter_and_literals() {
            let names = folders(&lines(&[
                "* LIST () NIL Archive",
                "* LIST (\\Noselect) \".\" {10}\r\nweird\"name",
                "* OK unrelated",
            ]))
            .unwrap();
            assert_eq!(names, vec!["Archive", "weird\"name"]);
        }

        #[test]
        fn malformed_line() {
            assert!(folders(&lines(&["* LIST \"/\" INBOX"])).is_err());
        }
    }

    mod select_tests {
        use super::*;

        #[test]
        fn exists_and_recent() {
            let raw = lines(&[
                r"* FLAGS (\Answered \Flagged \Deleted \Seen \Draft)",
                "* 172 EXISTS",
                "* 1 RECENT",
                "* OK [UIDVALIDITY 3857529045] UIDs valid",
            ]);
            let state = folder_state(&raw).unwrap();
            assert_eq!(state.message_count, 172);
            assert_eq!(state.recent_count, 1);
            assert_eq!(state.info, raw);
        }

        #[test]
        fn missing_recent_is_zero() {
            let state = folder_state(&lines(&["* 3 exists"])).unwrap();
            assert_eq!(state.message_count, 3);
            assert_eq!(state.recent_count, 0);
        }

        #[test]
        fn missing_exists_is_decode_error() {
            assert!(matches!(
                folder_state(&lines(&["* 1 RECENT"])),
                Err(Error::Decode { reply: "SELECT", .. })
            ));
            assert!(folder_state(&lines(&["* many EXISTS"])).is_err());
        }
    }
}
