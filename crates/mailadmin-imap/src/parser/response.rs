//! Response-line classification and reply assembly.

use crate::error::{Error, Result};
use crate::types::Status;

/// A response line split into its first two words and the remainder.
///
/// Splitting happens on whitespace runs, so the result does not depend on
/// tag width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLine<'a> {
    /// Tag, `*` or `+`.
    pub marker: &'a str,
    /// Status word, response keyword or message number.
    pub keyword: &'a str,
    /// Everything after the keyword, leading whitespace removed.
    pub rest: &'a str,
}

impl<'a> ResponseLine<'a> {
    /// Splits a response line.
    #[must_use]
    pub fn parse(line: &'a str) -> Self {
        let (marker, after) = split_word(line);
        let (keyword, rest) = split_word(after);
        Self {
            marker,
            keyword,
            rest,
        }
    }

    /// Returns true for an untagged (`*`) line.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        self.marker == "*"
    }

    /// Returns true if the keyword matches, ignoring case.
    #[must_use]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// How a line relates to the command in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Untagged data line; more lines follow.
    Untagged,
    /// `+` line: the server waits for a literal.
    ContinuationRequest,
    /// Terminal line carrying the command's own tag.
    Done {
        /// OK, NO or BAD.
        status: Status,
        /// Text after the status word.
        text: String,
    },
}

impl Completion {
    /// Classifies `line` against the tag of the outstanding command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the line carries another tag, or the
    /// command's tag with something other than OK, NO or BAD.
    pub fn classify(line: &str, tag: &str) -> Result<Self> {
        let parsed = ResponseLine::parse(line);

        if parsed.is_untagged() {
            return Ok(Self::Untagged);
        }
        if parsed.marker.starts_with('+') {
            return Ok(Self::ContinuationRequest);
        }
        if parsed.marker != tag {
            return Err(Error::Protocol(format!(
                "expected completion for {tag}, got {line:?}"
            )));
        }

        match Status::parse(parsed.keyword) {
            Some(status @ (Status::Ok | Status::No | Status::Bad)) => Ok(Self::Done {
                status,
                text: parsed.rest.to_string(),
            }),
            _ => Err(Error::Protocol(format!(
                "invalid status on tagged line {line:?}"
            ))),
        }
    }

    /// Returns true for a terminal line.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Everything the server sent for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Tag the command was issued with.
    pub tag: String,
    /// Terminal status.
    pub status: Status,
    /// Text of the terminal line.
    pub text: String,
    /// Untagged lines, in arrival order.
    pub lines: Vec<String>,
}

impl Reply {
    /// Returns true if the command completed with OK.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }

    /// Converts a NO or BAD completion into [`Error::Command`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] unless the status is OK.
    pub fn into_result(self, command: &'static str) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(Error::Command {
                command,
                status: self.status,
                text: self.text,
            })
        }
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
    fn split_ignores_whitespace_runs() {
        let line = ResponseLine::parse("A1000   OK   done here");
        assert_eq!(line.marker, "A1000");
        assert_eq!(line.keyword, "OK");
        assert_eq!(line.rest, "done here");
    }

    #[test]
    fn split_short_lines() {
        let line = ResponseLine::parse("+");
        assert_eq!(line.marker, "+");
        assert_eq!(line.keyword, "");
        assert_eq!(line.rest, "");
    }

    #[test]
    fn classify_reply_sequence() {
        let lines = ["* first", "* second", "A003 OK done"];
        let kinds: Vec<_> = lines
            .iter()
            .map(|l| Completion::classify(l, "A003").unwrap())
            .collect();

        assert_eq!(kinds[0], Completion::Untagged);
        assert_eq!(kinds[1], Completion::Untagged);
        assert_eq!(
            kinds[2],
            Completion::Done {
                status: Status::Ok,
                text: "done".to_string()
            }
        );
    }

    #[test]
    fn classify_failures() {
        assert_eq!(
            Completion::classify("A003 NO failed", "A003").unwrap(),
            Completion::Done {
                status: Status::No,
                text: "failed".to_string()
            }
        );
        let bad = Completion::classify("A003 bad syntax", "A003").unwrap();
        assert!(matches!(
            bad,
            Completion::Done {
                status: Status::Bad,
                ..
            }
        ));
        assert!(bad.is_done());
    }

    #[test]
    fn classify_continuation_request() {
        assert_eq!(
            Completion::classify("+ go ahead", "A003").unwrap(),
            Completion::ContinuationRequest
        );
        assert_eq!(
            Completion::classify("+", "A003").unwrap(),
            Completion::ContinuationRequest
        );
    }

    #[test]
    fn foreign_tag_is_protocol_error() {
        assert!(matches!(
            Completion::classify("A002 OK late", "A003"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            Completion::classify("A0031 OK prefix", "A003"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn own_tag_with_bogus_status_is_protocol_error() {
        assert!(matches!(
            Completion::classify("A003 MAYBE", "A003"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            Completion::classify("A003 BYE", "A003"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn reply_into_result() {
        let reply = Reply {
            tag: "A004".to_string(),
            status: Status::No,
            text: "Mailbox already exists".to_string(),
            lines: Vec::new(),
        };
        let err = reply.into_result("CREATE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "CREATE failed with NO: Mailbox already exists"
        );
    }
}
