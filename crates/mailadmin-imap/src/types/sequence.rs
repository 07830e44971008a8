//! Message sequence sets.

use std::num::NonZeroU32;
use std::str::FromStr;

/// Sequence set naming the messages a STORE applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single sequence number.
    Single(NonZeroU32),
    /// Range of sequence numbers (inclusive).
    Range(NonZeroU32, NonZeroU32),
    /// Range from start to end of mailbox.
    RangeFrom(NonZeroU32),
    /// All messages (*).
    All,
    /// Multiple sequence specifications.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a sequence set from a single number.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self::Single)
    }

    /// Creates a range sequence set.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        Some(Self::Range(NonZeroU32::new(start)?, NonZeroU32::new(end)?))
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}

/// Error returned when a sequence set string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sequence set: {0:?}")]
pub struct ParseSequenceSetError(String);

impl FromStr for SequenceSet {
    type Err = ParseSequenceSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSequenceSetError(s.to_string());
        let parse_num = |part: &str| {
            part.parse::<u32>()
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(err)
        };

        let mut items = Vec::new();
        for part in s.split(',') {
            let item = match part.split_once(':') {
                None if part == "*" => Self::All,
                None => Self::Single(parse_num(part)?),
                Some((start, "*")) => Self::RangeFrom(parse_num(start)?),
                Some((start, end)) => Self::Range(parse_num(start)?, parse_num(end)?),
            };
            items.push(item);
        }

        match items.len() {
            0 => Err(err()),
            1 => Ok(items.remove(0)),
            _ => Ok(Self::Set(items)),
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
    fn single_zero_returns_none() {
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 4).is_none());
    }

    #[test]
    fn display_forms() {
        assert_eq!(SequenceSet::single(5).unwrap().to_string(), "5");
        assert_eq!(SequenceSet::range(1, 10).unwrap().to_string(), "1:10");
        assert_eq!(SequenceSet::All.to_string(), "*");
        let set = SequenceSet::Set(vec![
            SequenceSet::single(1).unwrap(),
            SequenceSet::RangeFrom(NonZeroU32::new(4).unwrap()),
        ]);
        assert_eq!(set.to_string(), "1,4:*");
    }

    #[test]
    fn parse_matches_display() {
        for text in ["7", "1:5", "3:*", "*", "1,3:4,9:*"] {
            assert_eq!(text.parse::<SequenceSet>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        for text in ["", "0", "a", "1:", ",", "1;2", "-3"] {
            assert!(text.parse::<SequenceSet>().is_err(), "{text}");
        }
    }
}
