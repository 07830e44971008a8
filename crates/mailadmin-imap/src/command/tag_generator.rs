//! Command tag generator.
//!
//! Tags correlate a command with its terminal status line.

/// Tag generator owned by one connection.
///
/// Generates sequential tags `A001`, `A002`, ... The number is padded to
/// three digits and widens past `A999` (`A1000`); it never wraps.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u64,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 1, prefix }
    }

    /// Generates the next tag.
    #[must_use]
    pub fn next(&mut self) -> String {
        let n = self.counter;
        self.counter = self.counter.saturating_add(1);
        format!("{}{n:03}", self.prefix)
    }

    /// Tags `command` and returns `(tag, framed_line)`.
    pub fn issue(&mut self, command: &str) -> (String, String) {
        let tag = self.next();
        let line = format!("{tag} {command}");
        (tag, line)
    }

    /// Returns the number the next tag will carry.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
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
    use proptest::prelude::*;

    #[test]
    fn starts_at_one() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next(), "A001");
        assert_eq!(tags.next(), "A002");
        assert_eq!(tags.current(), 3);
    }

    #[test]
    fn issue_frames_command() {
        let mut tags = TagGenerator::default();
        let (tag, line) = tags.issue("CAPABILITY");
        assert_eq!(tag, "A001");
        assert_eq!(line, "A001 CAPABILITY");
    }

    #[test]
    fn widens_past_999() {
        let mut tags = TagGenerator::default();
        for _ in 1..999 {
            let _ = tags.next();
        }
        assert_eq!(tags.next(), "A999");
        assert_eq!(tags.next(), "A1000");
    }

    #[test]
    fn clone_continues_sequence() {
        let mut tags = TagGenerator::new('B');
        let _ = tags.next();
        let mut copy = tags.clone();
        assert_eq!(copy.next(), "B002");
    }

    proptest! {
        #[test]
        fn tags_strictly_increase(count in 1usize..1500) {
            let mut tags = TagGenerator::default();
            let mut previous = 0u64;
            for _ in 0..count {
                let tag = tags.next();
                prop_assert!(tag.starts_with('A'));
                prop_assert!(tag.len() >= 4);
                let n: u64 = tag[1..].parse().unwrap();
                prop_assert!(n > previous);
                previous = n;
            }
        }
    }
}
