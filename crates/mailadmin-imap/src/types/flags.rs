//! Message flags and STORE actions.

/// System flag that can be stored on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Message has been answered (`\Answered`).
    Answered,
    /// Message is flagged for attention (`\Flagged`).
    Flagged,
    /// Message is a draft (`\Draft`).
    Draft,
    /// Message has been read (`\Seen`).
    Seen,
    /// Message is marked for deletion (`\Deleted`).
    Deleted,
}

impl Flag {
    /// Returns the wire form of the flag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Draft => "\\Draft",
            Self::Seen => "\\Seen",
            Self::Deleted => "\\Deleted",
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a STORE combines the given flag with the message's current flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreAction {
    /// Replace all flags (`FLAGS`).
    Set,
    /// Replace all flags without untagged echo (`FLAGS.SILENT`).
    SetSilent,
    /// Add the flag (`+FLAGS`).
    Add,
    /// Add the flag without untagged echo (`+FLAGS.SILENT`).
    AddSilent,
    /// Remove the flag (`-FLAGS`).
    Remove,
    /// Remove the flag without untagged echo (`-FLAGS.SILENT`).
    RemoveSilent,
}

impl StoreAction {
    /// Returns the STORE data item name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "FLAGS",
            Self::SetSilent => "FLAGS.SILENT",
            Self::Add => "+FLAGS",
            Self::AddSilent => "+FLAGS.SILENT",
            Self::Remove => "-FLAGS",
            Self::RemoveSilent => "-FLAGS.SILENT",
        }
    }
}

impl std::fmt::Display for StoreAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
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
    fn flag_wire_names() {
        assert_eq!(Flag::Deleted.to_string(), "\\Deleted");
        assert_eq!(Flag::Seen.as_str(), "\\Seen");
    }

    #[test]
    fn action_wire_names() {
        let all = [
            (StoreAction::Set, "FLAGS"),
            (StoreAction::SetSilent, "FLAGS.SILENT"),
            (StoreAction::Add, "+FLAGS"),
            (StoreAction::AddSilent, "+FLAGS.SILENT"),
            (StoreAction::Remove, "-FLAGS"),
            (StoreAction::RemoveSilent, "-FLAGS.SILENT"),
        ];
        for (action, wire) in all {
            assert_eq!(action.to_string(), wire);
        }
    }
}
