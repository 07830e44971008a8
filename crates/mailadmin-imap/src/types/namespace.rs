//! Namespace records.

use serde::Serialize;

/// Root prefix and hierarchy delimiter for one class of mailboxes.
///
/// A namespace the server reports as `NIL` is the empty record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Namespace {
    /// Prefix every mailbox path in this namespace starts with.
    pub prefix: String,
    /// Hierarchy delimiter, empty when the server reported none.
    pub delimiter: String,
}

impl Namespace {
    /// Creates a namespace record.
    #[must_use]
    pub fn new(prefix: impl Into<String>, delimiter: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: delimiter.into(),
        }
    }

    /// Returns `name` rooted in this namespace.
    #[must_use]
    pub fn path(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }
}

/// Personal and shared namespaces, decoded once after login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Namespaces {
    /// The logged-in identity's own mailboxes.
    pub personal: Namespace,
    /// Other users' mailboxes, as seen by an administrator.
    pub shared: Namespace,
}

impl Namespaces {
    /// Returns the personal delimiter, falling back to the shared one when
    /// the identity has no personal namespace.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        if self.personal.delimiter.is_empty() {
            &self.shared.delimiter
        } else {
            &self.personal.delimiter
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
    fn path_prefixes_name() {
        assert_eq!(Namespace::new("user/", "/").path("jane"), "user/jane");
        assert_eq!(Namespace::default().path("INBOX"), "INBOX");
    }

    #[test]
    fn delimiter_falls_back_to_shared() {
        let ns = Namespaces {
            personal: Namespace::default(),
            shared: Namespace::new("user.", "."),
        };
        assert_eq!(ns.delimiter(), ".");

        let ns = Namespaces {
            personal: Namespace::new("INBOX/", "/"),
            shared: Namespace::new("user.", "."),
        };
        assert_eq!(ns.delimiter(), "/");
    }
}
