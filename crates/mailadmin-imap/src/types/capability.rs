//! Server capabilities and response status.

use std::collections::HashSet;

/// Response status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command rejected (operational error).
    No,
    /// Command malformed (protocol/syntax error).
    Bad,
    /// Server greeting (pre-authenticated).
    PreAuth,
    /// Server is closing connection.
    Bye,
}

impl Status {
    /// Parses a status word, ignoring case.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Returns true if this is a successful status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }

    /// Returns the wire form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
            Self::PreAuth => "PREAUTH",
            Self::Bye => "BYE",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// `IMAP4rev2` (RFC 9051)
    Imap4Rev2,
    /// NAMESPACE command support (RFC 2342)
    Namespace,
    /// QUOTA extension (RFC 2087)
    Quota,
    /// ACL extension (RFC 4314)
    Acl,
    /// LITERAL+ extension (RFC 7888)
    LiteralPlus,
    /// STARTTLS support
    StartTls,
    /// LOGIN disabled
    LoginDisabled,
    /// AUTH mechanism, uppercased
    Auth(String),
    /// Any other capability, uppercased
    Unknown(String),
}

impl Capability {
    /// Parses a capability token. Tokens are compared case-insensitively, so
    /// unknown tokens are stored uppercased.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IMAP4REV2" => Self::Imap4Rev2,
            "NAMESPACE" => Self::Namespace,
            "QUOTA" => Self::Quota,
            "ACL" => Self::Acl,
            "LITERAL+" => Self::LiteralPlus,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            _ => match upper.strip_prefix("AUTH=") {
                Some(mech) => Self::Auth(mech.to_string()),
                None => Self::Unknown(upper),
            },
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => write!(f, "IMAP4rev1"),
            Self::Imap4Rev2 => write!(f, "IMAP4rev2"),
            Self::Namespace => write!(f, "NAMESPACE"),
            Self::Quota => write!(f, "QUOTA"),
            Self::Acl => write!(f, "ACL"),
            Self::LiteralPlus => write!(f, "LITERAL+"),
            Self::StartTls => write!(f, "STARTTLS"),
            Self::LoginDisabled => write!(f, "LOGINDISABLED"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// Capabilities advertised by the server, decoded once after login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    caps: HashSet<Capability>,
}

impl CapabilitySet {
    /// Returns true if the capability was advertised.
    #[must_use]
    pub fn contains(&self, cap: &Capability) -> bool {
        self.caps.contains(cap)
    }

    /// Returns true if the SASL mechanism was advertised.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.caps
            .contains(&Capability::Auth(mechanism.to_ascii_uppercase()))
    }

    /// Iterates over the advertised capabilities.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.caps.iter()
    }

    /// Returns the number of capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caps.len()
    }

    /// Returns true if nothing was advertised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            caps: iter.into_iter().collect(),
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

    mod status_tests {
        use super::*;

        #[test]
        fn parse_is_case_insensitive() {
            assert_eq!(Status::parse("ok"), Some(Status::Ok));
            assert_eq!(Status::parse("No"), Some(Status::No));
            assert_eq!(Status::parse("BAD"), Some(Status::Bad));
            assert_eq!(Status::parse("DONE"), None);
        }

        #[test]
        fn is_ok_for_ok_and_preauth() {
            assert!(Status::Ok.is_ok());
            assert!(Status::PreAuth.is_ok());
            assert!(!Status::No.is_ok());
            assert!(!Status::Bad.is_ok());
            assert!(!Status::Bye.is_ok());
        }
    }

    mod capability_tests {
        use super::*;

        #[test]
        fn parse_known() {
            assert_eq!(Capability::parse("imap4rev1"), Capability::Imap4Rev1);
            assert_eq!(Capability::parse("QUOTA"), Capability::Quota);
            assert_eq!(Capability::parse("Namespace"), Capability::Namespace);
        }

        #[test]
        fn parse_auth_uppercases_mechanism() {
            assert_eq!(
                Capability::parse("AUTH=plain"),
                Capability::Auth("PLAIN".to_string())
            );
        }

        #[test]
        fn parse_unknown_uppercases() {
            assert_eq!(
                Capability::parse("x-cyrus"),
                Capability::Unknown("X-CYRUS".to_string())
            );
        }

        #[test]
        fn display_roundtrip() {
            for token in ["IMAP4rev1", "QUOTA", "ACL", "AUTH=PLAIN", "X-NETSCAPE"] {
                assert_eq!(
                    Capability::parse(token).to_string().to_ascii_uppercase(),
                    token.to_ascii_uppercase()
                );
            }
        }
    }

    mod set_tests {
        use super::*;

        #[test]
        fn membership() {
            let set: CapabilitySet = ["IMAP4rev1", "QUOTA", "AUTH=PLAIN"]
                .into_iter()
                .map(Capability::parse)
                .collect();

            assert_eq!(set.len(), 3);
            assert!(set.contains(&Capability::Quota));
            assert!(!set.contains(&Capability::Acl));
            assert!(set.supports_auth("plain"));
            assert!(!set.supports_auth("LOGIN"));
        }

        #[test]
        fn empty() {
            assert!(CapabilitySet::default().is_empty());
        }
    }
}
