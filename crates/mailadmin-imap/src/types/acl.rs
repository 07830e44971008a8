//! Access-control rights.

use std::str::FromStr;

use crate::error::Error;

/// Named rights combinations understood by [`AclRights::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclPreset {
    /// No rights; removes the identifier's entry.
    None,
    /// `lrs`
    Read,
    /// `lrsp`
    Post,
    /// `lrsip`
    Append,
    /// `lrswipcd`
    Write,
    /// `lrd`
    Delete,
    /// `lrswipcda`
    All,
}

impl AclPreset {
    /// Looks up a preset by name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "read" => Some(Self::Read),
            "post" => Some(Self::Post),
            "append" => Some(Self::Append),
            "write" => Some(Self::Write),
            "delete" => Some(Self::Delete),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Returns the rights letters the preset expands to.
    #[must_use]
    pub const fn letters(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Read => "lrs",
            Self::Post => "lrsp",
            Self::Append => "lrsip",
            Self::Write => "lrswipcd",
            Self::Delete => "lrd",
            Self::All => "lrswipcda",
        }
    }
}

/// Validated rights string for SETACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclRights(String);

impl AclRights {
    /// Letters a rights string may contain.
    pub const LETTERS: &'static str = "lrswipcda";

    /// Returns the rights letters as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<AclPreset> for AclRights {
    fn from(preset: AclPreset) -> Self {
        Self(preset.letters().to_string())
    }
}

impl FromStr for AclRights {
    type Err = Error;

    /// Accepts a preset name or a string of rights letters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(preset) = AclPreset::from_name(s) {
            return Ok(preset.into());
        }
        if s.is_empty() || !s.chars().all(|c| Self::LETTERS.contains(c)) {
            return Err(Error::InvalidArgument(format!("ACL rights {s:?}")));
        }
        Ok(Self(s.to_string()))
    }
}

impl std::fmt::Display for AclRights {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
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
    fn presets_expand() {
        assert_eq!("read".parse::<AclRights>().unwrap().as_str(), "lrs");
        assert_eq!("ALL".parse::<AclRights>().unwrap().as_str(), "lrswipcda");
        assert_eq!("none".parse::<AclRights>().unwrap().as_str(), "");
        assert_eq!(AclRights::from(AclPreset::Write).as_str(), "lrswipcd");
    }

    #[test]
    fn letters_pass_through() {
        assert_eq!("lrswi".parse::<AclRights>().unwrap().to_string(), "lrswi");
    }

    #[test]
    fn invalid_letters_rejected() {
        assert!(matches!(
            "lrx".parse::<AclRights>(),
            Err(Error::InvalidArgument(_))
        ));
        assert!("".parse::<AclRights>().is_err());
        assert!("read write".parse::<AclRights>().is_err());
    }
}
