//! Storage quota figures.

use serde::Serialize;

/// Storage usage of a quota root, in the server's units (kilobytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Quota {
    /// No storage limit is configured.
    Unset,
    /// A storage limit is configured.
    Set {
        /// Storage in use.
        used: u64,
        /// Storage limit.
        total: u64,
    },
}

impl Quota {
    /// Storage in use, zero when unset.
    #[must_use]
    pub const fn used(&self) -> u64 {
        match self {
            Self::Unset => 0,
            Self::Set { used, .. } => *used,
        }
    }

    /// Storage limit, zero when unset.
    #[must_use]
    pub const fn total(&self) -> u64 {
        match self {
            Self::Unset => 0,
            Self::Set { total, .. } => *total,
        }
    }

    /// Percentage of the limit in use, rounded to two decimals.
    ///
    /// Zero when no limit is set or the limit is zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        match *self {
            Self::Set { used, total } if total > 0 => {
                let raw = used as f64 / total as f64 * 100.0;
                (raw * 100.0).round() / 100.0
            }
            _ => 0.0,
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
    clippy::similar_names,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    #[test]
    fn unset_is_all_zero() {
        assert_eq!(Quota::Unset.used(), 0);
        assert_eq!(Quota::Unset.total(), 0);
        assert_eq!(Quota::Unset.percent(), 0.0);
    }

    #[test]
    fn percent_rounds_to_two_places() {
        let quota = Quota::Set {
            used: 7,
            total: 5000,
        };
        assert_eq!(quota.percent(), 0.14);

        let quota = Quota::Set { used: 1, total: 3 };
        assert_eq!(quota.percent(), 33.33);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        let quota = Quota::Set { used: 12, total: 0 };
        assert_eq!(quota.percent(), 0.0);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Quota::Set { used: 7, total: 10 }).unwrap();
        assert_eq!(json["kind"], "set");
        assert_eq!(json["used"], 7);
    }
}
