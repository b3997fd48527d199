//! Ordinal qualifiers
//!
//! The suffix after the last `_` in an annotation key selects which replicas
//! the annotation applies to:
//!
//! | Expression | Meaning            |
//! |------------|--------------------|
//! | (empty)    | every replica      |
//! | `N-M`      | `N <= ordinal <= M`|
//! | `N`        | `ordinal == N`     |
//! | `N-`       | `ordinal >= N`     |
//! | `-M`       | `ordinal <= M`     |
//!
//! Only whole-string matches count. Anything else is malformed and matches no
//! replica; a bad qualifier never fails the request.

#[cfg(test)]
use mockall::automock;
use tracing::debug;

/// Parsed qualifier expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Qualifier {
    /// Empty expression: applies to every replica
    Any,
    /// `N-M`, inclusive on both ends
    Range {
        /// Lowest matching ordinal
        min: u64,
        /// Highest matching ordinal
        max: u64,
    },
    /// `N`
    Exact(u64),
    /// `N-`
    AtLeast(u64),
    /// `-M`
    AtMost(u64),
    /// Anything not in the grammar
    Malformed(String),
}

impl Qualifier {
    /// Parse an expression; never fails, unknown shapes become `Malformed`
    pub fn parse(expr: &str) -> Self {
        if expr.is_empty() {
            return Self::Any;
        }

        let parsed = match expr.split_once('-') {
            Some((lo, hi)) if is_number(lo) && is_number(hi) => Some(Self::Range {
                min: saturating_number(lo),
                max: saturating_number(hi),
            }),
            None if is_number(expr) => Some(Self::Exact(saturating_number(expr))),
            Some((lo, "")) if is_number(lo) => Some(Self::AtLeast(saturating_number(lo))),
            Some(("", hi)) if is_number(hi) => Some(Self::AtMost(saturating_number(hi))),
            _ => None,
        };

        parsed.unwrap_or_else(|| Self::Malformed(expr.to_string()))
    }

    /// Whether `ordinal` is in scope
    pub fn matches(&self, ordinal: u32) -> bool {
        let ordinal = u64::from(ordinal);
        match *self {
            Self::Any => true,
            Self::Range { min, max } => (min..=max).contains(&ordinal),
            Self::Exact(n) => ordinal == n,
            Self::AtLeast(min) => ordinal >= min,
            Self::AtMost(max) => ordinal <= max,
            Self::Malformed(_) => false,
        }
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse an all-digit string, clamping values beyond `u64::MAX`
///
/// Ordinals are `u32`, so a clamped bound compares the same way the exact
/// value would.
fn saturating_number(s: &str) -> u64 {
    s.parse::<u64>().unwrap_or(u64::MAX)
}

/// Decides whether a replica falls inside a qualifier expression
#[cfg_attr(test, automock)]
pub trait OrdinalMatcher: Send + Sync {
    /// True when `ordinal` satisfies `expr`
    fn matches(&self, ordinal: u32, expr: &str) -> bool;
}

/// The standard qualifier grammar
#[derive(Clone, Copy, Debug, Default)]
pub struct RangeQualifier;

impl OrdinalMatcher for RangeQualifier {
    fn matches(&self, ordinal: u32, expr: &str) -> bool {
        let qualifier = Qualifier::parse(expr);
        let matched = qualifier.matches(ordinal);
        debug!(ordinal, qualifier = %expr, parsed = ?qualifier, matched, "checked ordinal against qualifier");
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier_table() {
        let cases = [
            (5, "", true),
            (5, "5", true),
            (4, "5", false),
            (5, "1-10", true),
            (1, "1-10", true),
            (10, "1-10", true),
            (11, "1-10", false),
            (0, "1-10", false),
            (5, "5-", true),
            (4, "5-", false),
            (5, "-5", true),
            (6, "-5", false),
            (5, "not-a-qualifier", false),
        ];

        for (ordinal, expr, expected) in cases {
            assert_eq!(
                RangeQualifier.matches(ordinal, expr),
                expected,
                "matches({}, {:?})",
                ordinal,
                expr
            );
        }
    }

    #[test]
    fn parse_recognizes_every_form() {
        assert_eq!(Qualifier::parse(""), Qualifier::Any);
        assert_eq!(Qualifier::parse("12-34"), Qualifier::Range { min: 12, max: 34 });
        assert_eq!(Qualifier::parse("7"), Qualifier::Exact(7));
        assert_eq!(Qualifier::parse("3-"), Qualifier::AtLeast(3));
        assert_eq!(Qualifier::parse("-9"), Qualifier::AtMost(9));
    }

    /// Substring matches are not accepted: the whole expression must fit.
    #[test]
    fn unanchored_shapes_are_malformed() {
        for expr in ["a1-2", "1-2b", "1-2-3", "-", "--1", "1--", " 1", "1 ", "+1", "1_2", "x"] {
            assert_eq!(
                Qualifier::parse(expr),
                Qualifier::Malformed(expr.to_string()),
                "{:?} should be malformed",
                expr
            );
            assert!(!RangeQualifier.matches(0, expr));
            assert!(!RangeQualifier.matches(1, expr));
        }
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let q = Qualifier::parse("5-2");
        assert_eq!(q, Qualifier::Range { min: 5, max: 2 });
        assert!((0..10).all(|o| !q.matches(o)));
    }

    #[test]
    fn oversized_bounds_saturate() {
        assert!(RangeQualifier.matches(u32::MAX, "-99999999999999999999999"));
        assert!(!RangeQualifier.matches(u32::MAX, "99999999999999999999999-"));
        assert!(!RangeQualifier.matches(u32::MAX, "99999999999999999999999"));
        assert!(!RangeQualifier.matches(u32::MAX, "4294967296"));
    }

    #[test]
    fn multi_digit_ranges() {
        assert!(RangeQualifier.matches(15, "10-20"));
        assert!(!RangeQualifier.matches(21, "10-20"));
    }
}
