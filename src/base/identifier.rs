//! Maintainable artefact identity and version ordering.

use std::cmp::Ordering;
use std::fmt;

use smol_str::SmolStr;

/// Version assumed when a reference or artefact omits one.
pub const DEFAULT_VERSION: &str = "1.0";

/// Version strings that select the highest registered version.
const WILDCARD_VERSIONS: [&str; 3] = ["latest", "*", ""];

/// Identity of a maintainable artefact: `(agency, id, version)`.
///
/// Two artefacts of the same kind with equal identifiers are the same
/// artefact; the [`ResolutionIndex`](crate::index::ResolutionIndex) refuses
/// to hold two different definitions under one identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    pub agency_id: SmolStr,
    pub id: SmolStr,
    pub version: SmolStr,
}

impl Identifier {
    pub fn new(
        agency_id: impl Into<SmolStr>,
        id: impl Into<SmolStr>,
        version: impl Into<SmolStr>,
    ) -> Self {
        Self {
            agency_id: agency_id.into(),
            id: id.into(),
            version: version.into(),
        }
    }

    /// An identifier with the default version `1.0`.
    pub fn unversioned(agency_id: impl Into<SmolStr>, id: impl Into<SmolStr>) -> Self {
        Self::new(agency_id, id, DEFAULT_VERSION)
    }

    /// Whether the version selects "highest available" rather than a
    /// concrete version.
    pub fn is_version_wildcard(&self) -> bool {
        WILDCARD_VERSIONS.contains(&self.version.as_str())
    }

    /// Same agency and id, ignoring version.
    pub fn same_artefact(&self, other: &Identifier) -> bool {
        self.agency_id == other.agency_id && self.id == other.id
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({})", self.agency_id, self.id, self.version)
    }
}

/// Compare two version strings.
///
/// Versions are split on `.` and compared component by component. Components
/// that are both plain integers compare numerically; an integer component
/// sorts before a non-integer one; anything else compares lexically. When
/// all shared components are equal the version with fewer components is
/// lower. Equal numeric values with different spellings (`01` vs `1`) are
/// ordered lexically so that the ordering agrees with string equality.
///
/// This is a total order over all strings, but only a best effort at
/// "semantic" ordering for versions that are not dotted integers.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = compare_component(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_component(l: &str, r: &str) -> Ordering {
    match (parse_numeric(l), parse_numeric(r)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| l.cmp(r)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => l.cmp(r),
    }
}

fn parse_numeric(component: &str) -> Option<u64> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    component.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_components_compare_numerically() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "10.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_shorter_version_is_lower() {
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1", "1.0"), Ordering::Less);
    }

    #[test]
    fn test_integers_sort_before_text() {
        assert_eq!(compare_versions("1.2", "1.2a"), Ordering::Less);
        assert_eq!(compare_versions("10", "1a"), Ordering::Less);
        assert_eq!(compare_versions("2", "1a"), Ordering::Less);
    }

    #[test]
    fn test_ordering_is_consistent_with_equality() {
        assert_eq!(compare_versions("1.01", "1.1"), Ordering::Less);
        assert_eq!(compare_versions("1.1", "1.01"), Ordering::Greater);
    }

    #[test]
    fn test_wildcard_versions() {
        assert!(Identifier::new("ECB", "CL_FREQ", "latest").is_version_wildcard());
        assert!(Identifier::new("ECB", "CL_FREQ", "*").is_version_wildcard());
        assert!(Identifier::new("ECB", "CL_FREQ", "").is_version_wildcard());
        assert!(!Identifier::unversioned("ECB", "CL_FREQ").is_version_wildcard());
    }

    #[test]
    fn test_display() {
        let id = Identifier::new("ECB", "ECB_EXR1", "1.0");
        assert_eq!(id.to_string(), "ECB:ECB_EXR1(1.0)");
    }
}
