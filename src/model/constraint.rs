//! Dataflows and content constraints.

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

use super::common::Maintainable;
use super::key::Key;
use super::reference::Reference;
use crate::base::Identifier;

/// A dataflow: a named usage of a data structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dataflow {
    pub maintainable: Maintainable,
    /// The data structure this flow uses.
    pub structure: Reference,
}

impl Dataflow {
    pub fn identifier(&self) -> &Identifier {
        &self.maintainable.identifier
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConstraintRole {
    #[default]
    Allowed,
    Actual,
}

impl ConstraintRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintRole::Allowed => "Allowed",
            ConstraintRole::Actual => "Actual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Allowed" | "allowed" => Some(ConstraintRole::Allowed),
            "Actual" | "actual" => Some(ConstraintRole::Actual),
            _ => None,
        }
    }
}

/// Permitted (or excluded) values per dimension. A dimension absent from
/// `members` is unrestricted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubeRegion {
    pub included: bool,
    pub members: IndexMap<SmolStr, IndexSet<SmolStr>>,
}

impl Default for CubeRegion {
    fn default() -> Self {
        Self {
            included: true,
            members: IndexMap::new(),
        }
    }
}

impl CubeRegion {
    /// Builder: restrict a dimension to the given values.
    pub fn with_member<V: Into<SmolStr>>(
        mut self,
        dimension: impl Into<SmolStr>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.members.insert(
            dimension.into(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Whether every restricted dimension present in `key` takes a listed
    /// value.
    pub fn matches(&self, key: &Key) -> bool {
        self.members.iter().all(|(dim, values)| match key.get(dim) {
            Some(value) => values.contains(value),
            None => true,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentConstraint {
    pub maintainable: Maintainable,
    pub role: ConstraintRole,
    /// Dataflows or data structures the constraint applies to.
    pub attachments: Vec<Reference>,
    pub regions: Vec<CubeRegion>,
}

impl ContentConstraint {
    pub fn new(maintainable: Maintainable, role: ConstraintRole) -> Self {
        Self {
            maintainable,
            role,
            attachments: Vec::new(),
            regions: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.maintainable.identifier
    }

    /// Whether a key falls inside the constrained cube: it must match at
    /// least one included region (if any exist) and no excluded region.
    pub fn allows(&self, key: &Key) -> bool {
        let mut included = self.regions.iter().filter(|r| r.included).peekable();
        let inside = included.peek().is_none() || included.any(|r| r.matches(key));
        inside
            && !self
                .regions
                .iter()
                .filter(|r| !r.included)
                .any(|r| r.matches(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint() -> ContentConstraint {
        let mut c = ContentConstraint::new(
            Maintainable::new(Identifier::unversioned("ECB", "EXR_CONSTRAINTS")),
            ConstraintRole::Allowed,
        );
        c.regions.push(
            CubeRegion::default()
                .with_member("FREQ", ["A", "M"])
                .with_member("CURRENCY", ["CHF", "USD"]),
        );
        c.regions.push(CubeRegion {
            included: false,
            ..CubeRegion::default().with_member("CURRENCY", ["USD"])
        });
        c
    }

    #[test]
    fn test_allows_included_values() {
        let key: Key = [("FREQ", "A"), ("CURRENCY", "CHF")].into_iter().collect();
        assert!(constraint().allows(&key));
    }

    #[test]
    fn test_rejects_values_outside_region() {
        let key: Key = [("FREQ", "Q"), ("CURRENCY", "CHF")].into_iter().collect();
        assert!(!constraint().allows(&key));
    }

    #[test]
    fn test_excluded_region_wins() {
        let key: Key = [("FREQ", "A"), ("CURRENCY", "USD")].into_iter().collect();
        assert!(!constraint().allows(&key));
    }

    #[test]
    fn test_unrestricted_dimension() {
        let key: Key = [("FREQ", "M"), ("CURRENCY", "CHF"), ("REF_AREA", "DE")]
            .into_iter()
            .collect();
        assert!(constraint().allows(&key));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(ConstraintRole::parse("Actual"), Some(ConstraintRole::Actual));
        assert_eq!(ConstraintRole::parse("Other"), None);
    }
}
