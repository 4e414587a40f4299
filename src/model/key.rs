//! Series and observation keys.

use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Mapping from dimension id to dimension value.
///
/// Keys built through [`DataStructureDefinition::make_key`] list dimensions
/// in descriptor order. Equality ignores order.
///
/// [`DataStructureDefinition::make_key`]: crate::model::DataStructureDefinition::make_key
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Key(IndexMap<SmolStr, SmolStr>);

impl Key {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.0.get(dimension).map(SmolStr::as_str)
    }

    pub fn insert(&mut self, dimension: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        self.0.insert(dimension.into(), value.into());
    }

    pub fn contains(&self, dimension: &str) -> bool {
        self.0.contains_key(dimension)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(SmolStr::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(SmolStr::as_str)
    }

    /// Union of two keys; entries of `other` win on conflict.
    pub fn merged(&self, other: &Key) -> Key {
        let mut out = self.clone();
        for (k, v) in &other.0 {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }
}

impl<K: Into<SmolStr>, V: Into<SmolStr>> FromIterator<(K, V)> for Key {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Key(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

/// Dot-separated values in key order, e.g. `M.CHF.EUR.SP00.A`.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.values().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(value)?;
        }
        Ok(())
    }
}
