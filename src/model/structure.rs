//! Data structure definitions and their components.
//!
//! ## Design
//!
//! ```text
//! DataStructureDefinition
//! ├── dimensions: DimensionDescriptor   (ordered, immutable once built)
//! ├── groups:     IndexMap<id, GroupDimensionDescriptor>
//! ├── attributes: IndexMap<id, DataAttribute>
//! └── measure:    PrimaryMeasure
//! ```
//!
//! The attachment level of an attribute is not stored. It is derived from
//! the declared [`AttributeRelationship`] and the data set's
//! [`DimensionAtObservation`], see [`DataAttribute::attachment_level`].

use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::common::{Identifiable, Maintainable};
use super::key::Key;
use super::reference::Reference;
use crate::base::Identifier;
use crate::error::{Location, Result, SdmxError};

/// Id of the time dimension in cross-domain structures.
pub const TIME_PERIOD: &str = "TIME_PERIOD";

/// Id of the primary measure.
pub const OBS_VALUE: &str = "OBS_VALUE";

// ============================================================================
// REPRESENTATION
// ============================================================================

/// Non-enumerated representation: a text type plus facets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextFormat {
    pub text_type: Option<SmolStr>,
    /// Other facets (`maxLength`, `pattern`, ...) by name.
    pub facets: IndexMap<SmolStr, String>,
}

/// How values of a concept or component are represented.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Representation {
    /// Codelist (or concept scheme) enumerating the allowed values.
    pub enumeration: Option<Reference>,
    pub text_format: Option<TextFormat>,
}

impl Representation {
    pub fn enumerated(codelist: Reference) -> Self {
        Self {
            enumeration: Some(codelist),
            text_format: None,
        }
    }

    pub fn text(text_type: impl Into<SmolStr>) -> Self {
        Self {
            enumeration: None,
            text_format: Some(TextFormat {
                text_type: Some(text_type.into()),
                facets: IndexMap::new(),
            }),
        }
    }
}

// ============================================================================
// DIMENSIONS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Dimension,
    Time,
    Measure,
}

/// A key component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub base: Identifiable,
    pub kind: DimensionKind,
    /// Concept identity. Absent only on structures reconstructed from data.
    pub concept: Option<Reference>,
    pub local_representation: Option<Representation>,
}

impl Dimension {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self {
            base: Identifiable::new(id),
            kind: DimensionKind::Dimension,
            concept: None,
            local_representation: None,
        }
    }

    pub fn time(id: impl Into<SmolStr>) -> Self {
        Self {
            kind: DimensionKind::Time,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn with_concept(mut self, concept: Reference) -> Self {
        self.concept = Some(concept);
        self
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.local_representation = Some(representation);
        self
    }

    /// Codelist enumerating this dimension, from its local representation.
    pub fn enumeration(&self) -> Option<&Reference> {
        self.local_representation
            .as_ref()
            .and_then(|r| r.enumeration.as_ref())
    }
}

/// Ordered list of dimensions. Order is fixed at construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionDescriptor {
    dimensions: IndexMap<SmolStr, Dimension>,
}

impl DimensionDescriptor {
    /// Build from dimensions in key order. Ids must be unique.
    pub fn new(dimensions: impl IntoIterator<Item = Dimension>) -> Result<Self> {
        let mut map = IndexMap::new();
        for dimension in dimensions {
            let id = dimension.base.id.clone();
            if map.insert(id.clone(), dimension).is_some() {
                return Err(SdmxError::malformed(
                    format!("duplicate dimension id {id}"),
                    Location::path("DimensionList"),
                ));
            }
        }
        Ok(Self { dimensions: map })
    }

    pub fn get(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.get(id)
    }

    /// Zero-based key position of a dimension.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.dimensions.get_index_of(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dimensions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.dimensions.keys().map(SmolStr::as_str)
    }

    pub fn time_dimension(&self) -> Option<&Dimension> {
        self.dimensions
            .values()
            .find(|d| d.kind == DimensionKind::Time)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Dimension> {
        self.dimensions.values_mut()
    }
}

/// A named subset of dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDimensionDescriptor {
    pub base: Identifiable,
    pub dimensions: Vec<SmolStr>,
}

impl GroupDimensionDescriptor {
    pub fn new(id: impl Into<SmolStr>, dimensions: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            base: Identifiable::new(id),
            dimensions: dimensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }
}

// ============================================================================
// DIMENSION AT OBSERVATION
// ============================================================================

/// Which dimension varies within a series.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DimensionAtObservation {
    /// Flat data: every observation carries its full key.
    AllDimensions,
    /// Series data grouped on all other dimensions.
    Dimension(SmolStr),
}

impl DimensionAtObservation {
    pub const ALL_DIMENSIONS: &'static str = "AllDimensions";

    pub fn parse(s: &str) -> Self {
        if s == Self::ALL_DIMENSIONS {
            DimensionAtObservation::AllDimensions
        } else {
            DimensionAtObservation::Dimension(SmolStr::new(s))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DimensionAtObservation::AllDimensions => Self::ALL_DIMENSIONS,
            DimensionAtObservation::Dimension(id) => id,
        }
    }

    pub fn dimension(&self) -> Option<&str> {
        match self {
            DimensionAtObservation::AllDimensions => None,
            DimensionAtObservation::Dimension(id) => Some(id),
        }
    }

    pub fn time_period() -> Self {
        DimensionAtObservation::Dimension(SmolStr::new_static(TIME_PERIOD))
    }
}

impl fmt::Display for DimensionAtObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// What an attribute is declared to relate to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeRelationship {
    /// One value per data set.
    DataSet,
    /// One value per group key of the named group.
    Group(SmolStr),
    /// One value per combination of the named dimensions.
    Dimensions {
        dimensions: Vec<SmolStr>,
        attachment_group: Option<SmolStr>,
    },
    /// One value per observation (related to the primary measure).
    Observation,
}

/// Where an attribute value is carried in a data set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentLevel {
    DataSet,
    Group,
    Series,
    Observation,
}

impl fmt::Display for AttachmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttachmentLevel::DataSet => "data set",
            AttachmentLevel::Group => "group",
            AttachmentLevel::Series => "series",
            AttachmentLevel::Observation => "observation",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UsageStatus {
    Mandatory,
    #[default]
    Conditional,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Mandatory => "Mandatory",
            UsageStatus::Conditional => "Conditional",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataAttribute {
    pub base: Identifiable,
    pub concept: Option<Reference>,
    pub local_representation: Option<Representation>,
    pub relationship: AttributeRelationship,
    pub usage: UsageStatus,
}

impl DataAttribute {
    pub fn new(id: impl Into<SmolStr>, relationship: AttributeRelationship) -> Self {
        Self {
            base: Identifiable::new(id),
            concept: None,
            local_representation: None,
            relationship,
            usage: UsageStatus::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn with_concept(mut self, concept: Reference) -> Self {
        self.concept = Some(concept);
        self
    }

    /// Level at which values of this attribute are carried for the given
    /// dimension at observation.
    pub fn attachment_level(&self, dim_at_obs: &DimensionAtObservation) -> AttachmentLevel {
        match &self.relationship {
            AttributeRelationship::DataSet => AttachmentLevel::DataSet,
            AttributeRelationship::Group(_) => AttachmentLevel::Group,
            AttributeRelationship::Observation => AttachmentLevel::Observation,
            AttributeRelationship::Dimensions { dimensions, .. } => match dim_at_obs {
                DimensionAtObservation::AllDimensions => AttachmentLevel::Observation,
                DimensionAtObservation::Dimension(obs_dim) => {
                    if dimensions.iter().any(|d| d == obs_dim) {
                        AttachmentLevel::Observation
                    } else {
                        AttachmentLevel::Series
                    }
                }
            },
        }
    }

    /// Whether a value found at `found` is acceptable. Attributes with an
    /// attachment group may also be carried on that group.
    pub fn accepts(&self, found: AttachmentLevel, dim_at_obs: &DimensionAtObservation) -> bool {
        if found == self.attachment_level(dim_at_obs) {
            return true;
        }
        matches!(
            (&self.relationship, found),
            (
                AttributeRelationship::Dimensions {
                    attachment_group: Some(_),
                    ..
                },
                AttachmentLevel::Group
            )
        )
    }
}

// ============================================================================
// MEASURE
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryMeasure {
    pub base: Identifiable,
    pub concept: Option<Reference>,
    pub local_representation: Option<Representation>,
}

impl Default for PrimaryMeasure {
    fn default() -> Self {
        Self {
            base: Identifiable::new(OBS_VALUE),
            concept: None,
            local_representation: None,
        }
    }
}

// ============================================================================
// DATA STRUCTURE DEFINITION
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataStructureDefinition {
    pub maintainable: Maintainable,
    pub dimensions: DimensionDescriptor,
    pub groups: IndexMap<SmolStr, GroupDimensionDescriptor>,
    pub attributes: IndexMap<SmolStr, DataAttribute>,
    pub measure: PrimaryMeasure,
}

impl DataStructureDefinition {
    pub fn new(maintainable: Maintainable, dimensions: DimensionDescriptor) -> Self {
        Self {
            maintainable,
            dimensions,
            groups: IndexMap::new(),
            attributes: IndexMap::new(),
            measure: PrimaryMeasure::default(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.maintainable.identifier
    }

    /// Builder: add an attribute.
    pub fn with_attribute(mut self, attribute: DataAttribute) -> Self {
        self.attributes.insert(attribute.base.id.clone(), attribute);
        self
    }

    /// Builder: add a group.
    pub fn with_group(mut self, group: GroupDimensionDescriptor) -> Self {
        self.groups.insert(group.base.id.clone(), group);
        self
    }

    pub fn dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.get(id)
    }

    pub fn attribute(&self, id: &str) -> Option<&DataAttribute> {
        self.attributes.get(id)
    }

    pub fn group(&self, id: &str) -> Option<&GroupDimensionDescriptor> {
        self.groups.get(id)
    }

    /// Build a key in descriptor order from an arbitrary mapping.
    ///
    /// The mapping must name exactly the structure's dimensions.
    pub fn make_key<K, V>(&self, mapping: impl IntoIterator<Item = (K, V)>) -> Result<Key>
    where
        K: Into<SmolStr>,
        V: Into<SmolStr>,
    {
        let given: IndexMap<SmolStr, SmolStr> = mapping
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let mismatch = || SdmxError::KeyArityMismatch {
            structure: self.identifier().clone(),
            expected: self.dimensions.len(),
            found: given.len(),
        };
        if given.len() != self.dimensions.len() {
            return Err(mismatch());
        }
        let mut key = Key::new();
        for id in self.dimensions.ids() {
            let value = given.get(id).ok_or_else(mismatch)?;
            key.insert(id, value.clone());
        }
        Ok(key)
    }

    /// Dot-separated key in descriptor order with empty slots for missing
    /// dimensions, e.g. `A..EUR`.
    pub fn key_string(&self, key: &Key) -> String {
        self.dimensions
            .ids()
            .map(|id| key.get(id).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Attributes whose values sit at `level` for the given dimension at
    /// observation, in declaration order.
    pub fn attributes_at(
        &self,
        level: AttachmentLevel,
        dim_at_obs: &DimensionAtObservation,
    ) -> impl Iterator<Item = &DataAttribute> {
        self.attributes
            .values()
            .filter(move |a| a.attachment_level(dim_at_obs) == level)
    }
}
