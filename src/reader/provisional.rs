//! Data structures reconstructed from data messages.
//!
//! Generic SDMX-ML and SDMX-JSON data do not embed their structure. When the
//! caller does not supply it, the reader rebuilds a stand-in from what the
//! data shows: dimension order from keys, attribute levels from where the
//! values sit. The result is marked as an external reference so writers
//! never emit it as a definition.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::Identifier;
use crate::dataset::RawDataSet;
use crate::error::{Location, Result, SdmxError};
use crate::model::{
    AttributeRelationship, DataAttribute, DataStructureDefinition, Dimension, DimensionAtObservation,
    DimensionDescriptor, DimensionKind, GroupDimensionDescriptor, Maintainable, TIME_PERIOD,
};

/// Where an attribute was first seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Level {
    DataSet,
    Group(SmolStr),
    Series,
    Observation,
}

#[derive(Clone, Debug)]
pub(crate) struct ProvisionalStructure {
    identifier: Identifier,
    dimensions: IndexMap<SmolStr, DimensionKind>,
    obs_dimension: Option<SmolStr>,
    groups: IndexMap<SmolStr, Vec<SmolStr>>,
    attributes: IndexMap<SmolStr, Level>,
}

impl ProvisionalStructure {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            dimensions: IndexMap::new(),
            obs_dimension: None,
            groups: IndexMap::new(),
            attributes: IndexMap::new(),
        }
    }

    /// Declare a dimension ahead of the data. The first declaration wins.
    pub fn declare_dimension(&mut self, id: impl Into<SmolStr>, kind: DimensionKind) {
        self.dimensions.entry(id.into()).or_insert(kind);
    }

    pub fn declare_attribute(&mut self, id: impl Into<SmolStr>, level: Level) {
        self.attributes.entry(id.into()).or_insert(level);
    }

    fn dimension(&mut self, id: &str) {
        if !self.dimensions.contains_key(id) {
            let kind = if id == TIME_PERIOD {
                DimensionKind::Time
            } else {
                DimensionKind::Dimension
            };
            self.dimensions.insert(SmolStr::new(id), kind);
        }
    }

    /// Extend the layout with everything a raw data set carries.
    pub fn observe(&mut self, raw: &RawDataSet, dim_at_obs: &DimensionAtObservation) {
        if let Some(dim) = dim_at_obs.dimension() {
            self.obs_dimension.get_or_insert_with(|| SmolStr::new(dim));
        }
        for id in raw.attributes.keys() {
            self.declare_attribute(id.clone(), Level::DataSet);
        }
        for group in &raw.groups {
            let group_id = group
                .group_id
                .clone()
                .unwrap_or_else(|| SmolStr::new("Group"));
            self.groups
                .entry(group_id.clone())
                .or_insert_with(|| group.key.dimensions().map(SmolStr::new).collect());
            for id in group.attributes.keys() {
                self.declare_attribute(id.clone(), Level::Group(group_id.clone()));
            }
        }
        for series in &raw.series {
            for dim in series.key.dimensions() {
                self.dimension(dim);
            }
            for id in series.attributes.keys() {
                self.declare_attribute(id.clone(), Level::Series);
            }
            for obs in &series.observations {
                for dim in obs.key.dimensions() {
                    self.dimension(dim);
                }
                for id in obs.attributes.keys() {
                    self.declare_attribute(id.clone(), Level::Observation);
                }
            }
        }
        for obs in &raw.observations {
            for dim in obs.key.dimensions() {
                self.dimension(dim);
            }
            for id in obs.attributes.keys() {
                self.declare_attribute(id.clone(), Level::Observation);
            }
        }
    }

    /// Build the stand-in structure. The dimension at observation, when
    /// known, becomes the last dimension.
    pub fn build(mut self) -> Result<DataStructureDefinition> {
        if let Some(obs_dim) = &self.obs_dimension {
            if let Some(kind) = self.dimensions.shift_remove(obs_dim) {
                self.dimensions.insert(obs_dim.clone(), kind);
            }
        }
        let dimensions = DimensionDescriptor::new(self.dimensions.iter().map(|(id, kind)| {
            let mut dim = Dimension::new(id.clone());
            dim.kind = *kind;
            dim
        }))
        .map_err(|e| {
            SdmxError::malformed(
                format!("cannot reconstruct {}: {e}", self.identifier),
                Location::path("DataSet"),
            )
        })?;

        let series_dims: Vec<SmolStr> = self
            .dimensions
            .keys()
            .filter(|id| Some(*id) != self.obs_dimension.as_ref())
            .cloned()
            .collect();

        let mut maintainable = Maintainable::new(self.identifier.clone());
        maintainable.is_external_reference = true;
        let mut dsd = DataStructureDefinition::new(maintainable, dimensions);
        for (id, dims) in self.groups {
            dsd = dsd.with_group(GroupDimensionDescriptor::new(id, dims));
        }
        for (id, level) in self.attributes {
            let relationship = match level {
                Level::DataSet => AttributeRelationship::DataSet,
                Level::Group(group) => AttributeRelationship::Group(group),
                Level::Series => AttributeRelationship::Dimensions {
                    dimensions: series_dims.clone(),
                    attachment_group: None,
                },
                Level::Observation => AttributeRelationship::Observation,
            };
            dsd = dsd.with_attribute(DataAttribute::new(id, relationship));
        }
        tracing::debug!(
            structure = %dsd.identifier(),
            dimensions = dsd.dimensions.len(),
            attributes = dsd.attributes.len(),
            "reconstructed structure from data"
        );
        Ok(dsd)
    }
}
