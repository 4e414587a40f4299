//! Data sets: observations in flat or series-grouped form.
//!
//! ```text
//! DataSet
//! ├── attributes            data set level values
//! ├── groups: [GroupKey]    partial keys with group level values
//! └── body
//!     ├── Flat([Observation])              dimensionAtObservation = AllDimensions
//!     └── Series([Series { key, attributes, [Observation] }])
//! ```
//!
//! In series form an observation's key holds only the dimension at
//! observation; the rest of its full key is the series key.

mod engine;
mod stream;
mod value;

pub use engine::{
    DatasetEngine, RawDataSet, RawGroup, RawObservation, RawSeries, build_dataset,
};
pub use stream::ObservationStream;
pub use value::ObsValue;

pub use crate::model::Key;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::{DataStructureDefinition, DimensionAtObservation, ItemScheme, Reference};

/// Attribute values by attribute id.
pub type AttributeValues = IndexMap<SmolStr, String>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    pub key: Key,
    pub value: ObsValue,
    pub attributes: AttributeValues,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Series {
    pub key: Key,
    pub attributes: AttributeValues,
    pub observations: Vec<Observation>,
}

/// Attribute values attached to a partial key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupKey {
    /// Group descriptor id, when the message names one.
    pub group_id: Option<SmolStr>,
    pub key: Key,
    pub attributes: AttributeValues,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSetBody {
    Flat(Vec<Observation>),
    Series(Vec<Series>),
}

#[derive(Clone, Debug)]
pub struct DataSet {
    /// The data structure the data set conforms to.
    pub structure: Reference,
    /// Dataflow the data was published under, if known.
    pub dataflow: Option<Reference>,
    pub action: Option<SmolStr>,
    pub dimension_at_observation: DimensionAtObservation,
    pub attributes: AttributeValues,
    pub groups: Vec<GroupKey>,
    pub body: DataSetBody,
    /// Problems found while building this data set.
    pub diagnostics: Vec<Diagnostic>,
}

/// Diagnostics do not take part in equality.
impl PartialEq for DataSet {
    fn eq(&self, other: &Self) -> bool {
        self.structure == other.structure
            && self.dataflow == other.dataflow
            && self.action == other.action
            && self.dimension_at_observation == other.dimension_at_observation
            && self.attributes == other.attributes
            && self.groups == other.groups
            && self.body == other.body
    }
}

impl DataSet {
    pub fn is_flat(&self) -> bool {
        matches!(self.body, DataSetBody::Flat(_))
    }

    /// Series in document order; empty for flat data sets.
    pub fn series(&self) -> &[Series] {
        match &self.body {
            DataSetBody::Series(series) => series,
            DataSetBody::Flat(_) => &[],
        }
    }

    /// Flat observations; empty for series data sets.
    pub fn flat_observations(&self) -> &[Observation] {
        match &self.body {
            DataSetBody::Flat(obs) => obs,
            DataSetBody::Series(_) => &[],
        }
    }

    pub fn observation_count(&self) -> usize {
        match &self.body {
            DataSetBody::Flat(obs) => obs.len(),
            DataSetBody::Series(series) => series.iter().map(|s| s.observations.len()).sum(),
        }
    }

    /// Lazily flatten into observations carrying their full key in
    /// descriptor order, with series attributes merged into each
    /// observation's attributes.
    pub fn iter_flat<'a>(
        &'a self,
        dsd: &'a DataStructureDefinition,
    ) -> Box<dyn Iterator<Item = Observation> + 'a> {
        match &self.body {
            DataSetBody::Flat(obs) => Box::new(obs.iter().map(move |o| Observation {
                key: canonical_key(dsd, &o.key),
                value: o.value.clone(),
                attributes: o.attributes.clone(),
            })),
            DataSetBody::Series(series) => Box::new(series.iter().flat_map(move |s| {
                s.observations.iter().map(move |o| {
                    let mut attributes = s.attributes.clone();
                    attributes.extend(o.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
                    Observation {
                        key: canonical_key(dsd, &s.key.merged(&o.key)),
                        value: o.value.clone(),
                        attributes,
                    }
                })
            })),
        }
    }

    /// Rebuild the data set for a different dimension at observation.
    ///
    /// Attribute values move to the level their declaration implies under
    /// the new grouping. `obs_order` orders observations within a series
    /// when the new observation dimension is coded.
    pub fn regroup(
        &self,
        dsd: &DataStructureDefinition,
        dimension_at_observation: DimensionAtObservation,
        obs_order: Option<&ItemScheme>,
    ) -> Result<DataSet> {
        let raw = RawDataSet {
            structure: self.structure.clone(),
            dataflow: self.dataflow.clone(),
            action: self.action.clone(),
            attributes: self.attributes.clone(),
            groups: self
                .groups
                .iter()
                .map(|g| RawGroup {
                    group_id: g.group_id.clone(),
                    key: g.key.clone(),
                    attributes: g.attributes.clone(),
                })
                .collect(),
            series: Vec::new(),
            observations: self
                .iter_flat(dsd)
                .map(|o| RawObservation {
                    key: o.key,
                    value: o.value,
                    attributes: o.attributes,
                })
                .collect(),
        };
        let mut engine = DatasetEngine::new(dsd).relocating();
        if let Some(order) = obs_order {
            engine = engine.with_obs_order(order);
        }
        let mut out = engine.build(raw, dimension_at_observation)?;
        let mut diagnostics = self.diagnostics.clone();
        diagnostics.append(&mut out.diagnostics);
        out.diagnostics = diagnostics;
        Ok(out)
    }
}

/// Key with the structure's dimensions first, in descriptor order, followed
/// by any dimensions the structure does not declare.
pub(crate) fn canonical_key(dsd: &DataStructureDefinition, key: &Key) -> Key {
    let mut out = Key::new();
    for id in dsd.dimensions.ids() {
        if let Some(value) = key.get(id) {
            out.insert(id, value);
        }
    }
    for (id, value) in key.iter() {
        if !dsd.dimensions.contains(id) {
            out.insert(id, value);
        }
    }
    out
}
