//! SDMX-JSON data messages.
//!
//! Series and observations are addressed by colon-separated indexes into
//! the value lists of the message's structure section:
//!
//! ```text
//! structure.dimensions.series      = [FREQ{M,A}, CURRENCY{CHF,USD}]
//! structure.dimensions.observation = [TIME_PERIOD{2000-01,2000-02}]
//! dataSets[0].series["0:1"].observations["1"] = [1.6, 0]
//!   → FREQ=M CURRENCY=USD TIME_PERIOD=2000-02, value 1.6,
//!     first observation attribute = its value #0
//! ```
//!
//! An index the value lists cannot satisfy costs only what it addresses: the
//! series, the observation or the single attribute value is dropped and
//! reported.

use serde_json::Value;
use smol_str::SmolStr;

use super::document;
use crate::base::ArtefactKind;
use crate::dataset::{
    AttributeValues, Key, ObsValue, RawDataSet, RawGroup, RawObservation, RawSeries,
};
use crate::diagnostics::{Diagnostic, codes};
use crate::error::{Location, Result, SdmxError};
use crate::index::ResolutionIndex;
use crate::message::{HeaderStructure, MessageKind};
use crate::model::{DimensionAtObservation, DimensionKind, Reference, TIME_PERIOD};
use crate::reader::provisional::{Level, ProvisionalStructure};
use crate::reader::{Document, PendingData};
use crate::wire;

pub(super) fn read_data(message: wire::DataMessage, supplied: &ResolutionIndex) -> Result<Document> {
    let mut doc = document(MessageKind::Data, message.meta, message.header);
    let (sections, data_sets) = match message.data {
        Some(body) => (body.structures, body.data_sets),
        None => (
            message.structure.into_iter().collect(),
            message.data_sets.unwrap_or_default(),
        ),
    };

    let sections = sections
        .iter()
        .enumerate()
        .map(|(i, s)| Section::new(s, i))
        .collect::<Result<Vec<_>>>()?;
    for section in &sections {
        doc.header.structures.push(HeaderStructure {
            structure_id: section.reference.target.id.clone(),
            structure: section.reference.clone(),
            dimension_at_observation: section.dim_at_obs.clone(),
        });
    }

    for (i, data_set) in data_sets.into_iter().enumerate() {
        let index = data_set.structure.unwrap_or(0);
        let section = sections.get(index).ok_or_else(|| {
            SdmxError::malformed(
                format!("data set refers to structure #{index}, message has {}", sections.len()),
                Location::path(format!("dataSets[{i}]")),
            )
        })?;
        let raw = section.data_set(data_set, i, &mut doc.diagnostics);
        let layout = (supplied.structure_of(&raw.structure).is_none()).then(|| section.layout());
        doc.data.push(PendingData {
            raw,
            dimension_at_observation: section.dim_at_obs.clone(),
            layout,
        });
    }
    Ok(doc)
}

/// A structure section prepared for decoding data sets.
struct Section<'a> {
    source: &'a wire::DataStructureSection,
    reference: Reference,
    dim_at_obs: DimensionAtObservation,
}

impl<'a> Section<'a> {
    fn new(source: &'a wire::DataStructureSection, index: usize) -> Result<Self> {
        let reference = source
            .links
            .iter()
            .filter_map(|l| l.urn.as_deref())
            .map(Reference::from_urn_str)
            .find(|r| {
                r.as_ref().map_or(true, |r| {
                    matches!(r.kind, ArtefactKind::DataStructure | ArtefactKind::Dataflow)
                })
            })
            .transpose()?
            .ok_or_else(|| {
                SdmxError::missing(
                    "data structure link",
                    Location::path(format!("structures[{index}]/links")),
                )
            })?;

        let dims = &source.dimensions;
        let dim_at_obs = match &source.dimension_at_observation {
            Some(declared) => DimensionAtObservation::parse(declared),
            None if !dims.series.is_empty() && dims.observation.len() == 1 => {
                DimensionAtObservation::Dimension(SmolStr::new(&dims.observation[0].id))
            }
            None => DimensionAtObservation::AllDimensions,
        };
        Ok(Self {
            source,
            reference,
            dim_at_obs,
        })
    }

    /// The layout the section declares, for when no structure is available.
    fn layout(&self) -> ProvisionalStructure {
        let mut layout = ProvisionalStructure::new(self.reference.target.clone());
        let dims = &self.source.dimensions;
        let mut ordered: Vec<(usize, usize, &wire::Component)> = dims
            .data_set
            .iter()
            .chain(&dims.series)
            .chain(&dims.observation)
            .enumerate()
            .map(|(i, c)| (c.key_position.unwrap_or(usize::MAX), i, c))
            .collect();
        ordered.sort_by_key(|(position, i, _)| (*position, *i));
        for (_, _, component) in ordered {
            let kind = if component.role.as_deref() == Some("time") || component.id == TIME_PERIOD {
                DimensionKind::Time
            } else {
                DimensionKind::Dimension
            };
            layout.declare_dimension(component.id.as_str(), kind);
        }
        let attrs = &self.source.attributes;
        for (components, level) in [
            (&attrs.data_set, Level::DataSet),
            (&attrs.series, Level::Series),
            (&attrs.observation, Level::Observation),
        ] {
            for component in components {
                layout.declare_attribute(component.id.as_str(), level.clone());
            }
        }
        layout
    }

    fn data_set(&self, data_set: wire::DataSet, i: usize, diagnostics: &mut Vec<Diagnostic>) -> RawDataSet {
        let path = format!("dataSets[{i}]");
        let mut raw = RawDataSet::new(self.reference.clone());
        raw.action = data_set.action.map(SmolStr::from);
        raw.attributes = attribute_values(
            &self.source.attributes.data_set,
            indexes(&data_set.attributes),
            &path,
            diagnostics,
        );

        // Data set level dimensions take their only value.
        let fixed: Key = self
            .source
            .dimensions
            .data_set
            .iter()
            .filter_map(|c| Some((c.id.as_str(), c.values.first()?.lexical()?)))
            .collect();

        for (series_key, series) in &data_set.series {
            let path = format!("{path}/series/{series_key}");
            let key = match decode_key(&self.source.dimensions.series, series_key, &path) {
                Ok(key) => fixed.merged(&key),
                Err(diagnostic) => {
                    dropped(diagnostics, diagnostic);
                    continue;
                }
            };
            let attributes = attribute_values(
                &self.source.attributes.series,
                indexes(&series.attributes),
                &path,
                diagnostics,
            );
            let observations = series
                .observations
                .iter()
                .filter_map(|(obs_key, array)| self.observation(obs_key, array, &path, diagnostics))
                .collect();
            raw.series.push(RawSeries {
                key,
                attributes,
                observations,
            });
        }
        for (obs_key, array) in &data_set.observations {
            if let Some(mut obs) = self.observation(obs_key, array, &path, diagnostics) {
                obs.key = fixed.merged(&obs.key);
                raw.observations.push(obs);
            }
        }
        for (group_key, attribute_indexes) in &data_set.dimension_group_attributes {
            let path = format!("{path}/dimensionGroupAttributes/{group_key}");
            let key = match self.decode_group_key(group_key, &path) {
                Ok(key) => key,
                Err(diagnostic) => {
                    dropped(diagnostics, diagnostic);
                    continue;
                }
            };
            raw.groups.push(RawGroup {
                group_id: None,
                key,
                attributes: attribute_values(
                    &self.source.attributes.dimension_group,
                    indexes(attribute_indexes),
                    &path,
                    diagnostics,
                ),
            });
        }
        raw
    }

    /// A partial key over the series and observation dimensions. Empty
    /// positions leave their dimension out of the key.
    fn decode_group_key(&self, key: &str, path: &str) -> std::result::Result<Key, Diagnostic> {
        let dims = &self.source.dimensions;
        let components: Vec<&wire::Component> = dims.series.iter().chain(&dims.observation).collect();
        let positions: Vec<&str> = key.split(':').collect();
        if positions.len() != components.len() {
            return Err(arity_mismatch(key, positions.len(), components.len(), path));
        }
        let mut out = Key::new();
        for (position, component) in positions.into_iter().zip(components) {
            if position.is_empty() {
                continue;
            }
            out.insert(component.id.as_str(), decode_position(position, component, path)?);
        }
        Ok(out)
    }

    fn observation(
        &self,
        key: &str,
        array: &[Value],
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<RawObservation> {
        let path = format!("{path}/observations/{key}");
        let key = match decode_key(&self.source.dimensions.observation, key, &path) {
            Ok(key) => key,
            Err(diagnostic) => {
                dropped(diagnostics, diagnostic);
                return None;
            }
        };
        let value = match array.first() {
            None | Some(Value::Null) => ObsValue::Missing,
            Some(Value::Number(n)) => ObsValue::from_lexical(&n.to_string()),
            Some(Value::String(s)) if s.is_empty() => ObsValue::Missing,
            Some(Value::String(s)) => ObsValue::Text(s.clone()),
            Some(other) => ObsValue::Text(other.to_string()),
        };
        Some(RawObservation {
            key,
            value,
            attributes: attribute_values(
                &self.source.attributes.observation,
                array.iter().skip(1).cloned(),
                &path,
                diagnostics,
            ),
        })
    }
}

fn dropped(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!(%diagnostic, "undecodable key");
    diagnostics.push(diagnostic);
}

fn arity_mismatch(key: &str, found: usize, expected: usize, path: &str) -> Diagnostic {
    Diagnostic::warning(format!(
        "key {key:?} has {found} position(s), structure has {expected} dimension(s); dropped"
    ))
    .with_code(codes::KEY_ARITY_MISMATCH)
    .with_location(Location::path(path))
}

fn bad_index(what: &str, position: &str, path: &str) -> Diagnostic {
    Diagnostic::warning(format!("no value #{position} for {what}; dropped"))
        .with_code(codes::BAD_VALUE_INDEX)
        .with_location(Location::path(path))
}

/// Decode a `0:1:...` index key against the components it addresses.
fn decode_key(components: &[wire::Component], key: &str, path: &str) -> std::result::Result<Key, Diagnostic> {
    if components.is_empty() {
        return Ok(Key::new());
    }
    let positions: Vec<&str> = key.split(':').collect();
    if positions.len() != components.len() {
        return Err(arity_mismatch(key, positions.len(), components.len(), path));
    }
    let mut out = Key::new();
    for (position, component) in positions.into_iter().zip(components) {
        out.insert(component.id.as_str(), decode_position(position, component, path)?);
    }
    Ok(out)
}

fn decode_position(
    position: &str,
    component: &wire::Component,
    path: &str,
) -> std::result::Result<String, Diagnostic> {
    position
        .parse::<usize>()
        .ok()
        .and_then(|i| component.values.get(i))
        .and_then(wire::ComponentValue::lexical)
        .ok_or_else(|| bad_index(&format!("dimension {}", component.id), position, path))
}

fn indexes(list: &[Option<usize>]) -> impl Iterator<Item = Value> + '_ {
    list.iter().map(|i| i.map_or(Value::Null, Value::from))
}

/// Resolve attribute value indexes. `null` means no value.
fn attribute_values(
    components: &[wire::Component],
    indexes: impl Iterator<Item = Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> AttributeValues {
    let mut out = AttributeValues::new();
    for (component, index) in components.iter().zip(indexes) {
        let value = match &index {
            Value::Null => continue,
            Value::Number(n) => n
                .as_u64()
                .and_then(|i| component.values.get(usize::try_from(i).ok()?))
                .and_then(wire::ComponentValue::lexical),
            _ => None,
        };
        match value {
            Some(value) => {
                out.insert(SmolStr::new(&component.id), value);
            }
            None => dropped(
                diagnostics,
                bad_index(&format!("attribute {}", component.id), &index.to_string(), path),
            ),
        }
    }
    out
}
