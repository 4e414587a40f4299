//! SDMX-JSON data messages.
//!
//! Each structure declaration becomes one structure section. The value
//! lists of a section are built from the data sets that use it, in the
//! order values are first met, and keys are written as colon-separated
//! indexes into those lists.
//!
//! Group keys only exist in generation 2, as `dimensionGroupAttributes`.
//! Generation 1 has nowhere to put them, so a data set with groups cannot be
//! written in it.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use smol_str::SmolStr;

use super::{header, place};
use crate::base::ArtefactKind;
use crate::dataset::{AttributeValues, DataSet, DataSetBody, GroupKey, Key, ObsValue, Observation};
use crate::error::{Result, SdmxError};
use crate::format::JsonVersion;
use crate::index::ResolutionIndex;
use crate::message::{HeaderStructure, Message};
use crate::model::{DataStructureDefinition, Dimension, DimensionKind};
use crate::options::WriterOptions;
use crate::wire::{self, DATA_SCHEMA_V1, DATA_SCHEMA_V2, write_text};
use crate::writer::{PreparedData, prepare};

/// Values of one component, in first-seen order.
type ValueList = IndexSet<String>;

pub(super) fn write_data(
    message: &Message,
    options: &WriterOptions,
    version: JsonVersion,
) -> Result<wire::DataMessage> {
    let prepared = prepare(message, options)?;

    // Declarations in use, in order of first use.
    let mut used: IndexSet<usize> = IndexSet::new();
    for data in &prepared.data {
        used.insert(data.structure);
    }
    if version == JsonVersion::V1 && used.len() > 1 {
        return Err(SdmxError::write(format!(
            "SDMX-JSON 1.0 data messages carry one structure, this message uses {}",
            used.len()
        )));
    }

    let mut sections = Vec::with_capacity(used.len());
    let mut data_sets = Vec::with_capacity(prepared.data.len());
    for (section_index, structure) in used.iter().enumerate() {
        let members: Vec<&PreparedData<'_>> =
            prepared.data.iter().filter(|d| d.structure == *structure).collect();
        let Some(first) = members.first() else {
            continue;
        };
        let mut layout = Layout::new(first.dsd, &first.data, &message.index, version);
        for data in &members {
            layout.collect(&data.data)?;
        }
        layout.order_attributes();

        for data in &members {
            let mut out = layout.data_set(&data.data)?;
            if version == JsonVersion::V2 {
                out.structure = Some(section_index);
            }
            data_sets.push(out);
        }
        sections.push(layout.section(&prepared.structures[*structure]));
    }

    let schema = match version {
        JsonVersion::V1 => DATA_SCHEMA_V1,
        JsonVersion::V2 => DATA_SCHEMA_V2,
    };
    let (meta, header) = place(header(&message.header, schema, version), version);
    let out = match version {
        JsonVersion::V1 => wire::DataMessage {
            meta,
            header,
            structure: sections.into_iter().next(),
            data_sets: Some(data_sets),
            data: None,
        },
        JsonVersion::V2 => wire::DataMessage {
            meta,
            header,
            structure: None,
            data_sets: None,
            data: Some(wire::DataBody {
                structures: sections,
                data_sets,
            }),
        },
    };
    Ok(out)
}

/// Layout and value lists of one structure section.
struct Layout<'a> {
    dsd: &'a DataStructureDefinition,
    index: &'a ResolutionIndex,
    version: JsonVersion,
    series_dims: Vec<&'a Dimension>,
    obs_dims: Vec<&'a Dimension>,
    dim_values: IndexMap<SmolStr, ValueList>,
    data_set_attrs: IndexMap<SmolStr, ValueList>,
    series_attrs: IndexMap<SmolStr, ValueList>,
    obs_attrs: IndexMap<SmolStr, ValueList>,
    group_attrs: IndexMap<SmolStr, ValueList>,
}

impl<'a> Layout<'a> {
    fn new(
        dsd: &'a DataStructureDefinition,
        data: &DataSet,
        index: &'a ResolutionIndex,
        version: JsonVersion,
    ) -> Self {
        let obs_dim = match &data.body {
            DataSetBody::Series(_) => data.dimension_at_observation.dimension(),
            DataSetBody::Flat(_) => None,
        };
        let (obs_dims, series_dims) = match obs_dim {
            Some(obs_dim) => dsd.dimensions.iter().partition(|d| d.id() == obs_dim),
            None => (dsd.dimensions.iter().collect(), Vec::new()),
        };
        Self {
            dsd,
            index,
            version,
            series_dims,
            obs_dims,
            dim_values: IndexMap::new(),
            data_set_attrs: IndexMap::new(),
            series_attrs: IndexMap::new(),
            obs_attrs: IndexMap::new(),
            group_attrs: IndexMap::new(),
        }
    }

    /// Gather the values a data set uses.
    fn collect(&mut self, data: &DataSet) -> Result<()> {
        if self.version == JsonVersion::V1 && !data.groups.is_empty() {
            return Err(SdmxError::write(format!(
                "SDMX-JSON 1.0 has no group keys, data set for {} has {}",
                data.structure,
                data.groups.len()
            )));
        }
        add_attributes(&mut self.data_set_attrs, &data.attributes);
        match &data.body {
            DataSetBody::Series(series) => {
                for s in series {
                    add_key(&mut self.dim_values, &self.series_dims, &s.key)?;
                    add_attributes(&mut self.series_attrs, &s.attributes);
                    for obs in &s.observations {
                        self.add_observation(obs)?;
                    }
                }
            }
            DataSetBody::Flat(observations) => {
                for obs in observations {
                    self.add_observation(obs)?;
                }
            }
        }
        for group in &data.groups {
            self.add_group(group)?;
        }
        Ok(())
    }

    /// Group keys may hold values no series uses.
    fn add_group(&mut self, group: &GroupKey) -> Result<()> {
        for (id, value) in group.key.iter() {
            if !self.key_dims().any(|d| d.id() == id) {
                return Err(SdmxError::write(format!(
                    "group key {} names {id}, which is not a dimension of {}",
                    group.key,
                    self.dsd.identifier()
                )));
            }
            self.dim_values
                .entry(SmolStr::new(id))
                .or_default()
                .insert(value.to_owned());
        }
        add_attributes(&mut self.group_attrs, &group.attributes);
        Ok(())
    }

    /// Dimensions a key position refers to: series, then observation.
    fn key_dims(&self) -> impl Iterator<Item = &&'a Dimension> + '_ {
        self.series_dims.iter().chain(&self.obs_dims)
    }

    fn add_observation(&mut self, obs: &Observation) -> Result<()> {
        add_key(&mut self.dim_values, &self.obs_dims, &obs.key)?;
        add_attributes(&mut self.obs_attrs, &obs.attributes);
        Ok(())
    }

    /// Declared attributes first, in structure order.
    fn order_attributes(&mut self) {
        let dsd = self.dsd;
        let rank = |id: &SmolStr| dsd.attributes.get_index_of(id).unwrap_or(usize::MAX);
        for level in [
            &mut self.data_set_attrs,
            &mut self.series_attrs,
            &mut self.obs_attrs,
            &mut self.group_attrs,
        ] {
            level.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
        }
    }

    fn data_set(&self, data: &DataSet) -> Result<wire::DataSet> {
        let mut out = wire::DataSet {
            action: data.action.as_ref().map(ToString::to_string),
            attributes: attribute_indexes(&self.data_set_attrs, &data.attributes),
            ..wire::DataSet::default()
        };
        match &data.body {
            DataSetBody::Series(series) => {
                for s in series {
                    let mut observations = IndexMap::new();
                    for obs in &s.observations {
                        observations.insert(self.encode_key(&self.obs_dims, &obs.key)?, self.observation(obs));
                    }
                    out.series.insert(
                        self.encode_key(&self.series_dims, &s.key)?,
                        wire::Series {
                            attributes: attribute_indexes(&self.series_attrs, &s.attributes),
                            observations,
                        },
                    );
                }
            }
            DataSetBody::Flat(observations) => {
                for obs in observations {
                    out.observations
                        .insert(self.encode_key(&self.obs_dims, &obs.key)?, self.observation(obs));
                }
            }
        }
        for group in &data.groups {
            out.dimension_group_attributes.insert(
                self.encode_group_key(&group.key),
                attribute_indexes(&self.group_attrs, &group.attributes),
            );
        }
        Ok(out)
    }

    /// `:1:` for a group open on the first and last dimension.
    fn encode_group_key(&self, key: &Key) -> String {
        let positions: Vec<String> = self
            .key_dims()
            .map(|dim| {
                key.get(dim.id())
                    .and_then(|value| self.dim_values.get(dim.id())?.get_index_of(value))
                    .map(|i| i.to_string())
                    .unwrap_or_default()
            })
            .collect();
        positions.join(":")
    }

    fn encode_key(&self, dims: &[&Dimension], key: &Key) -> Result<String> {
        let positions = dims
            .iter()
            .map(|dim| {
                key.get(dim.id())
                    .and_then(|value| self.dim_values.get(dim.id())?.get_index_of(value))
                    .map(|i| i.to_string())
                    .ok_or_else(|| missing_value(key, dim))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(positions.join(":"))
    }

    /// `[value, attribute index, ...]`.
    fn observation(&self, obs: &Observation) -> wire::ObservationArray {
        let value = match &obs.value {
            ObsValue::Number(n) => n
                .parse::<serde_json::Number>()
                .map_or_else(|_| Value::from(n.as_str()), Value::Number),
            ObsValue::Text(text) => Value::from(text.as_str()),
            ObsValue::Missing => Value::Null,
        };
        std::iter::once(value)
            .chain(
                attribute_indexes(&self.obs_attrs, &obs.attributes)
                    .into_iter()
                    .map(|i| i.map_or(Value::Null, Value::from)),
            )
            .collect()
    }

    fn section(&self, declaration: &HeaderStructure) -> wire::DataStructureSection {
        let reference = &declaration.structure;
        let rel = match reference.kind {
            ArtefactKind::Dataflow => "dataflow",
            _ => "datastructure",
        };
        let measures = (self.version == JsonVersion::V2).then(|| wire::Levels {
            observation: vec![wire::Component {
                id: self.dsd.measure.base.id.to_string(),
                ..wire::Component::default()
            }],
            ..wire::Levels::default()
        });
        wire::DataStructureSection {
            links: vec![wire::Link {
                urn: Some(reference.to_string()),
                rel: Some(rel.to_owned()),
                href: None,
            }],
            name: None,
            dimension_at_observation: Some(declaration.dimension_at_observation.to_string()),
            dimensions: wire::Levels {
                data_set: Vec::new(),
                series: self.series_dims.iter().map(|d| self.dimension(d)).collect(),
                observation: self.obs_dims.iter().map(|d| self.dimension(d)).collect(),
                dimension_group: Vec::new(),
            },
            attributes: wire::Levels {
                data_set: self.attributes(&self.data_set_attrs),
                series: self.attributes(&self.series_attrs),
                observation: self.attributes(&self.obs_attrs),
                dimension_group: self.attributes(&self.group_attrs),
            },
            measures,
        }
    }

    fn dimension(&self, dim: &Dimension) -> wire::Component {
        let codelist = dim.enumeration().and_then(|r| self.index.item_scheme(r));
        let values = self
            .dim_values
            .get(dim.id())
            .into_iter()
            .flatten()
            .map(|value| wire::ComponentValue {
                id: Some(value.clone()),
                name: codelist
                    .and_then(|cl| cl.get(value))
                    .and_then(|item| write_text(&item.base.name, self.version).0),
                value: None,
            })
            .collect();
        wire::Component {
            id: dim.id().to_owned(),
            name: write_text(&dim.base.name, self.version).0,
            key_position: self.dsd.dimensions.position(dim.id()),
            role: (dim.kind == DimensionKind::Time).then(|| "time".to_owned()),
            relationship: None,
            values,
        }
    }

    fn attributes(&self, level: &IndexMap<SmolStr, ValueList>) -> Vec<wire::Component> {
        level
            .iter()
            .map(|(id, values)| {
                let coded = self
                    .dsd
                    .attribute(id)
                    .and_then(|a| a.local_representation.as_ref())
                    .is_some_and(|r| r.enumeration.is_some());
                let values = values
                    .iter()
                    .map(|value| {
                        if coded {
                            wire::ComponentValue::coded(value.as_str())
                        } else {
                            wire::ComponentValue {
                                value: Some(Value::from(value.as_str())),
                                ..wire::ComponentValue::default()
                            }
                        }
                    })
                    .collect();
                wire::Component {
                    id: id.to_string(),
                    values,
                    ..wire::Component::default()
                }
            })
            .collect()
    }
}

fn add_key(values: &mut IndexMap<SmolStr, ValueList>, dims: &[&Dimension], key: &Key) -> Result<()> {
    for dim in dims {
        let value = key.get(dim.id()).ok_or_else(|| missing_value(key, dim))?;
        values
            .entry(SmolStr::new(dim.id()))
            .or_default()
            .insert(value.to_owned());
    }
    Ok(())
}

fn add_attributes(level: &mut IndexMap<SmolStr, ValueList>, attributes: &AttributeValues) {
    for (id, value) in attributes {
        level.entry(id.clone()).or_default().insert(value.clone());
    }
}

/// Index of each attribute's value in its list, `None` where absent.
fn attribute_indexes(level: &IndexMap<SmolStr, ValueList>, attributes: &AttributeValues) -> Vec<Option<usize>> {
    let indexes: Vec<Option<usize>> = level
        .iter()
        .map(|(id, values)| attributes.get(id).and_then(|v| values.get_index_of(v)))
        .collect();
    if indexes.iter().all(Option::is_none) {
        return Vec::new();
    }
    indexes
}

fn missing_value(key: &Key, dim: &Dimension) -> SdmxError {
    SdmxError::write(format!("key {key} has no value for dimension {}", dim.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Identifier;
    use crate::format::Format;
    use crate::model::{
        AttributeRelationship, DataAttribute, DimensionAtObservation, DimensionDescriptor,
        Maintainable, TIME_PERIOD,
    };
    use crate::options::ReaderOptions;
    use crate::{reader, writer};

    const DATA: &str = r#"{
  "header": {"id": "IREF1", "sender": {"id": "ECB"}},
  "structure": {
    "links": [{"rel": "datastructure",
               "urn": "urn:sdmx:org.sdmx.infomodel.datastructure.DataStructure=ECB:ECB_EXR1(1.0)"}],
    "dimensions": {
      "series": [
        {"id": "FREQ", "keyPosition": 0, "values": [{"id": "M"}]},
        {"id": "CURRENCY", "keyPosition": 1, "values": [{"id": "CHF"}, {"id": "USD"}]}],
      "observation": [
        {"id": "TIME_PERIOD", "keyPosition": 2, "role": "time",
         "values": [{"id": "2000-01"}, {"id": "2000-02"}]}]},
    "attributes": {
      "dataSet": [{"id": "UNIT_MULT", "values": [{"id": "0"}]}],
      "series": [{"id": "TITLE", "values": [{"name": "Swiss franc"}]}],
      "observation": [{"id": "OBS_STATUS", "values": [{"id": "A"}, {"id": "E"}]}]}
  },
  "dataSets": [{
    "action": "Replace",
    "attributes": [0],
    "series": {
      "0:0": {"attributes": [0], "observations": {"0": [1.6, 0], "1": ["NaN", 1]}},
      "0:1": {"observations": {"0": [0.98], "1": [null]}}
    }
  }]
}"#;

    fn dsd() -> DataStructureDefinition {
        DataStructureDefinition::new(
            Maintainable::new(Identifier::new("ECB", "ECB_EXR1", "1.0")),
            DimensionDescriptor::new([
                Dimension::new("FREQ"),
                Dimension::new("CURRENCY"),
                Dimension::time(TIME_PERIOD),
            ])
            .expect("dimensions"),
        )
        .with_attribute(DataAttribute::new("UNIT_MULT", AttributeRelationship::DataSet))
        .with_attribute(DataAttribute::new(
            "TITLE",
            AttributeRelationship::Dimensions {
                dimensions: vec!["FREQ".into(), "CURRENCY".into()],
                attachment_group: None,
            },
        ))
        .with_attribute(DataAttribute::new("OBS_STATUS", AttributeRelationship::Observation))
    }

    fn supplied() -> ReaderOptions {
        ReaderOptions::new().with_structure(dsd())
    }

    fn original() -> Message {
        reader::read(DATA.as_bytes(), &supplied()).expect("read")
    }

    fn rewrite(message: &Message, options: &WriterOptions) -> (Vec<u8>, Message) {
        let output = writer::write(message, options).expect("written");
        let back = reader::read(&output.bytes, &supplied()).expect("read back");
        (output.bytes, back)
    }

    #[test]
    fn test_round_trip_both_generations() {
        let original = original();
        assert!(original.diagnostics.is_empty(), "{:?}", original.diagnostics);
        for version in [JsonVersion::V1, JsonVersion::V2] {
            let options = WriterOptions::new(Format::DataJson(version));
            let (bytes, back) = rewrite(&original, &options);
            assert_eq!(back.data, original.data, "{version:?}");
            let (again, _) = rewrite(&back, &options);
            assert_eq!(again, bytes, "{version:?}");
        }
    }

    #[test]
    fn test_values_and_indexes() {
        let output = writer::write(&original(), &WriterOptions::new(Format::DataJson(JsonVersion::V2)))
            .expect("written");
        let json: Value = serde_json::from_slice(&output.bytes).expect("json");
        let structure = &json["data"]["structures"][0];
        assert_eq!(structure["dimensionAtObservation"], TIME_PERIOD);
        assert_eq!(structure["dimensions"]["observation"][0]["role"], "time");
        assert_eq!(structure["measures"]["observation"][0]["id"], "OBS_VALUE");

        let data_set = &json["data"]["dataSets"][0];
        assert_eq!(data_set["structure"], 0);
        assert_eq!(data_set["series"]["0:0"]["observations"]["0"][0], 1.6);
        assert_eq!(data_set["series"]["0:0"]["observations"]["1"][0], "NaN");
        assert_eq!(data_set["series"]["0:1"]["observations"]["1"][0], Value::Null);
    }

    #[test]
    fn test_flat_output() {
        let options = WriterOptions::new(Format::DataJson(JsonVersion::V1))
            .with_dimension_at_observation(DimensionAtObservation::AllDimensions);
        let (bytes, back) = rewrite(&original(), &options);
        let json: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["structure"]["dimensions"]["observation"].as_array().map(Vec::len), Some(3));
        assert!(json["dataSets"][0]["observations"]["0:0:0"].is_array());

        let data = &back.data[0];
        assert!(data.is_flat());
        assert_eq!(data.observation_count(), 4);
        let first = &data.flat_observations()[0];
        assert_eq!(first.key.to_string(), "M.CHF.2000-01");
        assert_eq!(first.attributes.get("TITLE").map(String::as_str), Some("Swiss franc"));
    }

    #[test]
    fn test_empty_message_is_still_data() {
        let mut message = original();
        message.data.clear();
        let (bytes, back) = rewrite(&message, &WriterOptions::new(Format::DataJson(JsonVersion::V1)));
        let json: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["dataSets"], Value::Array(Vec::new()));
        assert!(back.is_data());
        assert!(back.data.is_empty());
    }
}
