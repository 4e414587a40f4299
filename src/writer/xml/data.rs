//! Generic and structure-specific data sets.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use super::{emit, end};
use crate::dataset::{AttributeValues, DataSetBody, Key, Observation};
use crate::error::Result;
use crate::message::HeaderStructure;
use crate::writer::{Prepared, PreparedData};

/// Namespace prefix of the `index`th structure declaration.
pub(super) fn prefix(index: usize) -> String {
    format!("ns{}", index + 1)
}

/// Structure-specific namespaces, one per header declaration.
pub(super) fn structure_namespaces(prepared: &Prepared<'_>) -> Vec<String> {
    prepared
        .structures
        .iter()
        .map(|s| format!("{}:ObsLevelDim:{}", s.structure.urn(), s.dimension_at_observation))
        .collect()
}

fn data_set_start<'a>(
    prepared: &'a PreparedData<'_>,
    structures: &'a [HeaderStructure],
    structure_ref: &'a str,
) -> BytesStart<'a> {
    let mut start = BytesStart::new("mes:DataSet");
    start.push_attribute((structure_ref, structures[prepared.structure].structure_id.as_str()));
    if let Some(action) = &prepared.data.action {
        start.push_attribute(("action", action.as_str()));
    }
    start
}

// ============================================================================
// GENERIC
// ============================================================================

/// `<gen:{name}><gen:Value id=".." value=".."/>...</gen:{name}>`, omitted
/// when empty.
fn value_list<'a, W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    values: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<()> {
    let mut values = values.into_iter().peekable();
    if values.peek().is_none() {
        return Ok(());
    }
    emit(writer, Event::Start(BytesStart::new(name)))?;
    for (id, value) in values {
        let mut element = BytesStart::new("gen:Value");
        element.push_attribute(("id", id));
        element.push_attribute(("value", value));
        emit(writer, Event::Empty(element))?;
    }
    end(writer, name)
}

fn key_values(key: &Key) -> impl Iterator<Item = (&str, &str)> {
    key.iter()
}

fn attribute_values(attributes: &AttributeValues) -> impl Iterator<Item = (&str, &str)> {
    attributes.iter().map(|(id, value)| (id.as_str(), value.as_str()))
}

fn generic_obs<W: Write>(writer: &mut Writer<W>, obs: &Observation, obs_dim: Option<&str>) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("gen:Obs")))?;
    match obs_dim {
        Some(dim) => {
            let mut element = BytesStart::new("gen:ObsDimension");
            element.push_attribute(("value", obs.key.get(dim).unwrap_or_default()));
            emit(writer, Event::Empty(element))?;
        }
        None => value_list(writer, "gen:ObsKey", key_values(&obs.key))?,
    }
    if let Some(value) = obs.value.as_str() {
        let mut element = BytesStart::new("gen:ObsValue");
        element.push_attribute(("value", value));
        emit(writer, Event::Empty(element))?;
    }
    value_list(writer, "gen:Attributes", attribute_values(&obs.attributes))?;
    end(writer, "gen:Obs")
}

pub(super) fn write_generic<W: Write>(
    writer: &mut Writer<W>,
    prepared: &PreparedData<'_>,
    structures: &[HeaderStructure],
) -> Result<()> {
    let data = &prepared.data;
    emit(writer, Event::Start(data_set_start(prepared, structures, "structureRef")))?;
    value_list(writer, "gen:Attributes", attribute_values(&data.attributes))?;

    for group in &data.groups {
        let mut start = BytesStart::new("gen:Group");
        if let Some(id) = &group.group_id {
            start.push_attribute(("type", id.as_str()));
        }
        emit(writer, Event::Start(start))?;
        value_list(writer, "gen:GroupKey", key_values(&group.key))?;
        value_list(writer, "gen:Attributes", attribute_values(&group.attributes))?;
        end(writer, "gen:Group")?;
    }

    let obs_dim = data.dimension_at_observation.dimension();
    match &data.body {
        DataSetBody::Series(series) => {
            for s in series {
                emit(writer, Event::Start(BytesStart::new("gen:Series")))?;
                value_list(writer, "gen:SeriesKey", key_values(&s.key))?;
                value_list(writer, "gen:Attributes", attribute_values(&s.attributes))?;
                for obs in &s.observations {
                    generic_obs(writer, obs, obs_dim)?;
                }
                end(writer, "gen:Series")?;
            }
        }
        DataSetBody::Flat(observations) => {
            for obs in observations {
                generic_obs(writer, obs, None)?;
            }
        }
    }
    end(writer, "mes:DataSet")
}

// ============================================================================
// STRUCTURE-SPECIFIC
// ============================================================================

/// Key values followed by attribute values, as XML attributes.
fn push_values(element: &mut BytesStart<'_>, key: &Key, attributes: &AttributeValues) {
    for (id, value) in key.iter() {
        element.push_attribute((id, value));
    }
    for (id, value) in attributes {
        element.push_attribute((id.as_str(), value.as_str()));
    }
}

fn specific_obs<W: Write>(writer: &mut Writer<W>, obs: &Observation, measure: &str) -> Result<()> {
    let mut element = BytesStart::new("Obs");
    for (id, value) in obs.key.iter() {
        element.push_attribute((id, value));
    }
    if let Some(value) = obs.value.as_str() {
        element.push_attribute((measure, value));
    }
    for (id, value) in &obs.attributes {
        element.push_attribute((id.as_str(), value.as_str()));
    }
    emit(writer, Event::Empty(element))
}

pub(super) fn write_structure_specific<W: Write>(
    writer: &mut Writer<W>,
    prepared: &PreparedData<'_>,
    structures: &[HeaderStructure],
) -> Result<()> {
    let data = &prepared.data;
    let ns = prefix(prepared.structure);
    let measure = prepared.dsd.measure.base.id.as_str();

    let mut start = data_set_start(prepared, structures, "ss:structureRef");
    let data_set_type = format!("{ns}:DataSetType");
    start.push_attribute(("xsi:type", data_set_type.as_str()));
    for (id, value) in &data.attributes {
        start.push_attribute((id.as_str(), value.as_str()));
    }
    emit(writer, Event::Start(start))?;

    for group in &data.groups {
        let mut element = BytesStart::new("Group");
        if let Some(id) = &group.group_id {
            let group_type = format!("{ns}:{id}");
            element.push_attribute(("xsi:type", group_type.as_str()));
        }
        push_values(&mut element, &group.key, &group.attributes);
        emit(writer, Event::Empty(element))?;
    }

    match &data.body {
        DataSetBody::Series(series) => {
            for s in series {
                let mut element = BytesStart::new("Series");
                push_values(&mut element, &s.key, &s.attributes);
                if s.observations.is_empty() {
                    emit(writer, Event::Empty(element))?;
                    continue;
                }
                emit(writer, Event::Start(element))?;
                for obs in &s.observations {
                    specific_obs(writer, obs, measure)?;
                }
                end(writer, "Series")?;
            }
        }
        DataSetBody::Flat(observations) => {
            for obs in observations {
                specific_obs(writer, obs, measure)?;
            }
        }
    }
    end(writer, "mes:DataSet")
}
