//! Generic and structure-specific data sets.

use smol_str::SmolStr;

use super::tree::{Node, local_part};
use crate::dataset::{AttributeValues, Key, ObsValue, RawDataSet, RawGroup, RawObservation, RawSeries};
use crate::error::Result;
use crate::index::ResolutionIndex;
use crate::model::{DataStructureDefinition, DimensionAtObservation, OBS_VALUE, TIME_PERIOD};
use crate::reader::{Document, PendingData, header_structure};

/// Attributes of a structure-specific `DataSet` element that describe the
/// data set itself rather than carrying attribute values.
const DATA_SET_PROPERTIES: &[&str] = &[
    "action",
    "structureRef",
    "setID",
    "dataScope",
    "reportingBeginDate",
    "reportingEndDate",
    "validFromDate",
    "validToDate",
    "publicationYear",
    "publicationPeriod",
];

fn data_sets(root: &Node) -> impl Iterator<Item = &Node> {
    root.children_named("DataSet")
}

fn begin(doc: &Document, node: &Node) -> Result<(RawDataSet, DimensionAtObservation)> {
    let (structure, dim_at_obs) =
        header_structure(&doc.header, node.attr("structureRef"), node.location())?;
    let mut raw = RawDataSet::new(structure);
    raw.action = node.attr("action").map(SmolStr::new);
    Ok((raw, dim_at_obs))
}

fn push(doc: &mut Document, raw: RawDataSet, dimension_at_observation: DimensionAtObservation) {
    tracing::trace!(
        series = raw.series.len(),
        observations = raw.observations.len(),
        "raw data set"
    );
    doc.data.push(PendingData {
        raw,
        dimension_at_observation,
        layout: None,
    });
}

// ============================================================================
// GENERIC
// ============================================================================

/// `<gen:Value id=".." value=".."/>` children.
fn values(node: Option<&Node>) -> Vec<(SmolStr, String)> {
    node.map(|n| {
        n.children_named("Value")
            .filter_map(|v| Some((SmolStr::new(v.attr("id")?), v.attr("value")?.to_owned())))
            .collect()
    })
    .unwrap_or_default()
}

fn generic_key(node: Option<&Node>) -> Key {
    values(node).into_iter().collect()
}

fn generic_attributes(node: &Node) -> AttributeValues {
    values(node.child("Attributes")).into_iter().collect()
}

fn generic_obs(node: &Node, obs_dim: &str) -> RawObservation {
    let key = match node.child("ObsKey") {
        Some(key) => generic_key(Some(key)),
        None => node
            .child("ObsDimension")
            .and_then(|d| d.attr("value"))
            .map(|value| [(obs_dim, value)].into_iter().collect())
            .unwrap_or_default(),
    };
    RawObservation {
        key,
        value: node
            .child("ObsValue")
            .and_then(|v| v.attr("value"))
            .map(ObsValue::from_lexical)
            .unwrap_or_default(),
        attributes: generic_attributes(node),
    }
}

pub(super) fn read_generic(root: &Node, doc: &mut Document) -> Result<()> {
    for node in data_sets(root) {
        let (mut raw, dim_at_obs) = begin(doc, node)?;
        let obs_dim = dim_at_obs.dimension().unwrap_or(TIME_PERIOD).to_owned();
        raw.attributes = generic_attributes(node);
        for child in &node.children {
            match child.local.as_str() {
                "Group" => raw.groups.push(RawGroup {
                    group_id: child.attr("type").map(|t| SmolStr::new(local_part(t))),
                    key: generic_key(child.child("GroupKey")),
                    attributes: generic_attributes(child),
                }),
                "Series" => raw.series.push(RawSeries {
                    key: generic_key(child.child("SeriesKey")),
                    attributes: generic_attributes(child),
                    observations: child
                        .children_named("Obs")
                        .map(|o| generic_obs(o, &obs_dim))
                        .collect(),
                }),
                "Obs" => raw.observations.push(generic_obs(child, &obs_dim)),
                _ => {}
            }
        }
        push(doc, raw, dim_at_obs);
    }
    Ok(())
}

// ============================================================================
// STRUCTURE-SPECIFIC
// ============================================================================

/// Unprefixed XML attributes; prefixed ones (`xsi:type`, `ss:*`) are markup.
fn plain_attrs(node: &Node) -> impl Iterator<Item = (&str, &str)> {
    node.attrs
        .iter()
        .filter(|(name, _)| !name.contains(':') && !name.starts_with("xmlns"))
        .map(|(name, value)| (name.as_str(), value.as_str()))
}

/// How XML attributes split into key, value and attribute values.
enum Layout<'a> {
    Known(&'a DataStructureDefinition),
    /// No structure: series attributes are read as dimensions.
    Unknown { obs_dim: Option<SmolStr> },
}

impl Layout<'_> {
    fn is_dimension(&self, name: &str, observation: bool) -> bool {
        match self {
            Layout::Known(dsd) => dsd.dimensions.contains(name),
            Layout::Unknown { obs_dim } => match (observation, obs_dim) {
                (false, _) => true,
                (true, Some(dim)) => dim == name,
                (true, None) => name != OBS_VALUE,
            },
        }
    }

    fn measure(&self) -> &str {
        match self {
            Layout::Known(dsd) => dsd.measure.base.id.as_str(),
            Layout::Unknown { .. } => OBS_VALUE,
        }
    }

    fn split(&self, node: &Node, observation: bool) -> (Key, ObsValue, AttributeValues) {
        let mut key = Key::new();
        let mut value = ObsValue::Missing;
        let mut attributes = AttributeValues::new();
        for (name, v) in plain_attrs(node) {
            if observation && name == self.measure() {
                value = ObsValue::from_lexical(v);
            } else if self.is_dimension(name, observation) {
                key.insert(name, v);
            } else {
                attributes.insert(SmolStr::new(name), v.to_owned());
            }
        }
        (key, value, attributes)
    }
}

pub(super) fn read_structure_specific(
    root: &Node,
    doc: &mut Document,
    supplied: &ResolutionIndex,
) -> Result<()> {
    for node in data_sets(root) {
        let (mut raw, dim_at_obs) = begin(doc, node)?;
        let layout = match supplied.structure_of(&raw.structure) {
            Some(dsd) => Layout::Known(dsd),
            None => {
                tracing::warn!(structure = %raw.structure, "structure-specific data without its structure");
                Layout::Unknown {
                    obs_dim: dim_at_obs.dimension().map(SmolStr::new),
                }
            }
        };

        raw.attributes = plain_attrs(node)
            .filter(|(name, _)| !DATA_SET_PROPERTIES.contains(name))
            .map(|(name, value)| (SmolStr::new(name), value.to_owned()))
            .collect();

        for child in &node.children {
            match child.local.as_str() {
                "Group" => {
                    let (key, _, attributes) = match &layout {
                        Layout::Known(_) => layout.split(child, false),
                        // Without a structure a group key cannot be told
                        // apart from its attributes; keep everything as
                        // attributes so no dimension is invented.
                        Layout::Unknown { .. } => {
                            let attributes = plain_attrs(child)
                                .map(|(n, v)| (SmolStr::new(n), v.to_owned()))
                                .collect();
                            (Key::new(), ObsValue::Missing, attributes)
                        }
                    };
                    raw.groups.push(RawGroup {
                        group_id: child
                            .attr("xsi:type")
                            .or_else(|| child.attr("type"))
                            .map(|t| SmolStr::new(local_part(t))),
                        key,
                        attributes,
                    });
                }
                "Series" => {
                    let (key, _, attributes) = layout.split(child, false);
                    let observations = child
                        .children_named("Obs")
                        .map(|o| {
                            let (key, value, attributes) = layout.split(o, true);
                            RawObservation {
                                key,
                                value,
                                attributes,
                            }
                        })
                        .collect();
                    raw.series.push(RawSeries {
                        key,
                        attributes,
                        observations,
                    });
                }
                "Obs" => {
                    let (key, value, attributes) = layout.split(child, true);
                    raw.observations.push(RawObservation {
                        key,
                        value,
                        attributes,
                    });
                }
                _ => {}
            }
        }
        push(doc, raw, dim_at_obs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{header, tree};
    use super::*;
    use crate::base::{ArtefactKind, Identifier};
    use crate::message::MessageKind;
    use crate::model::{
        AttributeRelationship, DataAttribute, Dimension, DimensionDescriptor, Maintainable,
    };

    const HEADER: &str = r#"<mes:Header>
  <mes:ID>X</mes:ID><mes:Test>false</mes:Test>
  <mes:Structure structureID="ECB_EXR1" dimensionAtObservation="TIME_PERIOD">
    <com:Structure><Ref agencyID="ECB" id="ECB_EXR1" version="1.0"/></com:Structure>
  </mes:Structure>
</mes:Header>"#;

    fn doc_for(xml: &str) -> (Node, Document) {
        let root = tree::parse(xml.as_bytes()).expect("xml");
        let header = header::read_header(root.child("Header").expect("header")).expect("header");
        (root, Document::new(MessageKind::Data, header))
    }

    #[test]
    fn test_generic_series() {
        let xml = format!(
            r#"<mes:GenericData>{HEADER}
<mes:DataSet structureRef="ECB_EXR1" action="Replace">
  <gen:Attributes><gen:Value id="UNIT_MULT" value="0"/></gen:Attributes>
  <gen:Series>
    <gen:SeriesKey><gen:Value id="FREQ" value="M"/><gen:Value id="CURRENCY" value="CHF"/></gen:SeriesKey>
    <gen:Attributes><gen:Value id="TITLE" value="Swiss franc"/></gen:Attributes>
    <gen:Obs><gen:ObsDimension value="2000-01"/><gen:ObsValue value="1.6"/>
      <gen:Attributes><gen:Value id="OBS_STATUS" value="A"/></gen:Attributes></gen:Obs>
    <gen:Obs><gen:ObsDimension value="2000-02"/></gen:Obs>
  </gen:Series>
</mes:DataSet></mes:GenericData>"#
        );
        let (root, mut doc) = doc_for(&xml);
        read_generic(&root, &mut doc).expect("generic");
        let pending = &doc.data[0];
        assert_eq!(pending.dimension_at_observation, DimensionAtObservation::time_period());
        let raw = &pending.raw;
        assert_eq!(raw.action.as_deref(), Some("Replace"));
        assert_eq!(raw.attributes["UNIT_MULT"], "0");
        let series = &raw.series[0];
        assert_eq!(series.key.to_string(), "M.CHF");
        assert_eq!(series.observations[0].key.get(TIME_PERIOD), Some("2000-01"));
        assert_eq!(series.observations[0].value, ObsValue::from_lexical("1.6"));
        assert!(series.observations[1].value.is_missing());
    }

    fn exr() -> DataStructureDefinition {
        DataStructureDefinition::new(
            Maintainable::new(Identifier::unversioned("ECB", "ECB_EXR1")),
            DimensionDescriptor::new([
                Dimension::new("FREQ"),
                Dimension::new("CURRENCY"),
                Dimension::time(TIME_PERIOD),
            ])
            .expect("unique ids"),
        )
        .with_attribute(DataAttribute::new("UNIT_MULT", AttributeRelationship::DataSet))
        .with_attribute(DataAttribute::new("OBS_STATUS", AttributeRelationship::Observation))
    }

    const SS: &str = r#"<mes:DataSet ss:structureRef="ECB_EXR1" xsi:type="ns1:DataSetType" action="Replace" UNIT_MULT="0">
  <Group xsi:type="ns1:SIBLING" CURRENCY="CHF" DECIMALS="4"/>
  <Series FREQ="M" CURRENCY="CHF" TITLE="Swiss franc">
    <Obs TIME_PERIOD="2000-01" OBS_VALUE="1.6" OBS_STATUS="A"/>
  </Series>
</mes:DataSet>"#;

    #[test]
    fn test_structure_specific_with_structure() {
        let xml = format!("<mes:StructureSpecificData>{HEADER}{SS}</mes:StructureSpecificData>");
        let (root, mut doc) = doc_for(&xml);
        let mut supplied = ResolutionIndex::new();
        supplied.register_supplied(exr().into()).expect("register");
        read_structure_specific(&root, &mut doc, &supplied).expect("ss");

        let raw = &doc.data[0].raw;
        assert_eq!(raw.structure.kind, ArtefactKind::DataStructure);
        assert_eq!(raw.attributes.len(), 1);
        assert_eq!(raw.groups[0].group_id.as_deref(), Some("SIBLING"));
        assert_eq!(raw.groups[0].key.to_string(), "CHF");
        let series = &raw.series[0];
        assert_eq!(series.key.to_string(), "M.CHF");
        assert_eq!(series.attributes["TITLE"], "Swiss franc");
        let obs = &series.observations[0];
        assert_eq!(obs.key.to_string(), "2000-01");
        assert_eq!(obs.value.as_str(), Some("1.6"));
        assert_eq!(obs.attributes["OBS_STATUS"], "A");
    }

    #[test]
    fn test_structure_specific_without_structure() {
        let xml = format!("<mes:StructureSpecificData>{HEADER}{SS}</mes:StructureSpecificData>");
        let (root, mut doc) = doc_for(&xml);
        read_structure_specific(&root, &mut doc, &ResolutionIndex::new()).expect("ss");
        let series = &doc.data[0].raw.series[0];
        // TITLE cannot be told apart from a dimension.
        assert_eq!(series.key.len(), 3);
        assert!(series.attributes.is_empty());
        assert_eq!(series.observations[0].attributes["OBS_STATUS"], "A");
    }
}
