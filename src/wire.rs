//! Serde shapes of SDMX-JSON documents.
//!
//! One set of types serves both generations. Fields that only one
//! generation uses are optional and skipped when empty, so the writer
//! fills in what its generation needs and the reader accepts either.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::JsonVersion;
use crate::model::{DEFAULT_LOCALE, InternationalString};

/// Generation 2 schema locations contain this marker.
pub(crate) const SCHEMA_V2_MARKER: &str = "2.0";

pub(crate) const DATA_SCHEMA_V1: &str =
    "https://raw.githubusercontent.com/sdmx-twg/sdmx-json/master/data-message/tools/schemas/1.0/sdmx-json-data-schema.json";
pub(crate) const DATA_SCHEMA_V2: &str =
    "https://raw.githubusercontent.com/sdmx-twg/sdmx-json/develop/data-message/tools/schemas/2.0.0/sdmx-json-data-schema.json";
pub(crate) const STRUCTURE_SCHEMA_V1: &str =
    "https://raw.githubusercontent.com/sdmx-twg/sdmx-json/master/structure-message/tools/schemas/1.0/sdmx-json-structure-schema.json";
pub(crate) const STRUCTURE_SCHEMA_V2: &str =
    "https://raw.githubusercontent.com/sdmx-twg/sdmx-json/develop/structure-message/tools/schemas/2.0.0/sdmx-json-structure-schema.json";

fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// TEXT
// ============================================================================

/// `name`/`description`: a plain string or a locale map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Text {
    Plain(String),
    Localized(IndexMap<String, String>),
}

/// Localized text from a `name` + `names` pair.
pub(crate) fn read_text(
    single: Option<&Text>,
    localized: Option<&IndexMap<String, String>>,
) -> InternationalString {
    let mut text = InternationalString::new();
    for (locale, value) in localized.into_iter().flatten() {
        text.insert(locale.as_str(), value.as_str());
    }
    match single {
        Some(Text::Plain(value)) if text.is_empty() => {
            text.insert(DEFAULT_LOCALE, value.as_str());
        }
        Some(Text::Localized(map)) => {
            for (locale, value) in map {
                if text.get(locale).is_none() {
                    text.insert(locale.as_str(), value.as_str());
                }
            }
        }
        _ => {}
    }
    text
}

/// `name` + `names` for a generation: a locale map in generation 1, the
/// default text plus a locale map in generation 2.
pub(crate) fn write_text(
    text: &InternationalString,
    version: JsonVersion,
) -> (Option<Text>, Option<IndexMap<String, String>>) {
    if text.is_empty() {
        return (None, None);
    }
    let map: IndexMap<String, String> = text
        .iter()
        .map(|(locale, value)| (locale.to_owned(), value.to_owned()))
        .collect();
    match version {
        JsonVersion::V1 => (Some(Text::Localized(map)), None),
        JsonVersion::V2 => (text.default_text().map(|t| Text::Plain(t.to_owned())), Some(map)),
    }
}

// ============================================================================
// HEADER
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Party {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<IndexMap<String, String>>,
}

/// Generation 1 `header` or generation 2 `meta`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub test: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepared: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Party>,
    #[serde(default, alias = "receiver", skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<Party>,
}

// ============================================================================
// DATA MESSAGES
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,
    /// Generation 1: the single structure section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<DataStructureSection>,
    /// Generation 1: data sets at the top level. Written even when empty,
    /// the key identifies the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sets: Option<Vec<DataSet>>,
    /// Generation 2: structures and data sets under `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataBody>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataBody {
    #[serde(default)]
    pub structures: Vec<DataStructureSection>,
    #[serde(default)]
    pub data_sets: Vec<DataSet>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Components by level.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Levels {
    #[serde(default)]
    pub data_set: Vec<Component>,
    #[serde(default)]
    pub series: Vec<Component>,
    #[serde(default)]
    pub observation: Vec<Component>,
    /// Generation 2 attributes attached to partial keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimension_group: Vec<Component>,
}

/// The `structure` of a data message: the layout and value lists the data
/// sets index into.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataStructureSection {
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_at_observation: Option<String>,
    #[serde(default)]
    pub dimensions: Levels,
    #[serde(default)]
    pub attributes: Levels,
    /// Generation 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measures: Option<Levels>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Component {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Value>,
    #[serde(default)]
    pub values: Vec<ComponentValue>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ComponentValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Text>,
    /// Uncoded attribute values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ComponentValue {
    pub fn coded(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Lexical form: the code id, else the value, else the default name.
    pub fn lexical(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        match &self.value {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
        match &self.name {
            Some(Text::Plain(s)) => Some(s.clone()),
            Some(Text::Localized(map)) => map
                .get(DEFAULT_LOCALE)
                .or_else(|| map.values().next())
                .cloned(),
            None => None,
        }
    }
}

/// `[value, attribute index, ...]`.
pub(crate) type ObservationArray = Vec<Value>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Series {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Option<usize>>,
    #[serde(default)]
    pub observations: IndexMap<String, ObservationArray>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Generation 2: index into `data.structures`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Option<usize>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub series: IndexMap<String, Series>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub observations: IndexMap<String, ObservationArray>,
    /// Generation 2: attribute indexes by partial key. A partial key has a
    /// position for every series and observation dimension, empty where the
    /// group leaves the dimension open.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dimension_group_attributes: IndexMap<String, Vec<Option<usize>>>,
}

// ============================================================================
// STRUCTURE MESSAGES
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StructureMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,
    #[serde(default)]
    pub data: StructureBody,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StructureBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agency_schemes: Vec<ItemScheme>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dataflows: Vec<Dataflow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_schemes: Vec<ItemScheme>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codelists: Vec<ItemScheme>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concept_schemes: Vec<ItemScheme>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_structures: Vec<DataStructure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_constraints: Vec<Constraint>,
}

impl StructureBody {
    /// Keys of the body that hold artefacts, for format detection.
    pub const SECTIONS: [&'static str; 7] = [
        "agencySchemes",
        "dataflows",
        "categorySchemes",
        "codelists",
        "conceptSchemes",
        "dataStructures",
        "contentConstraints",
    ];
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub annotation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texts: Option<IndexMap<String, String>>,
}

/// Fields every identifiable artefact shares.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Identifiable {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Maintainable {
    #[serde(flatten)]
    pub base: Identifiable,
    #[serde(rename = "agencyID")]
    pub agency_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_external_reference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,
}

/// Generation 1 writes `textFormat`, generation 2 `format`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Representation {
    /// Codelist URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_format: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<IndexMap<String, Value>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Item {
    #[serde(flatten)]
    pub base: Identifiable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_representation: Option<Representation>,
    /// Nested categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Item>,
}

/// Any item scheme; the item list is named after the scheme kind.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ItemScheme {
    #[serde(flatten)]
    pub maintainable: Maintainable,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_partial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agencies: Vec<Item>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DimensionComponent {
    #[serde(flatten)]
    pub base: Identifiable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_representation: Option<Representation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DimensionList {
    #[serde(default)]
    pub dimensions: Vec<DimensionComponent>,
    /// Generation 1.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_dimensions: Vec<DimensionComponent>,
    /// Generation 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_dimension: Option<DimensionComponent>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Group {
    #[serde(flatten)]
    pub base: Identifiable,
    #[serde(default)]
    pub group_dimensions: Vec<String>,
}

/// Exactly one field is set. Generation 1 uses `none`/`primaryMeasure`,
/// generation 2 `dataflow`/`observation`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub none: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataflow: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_measure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttributeComponent {
    #[serde(flatten)]
    pub base: Identifiable,
    /// Generation 1: `Mandatory` / `Conditional`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_status: Option<String>,
    /// Generation 2: `mandatory` / `optional`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default)]
    pub attribute_relationship: Relationship,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_representation: Option<Representation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct AttributeList {
    #[serde(default)]
    pub attributes: Vec<AttributeComponent>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MeasureComponent {
    #[serde(flatten)]
    pub base: Identifiable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_representation: Option<Representation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MeasureList {
    /// Generation 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_measure: Option<MeasureComponent>,
    /// Generation 2.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<MeasureComponent>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Components {
    #[serde(default)]
    pub dimension_list: DimensionList,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_list: Option<AttributeList>,
    #[serde(default)]
    pub measure_list: MeasureList,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DataStructure {
    #[serde(flatten)]
    pub maintainable: Maintainable,
    #[serde(default)]
    pub data_structure_components: Components,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Dataflow {
    #[serde(flatten)]
    pub maintainable: Maintainable,
    /// Data structure URN.
    pub structure: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConstraintAttachment {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dataflows: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_structures: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct KeyValue {
    pub id: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Generation 1 says `isIncluded`, generation 2 `include`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CubeRegion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_included: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<bool>,
    #[serde(default)]
    pub key_values: Vec<KeyValue>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Constraint {
    #[serde(flatten)]
    pub maintainable: Maintainable,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_attachment: Option<ConstraintAttachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cube_regions: Vec<CubeRegion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_generations() {
        let text = read_text(Some(&Text::Plain("Frequency".into())), None);
        assert_eq!(text.get("en"), Some("Frequency"));

        let (single, map) = write_text(&text, JsonVersion::V1);
        assert!(matches!(single, Some(Text::Localized(_))));
        assert!(map.is_none());

        let (single, map) = write_text(&text, JsonVersion::V2);
        assert_eq!(single, Some(Text::Plain("Frequency".into())));
        assert_eq!(map.map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_names_win_over_name() {
        let names: IndexMap<String, String> =
            [("de".to_owned(), "Frequenz".to_owned())].into_iter().collect();
        let text = read_text(Some(&Text::Plain("Frequency".into())), Some(&names));
        // A plain name only fills in when no localized names exist.
        assert_eq!(text.len(), 1);
        assert_eq!(text.get("de"), Some("Frequenz"));
    }

    #[test]
    fn test_component_value_lexical() {
        assert_eq!(ComponentValue::coded("A").lexical().as_deref(), Some("A"));
        let uncoded = ComponentValue {
            value: Some(Value::from(4)),
            ..ComponentValue::default()
        };
        assert_eq!(uncoded.lexical().as_deref(), Some("4"));
    }

    #[test]
    fn test_flattened_maintainable() {
        let json = r#"{"id":"CL_FREQ","agencyID":"ECB","version":"1.0","name":{"en":"Frequency"},
            "codes":[{"id":"A","name":{"en":"Annual"}}]}"#;
        let scheme: ItemScheme = serde_json::from_str(json).expect("scheme");
        assert_eq!(scheme.maintainable.base.id, "CL_FREQ");
        assert_eq!(scheme.maintainable.agency_id, "ECB");
        assert_eq!(scheme.codes.len(), 1);
    }
}
