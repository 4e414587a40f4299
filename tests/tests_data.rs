#![allow(clippy::unwrap_used)]

use rstest::rstest;
use sdmx::dataset::{DataSet, ObsValue, ObservationStream, RawObservation, build_dataset};
use sdmx::diagnostics::codes;
use sdmx::model::{
    AttributeRelationship, DataAttribute, DataStructureDefinition, Dimension,
    DimensionAtObservation, DimensionDescriptor, GroupDimensionDescriptor, Key, Maintainable,
    TIME_PERIOD,
};
use sdmx::{
    Format, Identifier, JsonVersion, Message, ReaderOptions, SdmxError, WriterOptions, read,
    read_many, write,
};

const GENERIC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mes:GenericData xmlns:mes="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/message" xmlns:gen="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/data/generic" xmlns:com="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/common">
  <mes:Header>
    <mes:ID>EXR_M</mes:ID>
    <mes:Test>false</mes:Test>
    <mes:Sender id="ECB"/>
    <mes:Structure structureID="ECB_EXR1" dimensionAtObservation="TIME_PERIOD">
      <com:Structure><Ref agencyID="ECB" id="ECB_EXR1" version="1.0"/></com:Structure>
    </mes:Structure>
  </mes:Header>
  <mes:DataSet structureRef="ECB_EXR1" action="Replace">
    <gen:Attributes><gen:Value id="UNIT_MULT" value="0"/></gen:Attributes>
    <gen:Series>
      <gen:SeriesKey><gen:Value id="FREQ" value="M"/><gen:Value id="CURRENCY" value="CHF"/></gen:SeriesKey>
      <gen:Attributes><gen:Value id="TITLE" value="Swiss franc"/></gen:Attributes>
      <gen:Obs>
        <gen:ObsDimension value="2000-01"/>
        <gen:ObsValue value="1.6"/>
        <gen:Attributes><gen:Value id="OBS_STATUS" value="A"/></gen:Attributes>
      </gen:Obs>
      <gen:Obs><gen:ObsDimension value="2000-02"/><gen:ObsValue value="NaN"/></gen:Obs>
    </gen:Series>
    <gen:Series>
      <gen:SeriesKey><gen:Value id="FREQ" value="M"/><gen:Value id="CURRENCY" value="USD"/></gen:SeriesKey>
      <gen:Obs><gen:ObsDimension value="2000-01"/><gen:ObsValue value="0.98"/></gen:Obs>
      <gen:Obs><gen:ObsDimension value="2000-02"/></gen:Obs>
    </gen:Series>
  </mes:DataSet>
</mes:GenericData>"#;

fn exr() -> DataStructureDefinition {
    DataStructureDefinition::new(
        Maintainable::new(Identifier::new("ECB", "ECB_EXR1", "1.0")),
        DimensionDescriptor::new([
            Dimension::new("FREQ"),
            Dimension::new("CURRENCY"),
            Dimension::time(TIME_PERIOD),
        ])
        .unwrap(),
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

const SIBLING_GROUP: &str = r#"<gen:Group type="SIBLING">
      <gen:GroupKey><gen:Value id="CURRENCY" value="CHF"/></gen:GroupKey>
      <gen:Attributes><gen:Value id="DECIMALS" value="4"/></gen:Attributes>
    </gen:Group>
    "#;

/// The generic fixture with a sibling group on the Swiss franc series.
fn grouped() -> String {
    GENERIC.replacen("<gen:Series>", &format!("{SIBLING_GROUP}<gen:Series>"), 1)
}

fn exr_with_sibling() -> DataStructureDefinition {
    exr()
        .with_group(GroupDimensionDescriptor::new("SIBLING", ["CURRENCY"]))
        .with_attribute(DataAttribute::new(
            "DECIMALS",
            AttributeRelationship::Group("SIBLING".into()),
        ))
}

fn two_dims() -> DataStructureDefinition {
    DataStructureDefinition::new(
        Maintainable::new(Identifier::new("TEST", "AB", "1.0")),
        DimensionDescriptor::new([Dimension::new("A"), Dimension::new("B")]).unwrap(),
    )
    .with_attribute(DataAttribute::new("STATUS", AttributeRelationship::Observation))
}

fn obs(pairs: &[(&str, &str)], value: &str) -> RawObservation {
    RawObservation {
        key: pairs.iter().map(|(k, v)| (*k, *v)).collect(),
        value: ObsValue::from_lexical(value),
        ..RawObservation::default()
    }
}

fn supplied() -> ReaderOptions {
    ReaderOptions::new().with_structure(exr())
}

/// Every observation as (full key, value, attributes), in reading order.
fn flatten(data: &DataSet, dsd: &DataStructureDefinition) -> Vec<(String, Option<String>, Vec<(String, String)>)> {
    data.iter_flat(dsd)
        .map(|o| {
            let mut attributes: Vec<(String, String)> = o
                .attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            attributes.sort();
            (o.key.to_string(), o.value.as_str().map(str::to_owned), attributes)
        })
        .collect()
}

#[test]
fn test_series_group_on_remaining_dimensions() {
    let observations = vec![
        obs(&[("A", "1"), ("B", "x")], "10"),
        obs(&[("A", "1"), ("B", "y")], "11"),
        obs(&[("A", "2"), ("B", "x")], "20"),
    ];
    let data = build_dataset(
        observations,
        &two_dims(),
        DimensionAtObservation::Dimension("B".into()),
    )
    .unwrap();

    assert!(data.diagnostics.is_empty());
    let series = data.series();
    assert_eq!(series.len(), 2);
    let first = series.iter().find(|s| s.key.get("A") == Some("1")).unwrap();
    assert_eq!(first.observations.len(), 2);
    assert!(first.observations.iter().all(|o| o.key.len() == 1 && o.key.contains("B")));
    let second = series.iter().find(|s| s.key.get("A") == Some("2")).unwrap();
    assert_eq!(second.observations.len(), 1);
    assert_eq!(second.observations[0].value.as_f64(), Some(20.0));
}

#[test]
fn test_all_dimensions_keeps_observations_flat() {
    let observations = vec![
        obs(&[("B", "x"), ("A", "1")], "10"),
        obs(&[("A", "2"), ("B", "y")], ""),
    ];
    let data = build_dataset(observations, &two_dims(), DimensionAtObservation::AllDimensions).unwrap();
    assert!(data.is_flat());
    let keys: Vec<String> = data.flat_observations().iter().map(|o| o.key.to_string()).collect();
    assert_eq!(keys, ["1.x", "2.y"]);
    assert!(data.flat_observations()[1].value.is_missing());
}

#[rstest]
#[case::too_short(&[("A", "1")])]
#[case::too_long(&[("A", "1"), ("B", "x"), ("C", "z")])]
fn test_key_arity_is_reported_not_fatal(#[case] pairs: &[(&str, &str)]) {
    let observations = vec![obs(&[("A", "1"), ("B", "x")], "1"), obs(pairs, "2")];
    let data = build_dataset(observations, &two_dims(), DimensionAtObservation::AllDimensions).unwrap();
    assert_eq!(data.observation_count(), 1);
    assert!(data.diagnostics.iter().any(|d| d.has_code(codes::KEY_ARITY_MISMATCH)));
}

#[test]
fn test_duplicate_observation_keeps_first() {
    let observations = vec![
        obs(&[("A", "1"), ("B", "x")], "1"),
        obs(&[("A", "1"), ("B", "x")], "2"),
    ];
    let data = build_dataset(observations, &two_dims(), DimensionAtObservation::AllDimensions).unwrap();
    assert_eq!(data.observation_count(), 1);
    assert_eq!(data.flat_observations()[0].value.as_str(), Some("1"));
    assert!(data.diagnostics.iter().any(|d| d.has_code(codes::DUPLICATE_OBSERVATION)));
}

#[test]
fn test_unknown_dimension_at_observation_is_rejected() {
    let result = build_dataset(
        vec![obs(&[("A", "1"), ("B", "x")], "1")],
        &two_dims(),
        DimensionAtObservation::Dimension("C".into()),
    );
    assert!(matches!(result, Err(SdmxError::MalformedDocument { .. })));
}

#[test]
fn test_make_key_orders_and_checks_arity() {
    let dsd = exr();
    let key = dsd
        .make_key([("CURRENCY", "USD"), (TIME_PERIOD, "2000-01"), ("FREQ", "M")])
        .unwrap();
    assert_eq!(key.to_string(), "M.USD.2000-01");
    assert_eq!(dsd.key_string(&Key::from_iter([("FREQ", "M"), (TIME_PERIOD, "2000")])), "M..2000");

    assert!(matches!(
        dsd.make_key([("FREQ", "M"), ("CURRENCY", "USD")]),
        Err(SdmxError::KeyArityMismatch { expected: 3, found: 2, .. })
    ));
    assert!(matches!(
        dsd.make_key([("FREQ", "M"), ("CURRENCY", "USD"), ("REF_AREA", "CH")]),
        Err(SdmxError::KeyArityMismatch { .. })
    ));
}

#[test]
fn test_observation_stream_skips_invalid() {
    let dsd = two_dims();
    let raw = vec![
        obs(&[("A", "1"), ("B", "x")], "1"),
        obs(&[("A", "1")], "2"),
        obs(&[("A", "1"), ("B", "x")], "3"),
        obs(&[("B", "y"), ("A", "2")], "4"),
    ];
    let mut stream = ObservationStream::new(&dsd, raw);
    let keys: Vec<String> = stream.by_ref().map(|o| o.key.to_string()).collect();
    assert_eq!(keys, ["1.x", "2.y"]);
    let diagnostics = stream.take_diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].has_code(codes::KEY_ARITY_MISMATCH));
    assert!(diagnostics[1].has_code(codes::DUPLICATE_OBSERVATION));
}

#[test]
fn test_generic_data_with_supplied_structure() {
    let message = read(GENERIC.as_bytes(), &supplied()).unwrap();
    assert!(message.is_data());
    assert_eq!(message.all_diagnostics().count(), 0);

    let data = &message.data[0];
    assert_eq!(data.action.as_deref(), Some("Replace"));
    assert_eq!(data.attributes.get("UNIT_MULT").map(String::as_str), Some("0"));
    assert_eq!(data.series().len(), 2);
    assert_eq!(data.observation_count(), 4);
    assert!(message.structure_for(data).is_some());

    let chf = &data.series()[0];
    assert_eq!(chf.key.to_string(), "M.CHF");
    assert_eq!(chf.attributes.get("TITLE").map(String::as_str), Some("Swiss franc"));
    assert_eq!(chf.observations[1].value, ObsValue::Text("NaN".to_owned()));
    assert!(data.series()[1].observations[1].value.is_missing());
}

#[test]
fn test_generic_data_without_structure_is_provisional() {
    let message = read(GENERIC.as_bytes(), &ReaderOptions::new()).unwrap();
    assert!(
        message
            .all_diagnostics()
            .any(|d| d.has_code(codes::PROVISIONAL_STRUCTURE))
    );
    let data = &message.data[0];
    assert_eq!(data.observation_count(), 4);
    let dsd = message.structure_for(data).unwrap();
    assert!(dsd.dimension("FREQ").is_some());
    assert!(dsd.dimension("CURRENCY").is_some());
    assert!(dsd.dimension(TIME_PERIOD).is_some());
}

#[rstest]
#[case::generic(Format::GenericDataXml)]
#[case::structure_specific(Format::StructureSpecificDataXml)]
#[case::json_one(Format::DataJson(JsonVersion::V1))]
#[case::json_two(Format::DataJson(JsonVersion::V2))]
fn test_data_survives_every_format(#[case] format: Format) {
    let dsd = exr();
    let original = read(GENERIC.as_bytes(), &supplied()).unwrap();
    let output = write(&original, &WriterOptions::new(format)).unwrap();
    assert_eq!(output.content_type, format.content_type());

    let back = read(&output.bytes, &supplied()).unwrap();
    assert_eq!(back.data.len(), 1);
    assert_eq!(back.data[0].attributes, original.data[0].attributes);
    assert_eq!(flatten(&back.data[0], &dsd), flatten(&original.data[0], &dsd));
    assert_eq!(back, original);
}

#[rstest]
#[case::generic(Format::GenericDataXml)]
#[case::structure_specific(Format::StructureSpecificDataXml)]
#[case::json_two(Format::DataJson(JsonVersion::V2))]
fn test_groups_survive(#[case] format: Format) {
    let options = ReaderOptions::new().with_structure(exr_with_sibling());
    let original = read(grouped().as_bytes(), &options).unwrap();
    assert_eq!(original.all_diagnostics().count(), 0);
    let group = &original.data[0].groups[0];
    assert_eq!(group.group_id.as_deref(), Some("SIBLING"));
    assert_eq!(group.key.to_string(), "CHF");
    assert_eq!(group.attributes.get("DECIMALS").map(String::as_str), Some("4"));

    let output = write(&original, &WriterOptions::new(format)).unwrap();
    let back = read(&output.bytes, &options).unwrap();
    assert_eq!(back.data[0].groups, original.data[0].groups);
    assert_eq!(back, original);
}

#[test]
fn test_json_one_refuses_groups() {
    let options = ReaderOptions::new().with_structure(exr_with_sibling());
    let original = read(grouped().as_bytes(), &options).unwrap();
    let result = write(&original, &WriterOptions::new(Format::DataJson(JsonVersion::V1)));
    assert!(matches!(result, Err(SdmxError::Write(_))));
}

#[test]
fn test_reading_is_deterministic() {
    let options = ReaderOptions::new().with_structure(exr_with_sibling());
    let input = grouped();
    assert_eq!(
        read(input.as_bytes(), &options).unwrap(),
        read(input.as_bytes(), &options).unwrap()
    );
    assert_eq!(
        read(GENERIC.as_bytes(), &ReaderOptions::new()).unwrap(),
        read(GENERIC.as_bytes(), &ReaderOptions::new()).unwrap()
    );
}

#[test]
fn test_bad_json_index_keeps_the_rest() {
    let json = write(
        &read(GENERIC.as_bytes(), &supplied()).unwrap(),
        &WriterOptions::new(Format::DataJson(JsonVersion::V1)),
    )
    .unwrap()
    .bytes;
    let json = String::from_utf8(json).unwrap().replacen("\"0:1\"", "\"0:9\"", 1);
    let message = read(json.as_bytes(), &supplied()).unwrap();

    let data = &message.data[0];
    assert_eq!(data.series().len(), 1);
    assert_eq!(data.series()[0].key.to_string(), "M.CHF");
    assert_eq!(data.observation_count(), 2);
    assert!(message.all_diagnostics().any(|d| d.has_code(codes::BAD_VALUE_INDEX)));
}

#[test]
fn test_regroup_on_write() {
    let original = read(GENERIC.as_bytes(), &supplied()).unwrap();
    let options = WriterOptions::new(Format::StructureSpecificDataXml)
        .with_dimension_at_observation(DimensionAtObservation::Dimension("CURRENCY".into()));
    let back = read(&write(&original, &options).unwrap().bytes, &supplied()).unwrap();

    let data = &back.data[0];
    assert_eq!(
        data.dimension_at_observation,
        DimensionAtObservation::Dimension("CURRENCY".into())
    );
    assert_eq!(data.series().len(), 2);
    assert!(data.series().iter().all(|s| s.observations.len() == 2));
    let mut regrouped = flatten(data, &exr());
    let mut expected = flatten(&original.data[0], &exr());
    regrouped.sort();
    expected.sort();
    assert_eq!(regrouped, expected);
}

#[test]
fn test_read_many_keeps_order() {
    let json = write(
        &read(GENERIC.as_bytes(), &supplied()).unwrap(),
        &WriterOptions::new(Format::DataJson(JsonVersion::V2)),
    )
    .unwrap()
    .bytes;
    let inputs = [GENERIC.as_bytes(), b"not sdmx".as_slice(), json.as_slice()];
    let results = read_many(&inputs, &supplied());

    assert_eq!(results.len(), 3);
    let first: &Message = results[0].as_ref().unwrap();
    assert_eq!(first.header.id.as_deref(), Some("EXR_M"));
    assert!(matches!(results[1], Err(SdmxError::UnknownFormat(_))));
    assert_eq!(results[2].as_ref().unwrap().data[0].observation_count(), 4);
}
