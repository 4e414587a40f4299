//! SDMX-JSON structure messages.

use indexmap::IndexMap;
use serde_json::Value;

use super::{header, place};
use crate::base::{ArtefactKind, format_urn};
use crate::format::JsonVersion;
use crate::message::Message;
use crate::model::{
    Annotation, Artefact, AttributeRelationship, ContentConstraint, DataAttribute,
    DataStructureDefinition, Dataflow, Dimension, DimensionKind, Identifiable, ItemKind,
    ItemScheme, Maintainable, Representation, SchemeKind, UsageStatus,
};
use crate::wire::{self, STRUCTURE_SCHEMA_V1, STRUCTURE_SCHEMA_V2, write_text};

pub(super) fn write_structures(message: &Message, version: JsonVersion) -> wire::StructureMessage {
    let schema = match version {
        JsonVersion::V1 => STRUCTURE_SCHEMA_V1,
        JsonVersion::V2 => STRUCTURE_SCHEMA_V2,
    };
    let (meta, header) = place(header(&message.header, schema, version), version);
    let writer = StructureWriter { version };

    let mut body = wire::StructureBody::default();
    for artefact in message.index.iter() {
        tracing::trace!(artefact = %artefact.identifier(), "writing");
        match artefact {
            Artefact::ItemScheme(scheme) => {
                let out = writer.item_scheme(scheme);
                match scheme.kind() {
                    SchemeKind::AgencyScheme => body.agency_schemes.push(out),
                    SchemeKind::CategoryScheme => body.category_schemes.push(out),
                    SchemeKind::Codelist => body.codelists.push(out),
                    SchemeKind::ConceptScheme => body.concept_schemes.push(out),
                }
            }
            Artefact::DataStructure(dsd) => body.data_structures.push(writer.data_structure(dsd)),
            Artefact::Dataflow(flow) => body.dataflows.push(writer.dataflow(flow)),
            Artefact::Constraint(c) => body.content_constraints.push(writer.content_constraint(c)),
        }
    }
    wire::StructureMessage {
        meta,
        header,
        data: body,
    }
}

/// Conversion into the shapes of one generation.
struct StructureWriter {
    version: JsonVersion,
}

impl StructureWriter {
    fn is_v1(&self) -> bool {
        self.version == JsonVersion::V1
    }

    // ========================================================================
    // COMMON
    // ========================================================================

    fn annotations(&self, list: &[Annotation]) -> Vec<wire::Annotation> {
        list.iter()
            .map(|a| {
                let (text, texts) = write_text(&a.text, self.version);
                wire::Annotation {
                    id: a.id.as_ref().map(ToString::to_string),
                    title: a.title.clone(),
                    annotation_type: a.annotation_type.clone(),
                    url: a.url.clone(),
                    text,
                    texts,
                }
            })
            .collect()
    }

    fn identifiable(&self, base: &Identifiable, urn: Option<String>) -> wire::Identifiable {
        let (name, names) = write_text(&base.name, self.version);
        let (description, descriptions) = write_text(&base.description, self.version);
        wire::Identifiable {
            id: base.id.to_string(),
            urn,
            name,
            names,
            description,
            descriptions,
            annotations: self.annotations(&base.annotations),
        }
    }

    fn maintainable(&self, m: &Maintainable, kind: ArtefactKind) -> wire::Maintainable {
        let (name, names) = write_text(&m.name, self.version);
        let (description, descriptions) = write_text(&m.description, self.version);
        wire::Maintainable {
            base: wire::Identifiable {
                id: m.id().to_owned(),
                urn: Some(format_urn(kind, &m.identifier, None)),
                name,
                names,
                description,
                descriptions,
                annotations: self.annotations(&m.annotations),
            },
            agency_id: m.agency_id().to_owned(),
            version: Some(m.version().to_owned()),
            is_final: m.is_final,
            is_external_reference: m.is_external_reference,
            valid_from: m.valid_from.clone(),
            valid_to: m.valid_to.clone(),
        }
    }

    fn representation(&self, repr: &Representation) -> wire::Representation {
        let facets = repr.text_format.as_ref().map(|format| {
            let type_key = if self.is_v1() { "textType" } else { "dataType" };
            let mut facets = IndexMap::new();
            if let Some(text_type) = &format.text_type {
                facets.insert(type_key.to_owned(), Value::from(text_type.as_str()));
            }
            for (facet, value) in &format.facets {
                facets.insert(facet.to_string(), Value::from(value.as_str()));
            }
            facets
        });
        let (text_format, format) = if self.is_v1() {
            (facets, None)
        } else {
            (None, facets)
        };
        wire::Representation {
            enumeration: repr.enumeration.as_ref().map(ToString::to_string),
            text_format,
            format,
        }
    }

    // ========================================================================
    // ITEM SCHEMES
    // ========================================================================

    fn item_scheme(&self, scheme: &ItemScheme) -> wire::ItemScheme {
        let kind = scheme.kind();
        let items: Vec<wire::Item> = scheme
            .iter()
            .map(|item| {
                let urn = format_urn(kind.item_artefact_kind(), scheme.identifier(), Some(item.id()));
                let core_representation = match &item.kind {
                    ItemKind::Concept {
                        core_representation: Some(repr),
                    } => Some(self.representation(repr)),
                    _ => None,
                };
                wire::Item {
                    base: self.identifiable(&item.base, Some(urn)),
                    parent: item.parent.as_ref().map(ToString::to_string),
                    core_representation,
                    categories: Vec::new(),
                }
            })
            .collect();

        let mut out = wire::ItemScheme {
            maintainable: self.maintainable(&scheme.maintainable, kind.artefact_kind()),
            is_partial: scheme.is_partial,
            ..wire::ItemScheme::default()
        };
        match kind {
            SchemeKind::Codelist => out.codes = items,
            SchemeKind::ConceptScheme => out.concepts = items,
            SchemeKind::CategoryScheme => out.categories = items,
            SchemeKind::AgencyScheme => out.agencies = items,
        }
        out
    }

    // ========================================================================
    // DATA STRUCTURES
    // ========================================================================

    fn data_structure(&self, dsd: &DataStructureDefinition) -> wire::DataStructure {
        let component_urn = |kind: ArtefactKind, id: &str| format_urn(kind, dsd.identifier(), Some(id));

        let mut dimension_list = wire::DimensionList::default();
        for (index, dim) in dsd.dimensions.iter().enumerate() {
            let component = self.dimension(dim, index + 1, component_urn(dimension_class(dim.kind), dim.id()));
            match dim.kind {
                DimensionKind::Time if self.is_v1() => dimension_list.time_dimensions.push(component),
                DimensionKind::Time if dimension_list.time_dimension.is_none() => {
                    dimension_list.time_dimension = Some(component);
                }
                _ => dimension_list.dimensions.push(component),
            }
        }

        let groups = dsd
            .groups
            .values()
            .map(|group| wire::Group {
                base: self.identifiable(&group.base, Some(component_urn(ArtefactKind::GroupDimensionDescriptor, group.id()))),
                group_dimensions: group.dimensions.iter().map(ToString::to_string).collect(),
            })
            .collect();

        let attributes: Vec<_> = dsd
            .attributes
            .values()
            .map(|attr| self.attribute(attr, dsd, component_urn(ArtefactKind::DataAttribute, attr.id())))
            .collect();

        let measure = &dsd.measure;
        let measure = wire::MeasureComponent {
            base: self.identifiable(
                &measure.base,
                Some(component_urn(ArtefactKind::PrimaryMeasure, &measure.base.id)),
            ),
            concept_identity: measure.concept.as_ref().map(ToString::to_string),
            local_representation: measure.local_representation.as_ref().map(|r| self.representation(r)),
        };
        let measure_list = if self.is_v1() {
            wire::MeasureList {
                primary_measure: Some(measure),
                measures: Vec::new(),
            }
        } else {
            wire::MeasureList {
                primary_measure: None,
                measures: vec![measure],
            }
        };

        wire::DataStructure {
            maintainable: self.maintainable(&dsd.maintainable, ArtefactKind::DataStructure),
            data_structure_components: wire::Components {
                dimension_list,
                groups,
                attribute_list: (!attributes.is_empty()).then_some(wire::AttributeList { attributes }),
                measure_list,
            },
        }
    }

    fn dimension(&self, dim: &Dimension, position: usize, urn: String) -> wire::DimensionComponent {
        wire::DimensionComponent {
            base: self.identifiable(&dim.base, Some(urn)),
            position: Some(position),
            kind: Some(dimension_class(dim.kind).class_name().to_owned()),
            concept_identity: dim.concept.as_ref().map(ToString::to_string),
            local_representation: dim.local_representation.as_ref().map(|r| self.representation(r)),
        }
    }

    fn attribute(&self, attr: &DataAttribute, dsd: &DataStructureDefinition, urn: String) -> wire::AttributeComponent {
        let (assignment_status, usage) = if self.is_v1() {
            (Some(attr.usage.as_str().to_owned()), None)
        } else {
            let usage = match attr.usage {
                UsageStatus::Mandatory => "mandatory",
                UsageStatus::Conditional => "optional",
            };
            (None, Some(usage.to_owned()))
        };
        wire::AttributeComponent {
            base: self.identifiable(&attr.base, Some(urn)),
            assignment_status,
            usage,
            attribute_relationship: self.relationship(&attr.relationship, dsd),
            concept_identity: attr.concept.as_ref().map(ToString::to_string),
            local_representation: attr.local_representation.as_ref().map(|r| self.representation(r)),
        }
    }

    fn relationship(&self, rel: &AttributeRelationship, dsd: &DataStructureDefinition) -> wire::Relationship {
        let empty = || Some(Value::Object(serde_json::Map::new()));
        match rel {
            AttributeRelationship::DataSet if self.is_v1() => wire::Relationship {
                none: empty(),
                ..wire::Relationship::default()
            },
            AttributeRelationship::DataSet => wire::Relationship {
                dataflow: empty(),
                ..wire::Relationship::default()
            },
            AttributeRelationship::Group(group) => wire::Relationship {
                group: Some(group.to_string()),
                ..wire::Relationship::default()
            },
            AttributeRelationship::Dimensions {
                dimensions,
                attachment_group,
            } => wire::Relationship {
                dimensions: Some(dimensions.iter().map(ToString::to_string).collect()),
                attachment_group: attachment_group.as_ref().map(ToString::to_string),
                ..wire::Relationship::default()
            },
            AttributeRelationship::Observation if self.is_v1() => wire::Relationship {
                primary_measure: Some(dsd.measure.base.id.to_string()),
                ..wire::Relationship::default()
            },
            AttributeRelationship::Observation => wire::Relationship {
                observation: empty(),
                ..wire::Relationship::default()
            },
        }
    }

    fn dataflow(&self, flow: &Dataflow) -> wire::Dataflow {
        wire::Dataflow {
            maintainable: self.maintainable(&flow.maintainable, ArtefactKind::Dataflow),
            structure: flow.structure.to_string(),
        }
    }

    fn content_constraint(&self, c: &ContentConstraint) -> wire::Constraint {
        let mut attachment = wire::ConstraintAttachment::default();
        for target in &c.attachments {
            if target.kind == ArtefactKind::Dataflow {
                attachment.dataflows.push(target.to_string());
            } else {
                attachment.data_structures.push(target.to_string());
            }
        }
        let cube_regions = c
            .regions
            .iter()
            .map(|region| {
                let (is_included, include) = if self.is_v1() {
                    (Some(region.included), None)
                } else {
                    (None, Some(region.included))
                };
                wire::CubeRegion {
                    is_included,
                    include,
                    key_values: region
                        .members
                        .iter()
                        .map(|(id, values)| wire::KeyValue {
                            id: id.to_string(),
                            values: values.iter().map(ToString::to_string).collect(),
                        })
                        .collect(),
                }
            })
            .collect();
        wire::Constraint {
            maintainable: self.maintainable(&c.maintainable, ArtefactKind::ContentConstraint),
            role: Some(c.role.as_str().to_owned()),
            constraint_attachment: (!c.attachments.is_empty()).then_some(attachment),
            cube_regions,
        }
    }
}

fn dimension_class(kind: DimensionKind) -> ArtefactKind {
    match kind {
        DimensionKind::Dimension => ArtefactKind::Dimension,
        DimensionKind::Time => ArtefactKind::TimeDimension,
        DimensionKind::Measure => ArtefactKind::MeasureDimension,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::options::{ReaderOptions, WriterOptions};
    use crate::reader;
    use crate::writer::write;

    const STRUCTURES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mes:Structure xmlns:mes="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/message"
    xmlns:str="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/structure"
    xmlns:com="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/common">
  <mes:Header><mes:ID>S1</mes:ID><mes:Test>false</mes:Test><mes:Sender id="ECB"/></mes:Header>
  <mes:Structures>
    <str:Codelists>
      <str:Codelist id="CL_FREQ" agencyID="ECB" version="1.0">
        <com:Name xml:lang="en">Frequency</com:Name>
        <com:Name xml:lang="de">Frequenz</com:Name>
        <str:Code id="A"><com:Name xml:lang="en">Annual</com:Name></str:Code>
        <str:Code id="M"><com:Name xml:lang="en">Monthly</com:Name><str:Parent><Ref id="A"/></str:Parent></str:Code>
      </str:Codelist>
    </str:Codelists>
    <str:Concepts>
      <str:ConceptScheme id="ECB_CONCEPTS" agencyID="ECB" version="1.0">
        <str:Concept id="FREQ">
          <com:Annotations><com:Annotation id="A1"><com:AnnotationType>NOTE</com:AnnotationType>
            <com:AnnotationText xml:lang="en">Sampling</com:AnnotationText></com:Annotation></com:Annotations>
          <com:Name xml:lang="en">Frequency</com:Name>
          <str:CoreRepresentation><str:Enumeration><Ref id="CL_FREQ" agencyID="ECB" version="1.0" class="Codelist" package="codelist"/></str:Enumeration></str:CoreRepresentation>
        </str:Concept>
        <str:Concept id="TIME_PERIOD"/>
        <str:Concept id="OBS_STATUS"/>
        <str:Concept id="UNIT_MULT"/>
        <str:Concept id="OBS_VALUE"/>
      </str:ConceptScheme>
    </str:Concepts>
    <str:DataStructures>
      <str:DataStructure id="DSD" agencyID="ECB" version="1.0">
        <str:DataStructureComponents>
          <str:DimensionList id="DimensionDescriptor">
            <str:Dimension id="FREQ" position="1">
              <str:ConceptIdentity><Ref id="FREQ" maintainableParentID="ECB_CONCEPTS" maintainableParentVersion="1.0" agencyID="ECB" class="Concept" package="conceptscheme"/></str:ConceptIdentity>
              <str:LocalRepresentation><str:Enumeration><Ref id="CL_FREQ" agencyID="ECB" version="1.0" class="Codelist" package="codelist"/></str:Enumeration></str:LocalRepresentation>
            </str:Dimension>
            <str:TimeDimension id="TIME_PERIOD" position="2">
              <str:ConceptIdentity><Ref id="TIME_PERIOD" maintainableParentID="ECB_CONCEPTS" maintainableParentVersion="1.0" agencyID="ECB" class="Concept" package="conceptscheme"/></str:ConceptIdentity>
              <str:LocalRepresentation><str:TextFormat textType="ObservationalTimePeriod"/></str:LocalRepresentation>
            </str:TimeDimension>
          </str:DimensionList>
          <str:Group id="SIBLING">
            <str:GroupDimension><str:DimensionReference><Ref id="FREQ"/></str:DimensionReference></str:GroupDimension>
          </str:Group>
          <str:AttributeList id="AttributeDescriptor">
            <str:Attribute id="OBS_STATUS" assignmentStatus="Mandatory">
              <str:ConceptIdentity><Ref id="OBS_STATUS" maintainableParentID="ECB_CONCEPTS" maintainableParentVersion="1.0" agencyID="ECB" class="Concept" package="conceptscheme"/></str:ConceptIdentity>
              <str:LocalRepresentation><str:TextFormat textType="String" maxLength="1"/></str:LocalRepresentation>
              <str:AttributeRelationship><str:PrimaryMeasure><Ref id="OBS_VALUE"/></str:PrimaryMeasure></str:AttributeRelationship>
            </str:Attribute>
            <str:Attribute id="UNIT_MULT" assignmentStatus="Conditional">
              <str:ConceptIdentity><Ref id="UNIT_MULT" maintainableParentID="ECB_CONCEPTS" maintainableParentVersion="1.0" agencyID="ECB" class="Concept" package="conceptscheme"/></str:ConceptIdentity>
              <str:AttributeRelationship><str:Dimension><Ref id="FREQ"/></str:Dimension><str:AttachmentGroup><Ref id="SIBLING"/></str:AttachmentGroup></str:AttributeRelationship>
            </str:Attribute>
          </str:AttributeList>
          <str:MeasureList id="MeasureDescriptor">
            <str:PrimaryMeasure id="OBS_VALUE">
              <str:ConceptIdentity><Ref id="OBS_VALUE" maintainableParentID="ECB_CONCEPTS" maintainableParentVersion="1.0" agencyID="ECB" class="Concept" package="conceptscheme"/></str:ConceptIdentity>
            </str:PrimaryMeasure>
          </str:MeasureList>
        </str:DataStructureComponents>
      </str:DataStructure>
    </str:DataStructures>
    <str:Dataflows>
      <str:Dataflow id="EXR" agencyID="ECB" version="1.0">
        <str:Structure><Ref id="DSD" agencyID="ECB" version="1.0" class="DataStructure" package="datastructure"/></str:Structure>
      </str:Dataflow>
    </str:Dataflows>
    <str:Constraints>
      <str:ContentConstraint id="C" agencyID="ECB" version="1.0" type="Actual">
        <str:ConstraintAttachment><str:Dataflow><Ref id="EXR" agencyID="ECB" version="1.0" class="Dataflow" package="datastructure"/></str:Dataflow></str:ConstraintAttachment>
        <str:CubeRegion include="false"><com:KeyValue id="FREQ"><com:Value>M</com:Value></com:KeyValue></str:CubeRegion>
      </str:ContentConstraint>
    </str:Constraints>
  </mes:Structures>
</mes:Structure>"#;

    fn round_trip(version: JsonVersion) {
        let original = reader::read(STRUCTURES.as_bytes(), &ReaderOptions::default()).expect("read xml");
        let json = write(&original, &WriterOptions::new(Format::StructureJson(version))).expect("write json");
        let back = reader::read(&json.bytes, &ReaderOptions::default()).expect("read json");
        assert_eq!(back.index, original.index);

        let again = write(&back, &WriterOptions::new(Format::StructureJson(version))).expect("rewrite");
        assert_eq!(again.bytes, json.bytes);
    }

    #[test]
    fn test_structures_round_trip_generation_one() {
        round_trip(JsonVersion::V1);
    }

    #[test]
    fn test_structures_round_trip_generation_two() {
        round_trip(JsonVersion::V2);
    }

    #[test]
    fn test_generation_shapes() {
        let original = reader::read(STRUCTURES.as_bytes(), &ReaderOptions::default()).expect("read xml");
        let v1 = write(&original, &WriterOptions::new(Format::StructureJson(JsonVersion::V1))).expect("v1");
        let v1: Value = serde_json::from_slice(&v1.bytes).expect("json");
        let components = &v1["data"]["dataStructures"][0]["dataStructureComponents"];
        assert_eq!(components["dimensionList"]["timeDimensions"][0]["id"], "TIME_PERIOD");
        assert_eq!(components["measureList"]["primaryMeasure"]["id"], "OBS_VALUE");
        assert_eq!(components["attributeList"]["attributes"][0]["assignmentStatus"], "Mandatory");
        assert_eq!(
            components["attributeList"]["attributes"][0]["attributeRelationship"]["primaryMeasure"],
            "OBS_VALUE"
        );

        let v2 = write(&original, &WriterOptions::new(Format::StructureJson(JsonVersion::V2))).expect("v2");
        let v2: Value = serde_json::from_slice(&v2.bytes).expect("json");
        let components = &v2["data"]["dataStructures"][0]["dataStructureComponents"];
        assert_eq!(components["dimensionList"]["timeDimension"]["id"], "TIME_PERIOD");
        assert_eq!(
            components["dimensionList"]["timeDimension"]["localRepresentation"]["format"]["dataType"],
            "ObservationalTimePeriod"
        );
        assert_eq!(components["attributeList"]["attributes"][0]["usage"], "mandatory");
        assert_eq!(components["attributeList"]["attributes"][1]["attributeRelationship"]["attachmentGroup"], "SIBLING");
        assert_eq!(v2["data"]["contentConstraints"][0]["cubeRegions"][0]["include"], false);
        assert_eq!(v2["data"]["codelists"][0]["names"]["de"], "Frequenz");
    }
}
