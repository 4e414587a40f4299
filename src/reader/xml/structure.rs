//! Structure messages: `mes:Structures` and its artefact sections.

use smol_str::SmolStr;

use super::tree::Node;
use super::{annotations, international_string, local_ref, reference};
use crate::base::{ArtefactKind, DEFAULT_VERSION, Identifier};
use crate::diagnostics::{Diagnostic, codes};
use crate::error::{Result, SdmxError};
use crate::model::{
    Artefact, AttributeRelationship, ConstraintRole, ContentConstraint, CubeRegion, DataAttribute,
    DataStructureDefinition, Dataflow, Dimension, DimensionDescriptor, DimensionKind,
    GroupDimensionDescriptor, Identifiable, Item, ItemKind, ItemScheme, Maintainable,
    PrimaryMeasure, Reference, Representation, SchemeKind, TextFormat, UsageStatus,
};
use crate::reader::{Document, check_urn};

pub(super) fn read_structures(root: &Node, doc: &mut Document) -> Result<()> {
    let Some(structures) = root.child("Structures") else {
        return Ok(());
    };
    for section in &structures.children {
        match section.local.as_str() {
            "OrganisationSchemes" => {
                for scheme in &section.children {
                    if scheme.local == "AgencyScheme" {
                        let artefact = item_scheme(scheme, SchemeKind::AgencyScheme)?;
                        register(doc, artefact.into(), scheme)?;
                    } else {
                        ignore(doc, scheme);
                    }
                }
            }
            "Codelists" => {
                for node in section.children_named("Codelist") {
                    register(doc, item_scheme(node, SchemeKind::Codelist)?.into(), node)?;
                }
            }
            "Concepts" => {
                for node in section.children_named("ConceptScheme") {
                    register(doc, item_scheme(node, SchemeKind::ConceptScheme)?.into(), node)?;
                }
            }
            "CategorySchemes" => {
                for node in section.children_named("CategoryScheme") {
                    register(doc, item_scheme(node, SchemeKind::CategoryScheme)?.into(), node)?;
                }
            }
            "DataStructures" => {
                for node in section.children_named("DataStructure") {
                    register(doc, data_structure(node)?.into(), node)?;
                }
            }
            "Dataflows" => {
                for node in section.children_named("Dataflow") {
                    register(doc, dataflow(node)?.into(), node)?;
                }
            }
            "Constraints" => {
                for node in &section.children {
                    if node.local == "ContentConstraint" {
                        register(doc, constraint(node)?.into(), node)?;
                    } else {
                        ignore(doc, node);
                    }
                }
            }
            _ => ignore(doc, section),
        }
    }
    Ok(())
}

fn register(doc: &mut Document, artefact: Artefact, node: &Node) -> Result<()> {
    doc.diagnostics
        .extend(check_urn(&artefact, node.attr("urn"), node.location()));
    doc.index
        .register(artefact)
        .map_err(|e| match e {
            SdmxError::DuplicateArtefact { identifier, .. } => SdmxError::DuplicateArtefact {
                identifier,
                location: node.location(),
            },
            other => other,
        })
        .map(drop)
}

fn ignore(doc: &mut Document, node: &Node) {
    tracing::debug!(element = %node.name, "skipping unsupported structure content");
    doc.diagnostics.push(
        Diagnostic::info(format!("{} is not read", node.local))
            .with_code(codes::IGNORED_CONTENT)
            .with_location(node.location()),
    );
}

// ============================================================================
// COMMON
// ============================================================================

fn identifiable(node: &Node) -> Result<Identifiable> {
    Ok(Identifiable {
        id: SmolStr::new(node.required_attr("id")?),
        name: international_string(node, "Name"),
        description: international_string(node, "Description"),
        annotations: annotations(node),
    })
}

/// Components may omit their id and take it from their concept.
fn component(node: &Node, agency: &str) -> Result<(Identifiable, Option<Reference>)> {
    let concept = node
        .child("ConceptIdentity")
        .map(|c| reference(c, ArtefactKind::Concept, agency))
        .transpose()?;
    let id = match (node.attr("id"), &concept) {
        (Some(id), _) => SmolStr::new(id),
        (None, Some(concept)) => concept.item_id.clone().unwrap_or_default(),
        (None, None) => SmolStr::new(node.required_attr("id")?),
    };
    Ok((
        Identifiable {
            id,
            name: international_string(node, "Name"),
            description: international_string(node, "Description"),
            annotations: annotations(node),
        },
        concept,
    ))
}

fn maintainable(node: &Node) -> Result<Maintainable> {
    let identifier = Identifier::new(
        node.required_attr("agencyID")?,
        node.required_attr("id")?,
        node.attr("version").unwrap_or(DEFAULT_VERSION),
    );
    Ok(Maintainable {
        identifier,
        name: international_string(node, "Name"),
        description: international_string(node, "Description"),
        annotations: annotations(node),
        is_final: node.flag("isFinal", false),
        is_external_reference: node.flag("isExternalReference", false),
        valid_from: node.attr("validFrom").map(str::to_owned),
        valid_to: node.attr("validTo").map(str::to_owned),
    })
}

fn representation(node: &Node, agency: &str) -> Result<Representation> {
    let enumeration = node
        .child("Enumeration")
        .map(|e| reference(e, ArtefactKind::Codelist, agency))
        .transpose()?;
    let text_format = node
        .child("TextFormat")
        .or_else(|| node.child("EnumerationFormat"))
        .map(|f| {
            let mut format = TextFormat::default();
            for (name, value) in &f.attrs {
                if name == "textType" {
                    format.text_type = Some(SmolStr::new(value));
                } else {
                    format.facets.insert(name.clone(), value.clone());
                }
            }
            format
        });
    Ok(Representation {
        enumeration,
        text_format,
    })
}

// ============================================================================
// ITEM SCHEMES
// ============================================================================

fn item_element(kind: SchemeKind) -> &'static str {
    match kind {
        SchemeKind::Codelist => "Code",
        SchemeKind::ConceptScheme => "Concept",
        SchemeKind::CategoryScheme => "Category",
        SchemeKind::AgencyScheme => "Agency",
    }
}

fn item_scheme(node: &Node, kind: SchemeKind) -> Result<ItemScheme> {
    let maintainable = maintainable(node)?;
    let agency = maintainable.agency_id().to_owned();
    let mut scheme = ItemScheme::new(kind, maintainable);
    scheme.is_partial = node.flag("isPartial", false);
    read_items(node, &mut scheme, None, &agency)?;
    Ok(scheme)
}

/// Items may nest (categories always do); nesting becomes a parent link.
fn read_items(node: &Node, scheme: &mut ItemScheme, parent: Option<&SmolStr>, agency: &str) -> Result<()> {
    let element = item_element(scheme.kind());
    for child in node.children_named(element) {
        let base = identifiable(child)?;
        let kind = match scheme.kind().default_item_kind() {
            ItemKind::Concept { .. } => ItemKind::Concept {
                core_representation: child
                    .child("CoreRepresentation")
                    .map(|r| representation(r, agency))
                    .transpose()?,
            },
            other => other,
        };
        let mut item = Item::new(base, kind);
        item.parent = match child.child("Parent") {
            Some(p) => Some(local_ref(p)?),
            None => parent.cloned(),
        };
        let id = item.base.id.clone();
        scheme
            .insert(item)
            .map_err(|e| SdmxError::malformed(e.to_string(), child.location()))?;
        read_items(child, scheme, Some(&id), agency)?;
    }
    Ok(())
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

fn data_structure(node: &Node) -> Result<DataStructureDefinition> {
    let maintainable = maintainable(node)?;
    let agency = maintainable.agency_id().to_owned();
    let components = node.required_child("DataStructureComponents")?;

    let mut positioned = Vec::new();
    if let Some(list) = components.child("DimensionList") {
        for (index, child) in list.children.iter().enumerate() {
            let kind = match child.local.as_str() {
                "Dimension" => DimensionKind::Dimension,
                "TimeDimension" => DimensionKind::Time,
                "MeasureDimension" => DimensionKind::Measure,
                _ => continue,
            };
            let (base, concept) = component(child, &agency)?;
            let position = child
                .attr("position")
                .and_then(|p| p.parse::<usize>().ok())
                .unwrap_or(usize::MAX);
            let dimension = Dimension {
                base,
                kind,
                concept,
                local_representation: child
                    .child("LocalRepresentation")
                    .map(|r| representation(r, &agency))
                    .transpose()?,
            };
            positioned.push((position, index, dimension));
        }
    }
    positioned.sort_by_key(|(position, index, _)| (*position, *index));
    let dimensions = DimensionDescriptor::new(positioned.into_iter().map(|(_, _, d)| d))
        .map_err(|e| SdmxError::malformed(e.to_string(), components.location()))?;

    let mut dsd = DataStructureDefinition::new(maintainable, dimensions);

    for group in components.children_named("Group") {
        let mut dims = Vec::new();
        for member in group.children_named("GroupDimension") {
            dims.push(local_ref(member.required_child("DimensionReference")?)?);
        }
        dsd = dsd.with_group(GroupDimensionDescriptor {
            base: identifiable(group)?,
            dimensions: dims,
        });
    }

    if let Some(list) = components.child("AttributeList") {
        for child in list.children_named("Attribute") {
            let (base, concept) = component(child, &agency)?;
            let usage = match child.attr("assignmentStatus") {
                Some("Mandatory") => UsageStatus::Mandatory,
                _ => UsageStatus::Conditional,
            };
            dsd = dsd.with_attribute(DataAttribute {
                base,
                concept,
                local_representation: child
                    .child("LocalRepresentation")
                    .map(|r| representation(r, &agency))
                    .transpose()?,
                relationship: relationship(child.child("AttributeRelationship"))?,
                usage,
            });
        }
    }

    if let Some(measure) = components
        .child("MeasureList")
        .and_then(|l| l.child("PrimaryMeasure"))
    {
        let (base, concept) = component(measure, &agency)?;
        dsd.measure = PrimaryMeasure {
            base,
            concept,
            local_representation: measure
                .child("LocalRepresentation")
                .map(|r| representation(r, &agency))
                .transpose()?,
        };
    }
    Ok(dsd)
}

fn relationship(node: Option<&Node>) -> Result<AttributeRelationship> {
    let Some(node) = node else {
        return Ok(AttributeRelationship::DataSet);
    };
    if node.child("PrimaryMeasure").is_some() {
        return Ok(AttributeRelationship::Observation);
    }
    if let Some(group) = node.child("Group") {
        return Ok(AttributeRelationship::Group(local_ref(group)?));
    }
    let dimensions = node
        .children_named("Dimension")
        .map(local_ref)
        .collect::<Result<Vec<_>>>()?;
    if !dimensions.is_empty() {
        let attachment_group = node.child("AttachmentGroup").map(local_ref).transpose()?;
        return Ok(AttributeRelationship::Dimensions {
            dimensions,
            attachment_group,
        });
    }
    Ok(AttributeRelationship::DataSet)
}

// ============================================================================
// DATAFLOWS AND CONSTRAINTS
// ============================================================================

fn dataflow(node: &Node) -> Result<Dataflow> {
    let maintainable = maintainable(node)?;
    let structure = reference(
        node.required_child("Structure")?,
        ArtefactKind::DataStructure,
        maintainable.agency_id(),
    )?;
    Ok(Dataflow {
        maintainable,
        structure,
    })
}

fn constraint(node: &Node) -> Result<ContentConstraint> {
    let maintainable = maintainable(node)?;
    let agency = maintainable.agency_id().to_owned();
    let role = match node.attr("type") {
        Some(role) => ConstraintRole::parse(role).ok_or_else(|| {
            SdmxError::malformed(format!("unknown constraint type {role}"), node.location())
        })?,
        None => ConstraintRole::default(),
    };
    let mut constraint = ContentConstraint::new(maintainable, role);

    if let Some(attachment) = node.child("ConstraintAttachment") {
        for target in &attachment.children {
            let kind = ArtefactKind::from_class_name(&target.local)
                .filter(ArtefactKind::is_maintainable)
                .unwrap_or(ArtefactKind::Dataflow);
            constraint.attachments.push(reference(target, kind, &agency)?);
        }
    }

    for region in node.children_named("CubeRegion") {
        let mut cube = CubeRegion {
            included: region.flag("include", true),
            ..CubeRegion::default()
        };
        for key_value in region.children_named("KeyValue") {
            let values: Vec<SmolStr> = key_value
                .children_named("Value")
                .map(|v| SmolStr::new(v.text.trim()))
                .collect();
            cube = cube.with_member(key_value.required_attr("id")?, values);
        }
        constraint.regions.push(cube);
    }
    Ok(constraint)
}

#[cfg(test)]
mod tests {
    use super::super::tree;
    use super::*;
    use crate::message::{Header, MessageKind};

    const STRUCTURES: &str = r#"<mes:Structure xmlns:mes="m" xmlns:str="s" xmlns:com="c">
<mes:Structures>
  <str:Codelists>
    <str:Codelist id="CL_FREQ" agencyID="ECB" version="1.0" isFinal="true">
      <com:Name xml:lang="en">Frequency</com:Name>
      <str:Code id="A"><com:Name xml:lang="en">Annual</com:Name></str:Code>
      <str:Code id="M"><com:Name xml:lang="en">Monthly</com:Name><str:Parent><Ref id="A"/></str:Parent></str:Code>
    </str:Codelist>
  </str:Codelists>
  <str:CategorySchemes>
    <str:CategoryScheme id="TOPICS" agencyID="ECB">
      <str:Category id="ECO"><str:Category id="EXR"/></str:Category>
    </str:CategoryScheme>
  </str:CategorySchemes>
  <str:DataStructures>
    <str:DataStructure id="ECB_EXR1" agencyID="ECB" version="1.0">
      <str:DataStructureComponents>
        <str:DimensionList id="DimensionDescriptor">
          <str:TimeDimension id="TIME_PERIOD" position="2">
            <str:ConceptIdentity><Ref id="TIME_PERIOD" maintainableParentID="ECB_CONCEPTS" maintainableParentVersion="1.0" agencyID="ECB" class="Concept" package="conceptscheme"/></str:ConceptIdentity>
          </str:TimeDimension>
          <str:Dimension id="FREQ" position="1">
            <str:ConceptIdentity><Ref id="FREQ" maintainableParentID="ECB_CONCEPTS" agencyID="ECB" class="Concept"/></str:ConceptIdentity>
            <str:LocalRepresentation><str:Enumeration><Ref id="CL_FREQ" agencyID="ECB" version="1.0" class="Codelist" package="codelist"/></str:Enumeration></str:LocalRepresentation>
          </str:Dimension>
        </str:DimensionList>
        <str:Group id="SIBLING">
          <str:GroupDimension><str:DimensionReference><Ref id="FREQ"/></str:DimensionReference></str:GroupDimension>
        </str:Group>
        <str:AttributeList>
          <str:Attribute id="UNIT_MULT" assignmentStatus="Mandatory"><str:AttributeRelationship><str:None/></str:AttributeRelationship></str:Attribute>
          <str:Attribute id="DECIMALS"><str:AttributeRelationship><str:Group><Ref id="SIBLING"/></str:Group></str:AttributeRelationship></str:Attribute>
          <str:Attribute id="TITLE"><str:AttributeRelationship><str:Dimension><Ref id="FREQ"/></str:Dimension></str:AttributeRelationship></str:Attribute>
          <str:Attribute id="OBS_STATUS"><str:AttributeRelationship><str:PrimaryMeasure><Ref id="OBS_VALUE"/></str:PrimaryMeasure></str:AttributeRelationship></str:Attribute>
        </str:AttributeList>
        <str:MeasureList id="MeasureDescriptor"><str:PrimaryMeasure id="OBS_VALUE"/></str:MeasureList>
      </str:DataStructureComponents>
    </str:DataStructure>
  </str:DataStructures>
  <str:Constraints>
    <str:ContentConstraint id="EXR_CONSTRAINT" agencyID="ECB" type="Allowed">
      <str:ConstraintAttachment><str:Dataflow><Ref id="EXR" agencyID="ECB" version="1.0"/></str:Dataflow></str:ConstraintAttachment>
      <str:CubeRegion include="true"><com:KeyValue id="FREQ"><com:Value>A</com:Value><com:Value>M</com:Value></com:KeyValue></str:CubeRegion>
    </str:ContentConstraint>
  </str:Constraints>
  <str:Categorisations/>
</mes:Structures>
</mes:Structure>"#;

    fn read() -> Document {
        let root = tree::parse(STRUCTURES.as_bytes()).expect("xml");
        let mut doc = Document::new(MessageKind::Structure, Header::default());
        read_structures(&root, &mut doc).expect("structures");
        doc
    }

    #[test]
    fn test_codelist_hierarchy() {
        let doc = read();
        let cl = doc
            .index
            .get(ArtefactKind::Codelist, &Identifier::new("ECB", "CL_FREQ", "1.0"))
            .and_then(Artefact::as_item_scheme)
            .expect("codelist");
        assert!(cl.maintainable.is_final);
        assert_eq!(cl.parent("M").map(Item::id), Some("A"));
        assert_eq!(cl.get("A").and_then(|c| c.base.name.get("en")), Some("Annual"));
    }

    #[test]
    fn test_nested_categories_become_parent_links() {
        let doc = read();
        let scheme = doc
            .index
            .get(ArtefactKind::CategoryScheme, &Identifier::new("ECB", "TOPICS", "1.0"))
            .and_then(Artefact::as_item_scheme)
            .expect("category scheme");
        assert_eq!(scheme.parent("EXR").map(Item::id), Some("ECO"));
    }

    #[test]
    fn test_data_structure_components() {
        let doc = read();
        let dsd = doc
            .index
            .data_structure(&Identifier::new("ECB", "ECB_EXR1", "1.0"))
            .expect("dsd");
        let ids: Vec<_> = dsd.dimensions.ids().collect();
        assert_eq!(ids, vec!["FREQ", "TIME_PERIOD"]);
        assert_eq!(
            dsd.dimension("FREQ").and_then(|d| d.enumeration()).map(|r| r.target.id.as_str()),
            Some("CL_FREQ")
        );
        assert_eq!(dsd.group("SIBLING").map(|g| g.dimensions.len()), Some(1));
        assert_eq!(
            dsd.attribute("UNIT_MULT").map(|a| a.usage),
            Some(UsageStatus::Mandatory)
        );
        assert_eq!(
            dsd.attribute("DECIMALS").map(|a| &a.relationship),
            Some(&AttributeRelationship::Group("SIBLING".into()))
        );
        assert_eq!(
            dsd.attribute("OBS_STATUS").map(|a| &a.relationship),
            Some(&AttributeRelationship::Observation)
        );
        assert_eq!(dsd.measure.base.id, "OBS_VALUE");
    }

    #[test]
    fn test_constraint_and_ignored_sections() {
        let doc = read();
        let constraint = doc
            .index
            .iter_kind(ArtefactKind::ContentConstraint)
            .find_map(Artefact::as_constraint)
            .expect("constraint");
        assert_eq!(constraint.role, ConstraintRole::Allowed);
        assert_eq!(constraint.attachments[0].kind, ArtefactKind::Dataflow);
        assert_eq!(constraint.regions[0].members["FREQ"].len(), 2);
        assert!(doc.diagnostics.iter().any(|d| d.has_code(codes::IGNORED_CONTENT)));
    }

    #[test]
    fn test_duplicate_definition_is_error() {
        let xml = r#"<mes:Structure><mes:Structures><str:Codelists>
<str:Codelist id="CL" agencyID="ECB"><str:Code id="A"/></str:Codelist>
<str:Codelist id="CL" agencyID="ECB"><str:Code id="B"/></str:Codelist>
</str:Codelists></mes:Structures></mes:Structure>"#;
        let root = tree::parse(xml.as_bytes()).expect("xml");
        let mut doc = Document::new(MessageKind::Structure, Header::default());
        let err = read_structures(&root, &mut doc);
        assert!(matches!(err, Err(SdmxError::DuplicateArtefact { .. })));
    }
}
