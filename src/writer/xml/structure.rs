//! Structure messages: `mes:Structures` and its artefact sections.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use super::{annotations, emit, end, local_reference, localized, reference, text_element};
use crate::base::{ArtefactKind, format_urn};
use crate::error::Result;
use crate::message::Message;
use crate::model::{
    Artefact, AttributeRelationship, ContentConstraint, DataAttribute, DataStructureDefinition,
    Dataflow, Dimension, DimensionKind, Identifiable, ItemKind, ItemScheme, Maintainable,
    Reference, Representation, SchemeKind,
};

/// Sections in schema order, with the element wrapping each.
const SECTIONS: &[(&str, ArtefactKind)] = &[
    ("str:OrganisationSchemes", ArtefactKind::AgencyScheme),
    ("str:Dataflows", ArtefactKind::Dataflow),
    ("str:CategorySchemes", ArtefactKind::CategoryScheme),
    ("str:Codelists", ArtefactKind::Codelist),
    ("str:Concepts", ArtefactKind::ConceptScheme),
    ("str:DataStructures", ArtefactKind::DataStructure),
    ("str:Constraints", ArtefactKind::ContentConstraint),
];

pub(super) fn write_structures<W: Write>(writer: &mut Writer<W>, message: &Message) -> Result<()> {
    if message.index.is_empty() {
        return Ok(());
    }
    emit(writer, Event::Start(BytesStart::new("mes:Structures")))?;
    for (section, kind) in SECTIONS {
        let mut artefacts = message.index.iter_kind(*kind).peekable();
        if artefacts.peek().is_none() {
            continue;
        }
        emit(writer, Event::Start(BytesStart::new(*section)))?;
        for artefact in artefacts {
            tracing::trace!(artefact = %artefact.identifier(), "writing");
            match artefact {
                Artefact::ItemScheme(scheme) => item_scheme(writer, scheme)?,
                Artefact::DataStructure(dsd) => data_structure(writer, dsd)?,
                Artefact::Dataflow(flow) => dataflow(writer, flow)?,
                Artefact::Constraint(constraint) => content_constraint(writer, constraint)?,
            }
        }
        end(writer, section)?;
    }
    end(writer, "mes:Structures")
}

// ============================================================================
// COMMON
// ============================================================================

fn maintainable_start<'a>(name: &'a str, m: &'a Maintainable, kind: ArtefactKind) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    let urn = format_urn(kind, &m.identifier, None);
    start.push_attribute(("id", m.id()));
    start.push_attribute(("urn", urn.as_str()));
    start.push_attribute(("agencyID", m.agency_id()));
    start.push_attribute(("version", m.version()));
    if m.is_external_reference {
        start.push_attribute(("isExternalReference", "true"));
    }
    start.push_attribute(("isFinal", if m.is_final { "true" } else { "false" }));
    if let Some(from) = &m.valid_from {
        start.push_attribute(("validFrom", from.as_str()));
    }
    if let Some(to) = &m.valid_to {
        start.push_attribute(("validTo", to.as_str()));
    }
    start
}

/// Annotations, names and descriptions in schema order.
fn texts<W: Write>(writer: &mut Writer<W>, base: &Identifiable) -> Result<()> {
    annotations(writer, &base.annotations)?;
    localized(writer, "com:Name", &base.name)?;
    localized(writer, "com:Description", &base.description)
}

fn maintainable_texts<W: Write>(writer: &mut Writer<W>, m: &Maintainable) -> Result<()> {
    annotations(writer, &m.annotations)?;
    localized(writer, "com:Name", &m.name)?;
    localized(writer, "com:Description", &m.description)
}

fn representation<W: Write>(writer: &mut Writer<W>, name: &str, repr: &Representation) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    if let Some(enumeration) = &repr.enumeration {
        reference(writer, "str:Enumeration", enumeration)?;
    }
    if let Some(format) = &repr.text_format {
        let mut start = BytesStart::new("str:TextFormat");
        if let Some(text_type) = &format.text_type {
            start.push_attribute(("textType", text_type.as_str()));
        }
        for (facet, value) in &format.facets {
            start.push_attribute((facet.as_str(), value.as_str()));
        }
        emit(writer, Event::Empty(start))?;
    }
    end(writer, name)
}

/// Component start tag with its id and urn.
fn component_start<'a>(name: &'a str, base: &'a Identifiable, urn: &'a str) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("id", base.id.as_str()));
    start.push_attribute(("urn", urn));
    start
}

fn component_body<W: Write>(
    writer: &mut Writer<W>,
    base: &Identifiable,
    concept: Option<&Reference>,
    local: Option<&Representation>,
) -> Result<()> {
    texts(writer, base)?;
    if let Some(concept) = concept {
        reference(writer, "str:ConceptIdentity", concept)?;
    }
    if let Some(local) = local {
        representation(writer, "str:LocalRepresentation", local)?;
    }
    Ok(())
}

// ============================================================================
// ITEM SCHEMES
// ============================================================================

fn scheme_elements(kind: SchemeKind) -> (&'static str, &'static str) {
    match kind {
        SchemeKind::Codelist => ("str:Codelist", "str:Code"),
        SchemeKind::ConceptScheme => ("str:ConceptScheme", "str:Concept"),
        SchemeKind::CategoryScheme => ("str:CategoryScheme", "str:Category"),
        SchemeKind::AgencyScheme => ("str:AgencyScheme", "str:Agency"),
    }
}

fn item_scheme<W: Write>(writer: &mut Writer<W>, scheme: &ItemScheme) -> Result<()> {
    let (element, item_element) = scheme_elements(scheme.kind());
    let mut start = maintainable_start(element, &scheme.maintainable, scheme.kind().artefact_kind());
    if scheme.is_partial {
        start.push_attribute(("isPartial", "true"));
    }
    emit(writer, Event::Start(start))?;
    maintainable_texts(writer, &scheme.maintainable)?;

    let item_kind = scheme.kind().item_artefact_kind();
    for item in scheme.iter() {
        let urn = format_urn(item_kind, scheme.identifier(), Some(item.id()));
        let mut start = BytesStart::new(item_element);
        start.push_attribute(("id", item.id()));
        start.push_attribute(("urn", urn.as_str()));
        emit(writer, Event::Start(start))?;
        texts(writer, &item.base)?;
        if let ItemKind::Concept {
            core_representation: Some(core),
        } = &item.kind
        {
            representation(writer, "str:CoreRepresentation", core)?;
        }
        if let Some(parent) = &item.parent {
            local_reference(writer, "str:Parent", parent)?;
        }
        end(writer, item_element)?;
    }
    end(writer, element)
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

fn dimension_element(kind: DimensionKind) -> &'static str {
    match kind {
        DimensionKind::Dimension => "str:Dimension",
        DimensionKind::Time => "str:TimeDimension",
        DimensionKind::Measure => "str:MeasureDimension",
    }
}

fn dimension_artefact_kind(kind: DimensionKind) -> ArtefactKind {
    match kind {
        DimensionKind::Dimension => ArtefactKind::Dimension,
        DimensionKind::Time => ArtefactKind::TimeDimension,
        DimensionKind::Measure => ArtefactKind::MeasureDimension,
    }
}

fn dimension<W: Write>(
    writer: &mut Writer<W>,
    dsd: &DataStructureDefinition,
    position: usize,
    dim: &Dimension,
) -> Result<()> {
    let element = dimension_element(dim.kind);
    let urn = format_urn(dimension_artefact_kind(dim.kind), dsd.identifier(), Some(dim.id()));
    let position = (position + 1).to_string();
    let mut start = component_start(element, &dim.base, &urn);
    start.push_attribute(("position", position.as_str()));
    emit(writer, Event::Start(start))?;
    component_body(writer, &dim.base, dim.concept.as_ref(), dim.local_representation.as_ref())?;
    end(writer, element)
}

fn attribute<W: Write>(writer: &mut Writer<W>, dsd: &DataStructureDefinition, attr: &DataAttribute) -> Result<()> {
    let urn = format_urn(ArtefactKind::DataAttribute, dsd.identifier(), Some(attr.id()));
    let mut start = component_start("str:Attribute", &attr.base, &urn);
    start.push_attribute(("assignmentStatus", attr.usage.as_str()));
    emit(writer, Event::Start(start))?;
    component_body(writer, &attr.base, attr.concept.as_ref(), attr.local_representation.as_ref())?;

    emit(writer, Event::Start(BytesStart::new("str:AttributeRelationship")))?;
    match &attr.relationship {
        AttributeRelationship::DataSet => {
            emit(writer, Event::Empty(BytesStart::new("str:None")))?;
        }
        AttributeRelationship::Group(group) => local_reference(writer, "str:Group", group)?,
        AttributeRelationship::Dimensions {
            dimensions,
            attachment_group,
        } => {
            for dim in dimensions {
                local_reference(writer, "str:Dimension", dim)?;
            }
            if let Some(group) = attachment_group {
                local_reference(writer, "str:AttachmentGroup", group)?;
            }
        }
        AttributeRelationship::Observation => {
            local_reference(writer, "str:PrimaryMeasure", &dsd.measure.base.id)?;
        }
    }
    end(writer, "str:AttributeRelationship")?;
    end(writer, "str:Attribute")
}

fn data_structure<W: Write>(writer: &mut Writer<W>, dsd: &DataStructureDefinition) -> Result<()> {
    let start = maintainable_start("str:DataStructure", &dsd.maintainable, ArtefactKind::DataStructure);
    emit(writer, Event::Start(start))?;
    maintainable_texts(writer, &dsd.maintainable)?;
    emit(writer, Event::Start(BytesStart::new("str:DataStructureComponents")))?;

    let mut list = BytesStart::new("str:DimensionList");
    list.push_attribute(("id", "DimensionDescriptor"));
    emit(writer, Event::Start(list))?;
    for (position, dim) in dsd.dimensions.iter().enumerate() {
        dimension(writer, dsd, position, dim)?;
    }
    end(writer, "str:DimensionList")?;

    for group in dsd.groups.values() {
        let urn = format_urn(ArtefactKind::GroupDimensionDescriptor, dsd.identifier(), Some(group.id()));
        emit(writer, Event::Start(component_start("str:Group", &group.base, &urn)))?;
        texts(writer, &group.base)?;
        for dim in &group.dimensions {
            emit(writer, Event::Start(BytesStart::new("str:GroupDimension")))?;
            local_reference(writer, "str:DimensionReference", dim)?;
            end(writer, "str:GroupDimension")?;
        }
        end(writer, "str:Group")?;
    }

    if !dsd.attributes.is_empty() {
        let mut list = BytesStart::new("str:AttributeList");
        list.push_attribute(("id", "AttributeDescriptor"));
        emit(writer, Event::Start(list))?;
        for attr in dsd.attributes.values() {
            attribute(writer, dsd, attr)?;
        }
        end(writer, "str:AttributeList")?;
    }

    let mut list = BytesStart::new("str:MeasureList");
    list.push_attribute(("id", "MeasureDescriptor"));
    emit(writer, Event::Start(list))?;
    let measure = &dsd.measure;
    let urn = format_urn(ArtefactKind::PrimaryMeasure, dsd.identifier(), Some(&measure.base.id));
    emit(writer, Event::Start(component_start("str:PrimaryMeasure", &measure.base, &urn)))?;
    component_body(writer, &measure.base, measure.concept.as_ref(), measure.local_representation.as_ref())?;
    end(writer, "str:PrimaryMeasure")?;
    end(writer, "str:MeasureList")?;

    end(writer, "str:DataStructureComponents")?;
    end(writer, "str:DataStructure")
}

// ============================================================================
// DATAFLOWS AND CONSTRAINTS
// ============================================================================

fn dataflow<W: Write>(writer: &mut Writer<W>, flow: &Dataflow) -> Result<()> {
    let start = maintainable_start("str:Dataflow", &flow.maintainable, ArtefactKind::Dataflow);
    emit(writer, Event::Start(start))?;
    maintainable_texts(writer, &flow.maintainable)?;
    reference(writer, "str:Structure", &flow.structure)?;
    end(writer, "str:Dataflow")
}

fn content_constraint<W: Write>(writer: &mut Writer<W>, constraint: &ContentConstraint) -> Result<()> {
    let mut start = maintainable_start(
        "str:ContentConstraint",
        &constraint.maintainable,
        ArtefactKind::ContentConstraint,
    );
    start.push_attribute(("type", constraint.role.as_str()));
    emit(writer, Event::Start(start))?;
    maintainable_texts(writer, &constraint.maintainable)?;

    if !constraint.attachments.is_empty() {
        emit(writer, Event::Start(BytesStart::new("str:ConstraintAttachment")))?;
        for attachment in &constraint.attachments {
            let element = format!("str:{}", attachment.kind.class_name());
            reference(writer, &element, attachment)?;
        }
        end(writer, "str:ConstraintAttachment")?;
    }

    for region in &constraint.regions {
        let mut start = BytesStart::new("str:CubeRegion");
        start.push_attribute(("include", if region.included { "true" } else { "false" }));
        emit(writer, Event::Start(start))?;
        for (dim, values) in &region.members {
            let mut key_value = BytesStart::new("com:KeyValue");
            key_value.push_attribute(("id", dim.as_str()));
            emit(writer, Event::Start(key_value))?;
            for value in values {
                text_element(writer, "com:Value", &[], value)?;
            }
            end(writer, "com:KeyValue")?;
        }
        end(writer, "str:CubeRegion")?;
    }
    end(writer, "str:ContentConstraint")
}
