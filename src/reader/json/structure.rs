//! SDMX-JSON structure messages.

use smol_str::SmolStr;

use super::document;
use crate::base::{ArtefactKind, DEFAULT_VERSION, Identifier};
use crate::error::{Location, Result, SdmxError};
use crate::message::MessageKind;
use crate::model::{
    Annotation, Artefact, AttributeRelationship, ConstraintRole, ContentConstraint, CubeRegion,
    DataAttribute, DataStructureDefinition, Dataflow, Dimension, DimensionDescriptor,
    DimensionKind, GroupDimensionDescriptor, Identifiable, Item, ItemKind, ItemScheme,
    Maintainable, PrimaryMeasure, Reference, Representation, SchemeKind, TextFormat, UsageStatus,
};
use crate::reader::{Document, check_urn};
use crate::wire::{self, read_text};

pub(super) fn read_structures(message: wire::StructureMessage) -> Result<Document> {
    let mut doc = document(MessageKind::Structure, message.meta, message.header);
    let body = message.data;

    let schemes = [
        (SchemeKind::AgencyScheme, "agencySchemes", body.agency_schemes),
        (SchemeKind::CategoryScheme, "categorySchemes", body.category_schemes),
        (SchemeKind::Codelist, "codelists", body.codelists),
        (SchemeKind::ConceptScheme, "conceptSchemes", body.concept_schemes),
    ];
    for (kind, section, list) in schemes {
        for (i, scheme) in list.into_iter().enumerate() {
            let path = format!("data/{section}[{i}]");
            let declared = scheme.maintainable.base.urn.clone();
            register(&mut doc, item_scheme(scheme, kind, &path)?.into(), declared, path)?;
        }
    }
    for (i, dsd) in body.data_structures.into_iter().enumerate() {
        let path = format!("data/dataStructures[{i}]");
        let declared = dsd.maintainable.base.urn.clone();
        register(&mut doc, data_structure(dsd, &path)?.into(), declared, path)?;
    }
    for (i, flow) in body.dataflows.into_iter().enumerate() {
        let path = format!("data/dataflows[{i}]");
        let declared = flow.maintainable.base.urn.clone();
        register(&mut doc, dataflow(flow)?.into(), declared, path)?;
    }
    for (i, constraint) in body.content_constraints.into_iter().enumerate() {
        let path = format!("data/contentConstraints[{i}]");
        let declared = constraint.maintainable.base.urn.clone();
        register(&mut doc, content_constraint(constraint)?.into(), declared, path)?;
    }
    Ok(doc)
}

fn register(doc: &mut Document, artefact: Artefact, declared: Option<String>, path: String) -> Result<()> {
    doc.diagnostics.extend(check_urn(
        &artefact,
        declared.as_deref(),
        Location::path(path.clone()),
    ));
    doc.index
        .register(artefact)
        .map_err(|e| match e {
            SdmxError::DuplicateArtefact { identifier, .. } => SdmxError::DuplicateArtefact {
                identifier,
                location: Location::path(path),
            },
            other => other,
        })
        .map(drop)
}

// ============================================================================
// COMMON
// ============================================================================

fn annotations(list: Vec<wire::Annotation>) -> Vec<Annotation> {
    list.into_iter()
        .map(|a| Annotation {
            id: a.id.map(SmolStr::from),
            title: a.title,
            annotation_type: a.annotation_type,
            url: a.url,
            text: read_text(a.text.as_ref(), a.texts.as_ref()),
        })
        .collect()
}

fn identifiable(base: wire::Identifiable, path: &str) -> Result<Identifiable> {
    if base.id.is_empty() {
        return Err(SdmxError::missing("id", Location::path(path)));
    }
    Ok(Identifiable {
        name: read_text(base.name.as_ref(), base.names.as_ref()),
        description: read_text(base.description.as_ref(), base.descriptions.as_ref()),
        annotations: annotations(base.annotations),
        id: SmolStr::from(base.id),
    })
}

fn maintainable(m: wire::Maintainable, path: &str) -> Result<Maintainable> {
    let identifier = Identifier::new(
        m.agency_id.as_str(),
        m.base.id.as_str(),
        m.version.as_deref().unwrap_or(DEFAULT_VERSION),
    );
    let base = identifiable(m.base, path)?;
    Ok(Maintainable {
        identifier,
        name: base.name,
        description: base.description,
        annotations: base.annotations,
        is_final: m.is_final,
        is_external_reference: m.is_external_reference,
        valid_from: m.valid_from,
        valid_to: m.valid_to,
    })
}

fn urn(text: &str) -> Result<Reference> {
    Reference::from_urn_str(text)
}

fn representation(r: wire::Representation) -> Result<Representation> {
    let enumeration = r.enumeration.as_deref().map(urn).transpose()?;
    let text_format = r.text_format.or(r.format).map(|facets| {
        let mut format = TextFormat::default();
        for (name, value) in facets {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            if name == "textType" || name == "dataType" {
                format.text_type = Some(SmolStr::from(value));
            } else {
                format.facets.insert(SmolStr::from(name), value);
            }
        }
        format
    });
    Ok(Representation {
        enumeration,
        text_format,
    })
}

/// Component id, falling back to the concept's item id.
fn component(
    mut base: wire::Identifiable,
    concept: Option<&str>,
    path: &str,
) -> Result<(Identifiable, Option<Reference>)> {
    let concept = concept.map(urn).transpose()?;
    if base.id.is_empty() {
        if let Some(item) = concept.as_ref().and_then(|c| c.item_id.as_ref()) {
            base.id = item.to_string();
        }
    }
    Ok((identifiable(base, path)?, concept))
}

// ============================================================================
// ITEM SCHEMES
// ============================================================================

fn item_scheme(scheme: wire::ItemScheme, kind: SchemeKind, path: &str) -> Result<ItemScheme> {
    let mut out = ItemScheme::new(kind, maintainable(scheme.maintainable, path)?);
    out.is_partial = scheme.is_partial;
    let items = match kind {
        SchemeKind::Codelist => scheme.codes,
        SchemeKind::ConceptScheme => scheme.concepts,
        SchemeKind::CategoryScheme => scheme.categories,
        SchemeKind::AgencyScheme => scheme.agencies,
    };
    read_items(items, &mut out, None, path)?;
    Ok(out)
}

fn read_items(items: Vec<wire::Item>, scheme: &mut ItemScheme, parent: Option<&SmolStr>, path: &str) -> Result<()> {
    for (i, item) in items.into_iter().enumerate() {
        let path = format!("{path}/items[{i}]");
        let kind = match scheme.kind().default_item_kind() {
            ItemKind::Concept { .. } => ItemKind::Concept {
                core_representation: item.core_representation.map(representation).transpose()?,
            },
            other => other,
        };
        let mut out = Item::new(identifiable(item.base, &path)?, kind);
        out.parent = item.parent.map(SmolStr::from).or_else(|| parent.cloned());
        let id = out.base.id.clone();
        scheme
            .insert(out)
            .map_err(|e| SdmxError::malformed(e.to_string(), Location::path(path.as_str())))?;
        read_items(item.categories, scheme, Some(&id), &path)?;
    }
    Ok(())
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

fn dimension_kind(declared: Option<&str>, default: DimensionKind) -> DimensionKind {
    match declared {
        Some("TimeDimension") => DimensionKind::Time,
        Some("MeasureDimension") => DimensionKind::Measure,
        Some("Dimension") => DimensionKind::Dimension,
        _ => default,
    }
}

fn data_structure(dsd: wire::DataStructure, path: &str) -> Result<DataStructureDefinition> {
    let maintainable = maintainable(dsd.maintainable, path)?;
    let components = dsd.data_structure_components;
    let list = components.dimension_list;

    let mut positioned = Vec::new();
    let plain = list.dimensions.into_iter().map(|d| (d, DimensionKind::Dimension));
    let time = list
        .time_dimensions
        .into_iter()
        .chain(list.time_dimension)
        .map(|d| (d, DimensionKind::Time));
    for (index, (dim, default)) in plain.chain(time).enumerate() {
        let (base, concept) = component(dim.base, dim.concept_identity.as_deref(), path)?;
        let dimension = Dimension {
            base,
            kind: dimension_kind(dim.kind.as_deref(), default),
            concept,
            local_representation: dim.local_representation.map(representation).transpose()?,
        };
        positioned.push((dim.position.unwrap_or(usize::MAX), index, dimension));
    }
    positioned.sort_by_key(|(position, index, _)| (*position, *index));
    let dimensions = DimensionDescriptor::new(positioned.into_iter().map(|(_, _, d)| d))
        .map_err(|e| SdmxError::malformed(e.to_string(), Location::path(path)))?;

    let mut out = DataStructureDefinition::new(maintainable, dimensions);
    for group in components.groups {
        out = out.with_group(GroupDimensionDescriptor {
            base: identifiable(group.base, path)?,
            dimensions: group.group_dimensions.into_iter().map(SmolStr::from).collect(),
        });
    }

    for attr in components.attribute_list.map(|l| l.attributes).unwrap_or_default() {
        let (base, concept) = component(attr.base, attr.concept_identity.as_deref(), path)?;
        let usage = match (attr.assignment_status.as_deref(), attr.usage.as_deref()) {
            (Some("Mandatory"), _) | (_, Some("mandatory")) => UsageStatus::Mandatory,
            _ => UsageStatus::Conditional,
        };
        out = out.with_attribute(DataAttribute {
            base,
            concept,
            local_representation: attr.local_representation.map(representation).transpose()?,
            relationship: relationship(attr.attribute_relationship),
            usage,
        });
    }

    let measure = components
        .measure_list
        .primary_measure
        .or_else(|| components.measure_list.measures.into_iter().next());
    if let Some(measure) = measure {
        let (base, concept) = component(measure.base, measure.concept_identity.as_deref(), path)?;
        out.measure = PrimaryMeasure {
            base,
            concept,
            local_representation: measure.local_representation.map(representation).transpose()?,
        };
    }
    Ok(out)
}

fn relationship(r: wire::Relationship) -> AttributeRelationship {
    if r.primary_measure.is_some() || r.observation.is_some() {
        return AttributeRelationship::Observation;
    }
    if let Some(group) = r.group {
        return AttributeRelationship::Group(SmolStr::from(group));
    }
    match r.dimensions {
        Some(dims) if !dims.is_empty() => AttributeRelationship::Dimensions {
            dimensions: dims.into_iter().map(SmolStr::from).collect(),
            attachment_group: r.attachment_group.map(SmolStr::from),
        },
        _ => AttributeRelationship::DataSet,
    }
}

fn dataflow(flow: wire::Dataflow) -> Result<Dataflow> {
    let path = format!("data/dataflows/{}", flow.maintainable.base.id);
    let structure = urn(&flow.structure)?;
    if structure.kind != ArtefactKind::DataStructure {
        return Err(SdmxError::bad_reference(
            flow.structure,
            "a dataflow's structure must be a DataStructure",
        ));
    }
    Ok(Dataflow {
        maintainable: maintainable(flow.maintainable, &path)?,
        structure,
    })
}

fn content_constraint(c: wire::Constraint) -> Result<ContentConstraint> {
    let path = format!("data/contentConstraints/{}", c.maintainable.base.id);
    let role = match c.role.as_deref() {
        Some(role) => ConstraintRole::parse(role).ok_or_else(|| {
            SdmxError::malformed(format!("unknown constraint type {role}"), Location::path(path.as_str()))
        })?,
        None => ConstraintRole::Allowed,
    };
    let mut out = ContentConstraint::new(maintainable(c.maintainable, &path)?, role);
    if let Some(attachment) = c.constraint_attachment {
        for target in attachment.dataflows.iter().chain(&attachment.data_structures) {
            out.attachments.push(urn(target)?);
        }
    }
    for region in c.cube_regions {
        let mut cube = CubeRegion {
            included: region.is_included.or(region.include).unwrap_or(true),
            ..CubeRegion::default()
        };
        for kv in region.key_values {
            cube = cube.with_member(kv.id, kv.values);
        }
        out.regions.push(cube);
    }
    Ok(out)
}
