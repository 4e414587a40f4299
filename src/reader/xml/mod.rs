//! SDMX-ML 2.1 reader.
//!
//! The document is parsed into an element tree first ([`tree`]), then the
//! header, structures, data sets and footer are read from the tree. Element
//! names are matched on their local part, so any namespace prefixes work.

mod data;
mod header;
mod structure;
pub(crate) mod tree;

use smol_str::SmolStr;

use super::{Document, assemble, supplied_index};
use crate::base::{ArtefactKind, DEFAULT_VERSION, Identifier};
use crate::error::{Result, SdmxError};
use crate::format::{Family, Format};
use crate::message::{Message, MessageKind};
use crate::model::{Annotation, InternationalString, Reference, DEFAULT_LOCALE};
use crate::options::ReaderOptions;

use tree::Node;

/// Detect the SDMX-ML message format from the root element.
pub fn detect(input: &[u8]) -> Result<Format> {
    classify(&tree::root_element(input)?)
}

fn classify(root: &Node) -> Result<Format> {
    check_version(root)?;
    match root.local.as_str() {
        "Structure" | "Error" => Ok(Format::StructureXml),
        "GenericData" | "GenericTimeSeriesData" => Ok(Format::GenericDataXml),
        "StructureSpecificData" | "StructureSpecificTimeSeriesData" => {
            Ok(Format::StructureSpecificDataXml)
        }
        other => Err(SdmxError::UnknownFormat(format!(
            "unrecognised SDMX-ML root element <{other}>"
        ))),
    }
}

/// Reject documents bound to SDMX-ML 2.0 or 3.0 namespaces.
fn check_version(root: &Node) -> Result<()> {
    for (name, value) in &root.attrs {
        if !name.starts_with("xmlns") {
            continue;
        }
        let value = value.to_ascii_lowercase();
        if value.contains("/v2_0/") {
            return Err(SdmxError::UnsupportedVersion("SDMX-ML 2.0".to_owned()));
        }
        if value.contains("/v3_0/") {
            return Err(SdmxError::UnsupportedVersion("SDMX-ML 3.0".to_owned()));
        }
    }
    Ok(())
}

/// Read an SDMX-ML 2.1 message.
pub fn read(input: &[u8], format: Option<Format>, options: &ReaderOptions) -> Result<Message> {
    if let Some(format) = format {
        if format.family() != Family::Xml {
            return Err(SdmxError::UnknownFormat(format!(
                "{format} cannot be read as SDMX-ML"
            )));
        }
    }
    let root = tree::parse(input)?;
    let detected = classify(&root)?;
    if format.is_some_and(|f| f != detected) {
        tracing::warn!(declared = ?format, %detected, "declared format differs from document; reading as document");
    }
    tracing::debug!(format = %detected, root = %root.name, "structural pass");

    let supplied = supplied_index(options)?;
    let kind = match root.local.as_str() {
        "Structure" => MessageKind::Structure,
        "Error" => MessageKind::Error,
        _ => MessageKind::Data,
    };
    let header = match root.child("Header") {
        Some(node) => header::read_header(node)?,
        None => Default::default(),
    };

    let mut doc = Document::new(kind, header);
    match (kind, detected) {
        (MessageKind::Structure, _) => structure::read_structures(&root, &mut doc)?,
        (MessageKind::Error, _) => {}
        (_, Format::GenericDataXml) => data::read_generic(&root, &mut doc)?,
        (_, _) => data::read_structure_specific(&root, &mut doc, &supplied)?,
    }
    doc.footer = header::read_footer(&root)?;

    assemble(doc, &supplied, options)
}

// ============================================================================
// SHARED READERS
// ============================================================================

/// Localized text from repeated child elements such as `com:Name`.
pub(crate) fn international_string(node: &Node, local: &str) -> InternationalString {
    let mut text = InternationalString::new();
    for child in node.children_named(local) {
        let lang = child.attr("xml:lang").unwrap_or(DEFAULT_LOCALE);
        text.insert(lang, child.text.trim());
    }
    text
}

pub(crate) fn annotations(node: &Node) -> Vec<Annotation> {
    let Some(list) = node.child("Annotations") else {
        return Vec::new();
    };
    list.children_named("Annotation")
        .map(|a| Annotation {
            id: a.attr("id").map(SmolStr::new),
            title: a.child_text("AnnotationTitle").map(str::to_owned),
            annotation_type: a.child_text("AnnotationType").map(str::to_owned),
            url: a.child_text("AnnotationURL").map(str::to_owned),
            text: international_string(a, "AnnotationText"),
        })
        .collect()
}

/// Read a reference held by `node` as a `<Ref>` or `<URN>` child.
///
/// `Ref` attributes default to the enclosing artefact's agency and to
/// version 1.0; the class attribute, when present, overrides `default_kind`.
pub(crate) fn reference(node: &Node, default_kind: ArtefactKind, agency: &str) -> Result<Reference> {
    if let Some(urn) = node.child_text("URN") {
        return Reference::from_urn_str(urn);
    }
    let Some(r) = node.child("Ref") else {
        let text = node.text.trim();
        if text.starts_with("urn:") {
            return Reference::from_urn_str(text);
        }
        return Err(SdmxError::bad_reference(
            node.name.as_str(),
            "expected a Ref or URN child",
        ));
    };

    let id = r.required_attr("id")?;
    let kind = match r.attr("class") {
        Some(class) => ArtefactKind::from_class_name(class)
            .ok_or_else(|| SdmxError::bad_reference(id, format!("unknown class {class}")))?,
        None => default_kind,
    };
    if let Some(package) = r.attr("package") {
        if package != kind.package() {
            return Err(SdmxError::bad_reference(
                id,
                format!("class {} is not in package {package}", kind.class_name()),
            ));
        }
    }
    let agency = r.attr("agencyID").unwrap_or(agency);

    if kind.is_maintainable() {
        let version = r.attr("version").unwrap_or(DEFAULT_VERSION);
        return Ok(Reference::new(kind, Identifier::new(agency, id, version)));
    }
    let parent = r.attr("maintainableParentID").ok_or_else(|| {
        SdmxError::bad_reference(id, format!("{} reference without maintainableParentID", kind.class_name()))
    })?;
    let version = r
        .attr("maintainableParentVersion")
        .or_else(|| r.attr("version"))
        .unwrap_or(DEFAULT_VERSION);
    Ok(Reference::item(kind, Identifier::new(agency, parent, version), id))
}

/// Id of a local `<Ref id="..."/>` inside `node`.
pub(crate) fn local_ref(node: &Node) -> Result<SmolStr> {
    node.required_child("Ref")
        .and_then(|r| r.required_attr("id"))
        .map(SmolStr::new)
}
