//! SDMX-ML 2.1 writer.
//!
//! Events go through a quick-xml [`Writer`] over an in-memory buffer. Every
//! element name is written with the conventional prefixes (`mes`, `com`,
//! `str`, `gen`); the reader matches on local names, so the output reads
//! back regardless.

mod data;
mod structure;

use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::prepare;
use crate::base::ArtefactKind;
use crate::error::{Result, SdmxError};
use crate::format::Format;
use crate::message::{Footer, FooterMessage, Header, HeaderStructure, Message, MessageKind, Party};
use crate::model::{Annotation, InternationalString, Reference};
use crate::options::WriterOptions;

pub(crate) const NS_MESSAGE: &str = "http://www.sdmx.org/resources/sdmxml/schemas/v2_1/message";
pub(crate) const NS_COMMON: &str = "http://www.sdmx.org/resources/sdmxml/schemas/v2_1/common";
pub(crate) const NS_STRUCTURE: &str = "http://www.sdmx.org/resources/sdmxml/schemas/v2_1/structure";
pub(crate) const NS_GENERIC: &str =
    "http://www.sdmx.org/resources/sdmxml/schemas/v2_1/data/generic";
pub(crate) const NS_STRUCTURE_SPECIFIC: &str =
    "http://www.sdmx.org/resources/sdmxml/schemas/v2_1/data/structurespecific";
pub(crate) const NS_FOOTER: &str =
    "http://www.sdmx.org/resources/sdmxml/schemas/v2_1/message/footer";
pub(crate) const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Write a message as SDMX-ML 2.1.
pub fn write(message: &Message, options: &WriterOptions) -> Result<Vec<u8>> {
    let root = match options.format {
        Format::StructureXml if message.kind == MessageKind::Error => "mes:Error",
        Format::StructureXml => "mes:Structure",
        Format::GenericDataXml => "mes:GenericData",
        Format::StructureSpecificDataXml => "mes:StructureSpecificData",
        other => {
            return Err(SdmxError::write(format!("{other} is not an SDMX-ML format")));
        }
    };

    let mut buffer = Cursor::new(Vec::new());
    let mut writer = if options.indent > 0 {
        Writer::new_with_indent(&mut buffer, b' ', options.indent)
    } else {
        Writer::new(&mut buffer)
    };
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut start = BytesStart::new(root);
    start.push_attribute(("xmlns:mes", NS_MESSAGE));
    start.push_attribute(("xmlns:com", NS_COMMON));

    match options.format {
        Format::GenericDataXml | Format::StructureSpecificDataXml => {
            let prepared = prepare(message, options)?;
            let specific = options.format == Format::StructureSpecificDataXml;
            let namespaces = if specific {
                data::structure_namespaces(&prepared)
            } else {
                Vec::new()
            };
            if specific {
                start.push_attribute(("xmlns:ss", NS_STRUCTURE_SPECIFIC));
                start.push_attribute(("xmlns:xsi", NS_XSI));
                for (index, namespace) in namespaces.iter().enumerate() {
                    let prefix = format!("xmlns:{}", data::prefix(index));
                    start.push_attribute((prefix.as_str(), namespace.as_str()));
                }
            } else {
                start.push_attribute(("xmlns:gen", NS_GENERIC));
            }
            if message.footer.is_some() {
                start.push_attribute(("xmlns:footer", NS_FOOTER));
            }
            emit(&mut writer, Event::Start(start))?;
            write_header(&mut writer, &message.header, &prepared.structures, &namespaces)?;
            for data_set in &prepared.data {
                if specific {
                    data::write_structure_specific(&mut writer, data_set, &prepared.structures)?;
                } else {
                    data::write_generic(&mut writer, data_set, &prepared.structures)?;
                }
            }
            if let Some(footer) = &message.footer {
                write_footer(&mut writer, footer)?;
            }
        }
        _ if message.kind == MessageKind::Error => {
            emit(&mut writer, Event::Start(start))?;
            write_header(&mut writer, &message.header, &message.header.structures, &[])?;
            if let Some(footer) = &message.footer {
                for entry in &footer.messages {
                    write_footer_message(&mut writer, "mes:ErrorMessage", entry)?;
                }
            }
        }
        _ => {
            start.push_attribute(("xmlns:str", NS_STRUCTURE));
            if message.footer.is_some() {
                start.push_attribute(("xmlns:footer", NS_FOOTER));
            }
            emit(&mut writer, Event::Start(start))?;
            write_header(&mut writer, &message.header, &message.header.structures, &[])?;
            structure::write_structures(&mut writer, message)?;
            if let Some(footer) = &message.footer {
                write_footer(&mut writer, footer)?;
            }
        }
    }

    end(&mut writer, root)?;
    Ok(buffer.into_inner())
}

// ============================================================================
// EVENT HELPERS
// ============================================================================

pub(crate) fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| SdmxError::write(format!("failed to write XML: {e}")))
}

pub(crate) fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// `<name attrs...>text</name>`
pub(crate) fn text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    for attr in attrs {
        start.push_attribute(*attr);
    }
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    end(writer, name)
}

/// One element per locale, e.g. repeated `com:Name`.
pub(crate) fn localized<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &InternationalString,
) -> Result<()> {
    for (lang, value) in text.iter() {
        text_element(writer, name, &[("xml:lang", lang)], value)?;
    }
    Ok(())
}

pub(crate) fn annotations<W: Write>(writer: &mut Writer<W>, annotations: &[Annotation]) -> Result<()> {
    if annotations.is_empty() {
        return Ok(());
    }
    emit(writer, Event::Start(BytesStart::new("com:Annotations")))?;
    for annotation in annotations {
        let mut start = BytesStart::new("com:Annotation");
        if let Some(id) = &annotation.id {
            start.push_attribute(("id", id.as_str()));
        }
        emit(writer, Event::Start(start))?;
        if let Some(title) = &annotation.title {
            text_element(writer, "com:AnnotationTitle", &[], title)?;
        }
        if let Some(kind) = &annotation.annotation_type {
            text_element(writer, "com:AnnotationType", &[], kind)?;
        }
        if let Some(url) = &annotation.url {
            text_element(writer, "com:AnnotationURL", &[], url)?;
        }
        localized(writer, "com:AnnotationText", &annotation.text)?;
        end(writer, "com:Annotation")?;
    }
    end(writer, "com:Annotations")
}

/// `<name><Ref .../></name>` with every attribute spelled out.
pub(crate) fn reference<W: Write>(writer: &mut Writer<W>, name: &str, reference: &Reference) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    let target = &reference.target;
    let kind = reference.kind;
    let mut r = BytesStart::new("Ref");
    match &reference.item_id {
        Some(item) => {
            r.push_attribute(("id", item.as_str()));
            r.push_attribute(("maintainableParentID", target.id.as_str()));
            r.push_attribute(("maintainableParentVersion", target.version.as_str()));
            r.push_attribute(("agencyID", target.agency_id.as_str()));
        }
        None => {
            r.push_attribute(("agencyID", target.agency_id.as_str()));
            r.push_attribute(("id", target.id.as_str()));
            r.push_attribute(("version", target.version.as_str()));
        }
    }
    r.push_attribute(("class", kind.class_name()));
    r.push_attribute(("package", kind.package()));
    emit(writer, Event::Empty(r))?;
    end(writer, name)
}

/// `<name><Ref id="..."/></name>` for components of the same structure.
pub(crate) fn local_reference<W: Write>(writer: &mut Writer<W>, name: &str, id: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    let mut r = BytesStart::new("Ref");
    r.push_attribute(("id", id));
    emit(writer, Event::Empty(r))?;
    end(writer, name)
}

// ============================================================================
// HEADER AND FOOTER
// ============================================================================

fn party<W: Write>(writer: &mut Writer<W>, name: &str, party: &Party) -> Result<()> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("id", party.id.as_str()));
    if party.name.is_empty() {
        return emit(writer, Event::Empty(start));
    }
    emit(writer, Event::Start(start))?;
    localized(writer, "com:Name", &party.name)?;
    end(writer, name)
}

fn write_header<W: Write>(
    writer: &mut Writer<W>,
    header: &Header,
    structures: &[HeaderStructure],
    namespaces: &[String],
) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("mes:Header")))?;
    if let Some(id) = &header.id {
        text_element(writer, "mes:ID", &[], id)?;
    }
    text_element(writer, "mes:Test", &[], if header.test { "true" } else { "false" })?;
    if let Some(prepared) = &header.prepared {
        text_element(writer, "mes:Prepared", &[], &prepared.to_rfc3339())?;
    }
    if let Some(sender) = &header.sender {
        party(writer, "mes:Sender", sender)?;
    }
    for receiver in &header.receivers {
        party(writer, "mes:Receiver", receiver)?;
    }
    for (index, declared) in structures.iter().enumerate() {
        let mut start = BytesStart::new("mes:Structure");
        start.push_attribute(("structureID", declared.structure_id.as_str()));
        if let Some(namespace) = namespaces.get(index) {
            start.push_attribute(("namespace", namespace.as_str()));
        }
        start.push_attribute((
            "dimensionAtObservation",
            declared.dimension_at_observation.as_str(),
        ));
        emit(writer, Event::Start(start))?;
        let element = if declared.structure.kind == ArtefactKind::DataStructure {
            "com:Structure"
        } else {
            "com:StructureUsage"
        };
        reference(writer, element, &declared.structure)?;
        end(writer, "mes:Structure")?;
    }
    end(writer, "mes:Header")
}

fn write_footer_message<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    entry: &FooterMessage,
) -> Result<()> {
    let mut start = BytesStart::new(name);
    if let Some(code) = &entry.code {
        start.push_attribute(("code", code.as_str()));
    }
    if let Some(severity) = &entry.severity {
        start.push_attribute(("severity", severity.as_str()));
    }
    emit(writer, Event::Start(start))?;
    for text in &entry.text {
        localized(writer, "com:Text", text)?;
    }
    end(writer, name)
}

fn write_footer<W: Write>(writer: &mut Writer<W>, footer: &Footer) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("footer:Footer")))?;
    for entry in &footer.messages {
        write_footer_message(writer, "footer:Message", entry)?;
    }
    end(writer, "footer:Footer")
}
