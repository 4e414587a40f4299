//! Wire formats and format detection.
//!
//! ```text
//!   content type ──▶ Format (exact) ────────────────┐
//!        │                                          │
//!        └──▶ family only / absent ──▶ sniff bytes ─┤
//!                                                   ▼
//!                        ┌─────────────────────────────────────────┐
//!                        │ MessageFormat trait                     │
//!                        │  SdmxMl   (structure, generic, SS data) │
//!                        │  SdmxJson (structure, data; gen 1 + 2)  │
//!                        └─────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::error::{Result, SdmxError};
use crate::message::Message;
use crate::options::{ReaderOptions, WriterOptions};
use crate::{reader, writer};

/// SDMX-JSON generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JsonVersion {
    /// SDMX-JSON 1.0
    V1,
    /// SDMX-JSON 2.0
    V2,
}

/// A concrete message format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    StructureXml,
    GenericDataXml,
    StructureSpecificDataXml,
    DataJson(JsonVersion),
    StructureJson(JsonVersion),
}

impl Format {
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::StructureXml => "application/vnd.sdmx.structure+xml;version=2.1",
            Format::GenericDataXml => "application/vnd.sdmx.genericdata+xml;version=2.1",
            Format::StructureSpecificDataXml => {
                "application/vnd.sdmx.structurespecificdata+xml;version=2.1"
            }
            Format::DataJson(JsonVersion::V1) => "application/vnd.sdmx.data+json;version=1.0.0",
            Format::DataJson(JsonVersion::V2) => "application/vnd.sdmx.data+json;version=2.0.0",
            Format::StructureJson(JsonVersion::V1) => {
                "application/vnd.sdmx.structure+json;version=1.0.0"
            }
            Format::StructureJson(JsonVersion::V2) => {
                "application/vnd.sdmx.structure+json;version=2.0.0"
            }
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Format::StructureXml | Format::GenericDataXml | Format::StructureSpecificDataXml => {
                Family::Xml
            }
            Format::DataJson(_) | Format::StructureJson(_) => Family::Json,
        }
    }

    pub fn is_data(&self) -> bool {
        !matches!(self, Format::StructureXml | Format::StructureJson(_))
    }

    /// The codec that reads and writes this format.
    pub fn codec(&self) -> Box<dyn MessageFormat> {
        match self.family() {
            Family::Xml => Box::new(SdmxMl),
            Family::Json => Box::new(SdmxJson),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::StructureXml => "SDMX-ML 2.1 structure",
            Format::GenericDataXml => "SDMX-ML 2.1 generic data",
            Format::StructureSpecificDataXml => "SDMX-ML 2.1 structure-specific data",
            Format::DataJson(JsonVersion::V1) => "SDMX-JSON 1.0 data",
            Format::DataJson(JsonVersion::V2) => "SDMX-JSON 2.0 data",
            Format::StructureJson(JsonVersion::V1) => "SDMX-JSON 1.0 structure",
            Format::StructureJson(JsonVersion::V2) => "SDMX-JSON 2.0 structure",
        })
    }
}

/// Syntax family of a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Xml,
    Json,
}

/// What a content type says about the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentTypeHint {
    Exact(Format),
    Family(Family),
    Unknown,
}

/// Interpret a declared content type.
///
/// SDMX media types in versions this crate does not read fail with
/// [`SdmxError::UnsupportedVersion`]; media types that only name a syntax
/// (`application/xml`, `application/json`) yield a family hint.
pub fn parse_content_type(content_type: &str) -> Result<ContentTypeHint> {
    let mut parts = content_type.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let version = parts.find_map(|p| {
        let (name, value) = p.split_once('=')?;
        (name.trim().eq_ignore_ascii_case("version")).then(|| value.trim().trim_matches('"').to_owned())
    });
    let version = version.as_deref();

    let hint = match mime.as_str() {
        "application/vnd.sdmx.structure+xml" => ContentTypeHint::Exact(xml(Format::StructureXml, version)?),
        "application/vnd.sdmx.genericdata+xml"
        | "application/vnd.sdmx.generictimeseriesdata+xml" => {
            ContentTypeHint::Exact(xml(Format::GenericDataXml, version)?)
        }
        "application/vnd.sdmx.structurespecificdata+xml"
        | "application/vnd.sdmx.structurespecifictimeseriesdata+xml" => {
            ContentTypeHint::Exact(xml(Format::StructureSpecificDataXml, version)?)
        }
        "application/vnd.sdmx.data+json" => {
            ContentTypeHint::Exact(Format::DataJson(json_version(version)?))
        }
        "application/vnd.sdmx.structure+json" => {
            ContentTypeHint::Exact(Format::StructureJson(json_version(version)?))
        }
        "application/xml" | "text/xml" => ContentTypeHint::Family(Family::Xml),
        "application/json" | "text/json" => ContentTypeHint::Family(Family::Json),
        _ => ContentTypeHint::Unknown,
    };
    Ok(hint)
}

fn xml(format: Format, version: Option<&str>) -> Result<Format> {
    match version {
        None | Some("2.1") => Ok(format),
        Some(v) => Err(SdmxError::UnsupportedVersion(format!("SDMX-ML {v}"))),
    }
}

fn json_version(version: Option<&str>) -> Result<JsonVersion> {
    match version {
        None => Ok(JsonVersion::V1),
        Some(v) if v == "1" || v.starts_with("1.") => Ok(JsonVersion::V1),
        Some(v) if v == "2" || v.starts_with("2.") => Ok(JsonVersion::V2),
        Some(v) => Err(SdmxError::UnsupportedVersion(format!("SDMX-JSON {v}"))),
    }
}

/// Sniff the syntax family from the leading bytes.
pub fn sniff_family(input: &[u8]) -> Result<Family> {
    let input = input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input);
    match input.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'<') => Ok(Family::Xml),
        Some(b'{' | b'[') => Ok(Family::Json),
        Some(other) => Err(SdmxError::UnknownFormat(format!(
            "input starts with {:?}, expected XML or JSON",
            char::from(*other)
        ))),
        None => Err(SdmxError::UnknownFormat("empty input".to_owned())),
    }
}

/// Detect the concrete format of an input.
///
/// A content type that names a concrete format wins. Otherwise the family
/// is sniffed and the message kind and version are read from the document
/// itself.
pub fn detect_format(input: &[u8], content_type: Option<&str>) -> Result<Format> {
    let family = match content_type.map(parse_content_type).transpose()? {
        Some(ContentTypeHint::Exact(format)) => return Ok(format),
        Some(ContentTypeHint::Family(family)) => family,
        Some(ContentTypeHint::Unknown) | None => sniff_family(input)?,
    };
    let format = match family {
        Family::Xml => reader::xml::detect(input)?,
        Family::Json => reader::json::detect(&reader::json::parse_value(input)?)?,
    };
    tracing::debug!(%format, "detected format");
    Ok(format)
}

// ============================================================================
// CODECS
// ============================================================================

/// A family of wire formats that can read and write messages.
pub trait MessageFormat: Send + Sync {
    /// Human-readable name of the format family.
    fn name(&self) -> &'static str;

    /// Concrete formats this codec handles.
    fn formats(&self) -> &'static [Format];

    /// Read a message. `format`, when given, overrides detection of the
    /// message kind within the family.
    fn read(&self, input: &[u8], format: Option<Format>, options: &ReaderOptions) -> Result<Message>;

    /// Write a message in `options.format`.
    fn write(&self, message: &Message, options: &WriterOptions) -> Result<Vec<u8>>;
}

/// SDMX-ML 2.1.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdmxMl;

impl MessageFormat for SdmxMl {
    fn name(&self) -> &'static str {
        "SDMX-ML"
    }

    fn formats(&self) -> &'static [Format] {
        &[
            Format::StructureXml,
            Format::GenericDataXml,
            Format::StructureSpecificDataXml,
        ]
    }

    fn read(&self, input: &[u8], format: Option<Format>, options: &ReaderOptions) -> Result<Message> {
        reader::xml::read(input, format, options)
    }

    fn write(&self, message: &Message, options: &WriterOptions) -> Result<Vec<u8>> {
        writer::xml::write(message, options)
    }
}

/// SDMX-JSON, generations 1 and 2.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdmxJson;

impl MessageFormat for SdmxJson {
    fn name(&self) -> &'static str {
        "SDMX-JSON"
    }

    fn formats(&self) -> &'static [Format] {
        &[
            Format::DataJson(JsonVersion::V1),
            Format::DataJson(JsonVersion::V2),
            Format::StructureJson(JsonVersion::V1),
            Format::StructureJson(JsonVersion::V2),
        ]
    }

    fn read(&self, input: &[u8], format: Option<Format>, options: &ReaderOptions) -> Result<Message> {
        reader::json::read(input, format, options)
    }

    fn write(&self, message: &Message, options: &WriterOptions) -> Result<Vec<u8>> {
        writer::json::write(message, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_round_trip() {
        for codec in [&SdmxMl as &dyn MessageFormat, &SdmxJson] {
            for format in codec.formats() {
                assert_eq!(
                    parse_content_type(format.content_type()).expect("known"),
                    ContentTypeHint::Exact(*format)
                );
                assert_eq!(format.codec().name(), codec.name());
            }
        }
    }

    #[test]
    fn test_unsupported_xml_version() {
        let err = parse_content_type("application/vnd.sdmx.structure+xml; version=3.0");
        assert!(matches!(err, Err(SdmxError::UnsupportedVersion(_))));
    }

    #[test]
    fn test_generic_types_are_family_hints() {
        assert_eq!(
            parse_content_type("application/xml; charset=utf-8").expect("ok"),
            ContentTypeHint::Family(Family::Xml)
        );
        assert_eq!(
            parse_content_type("text/csv").expect("ok"),
            ContentTypeHint::Unknown
        );
    }

    #[test]
    fn test_sniff_family() {
        assert_eq!(sniff_family(b"\xEF\xBB\xBF  <?xml").expect("xml"), Family::Xml);
        assert_eq!(sniff_family(b"\n{\"a\":1}").expect("json"), Family::Json);
        assert_eq!(sniff_family(b"[1]").expect("json"), Family::Json);
        assert!(matches!(sniff_family(b"FREQ,TIME"), Err(SdmxError::UnknownFormat(_))));
        assert!(matches!(sniff_family(b"   "), Err(SdmxError::UnknownFormat(_))));
    }
}
