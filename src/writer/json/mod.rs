//! SDMX-JSON writer, generations 1 and 2.
//!
//! Messages are converted into the serde shapes of [`crate::wire`] and
//! serialized in one go. Generation 1 puts the header under `header`,
//! generation 2 under `meta`; the shapes skip whatever the other
//! generation uses.

mod data;
mod structure;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::{Result, SdmxError};
use crate::format::{Format, JsonVersion};
use crate::message::{Header, Message, MessageKind, Party};
use crate::options::WriterOptions;
use crate::wire::{self, write_text};

/// Write `message` as SDMX-JSON.
pub fn write(message: &Message, options: &WriterOptions) -> Result<Vec<u8>> {
    match options.format {
        Format::DataJson(version) => {
            let body = data::write_data(message, options, version)?;
            serialize(&body, options.indent)
        }
        Format::StructureJson(version) => {
            if message.kind == MessageKind::Error {
                return Err(SdmxError::write("error messages have no SDMX-JSON form"));
            }
            let body = structure::write_structures(message, version);
            serialize(&body, options.indent)
        }
        other => Err(SdmxError::write(format!("{other} is not an SDMX-JSON format"))),
    }
}

fn serialize<T: Serialize>(value: &T, indent: usize) -> Result<Vec<u8>> {
    let failed = |e: serde_json::Error| SdmxError::write(format!("failed to write JSON: {e}"));
    if indent == 0 {
        return serde_json::to_vec(value).map_err(failed);
    }
    let indent = vec![b' '; indent];
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
    value.serialize(&mut serializer).map_err(failed)?;
    Ok(out)
}

fn party(party: &Party, version: JsonVersion) -> wire::Party {
    let (name, names) = write_text(&party.name, version);
    wire::Party {
        id: party.id.to_string(),
        name,
        names,
    }
}

/// The message header, carrying the schema of the generation.
fn header(header: &Header, schema: &str, version: JsonVersion) -> wire::Header {
    wire::Header {
        schema: Some(schema.to_owned()),
        id: header.id.as_ref().map(ToString::to_string),
        test: header.test,
        prepared: header.prepared.map(|p| p.to_rfc3339()),
        sender: header.sender.as_ref().map(|p| party(p, version)),
        receivers: header.receivers.iter().map(|p| party(p, version)).collect(),
    }
}

/// Split a header between the generation 1 and generation 2 slots.
fn place(header: wire::Header, version: JsonVersion) -> (Option<wire::Header>, Option<wire::Header>) {
    match version {
        JsonVersion::V1 => (None, Some(header)),
        JsonVersion::V2 => (Some(header), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::parse_prepared;
    use crate::options::ReaderOptions;
    use crate::reader;

    fn structure_message() -> Message {
        let header = Header {
            id: Some("IREF1".into()),
            test: true,
            prepared: parse_prepared("2024-03-01T10:00:00+01:00"),
            sender: Some(Party::new("ECB")),
            ..Header::default()
        };
        Message::new(MessageKind::Structure, header)
    }

    #[test]
    fn test_header_round_trip_both_generations() {
        for version in [JsonVersion::V1, JsonVersion::V2] {
            let message = structure_message();
            let bytes = write(&message, &WriterOptions::new(Format::StructureJson(version)))
                .expect("written");
            let read = reader::read(&bytes, &ReaderOptions::new()).expect("read");
            assert_eq!(read.kind, MessageKind::Structure);
            assert_eq!(read.header.id, message.header.id);
            assert!(read.header.test);
            assert_eq!(read.header.prepared, message.header.prepared);
            assert_eq!(read.header.sender.map(|p| p.id), Some("ECB".into()));
        }
    }

    #[test]
    fn test_generation_slot() {
        let message = structure_message();
        let v1 = write(&message, &WriterOptions::new(Format::StructureJson(JsonVersion::V1)))
            .expect("v1");
        let v1: serde_json::Value = serde_json::from_slice(&v1).expect("json");
        assert!(v1.get("header").is_some());
        assert!(v1.get("meta").is_none());

        let v2 = write(&message, &WriterOptions::new(Format::StructureJson(JsonVersion::V2)))
            .expect("v2");
        let v2: serde_json::Value = serde_json::from_slice(&v2).expect("json");
        let schema = v2["meta"]["schema"].as_str().expect("schema");
        assert!(schema.contains(wire::SCHEMA_V2_MARKER));
    }

    #[test]
    fn test_compact_output() {
        let message = structure_message();
        let options = WriterOptions::new(Format::StructureJson(JsonVersion::V2)).compact();
        let bytes = write(&message, &options).expect("written");
        assert!(!bytes.contains(&b'\n'));
    }

    #[test]
    fn test_rejects_xml_format() {
        let message = structure_message();
        let result = write(&message, &WriterOptions::new(Format::StructureXml));
        assert!(matches!(result, Err(SdmxError::Write(_))));
    }
}
