//! SDMX-JSON reader, generations 1 and 2.
//!
//! The document is deserialized into the serde shapes of [`crate::wire`]
//! and converted from there. References are URN strings.

mod data;
mod structure;

use serde_json::Value;
use smol_str::SmolStr;

use super::{Document, assemble, supplied_index};
use crate::error::{Location, Result, SdmxError};
use crate::format::{Family, Format, JsonVersion};
use crate::message::{Header, Message, MessageKind, Party, parse_prepared};
use crate::options::ReaderOptions;
use crate::wire::{self, SCHEMA_V2_MARKER, StructureBody};

/// Parse the input as JSON.
pub fn parse_value(input: &[u8]) -> Result<Value> {
    serde_json::from_slice(input).map_err(|e| {
        SdmxError::malformed(
            e.to_string(),
            Location::path(format!("line {} column {}", e.line(), e.column())),
        )
    })
}

/// Detect the SDMX-JSON message kind and generation.
pub fn detect(value: &Value) -> Result<Format> {
    let Some(root) = value.as_object() else {
        return Err(SdmxError::UnknownFormat(
            "SDMX-JSON messages are JSON objects".to_owned(),
        ));
    };
    let schema = root
        .get("meta")
        .and_then(|m| m.get("schema"))
        .and_then(Value::as_str);
    let version = match schema {
        Some(s) if s.contains(SCHEMA_V2_MARKER) => JsonVersion::V2,
        _ => JsonVersion::V1,
    };

    if root.contains_key("dataSets") || root.contains_key("structure") {
        return Ok(Format::DataJson(JsonVersion::V1));
    }
    if let Some(data) = root.get("data").and_then(Value::as_object) {
        if data.contains_key("dataSets") || data.contains_key("structures") {
            return Ok(Format::DataJson(JsonVersion::V2));
        }
        if data.is_empty() || StructureBody::SECTIONS.iter().any(|s| data.contains_key(*s)) {
            return Ok(Format::StructureJson(version));
        }
    }
    Err(SdmxError::UnknownFormat(
        "JSON document is neither an SDMX-JSON data nor structure message".to_owned(),
    ))
}

/// Read an SDMX-JSON message.
pub fn read(input: &[u8], format: Option<Format>, options: &ReaderOptions) -> Result<Message> {
    if let Some(format) = format {
        if format.family() != Family::Json {
            return Err(SdmxError::UnknownFormat(format!(
                "{format} cannot be read as SDMX-JSON"
            )));
        }
    }
    let value = parse_value(input)?;
    let detected = detect(&value)?;
    if format.is_some_and(|f| f != detected) {
        tracing::warn!(declared = ?format, %detected, "declared format differs from document; reading as document");
    }
    tracing::debug!(format = %detected, "structural pass");

    let supplied = supplied_index(options)?;
    let doc = match detected {
        Format::DataJson(_) => {
            let message: wire::DataMessage = deserialize(value)?;
            data::read_data(message, &supplied)?
        }
        _ => {
            let message: wire::StructureMessage = deserialize(value)?;
            structure::read_structures(message)?
        }
    };
    assemble(doc, &supplied, options)
}

fn deserialize<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| SdmxError::malformed(e.to_string(), Location::path("/")))
}

/// Message header from a generation 1 `header` or generation 2 `meta`.
fn header(meta: Option<wire::Header>) -> Header {
    let Some(meta) = meta else {
        return Header::default();
    };
    let party = |p: wire::Party| Party {
        id: SmolStr::new(&p.id),
        name: wire::read_text(p.name.as_ref(), p.names.as_ref()),
    };
    Header {
        id: meta.id.map(SmolStr::from),
        test: meta.test,
        prepared: meta.prepared.as_deref().and_then(parse_prepared),
        sender: meta.sender.map(party),
        receivers: meta.receivers.into_iter().map(party).collect(),
        structures: Vec::new(),
    }
}

fn document(kind: MessageKind, meta: Option<wire::Header>, header_v1: Option<wire::Header>) -> Document {
    Document::new(kind, header(meta.or(header_v1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_generations() {
        let v1 = json!({"header": {"id": "X"}, "structure": {}, "dataSets": []});
        assert_eq!(detect(&v1).expect("known"), Format::DataJson(JsonVersion::V1));

        let v2 = json!({"meta": {"schema": "https://example.org/schemas/2.0.0/sdmx-json-data-schema.json"},
                        "data": {"structures": [], "dataSets": []}});
        assert_eq!(detect(&v2).expect("known"), Format::DataJson(JsonVersion::V2));

        let s2 = json!({"meta": {"schema": "https://example.org/2.0.0/sdmx-json-structure-schema.json"},
                        "data": {"codelists": []}});
        assert_eq!(detect(&s2).expect("known"), Format::StructureJson(JsonVersion::V2));

        let s1 = json!({"data": {"dataStructures": []}});
        assert_eq!(detect(&s1).expect("known"), Format::StructureJson(JsonVersion::V1));
    }

    #[test]
    fn test_detect_rejects_other_json() {
        assert!(matches!(detect(&json!([1, 2])), Err(SdmxError::UnknownFormat(_))));
        assert!(matches!(detect(&json!({"rows": []})), Err(SdmxError::UnknownFormat(_))));
    }

    #[test]
    fn test_parse_error_has_position() {
        let err = parse_value(b"{\"a\": ").expect_err("truncated");
        assert!(matches!(err, SdmxError::MalformedDocument { .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_header_conversion() {
        let meta: wire::Header = serde_json::from_value(json!({
            "id": "IREF1", "test": true, "prepared": "2020-01-01T00:00:00Z",
            "sender": {"id": "ECB", "name": "European Central Bank"}
        }))
        .expect("header");
        let header = header(Some(meta));
        assert_eq!(header.id.as_deref(), Some("IREF1"));
        assert!(header.test);
        assert!(header.prepared.is_some());
        let sender = header.sender.expect("sender");
        assert_eq!(sender.name.get("en"), Some("European Central Bank"));
    }
}
