//! Error types for reading, resolving and writing SDMX messages.
//!
//! Every fatal condition surfaces as an [`SdmxError`]. Recoverable problems
//! (unresolved local references, attachment mismatches, dropped
//! observations) are reported as [`Diagnostic`](crate::Diagnostic)s instead
//! and never abort a read.

use std::fmt;

use text_size::TextSize;
use thiserror::Error;

use crate::base::Identifier;

/// Where in an input document an error was detected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// Byte offset into the input, when the parser knows it.
    pub offset: Option<TextSize>,
    /// Element or JSON path leading to the offending node.
    pub path: String,
}

impl Location {
    pub fn new(offset: Option<TextSize>, path: impl Into<String>) -> Self {
        Self {
            offset,
            path: path.into(),
        }
    }

    /// A location known only by its node path.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            offset: None,
            path: path.into(),
        }
    }

    /// A location known only by its byte offset.
    pub fn offset(offset: u64) -> Self {
        Self {
            offset: u32::try_from(offset).ok().map(TextSize::from),
            path: String::new(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.offset, self.path.is_empty()) {
            (Some(offset), true) => write!(f, "byte {}", u32::from(offset)),
            (Some(offset), false) => write!(f, "{} (byte {})", self.path, u32::from(offset)),
            (None, false) => f.write_str(&self.path),
            (None, true) => f.write_str("<unknown>"),
        }
    }
}

/// Errors that abort a read, a resolution or a write.
#[derive(Debug, Error)]
pub enum SdmxError {
    /// Neither the content type nor the leading bytes identify a format.
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// A recognised format in a version this crate does not read.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// The input is not well-formed, or a required element is missing.
    #[error("malformed document at {location}: {message}")]
    MalformedDocument { message: String, location: Location },

    /// A URN or reference does not follow the SDMX grammar.
    #[error("malformed reference {reference:?}: {message}")]
    MalformedReference { reference: String, message: String },

    /// Two different artefacts were registered under the same identity.
    #[error("duplicate artefact {identifier} at {location}")]
    DuplicateArtefact {
        identifier: Identifier,
        location: Location,
    },

    /// A reference into the message's own agency scope with no definition.
    #[error("unresolved local reference to {identifier} at {location}")]
    UnresolvedLocalReference {
        identifier: Identifier,
        location: Location,
    },

    /// A key mapping whose dimensions differ from the structure's.
    #[error("key arity mismatch for {structure}: expected {expected} dimension(s), got {found}")]
    KeyArityMismatch {
        structure: Identifier,
        expected: usize,
        found: usize,
    },

    /// An attribute found at a level its structure does not declare.
    #[error("attribute {attribute} attached at {found}, declared at {expected}")]
    AttachmentLevelMismatch {
        attribute: String,
        expected: String,
        found: String,
    },

    /// A message that cannot be expressed in the requested output format.
    #[error("write failed: {0}")]
    Write(String),

    /// IO error while reading or writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdmxError {
    /// Create a malformed document error.
    pub fn malformed(message: impl Into<String>, location: Location) -> Self {
        Self::MalformedDocument {
            message: message.into(),
            location,
        }
    }

    /// Create a missing element error.
    pub fn missing(name: &str, location: Location) -> Self {
        Self::MalformedDocument {
            message: format!("missing required {name}"),
            location,
        }
    }

    /// Create a malformed reference error.
    pub fn bad_reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedReference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create a write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }
}

/// Result type for SDMX operations.
pub type Result<T> = std::result::Result<T, SdmxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(Location::path("Codelist/Code").to_string(), "Codelist/Code");
        assert_eq!(Location::offset(12).to_string(), "byte 12");
        assert_eq!(
            Location::new(Some(TextSize::from(4)), "Header").to_string(),
            "Header (byte 4)"
        );
        assert_eq!(Location::default().to_string(), "<unknown>");
    }

    #[test]
    fn test_offset_beyond_u32_is_dropped() {
        assert_eq!(Location::offset(u64::MAX).offset, None);
    }

    #[test]
    fn test_error_messages() {
        let err = SdmxError::missing("element Header", Location::path("Structure"));
        assert_eq!(
            err.to_string(),
            "malformed document at Structure: missing required element Header"
        );

        let err = SdmxError::KeyArityMismatch {
            structure: Identifier::new("ECB", "ECB_EXR1", "1.0"),
            expected: 5,
            found: 4,
        };
        assert!(err.to_string().contains("expected 5 dimension(s), got 4"));
    }
}
