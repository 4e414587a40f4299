//! Diagnostics: non-fatal problems collected while reading a message.
//!
//! Readers never log-and-forget. Anything dropped, stubbed or rejected on the
//! way to a [`Message`](crate::Message) is recorded here so callers can
//! decide whether it matters.

use std::fmt;

use smol_str::SmolStr;

use crate::error::Location;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// A diagnostic message with an optional location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Diagnostic code (e.g., "S0001"), see [`codes`].
    pub code: Option<SmolStr>,
    /// The diagnostic message.
    pub message: String,
    /// Where the problem was found, if known.
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: None,
            message: message.into(),
            location: None,
        }
    }

    /// Create a new informational diagnostic.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code: None,
            message: message.into(),
            location: None,
        }
    }

    /// Set the diagnostic code.
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(SmolStr::new(code));
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Whether this diagnostic carries the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, "[{code}]")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Diagnostic codes.
pub mod codes {
    /// Reference into the message's own agency scope that is not defined.
    pub const UNRESOLVED_LOCAL_REFERENCE: &str = "S0001";
    /// Observation key does not cover exactly the structure's dimensions.
    pub const KEY_ARITY_MISMATCH: &str = "S0002";
    /// Attribute value found at a level other than the declared one.
    pub const ATTACHMENT_LEVEL_MISMATCH: &str = "S0003";
    /// Attribute id not declared by the structure.
    pub const UNKNOWN_ATTRIBUTE: &str = "S0004";
    /// Two observations with the same full key.
    pub const DUPLICATE_OBSERVATION: &str = "S0005";
    /// Structure was reconstructed from the data itself.
    pub const PROVISIONAL_STRUCTURE: &str = "S0006";
    /// Series key repeated with a conflicting attribute value.
    pub const CONFLICTING_ATTRIBUTE: &str = "S0007";
    /// Group key naming a dimension the structure lacks.
    pub const UNKNOWN_DIMENSION: &str = "S0008";
    /// Element or member the reader does not understand and skipped.
    pub const IGNORED_CONTENT: &str = "S0009";
    /// Index into a value list that the list does not have.
    pub const BAD_VALUE_INDEX: &str = "S0010";
    /// Declared `urn` that does not name the artefact carrying it.
    pub const URN_MISMATCH: &str = "S0011";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_code_and_location() {
        let diag = Diagnostic::warning("dropped observation")
            .with_code(codes::DUPLICATE_OBSERVATION)
            .with_location(Location::path("DataSet/Series"));
        assert_eq!(
            diag.to_string(),
            "warning[S0005]: dropped observation at DataSet/Series"
        );
        assert!(diag.has_code(codes::DUPLICATE_OBSERVATION));
        assert!(!diag.is_error());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Warning < Severity::Info);
    }
}
