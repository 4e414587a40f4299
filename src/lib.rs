//! # sdmx
//!
//! SDMX Information Model with SDMX-ML 2.1 and SDMX-JSON readers and
//! writers.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! reader / writer → SDMX-ML and SDMX-JSON codecs, format detection
//!   ↓
//! message         → header, artefacts, data sets, footer
//!   ↓
//! dataset         → grouping engine: raw observations → series or flat data
//!   ↓
//! index           → resolution index, reference fix-up
//!   ↓
//! model           → item schemes, data structures, dataflows, constraints
//!   ↓
//! base            → identifiers, versions, artefact kinds, URNs
//! ```
//!
//! Reading is two passes: a format reader builds artefacts and raw data
//! with every reference pending, then the fix-up pass settles references
//! against the whole document and groups the data.

// ============================================================================
// MODULES (dependency order: base → model → index → dataset → message → reader/writer)
// ============================================================================

/// Foundation types: identifiers, versions, artefact kinds, URNs
pub mod base;

/// Information model artefacts
pub mod model;

/// Artefact registry and reference resolution
pub mod index;

/// Data sets and the grouping engine
pub mod dataset;

/// SDMX messages
pub mod message;

/// Format detection and codec dispatch
pub mod format;

/// Reader and writer options
pub mod options;

/// Message readers
pub mod reader;

/// Message writers
pub mod writer;

pub mod diagnostics;
pub mod error;

mod wire;

// Re-export the entry points
pub use diagnostics::{Diagnostic, Severity};
pub use error::{Location, Result, SdmxError};
pub use format::{Format, JsonVersion, MessageFormat, detect_format};
pub use message::{Header, Message, MessageKind};
pub use options::{ReaderOptions, WriterOptions};
pub use reader::{read, read_many};
pub use writer::{Output, write};

// Re-export foundation types
pub use base::{ArtefactKind, Identifier, Urn, compare_versions, format_urn, parse_urn};
