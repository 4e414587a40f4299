//! Foundation types for SDMX artefacts.
//!
//! This module provides the identity layer used throughout the crate:
//! - [`Identifier`] - `(agency, id, version)` of a maintainable artefact
//! - [`compare_versions`] - total order over version strings
//! - [`ArtefactKind`] - classes addressable by reference
//! - [`Urn`], [`parse_urn`], [`format_urn`] - the SDMX URN grammar
//!
//! This module has NO dependencies on other sdmx modules besides `error`.

mod identifier;
mod kind;
mod urn;

pub use identifier::{DEFAULT_VERSION, Identifier, compare_versions};
pub use kind::ArtefactKind;
pub use urn::{URN_PREFIX, Urn, format_urn, is_id, parse_urn};

// Re-export text-size types for convenience
pub use text_size::{self, TextSize};
