//! Reader and writer options.

use crate::format::Format;
use crate::model::{Artefact, DimensionAtObservation};

/// Options for [`read`](crate::reader::read).
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Declared content type; takes precedence over sniffing when it names
    /// a concrete format.
    pub content_type: Option<String>,
    /// Abort on an unresolved reference into the message's own agency
    /// instead of reporting it.
    pub strict_local_references: bool,
    /// Abort on an attribute value at the wrong level instead of reporting
    /// it.
    pub strict_attachment: bool,
    /// Structures supplied by the caller, for data messages that only
    /// reference their structure.
    pub structures: Vec<Artefact>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_structure(mut self, artefact: impl Into<Artefact>) -> Self {
        self.structures.push(artefact.into());
        self
    }

    /// Supply every artefact of an earlier structure message.
    pub fn with_structures<'a>(mut self, artefacts: impl IntoIterator<Item = &'a Artefact>) -> Self {
        self.structures.extend(artefacts.into_iter().cloned());
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_local_references = true;
        self.strict_attachment = true;
        self
    }
}

/// Options for [`write`](crate::writer::write).
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub format: Format,
    /// Regroup every data set to this dimension at observation before
    /// writing.
    pub dimension_at_observation: Option<DimensionAtObservation>,
    /// Spaces per indentation level; 0 writes compact output.
    pub indent: usize,
}

impl WriterOptions {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            dimension_at_observation: None,
            indent: 2,
        }
    }

    pub fn with_dimension_at_observation(mut self, dim: DimensionAtObservation) -> Self {
        self.dimension_at_observation = Some(dim);
        self
    }

    pub fn compact(mut self) -> Self {
        self.indent = 0;
        self
    }
}
