//! Messages: the unit that readers produce and writers consume.
//!
//! A [`Message`] owns its [`ResolutionIndex`]; structures referenced by the
//! data sets of a data message live there (or are external stubs).

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use smol_str::SmolStr;

use crate::base::ArtefactKind;
use crate::dataset::DataSet;
use crate::diagnostics::Diagnostic;
use crate::index::ResolutionIndex;
use crate::model::{
    ContentConstraint, DataStructureDefinition, Dataflow, DimensionAtObservation,
    InternationalString, ItemScheme, Reference,
};

// ============================================================================
// HEADER
// ============================================================================

/// Sender or receiver of a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Party {
    pub id: SmolStr,
    pub name: InternationalString,
}

impl Party {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            name: InternationalString::new(),
        }
    }
}

/// Per-data-set structure declaration in a data message header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderStructure {
    /// Local id data sets use to point at this declaration.
    pub structure_id: SmolStr,
    /// The data structure, or the dataflow whose structure applies.
    pub structure: Reference,
    pub dimension_at_observation: DimensionAtObservation,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub id: Option<SmolStr>,
    pub test: bool,
    pub prepared: Option<DateTime<FixedOffset>>,
    pub sender: Option<Party>,
    pub receivers: Vec<Party>,
    pub structures: Vec<HeaderStructure>,
}

impl Header {
    pub fn structure(&self, structure_id: &str) -> Option<&HeaderStructure> {
        self.structures
            .iter()
            .find(|s| s.structure_id == structure_id)
    }
}

/// Parse a header timestamp. A missing UTC offset is read as UTC.
pub fn parse_prepared(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).ok().or_else(|| {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

// ============================================================================
// FOOTER
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FooterMessage {
    pub code: Option<SmolStr>,
    pub severity: Option<SmolStr>,
    pub text: Vec<InternationalString>,
}

/// Trailing status messages of a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Footer {
    pub messages: Vec<FooterMessage>,
}

// ============================================================================
// MESSAGE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Structure,
    Data,
    /// An error message: header plus footer text, no payload.
    Error,
}

#[derive(Clone, Debug)]
pub struct Message {
    pub kind: MessageKind,
    pub header: Header,
    pub index: ResolutionIndex,
    pub data: Vec<DataSet>,
    pub footer: Option<Footer>,
    /// Problems found while reading; see also each data set's diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Diagnostics do not take part in equality.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.header == other.header
            && self.index == other.index
            && self.data == other.data
            && self.footer == other.footer
    }
}

impl Message {
    pub fn new(kind: MessageKind, header: Header) -> Self {
        Self {
            kind,
            header,
            index: ResolutionIndex::new(),
            data: Vec::new(),
            footer: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_structure(&self) -> bool {
        self.kind == MessageKind::Structure
    }

    pub fn is_data(&self) -> bool {
        self.kind == MessageKind::Data
    }

    fn item_schemes(&self, kind: ArtefactKind) -> impl Iterator<Item = &ItemScheme> {
        self.index.iter_kind(kind).filter_map(|a| a.as_item_scheme())
    }

    pub fn codelists(&self) -> impl Iterator<Item = &ItemScheme> {
        self.item_schemes(ArtefactKind::Codelist)
    }

    pub fn concept_schemes(&self) -> impl Iterator<Item = &ItemScheme> {
        self.item_schemes(ArtefactKind::ConceptScheme)
    }

    pub fn category_schemes(&self) -> impl Iterator<Item = &ItemScheme> {
        self.item_schemes(ArtefactKind::CategoryScheme)
    }

    pub fn agency_schemes(&self) -> impl Iterator<Item = &ItemScheme> {
        self.item_schemes(ArtefactKind::AgencyScheme)
    }

    pub fn data_structures(&self) -> impl Iterator<Item = &DataStructureDefinition> {
        self.index
            .iter_kind(ArtefactKind::DataStructure)
            .filter_map(|a| a.as_data_structure())
    }

    pub fn dataflows(&self) -> impl Iterator<Item = &Dataflow> {
        self.index
            .iter_kind(ArtefactKind::Dataflow)
            .filter_map(|a| a.as_dataflow())
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ContentConstraint> {
        self.index
            .iter_kind(ArtefactKind::ContentConstraint)
            .filter_map(|a| a.as_constraint())
    }

    /// The data structure a data set conforms to, if the index holds it.
    pub fn structure_for(&self, data_set: &DataSet) -> Option<&DataStructureDefinition> {
        self.index.structure_of(&data_set.structure)
    }

    /// All diagnostics: message level first, then per data set.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.data.iter().flat_map(|ds| ds.diagnostics.iter()))
    }
}
