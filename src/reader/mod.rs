//! Message reader: bytes in, [`Message`] out.
//!
//! # Architecture
//!
//! ```text
//!   bytes + content type
//!        │
//!        ▼
//!   format detection ──▶ xml::read / json::read       (structural pass)
//!                               │
//!                               ▼
//!                          Document { header, index, raw data sets }
//!                               │
//!                               ▼
//!                          assemble                    (fix-up pass)
//!                           ├── supplied structures join the index
//!                           ├── missing data structures are reconstructed
//!                           ├── every reference is settled
//!                           └── raw data sets go through the DatasetEngine
//!                               │
//!                               ▼
//!                            Message
//! ```
//!
//! The format readers never resolve a reference. They register artefacts as
//! they complete them and leave every reference pending; `assemble` settles
//! them once the whole document is known, so forward references work.

pub mod json;
pub(crate) mod provisional;
pub mod xml;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::base::{ArtefactKind, Identifier, parse_urn};
use crate::dataset::{DatasetEngine, RawDataSet};
use crate::diagnostics::{Diagnostic, codes};
use crate::error::{Location, Result, SdmxError};
use crate::format::{
    ContentTypeHint, Family, MessageFormat, SdmxJson, SdmxMl, parse_content_type, sniff_family,
};
use crate::index::ResolutionIndex;
use crate::message::{Footer, Header, Message, MessageKind};
use crate::model::{Artefact, DataStructureDefinition, DimensionAtObservation, ItemScheme, Reference};
use crate::options::ReaderOptions;

use provisional::ProvisionalStructure;

/// Read one message.
///
/// The declared content type in `options` is honoured first; without one
/// the format is sniffed from the input.
pub fn read(input: &[u8], options: &ReaderOptions) -> Result<Message> {
    let hint = options
        .content_type
        .as_deref()
        .map(parse_content_type)
        .transpose()?;
    let (family, format) = match hint {
        Some(ContentTypeHint::Exact(format)) => (format.family(), Some(format)),
        Some(ContentTypeHint::Family(family)) => (family, None),
        Some(ContentTypeHint::Unknown) | None => (sniff_family(input)?, None),
    };
    let codec: &dyn MessageFormat = match family {
        Family::Xml => &SdmxMl,
        Family::Json => &SdmxJson,
    };
    tracing::debug!(codec = codec.name(), bytes = input.len(), "reading message");
    codec.read(input, format, options)
}

/// Read independent messages in parallel. Results keep the input order.
pub fn read_many<T>(inputs: &[T], options: &ReaderOptions) -> Vec<Result<Message>>
where
    T: AsRef<[u8]> + Sync,
{
    inputs
        .par_iter()
        .map(|input| read(input.as_ref(), options))
        .collect()
}

// ============================================================================
// INTERMEDIATE DOCUMENT
// ============================================================================

/// A data set as the structural pass left it.
#[derive(Debug)]
pub(crate) struct PendingData {
    /// `raw.structure` may still point at a dataflow.
    pub raw: RawDataSet,
    pub dimension_at_observation: DimensionAtObservation,
    /// Layout the document declares, used when no structure is available.
    pub layout: Option<ProvisionalStructure>,
}

/// Output of the structural pass of either format.
#[derive(Debug)]
pub(crate) struct Document {
    pub kind: MessageKind,
    pub header: Header,
    pub index: ResolutionIndex,
    pub data: Vec<PendingData>,
    pub footer: Option<Footer>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Document {
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
}

/// Compare the `urn` a document declares for an artefact with the identity
/// it was read as. The identity wins; a disagreement is reported.
pub(crate) fn check_urn(artefact: &Artefact, declared: Option<&str>, location: Location) -> Option<Diagnostic> {
    let declared = declared?;
    let agrees = parse_urn(declared).is_ok_and(|urn| {
        urn.kind == artefact.kind() && urn.item_id.is_none() && &urn.identifier == artefact.identifier()
    });
    if agrees {
        return None;
    }
    tracing::warn!(declared, artefact = %artefact.identifier(), "declared urn disagrees with identity");
    Some(
        Diagnostic::warning(format!(
            "urn {declared} does not name {}; using {}",
            artefact.identifier(),
            artefact.urn()
        ))
        .with_code(codes::URN_MISMATCH)
        .with_location(location),
    )
}

/// Index over the structures supplied by the caller.
pub(crate) fn supplied_index(options: &ReaderOptions) -> Result<ResolutionIndex> {
    let mut index = ResolutionIndex::new();
    for artefact in &options.structures {
        index.register_supplied(artefact.clone())?;
    }
    Ok(index)
}

// ============================================================================
// FIX-UP PASS
// ============================================================================

/// Turn a finished structural pass into a message.
pub(crate) fn assemble(doc: Document, supplied: &ResolutionIndex, options: &ReaderOptions) -> Result<Message> {
    let Document {
        kind,
        mut header,
        mut index,
        mut data,
        footer,
        mut diagnostics,
    } = doc;
    let strict = options.strict_local_references;

    // A structure message speaks for its sender; a data message only for
    // what it defines.
    if kind == MessageKind::Structure {
        if let Some(sender) = &header.sender {
            index.add_agency(sender.id.clone());
        }
    }

    for artefact in supplied.iter() {
        if index.get(artefact.kind(), artefact.identifier()).is_none() {
            index.register_supplied(artefact.clone())?;
        }
    }

    for pending in &mut data {
        point_at_structure(&index, &mut pending.raw);
    }
    reconstruct_missing(&mut index, &mut data, &mut diagnostics)?;

    diagnostics.extend(index.settle_references(strict)?);
    for structure in &mut header.structures {
        diagnostics.extend(index.settle(&mut structure.structure, strict)?);
    }
    for pending in &mut data {
        diagnostics.extend(index.settle(&mut pending.raw.structure, strict)?);
        if let Some(flow) = &mut pending.raw.dataflow {
            diagnostics.extend(index.settle(flow, strict)?);
        }
    }

    let mut data_sets = Vec::with_capacity(data.len());
    for pending in data {
        let dsd = index.structure_of(&pending.raw.structure).ok_or_else(|| {
            SdmxError::malformed(
                format!("no data structure for {}", pending.raw.structure),
                Location::path("DataSet"),
            )
        })?;
        let mut engine = DatasetEngine::new(dsd).strict(options.strict_attachment);
        if let Some(order) = observation_order(&index, dsd, &pending.dimension_at_observation) {
            engine = engine.with_obs_order(order);
        }
        data_sets.push(engine.build(pending.raw, pending.dimension_at_observation)?);
    }

    tracing::debug!(
        artefacts = index.len(),
        data_sets = data_sets.len(),
        diagnostics = diagnostics.len(),
        "message assembled"
    );
    Ok(Message {
        kind,
        header,
        index,
        data: data_sets,
        footer,
        diagnostics,
    })
}

/// Replace a dataflow structure reference by the dataflow's data structure,
/// keeping the dataflow alongside.
fn point_at_structure(index: &ResolutionIndex, raw: &mut RawDataSet) {
    if raw.structure.kind != ArtefactKind::Dataflow {
        return;
    }
    let flow = raw.structure.clone();
    raw.structure = match index.dataflow(&flow.target) {
        Some(dataflow) => Reference::new(ArtefactKind::DataStructure, dataflow.structure.target.clone()),
        // Unknown flow: the reconstructed structure takes the flow's identity.
        None => Reference::new(ArtefactKind::DataStructure, flow.target.clone()),
    };
    raw.dataflow.get_or_insert(flow);
}

/// Reconstruct the structures of data sets whose structure is neither
/// defined nor supplied. Data sets sharing a structure share one layout.
fn reconstruct_missing(
    index: &mut ResolutionIndex,
    data: &mut [PendingData],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let mut layouts: IndexMap<Identifier, ProvisionalStructure> = IndexMap::new();
    for pending in data.iter_mut() {
        if index.structure_of(&pending.raw.structure).is_some() {
            continue;
        }
        let identifier = pending.raw.structure.target.clone();
        let declared = pending.layout.take();
        let layout = layouts
            .entry(identifier.clone())
            .or_insert_with(|| declared.unwrap_or_else(|| ProvisionalStructure::new(identifier)));
        layout.observe(&pending.raw, &pending.dimension_at_observation);
    }
    for (identifier, layout) in layouts {
        tracing::warn!(structure = %identifier, "data structure not available, reconstructing from data");
        diagnostics.push(
            Diagnostic::warning(format!(
                "data structure {identifier} is neither defined nor supplied; reconstructed from the data"
            ))
            .with_code(codes::PROVISIONAL_STRUCTURE),
        );
        let dsd: DataStructureDefinition = layout.build()?;
        index.register_supplied(dsd.into())?;
    }
    Ok(())
}

/// Codelist ordering the observation dimension, from the dimension's local
/// representation or its concept's core representation.
pub(crate) fn observation_order<'a>(
    index: &'a ResolutionIndex,
    dsd: &DataStructureDefinition,
    dim_at_obs: &DimensionAtObservation,
) -> Option<&'a ItemScheme> {
    let dimension = dsd.dimension(dim_at_obs.dimension()?)?;
    let enumeration = dimension.enumeration().cloned().or_else(|| {
        let concept = dimension.concept.as_ref()?;
        let scheme = index.item_scheme(concept)?;
        scheme
            .get(concept.item_id.as_deref()?)?
            .core_representation()?
            .enumeration
            .clone()
    })?;
    index
        .item_scheme(&enumeration)
        .filter(|scheme| scheme.kind().artefact_kind() == ArtefactKind::Codelist)
}

/// Structure reference for a data set, from the header declaration it
/// names.
pub(crate) fn header_structure(
    header: &Header,
    structure_id: Option<&str>,
    location: Location,
) -> Result<(Reference, DimensionAtObservation)> {
    let declared = match structure_id {
        Some(id) => header.structure(id),
        None => header.structures.first(),
    };
    declared
        .map(|s| (s.structure.clone(), s.dimension_at_observation.clone()))
        .ok_or_else(|| {
            SdmxError::malformed(
                format!(
                    "data set refers to undeclared structure {}",
                    structure_id.unwrap_or("(none)")
                ),
                location,
            )
        })
}
