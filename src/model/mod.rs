//! The SDMX Information Model.
//!
//! Structural metadata is a graph of maintainable artefacts that refer to
//! each other by identity:
//!
//! ```text
//! Dataflow ──structure──▶ DataStructureDefinition
//!                            ├── Dimension ──concept──▶ ConceptScheme/Concept
//!                            │      └── representation ──▶ Codelist
//!                            ├── DataAttribute ──concept──▶ ...
//!                            └── PrimaryMeasure
//! ContentConstraint ──attachment──▶ Dataflow | DataStructureDefinition
//! ```
//!
//! Every edge is a [`Reference`]; the graph itself lives in a
//! [`ResolutionIndex`](crate::index::ResolutionIndex).

mod common;
mod constraint;
mod item;
mod key;
mod reference;
mod structure;

pub use common::{Annotation, DEFAULT_LOCALE, Identifiable, InternationalString, Maintainable};
pub use constraint::{ConstraintRole, ContentConstraint, CubeRegion, Dataflow};
pub use item::{Item, ItemKind, ItemScheme, SchemeKind};
pub use key::Key;
pub use reference::{Reference, Resolution};
pub use structure::{
    AttachmentLevel, AttributeRelationship, DataAttribute, DataStructureDefinition, Dimension,
    DimensionAtObservation, DimensionDescriptor, DimensionKind, GroupDimensionDescriptor,
    OBS_VALUE, PrimaryMeasure, Representation, TIME_PERIOD, TextFormat, UsageStatus,
};

use crate::base::{ArtefactKind, Identifier, format_urn};

// ============================================================================
// ARTEFACT
// ============================================================================

/// Any maintainable artefact that can be held by the resolution index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Artefact {
    ItemScheme(ItemScheme),
    DataStructure(DataStructureDefinition),
    Dataflow(Dataflow),
    Constraint(ContentConstraint),
}

impl Artefact {
    pub fn kind(&self) -> ArtefactKind {
        match self {
            Artefact::ItemScheme(s) => s.kind().artefact_kind(),
            Artefact::DataStructure(_) => ArtefactKind::DataStructure,
            Artefact::Dataflow(_) => ArtefactKind::Dataflow,
            Artefact::Constraint(_) => ArtefactKind::ContentConstraint,
        }
    }

    pub fn maintainable(&self) -> &Maintainable {
        match self {
            Artefact::ItemScheme(s) => &s.maintainable,
            Artefact::DataStructure(d) => &d.maintainable,
            Artefact::Dataflow(f) => &f.maintainable,
            Artefact::Constraint(c) => &c.maintainable,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.maintainable().identifier
    }

    /// The artefact's URN, from its kind and identity.
    pub fn urn(&self) -> String {
        format_urn(self.kind(), self.identifier(), None)
    }

    pub fn as_item_scheme(&self) -> Option<&ItemScheme> {
        match self {
            Artefact::ItemScheme(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data_structure(&self) -> Option<&DataStructureDefinition> {
        match self {
            Artefact::DataStructure(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dataflow(&self) -> Option<&Dataflow> {
        match self {
            Artefact::Dataflow(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_constraint(&self) -> Option<&ContentConstraint> {
        match self {
            Artefact::Constraint(c) => Some(c),
            _ => None,
        }
    }

    /// Whether this artefact defines the item or component `item_id` of
    /// class `kind`. Nested category paths (`A.B`) match on their last
    /// segment.
    pub fn contains_item(&self, kind: ArtefactKind, item_id: &str) -> bool {
        match self {
            Artefact::ItemScheme(s) => {
                s.contains(item_id)
                    || item_id
                        .rsplit_once('.')
                        .is_some_and(|(_, last)| s.contains(last))
            }
            Artefact::DataStructure(d) => match kind {
                ArtefactKind::Dimension
                | ArtefactKind::TimeDimension
                | ArtefactKind::MeasureDimension => d.dimensions.contains(item_id),
                ArtefactKind::DataAttribute => d.attributes.contains_key(item_id),
                ArtefactKind::PrimaryMeasure => d.measure.base.id == item_id,
                ArtefactKind::GroupDimensionDescriptor => d.groups.contains_key(item_id),
                _ => false,
            },
            Artefact::Dataflow(_) | Artefact::Constraint(_) => false,
        }
    }

    /// Every outgoing reference, in a fixed order.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        match self {
            Artefact::ItemScheme(s) => {
                for item in s.iter() {
                    if let Some(rep) = item.core_representation() {
                        out.extend(rep.enumeration.as_ref());
                    }
                }
            }
            Artefact::DataStructure(d) => {
                for dim in d.dimensions.iter() {
                    out.extend(dim.concept.as_ref());
                    out.extend(dim.enumeration());
                }
                for attr in d.attributes.values() {
                    out.extend(attr.concept.as_ref());
                    out.extend(
                        attr.local_representation
                            .as_ref()
                            .and_then(|r| r.enumeration.as_ref()),
                    );
                }
                out.extend(d.measure.concept.as_ref());
                out.extend(
                    d.measure
                        .local_representation
                        .as_ref()
                        .and_then(|r| r.enumeration.as_ref()),
                );
            }
            Artefact::Dataflow(f) => out.push(&f.structure),
            Artefact::Constraint(c) => out.extend(c.attachments.iter()),
        }
        out
    }

    /// Mutable counterpart of [`references`](Self::references), same order.
    pub(crate) fn references_mut(&mut self) -> Vec<&mut Reference> {
        let mut out = Vec::new();
        match self {
            Artefact::ItemScheme(s) => {
                for item in s.items_mut() {
                    if let ItemKind::Concept {
                        core_representation: Some(rep),
                    } = &mut item.kind
                    {
                        out.extend(rep.enumeration.as_mut());
                    }
                }
            }
            Artefact::DataStructure(d) => {
                for dim in d.dimensions.iter_mut() {
                    out.extend(dim.concept.as_mut());
                    out.extend(
                        dim.local_representation
                            .as_mut()
                            .and_then(|r| r.enumeration.as_mut()),
                    );
                }
                for attr in d.attributes.values_mut() {
                    out.extend(attr.concept.as_mut());
                    out.extend(
                        attr.local_representation
                            .as_mut()
                            .and_then(|r| r.enumeration.as_mut()),
                    );
                }
                out.extend(d.measure.concept.as_mut());
                out.extend(
                    d.measure
                        .local_representation
                        .as_mut()
                        .and_then(|r| r.enumeration.as_mut()),
                );
            }
            Artefact::Dataflow(f) => out.push(&mut f.structure),
            Artefact::Constraint(c) => out.extend(c.attachments.iter_mut()),
        }
        out
    }
}

impl From<ItemScheme> for Artefact {
    fn from(s: ItemScheme) -> Self {
        Artefact::ItemScheme(s)
    }
}

impl From<DataStructureDefinition> for Artefact {
    fn from(d: DataStructureDefinition) -> Self {
        Artefact::DataStructure(d)
    }
}

impl From<Dataflow> for Artefact {
    fn from(f: Dataflow) -> Self {
        Artefact::Dataflow(f)
    }
}

impl From<ContentConstraint> for Artefact {
    fn from(c: ContentConstraint) -> Self {
        Artefact::Constraint(c)
    }
}
