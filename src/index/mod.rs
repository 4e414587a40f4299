//! Resolution index: the per-message store of maintainable artefacts.
//!
//! # Architecture
//!
//! Readers work in two passes:
//!
//! 1. **Structural pass**: every maintainable artefact is built and
//!    [`register`](ResolutionIndex::register)ed as soon as it is complete.
//!    References inside artefacts are created `Pending`.
//! 2. **Fix-up pass**: [`settle_references`](ResolutionIndex::settle_references)
//!    walks every reference held by the index and marks it `Local` or
//!    `External`. Forward references inside one document therefore resolve
//!    no matter which artefact appears first.
//!
//! A reference whose agency belongs to the message's own scope (the sender
//! plus every agency that maintains an artefact defined in the message) must
//! resolve locally; otherwise it is reported. References into any other
//! agency quietly become external stubs.

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

use crate::base::{ArtefactKind, Identifier, compare_versions};
use crate::diagnostics::{Diagnostic, codes};
use crate::error::{Location, Result, SdmxError};
use crate::model::{
    Artefact, DataStructureDefinition, Dataflow, ItemScheme, Reference, Resolution,
};

/// Lookup key: artefact class plus identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtefactKey {
    pub kind: ArtefactKind,
    pub identifier: Identifier,
}

/// Outcome of resolving an identity.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedRef<'a> {
    /// Defined in this index.
    Local(&'a Artefact),
    /// Maintained elsewhere; only the identity is known.
    External(Identifier),
}

impl ResolvedRef<'_> {
    pub fn is_local(&self) -> bool {
        matches!(self, ResolvedRef::Local(_))
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            ResolvedRef::Local(_) => Resolution::Local,
            ResolvedRef::External(_) => Resolution::External,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolutionIndex {
    entries: IndexMap<ArtefactKey, Artefact, FxBuildHasher>,
    agency_scope: IndexSet<SmolStr, FxBuildHasher>,
}

impl PartialEq for ResolutionIndex {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl ResolutionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Register an artefact defined by the message. Its agency joins the
    /// local scope.
    ///
    /// Registering an artefact equal to one already held is a no-op and
    /// returns `Ok(false)`; registering a different artefact under the same
    /// identity fails with [`SdmxError::DuplicateArtefact`].
    pub fn register(&mut self, artefact: Artefact) -> Result<bool> {
        self.agency_scope
            .insert(artefact.identifier().agency_id.clone());
        self.insert(artefact)
    }

    /// Register an artefact supplied from outside the message. It resolves
    /// locally but does not widen the agency scope.
    pub fn register_supplied(&mut self, artefact: Artefact) -> Result<bool> {
        self.insert(artefact)
    }

    fn insert(&mut self, artefact: Artefact) -> Result<bool> {
        let key = ArtefactKey {
            kind: artefact.kind(),
            identifier: artefact.identifier().clone(),
        };
        if let Some(existing) = self.entries.get(&key) {
            if *existing == artefact {
                tracing::trace!(artefact = %key.identifier, "identical artefact registered twice");
                return Ok(false);
            }
            return Err(SdmxError::DuplicateArtefact {
                identifier: key.identifier,
                location: Location::path(key.kind.class_name()),
            });
        }
        tracing::trace!(kind = %key.kind, artefact = %key.identifier, "registered");
        self.entries.insert(key, artefact);
        Ok(true)
    }

    /// Add an agency to the local scope (typically the message sender).
    pub fn add_agency(&mut self, agency_id: impl Into<SmolStr>) {
        self.agency_scope.insert(agency_id.into());
    }

    pub fn is_local_agency(&self, agency_id: &str) -> bool {
        self.agency_scope.contains(agency_id)
    }

    pub fn agency_scope(&self) -> impl Iterator<Item = &str> {
        self.agency_scope.iter().map(SmolStr::as_str)
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Find a maintainable artefact. Wildcard versions (`latest`, `*`, empty)
    /// pick the highest registered version.
    pub fn get(&self, kind: ArtefactKind, identifier: &Identifier) -> Option<&Artefact> {
        let kind = kind.maintainable_kind();
        if identifier.is_version_wildcard() {
            return self
                .entries
                .iter()
                .filter(|(k, _)| k.kind == kind && k.identifier.same_artefact(identifier))
                .max_by(|(a, _), (b, _)| {
                    compare_versions(&a.identifier.version, &b.identifier.version)
                })
                .map(|(_, artefact)| artefact);
        }
        self.entries.get(&ArtefactKey {
            kind,
            identifier: identifier.clone(),
        })
    }

    /// Resolve an identity under the agency-scope policy.
    ///
    /// Missing artefacts of a local agency are an error; missing artefacts
    /// of any other agency resolve to an external stub.
    pub fn resolve(&self, identifier: &Identifier, kind: ArtefactKind) -> Result<ResolvedRef<'_>> {
        if let Some(artefact) = self.get(kind, identifier) {
            return Ok(ResolvedRef::Local(artefact));
        }
        if self.is_local_agency(&identifier.agency_id) {
            return Err(SdmxError::UnresolvedLocalReference {
                identifier: identifier.clone(),
                location: Location::path(kind.class_name()),
            });
        }
        Ok(ResolvedRef::External(identifier.clone()))
    }

    /// Resolve a reference, also checking that a referenced item exists in
    /// its local maintainable.
    pub fn resolve_reference(&self, reference: &Reference) -> Result<ResolvedRef<'_>> {
        let resolved = self.resolve(&reference.target, reference.kind)?;
        if let (ResolvedRef::Local(artefact), Some(item)) = (&resolved, &reference.item_id) {
            if !artefact.contains_item(reference.kind, item) {
                return Err(SdmxError::UnresolvedLocalReference {
                    identifier: reference.target.clone(),
                    location: Location::path(format!("{}.{item}", reference.kind.class_name())),
                });
            }
        }
        Ok(resolved)
    }

    /// Resolve a data structure or dataflow reference to its data structure.
    pub fn structure_of(&self, reference: &Reference) -> Option<&DataStructureDefinition> {
        match reference.kind {
            ArtefactKind::Dataflow => self
                .dataflow(&reference.target)
                .and_then(|flow| self.data_structure(&flow.structure.target)),
            _ => self.data_structure(&reference.target),
        }
    }

    pub fn data_structure(&self, identifier: &Identifier) -> Option<&DataStructureDefinition> {
        self.get(ArtefactKind::DataStructure, identifier)
            .and_then(Artefact::as_data_structure)
    }

    pub fn dataflow(&self, identifier: &Identifier) -> Option<&Dataflow> {
        self.get(ArtefactKind::Dataflow, identifier)
            .and_then(Artefact::as_dataflow)
    }

    /// Item scheme targeted by a reference such as a representation's
    /// enumeration.
    pub fn item_scheme(&self, reference: &Reference) -> Option<&ItemScheme> {
        self.get(reference.maintainable_kind(), &reference.target)
            .and_then(Artefact::as_item_scheme)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artefact> {
        self.entries.values()
    }

    /// Artefacts of one maintainable class, in registration order.
    pub fn iter_kind(&self, kind: ArtefactKind) -> impl Iterator<Item = &Artefact> {
        self.entries
            .iter()
            .filter(move |(k, _)| k.kind == kind)
            .map(|(_, artefact)| artefact)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // FIX-UP
    // ========================================================================

    /// Settle every pending reference held by the index.
    ///
    /// Unresolved local references are returned as diagnostics and marked
    /// external, or abort with an error when `strict` is set.
    pub fn settle_references(&mut self, strict: bool) -> Result<Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        let mut outcomes: Vec<Vec<Resolution>> = Vec::with_capacity(self.entries.len());

        for artefact in self.entries.values() {
            let mut settled = Vec::new();
            for reference in artefact.references() {
                match self.resolve_reference(reference) {
                    Ok(resolved) => settled.push(resolved.resolution()),
                    Err(err @ SdmxError::UnresolvedLocalReference { .. }) => {
                        if strict {
                            return Err(err);
                        }
                        tracing::warn!(from = %artefact.identifier(), to = %reference, "unresolved local reference");
                        diagnostics.push(
                            Diagnostic::warning(format!(
                                "{} {} refers to undefined {}",
                                artefact.kind(),
                                artefact.identifier(),
                                reference
                            ))
                            .with_code(codes::UNRESOLVED_LOCAL_REFERENCE)
                            .with_location(Location::path(artefact.identifier().to_string())),
                        );
                        settled.push(Resolution::External);
                    }
                    Err(err) => return Err(err),
                }
            }
            outcomes.push(settled);
        }

        for (artefact, settled) in self.entries.values_mut().zip(outcomes) {
            for (reference, resolution) in artefact.references_mut().into_iter().zip(settled) {
                reference.set_resolution(resolution);
            }
        }
        tracing::debug!(
            artefacts = self.entries.len(),
            unresolved = diagnostics.len(),
            "references settled"
        );
        Ok(diagnostics)
    }

    /// Settle a single reference held outside the index (header structures,
    /// data set structure references).
    pub fn settle(&self, reference: &mut Reference, strict: bool) -> Result<Option<Diagnostic>> {
        match self.resolve_reference(reference) {
            Ok(resolved) => {
                reference.set_resolution(resolved.resolution());
                Ok(None)
            }
            Err(err @ SdmxError::UnresolvedLocalReference { .. }) if strict => Err(err),
            Err(SdmxError::UnresolvedLocalReference { .. }) => {
                reference.set_resolution(Resolution::External);
                Ok(Some(
                    Diagnostic::warning(format!("reference to undefined {reference}"))
                        .with_code(codes::UNRESOLVED_LOCAL_REFERENCE),
                ))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Dimension, DimensionDescriptor, Item, Maintainable, Representation, SchemeKind,
    };

    fn codelist(agency: &str, id: &str, version: &str) -> Artefact {
        ItemScheme::new(
            SchemeKind::Codelist,
            Maintainable::new(Identifier::new(agency, id, version)),
        )
        .with_item(Item::code("A"))
        .expect("valid codelist")
        .into()
    }

    fn dsd_referencing(codelist: Identifier) -> Artefact {
        let dims = DimensionDescriptor::new([Dimension::new("FREQ").with_representation(
            Representation::enumerated(Reference::new(ArtefactKind::Codelist, codelist)),
        )])
        .expect("unique ids");
        DataStructureDefinition::new(
            Maintainable::new(Identifier::unversioned("ECB", "ECB_EXR1")),
            dims,
        )
        .into()
    }

    #[test]
    fn test_register_identical_is_noop() {
        let mut index = ResolutionIndex::new();
        assert!(index.register(codelist("ECB", "CL_FREQ", "1.0")).expect("first"));
        assert!(!index.register(codelist("ECB", "CL_FREQ", "1.0")).expect("identical"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_register_conflicting_definition_fails() {
        let mut index = ResolutionIndex::new();
        index.register(codelist("ECB", "CL_FREQ", "1.0")).expect("first");
        let mut other = ItemScheme::codelist(Identifier::new("ECB", "CL_FREQ", "1.0"));
        other.insert(Item::code("M")).expect("item");
        let err = index.register(other.into());
        assert!(matches!(err, Err(SdmxError::DuplicateArtefact { .. })));
    }

    #[test]
    fn test_foreign_agency_resolves_external() {
        let mut index = ResolutionIndex::new();
        index.add_agency("ECB");
        let id = Identifier::unversioned("SDMX", "CL_FREQ");
        let resolved = index.resolve(&id, ArtefactKind::Codelist).expect("external stub");
        assert_eq!(resolved, ResolvedRef::External(id));
    }

    #[test]
    fn test_local_agency_missing_is_error() {
        let mut index = ResolutionIndex::new();
        index.add_agency("ECB");
        let id = Identifier::unversioned("ECB", "CL_MISSING");
        assert!(matches!(
            index.resolve(&id, ArtefactKind::Codelist),
            Err(SdmxError::UnresolvedLocalReference { .. })
        ));
    }

    #[test]
    fn test_wildcard_picks_highest_version() {
        let mut index = ResolutionIndex::new();
        index.register(codelist("ECB", "CL_FREQ", "1.9")).expect("register");
        index.register(codelist("ECB", "CL_FREQ", "1.10")).expect("register");
        index.register(codelist("ECB", "CL_FREQ", "1.2")).expect("register");
        let found = index
            .get(ArtefactKind::Codelist, &Identifier::new("ECB", "CL_FREQ", "latest"))
            .expect("found");
        assert_eq!(found.identifier().version, "1.10");
    }

    #[test]
    fn test_settle_forward_reference() {
        let mut index = ResolutionIndex::new();
        index
            .register(dsd_referencing(Identifier::unversioned("ECB", "CL_FREQ")))
            .expect("register");
        index.register(codelist("ECB", "CL_FREQ", "1.0")).expect("register");
        let diags = index.settle_references(false).expect("settled");
        assert!(diags.is_empty());
        let dsd = index
            .data_structure(&Identifier::unversioned("ECB", "ECB_EXR1"))
            .expect("dsd");
        let dim = dsd.dimension("FREQ").expect("dim");
        assert!(dim.enumeration().is_some_and(Reference::is_local));
    }

    #[test]
    fn test_settle_reports_missing_local() {
        let mut index = ResolutionIndex::new();
        index
            .register(dsd_referencing(Identifier::unversioned("ECB", "CL_GONE")))
            .expect("register");
        let diags = index.settle_references(false).expect("settled");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].has_code(codes::UNRESOLVED_LOCAL_REFERENCE));
        assert!(index.settle_references(true).is_err());
    }

    #[test]
    fn test_item_must_exist_in_local_scheme() {
        let mut index = ResolutionIndex::new();
        index.register(codelist("ECB", "CL_FREQ", "1.0")).expect("register");
        let present = Reference::item(ArtefactKind::Code, Identifier::unversioned("ECB", "CL_FREQ"), "A");
        let absent = Reference::item(ArtefactKind::Code, Identifier::unversioned("ECB", "CL_FREQ"), "Z");
        assert!(index.resolve_reference(&present).is_ok());
        assert!(index.resolve_reference(&absent).is_err());
    }
}
