//! Cross-artefact references.
//!
//! References are stored by identity, never by pointer. Readers create them
//! [`Resolution::Pending`]; the fix-up pass over the
//! [`ResolutionIndex`](crate::index::ResolutionIndex) settles each one to
//! `Local` or `External` before a message is returned.

use std::fmt;

use smol_str::SmolStr;

use crate::base::{ArtefactKind, Identifier, Urn, parse_urn};
use crate::error::Result;

/// Resolution state of a [`Reference`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Not yet looked up.
    #[default]
    Pending,
    /// Target is defined in the same message (or supplied structures).
    Local,
    /// Target is maintained elsewhere; only its identity is known.
    External,
}

/// A typed reference to a maintainable artefact or to an item within one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Class of the target, e.g. `Concept` for a concept identity.
    pub kind: ArtefactKind,
    /// Identity of the target's maintainable artefact.
    pub target: Identifier,
    /// Item or component id for non-maintainable targets.
    pub item_id: Option<SmolStr>,
    resolution: Resolution,
}

impl Reference {
    /// Reference to a maintainable artefact.
    pub fn new(kind: ArtefactKind, target: Identifier) -> Self {
        Self {
            kind,
            target,
            item_id: None,
            resolution: Resolution::Pending,
        }
    }

    /// Reference to an item inside a maintainable artefact.
    pub fn item(kind: ArtefactKind, target: Identifier, item_id: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            target,
            item_id: Some(item_id.into()),
            resolution: Resolution::Pending,
        }
    }

    /// Parse a reference from its URN.
    pub fn from_urn_str(urn: &str) -> Result<Self> {
        Ok(Self::from(parse_urn(urn)?))
    }

    pub fn urn(&self) -> Urn {
        Urn {
            kind: self.kind,
            identifier: self.target.clone(),
            item_id: self.item_id.clone(),
        }
    }

    /// Class of the maintainable artefact that must exist for this
    /// reference to resolve locally.
    pub fn maintainable_kind(&self) -> ArtefactKind {
        self.kind.maintainable_kind()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_local(&self) -> bool {
        self.resolution == Resolution::Local
    }

    pub fn is_external(&self) -> bool {
        self.resolution == Resolution::External
    }

    pub fn is_pending(&self) -> bool {
        self.resolution == Resolution::Pending
    }

    /// Builder: set the resolution state.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub(crate) fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }
}

impl From<Urn> for Reference {
    fn from(urn: Urn) -> Self {
        Self {
            kind: urn.kind,
            target: urn.identifier,
            item_id: urn.item_id,
            resolution: Resolution::Pending,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}
