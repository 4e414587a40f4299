//! Item schemes: codelists, concept schemes, category schemes and agency
//! schemes.
//!
//! Hierarchy is expressed by parent *ids*, never by owning pointers. The
//! scheme keeps a child index next to the items so navigation is O(1) in
//! both directions.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::common::{Identifiable, Maintainable};
use super::structure::Representation;
use crate::base::{ArtefactKind, Identifier};
use crate::error::{Location, Result, SdmxError};

/// The four kinds of item scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemeKind {
    Codelist,
    ConceptScheme,
    CategoryScheme,
    AgencyScheme,
}

impl SchemeKind {
    pub fn artefact_kind(&self) -> ArtefactKind {
        match self {
            SchemeKind::Codelist => ArtefactKind::Codelist,
            SchemeKind::ConceptScheme => ArtefactKind::ConceptScheme,
            SchemeKind::CategoryScheme => ArtefactKind::CategoryScheme,
            SchemeKind::AgencyScheme => ArtefactKind::AgencyScheme,
        }
    }

    pub fn item_artefact_kind(&self) -> ArtefactKind {
        match self {
            SchemeKind::Codelist => ArtefactKind::Code,
            SchemeKind::ConceptScheme => ArtefactKind::Concept,
            SchemeKind::CategoryScheme => ArtefactKind::Category,
            SchemeKind::AgencyScheme => ArtefactKind::Agency,
        }
    }

    pub fn from_artefact_kind(kind: ArtefactKind) -> Option<Self> {
        match kind {
            ArtefactKind::Codelist => Some(SchemeKind::Codelist),
            ArtefactKind::ConceptScheme => Some(SchemeKind::ConceptScheme),
            ArtefactKind::CategoryScheme => Some(SchemeKind::CategoryScheme),
            ArtefactKind::AgencyScheme => Some(SchemeKind::AgencyScheme),
            _ => None,
        }
    }

    /// Empty item details matching this scheme.
    pub fn default_item_kind(&self) -> ItemKind {
        match self {
            SchemeKind::Codelist => ItemKind::Code,
            SchemeKind::ConceptScheme => ItemKind::Concept {
                core_representation: None,
            },
            SchemeKind::CategoryScheme => ItemKind::Category,
            SchemeKind::AgencyScheme => ItemKind::Organisation,
        }
    }
}

/// Variant-specific details of an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Code,
    Concept {
        core_representation: Option<Representation>,
    },
    Category,
    Organisation,
}

impl ItemKind {
    fn scheme_kind(&self) -> SchemeKind {
        match self {
            ItemKind::Code => SchemeKind::Codelist,
            ItemKind::Concept { .. } => SchemeKind::ConceptScheme,
            ItemKind::Category => SchemeKind::CategoryScheme,
            ItemKind::Organisation => SchemeKind::AgencyScheme,
        }
    }
}

/// An item within a scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pub base: Identifiable,
    /// Id of the parent item in the same scheme.
    pub parent: Option<SmolStr>,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(base: Identifiable, kind: ItemKind) -> Self {
        Self {
            base,
            parent: None,
            kind,
        }
    }

    pub fn code(id: impl Into<SmolStr>) -> Self {
        Self::new(Identifiable::new(id), ItemKind::Code)
    }

    pub fn concept(id: impl Into<SmolStr>) -> Self {
        Self::new(
            Identifiable::new(id),
            ItemKind::Concept {
                core_representation: None,
            },
        )
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    /// Builder: set the parent id.
    pub fn with_parent(mut self, parent: impl Into<SmolStr>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder: add a localized name.
    pub fn with_name(mut self, locale: &str, text: impl Into<String>) -> Self {
        self.base.name.insert(locale, text);
        self
    }

    /// Core representation, for concepts.
    pub fn core_representation(&self) -> Option<&Representation> {
        match &self.kind {
            ItemKind::Concept {
                core_representation,
            } => core_representation.as_ref(),
            _ => None,
        }
    }
}

/// An ordered scheme of items.
#[derive(Clone, Debug)]
pub struct ItemScheme {
    pub maintainable: Maintainable,
    pub is_partial: bool,
    kind: SchemeKind,
    items: IndexMap<SmolStr, Item>,
    children: IndexMap<SmolStr, Vec<SmolStr>>,
}

impl PartialEq for ItemScheme {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.is_partial == other.is_partial
            && self.maintainable == other.maintainable
            && self.items == other.items
    }
}

impl Eq for ItemScheme {}

impl ItemScheme {
    pub fn new(kind: SchemeKind, maintainable: Maintainable) -> Self {
        Self {
            maintainable,
            is_partial: false,
            kind,
            items: IndexMap::new(),
            children: IndexMap::new(),
        }
    }

    pub fn codelist(identifier: Identifier) -> Self {
        Self::new(SchemeKind::Codelist, Maintainable::new(identifier))
    }

    pub fn concept_scheme(identifier: Identifier) -> Self {
        Self::new(SchemeKind::ConceptScheme, Maintainable::new(identifier))
    }

    pub fn kind(&self) -> SchemeKind {
        self.kind
    }

    pub fn identifier(&self) -> &Identifier {
        &self.maintainable.identifier
    }

    /// Add an item. Ids are unique within the scheme and the item variant
    /// must match the scheme kind. The parent need not exist yet.
    pub fn insert(&mut self, item: Item) -> Result<()> {
        let location = || Location::path(format!("{}/{}", self.identifier(), item.id()));
        if item.kind.scheme_kind() != self.kind {
            return Err(SdmxError::malformed(
                format!(
                    "{} item cannot belong to a {}",
                    item.kind.scheme_kind().item_artefact_kind(),
                    self.kind.artefact_kind()
                ),
                location(),
            ));
        }
        if self.items.contains_key(item.id()) {
            return Err(SdmxError::malformed(
                format!("duplicate item id {}", item.id()),
                location(),
            ));
        }
        if let Some(parent) = &item.parent {
            self.children
                .entry(parent.clone())
                .or_default()
                .push(item.base.id.clone());
        }
        self.items.insert(item.base.id.clone(), item);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_item(mut self, item: Item) -> Result<Self> {
        self.insert(item)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Document position of an item, used to order codes.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.get_index_of(id)
    }

    pub fn parent(&self, id: &str) -> Option<&Item> {
        self.items
            .get(id)
            .and_then(|item| item.parent.as_deref())
            .and_then(|parent| self.items.get(parent))
    }

    /// Direct children of an item, in document order.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &Item> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.items.get(child.as_str()))
    }

    /// Ancestors from the direct parent upward. Stops on cycles.
    pub fn ancestors(&self, id: &str) -> Vec<&Item> {
        let mut out: Vec<&Item> = Vec::new();
        let mut current = self.parent(id);
        while let Some(item) = current {
            if out.len() >= self.items.len() || out.iter().any(|seen| seen.id() == item.id()) {
                break;
            }
            out.push(item);
            current = self.parent(item.id());
        }
        out
    }

    /// Items without a parent, in document order.
    pub fn roots(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|item| item.parent.is_none())
    }

    /// Items whose parent id names no item of this scheme.
    pub fn dangling_parents(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|item| {
            item.parent
                .as_deref()
                .is_some_and(|parent| !self.items.contains_key(parent))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> ItemScheme {
        ItemScheme::codelist(Identifier::unversioned("ESTAT", "CL_GEO"))
            .with_item(Item::code("EU").with_name("en", "European Union"))
            .and_then(|s| s.with_item(Item::code("DE").with_parent("EU")))
            .and_then(|s| s.with_item(Item::code("FR").with_parent("EU")))
            .and_then(|s| s.with_item(Item::code("BE_1").with_parent("BE")))
            .and_then(|s| s.with_item(Item::code("BE").with_parent("EU")))
            .expect("valid codelist")
    }

    #[test]
    fn test_navigation_both_ways() {
        let cl = geo();
        assert_eq!(cl.parent("DE").map(Item::id), Some("EU"));
        let children: Vec<_> = cl.children("EU").map(Item::id).collect();
        assert_eq!(children, vec!["DE", "FR", "BE"]);
        let ancestors: Vec<_> = cl.ancestors("BE_1").into_iter().map(Item::id).collect();
        assert_eq!(ancestors, vec!["BE", "EU"]);
    }

    #[test]
    fn test_forward_parent_resolves() {
        let cl = geo();
        assert_eq!(cl.parent("BE_1").map(Item::id), Some("BE"));
        assert_eq!(cl.dangling_parents().count(), 0);
    }

    #[test]
    fn test_position_follows_document_order() {
        let cl = geo();
        assert_eq!(cl.position("EU"), Some(0));
        assert_eq!(cl.position("BE"), Some(4));
        assert_eq!(cl.position("XX"), None);
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let mut cl = geo();
        assert!(cl.insert(Item::code("DE")).is_err());
    }

    #[test]
    fn test_item_kind_must_match_scheme() {
        let mut cl = ItemScheme::codelist(Identifier::unversioned("ECB", "CL_FREQ"));
        assert!(cl.insert(Item::concept("FREQ")).is_err());
    }

    #[test]
    fn test_cycle_does_not_loop() {
        let cl = ItemScheme::codelist(Identifier::unversioned("X", "CYCLE"))
            .with_item(Item::code("A").with_parent("B"))
            .and_then(|s| s.with_item(Item::code("B").with_parent("A")))
            .expect("valid codelist");
        assert_eq!(cl.ancestors("A").len(), 2);
        assert_eq!(cl.roots().count(), 0);
    }
}
