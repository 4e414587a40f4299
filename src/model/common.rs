//! Shared metadata carried by every identifiable artefact.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::base::Identifier;

/// Locale used when a caller asks for "the" text of an international string.
pub const DEFAULT_LOCALE: &str = "en";

// ============================================================================
// LOCALIZED TEXT
// ============================================================================

/// Localized text, keyed by locale.
///
/// Equality ignores the order in which localizations were added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InternationalString(IndexMap<SmolStr, String>);

impl InternationalString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a single localization.
    pub fn localized(locale: impl Into<SmolStr>, text: impl Into<String>) -> Self {
        let mut s = Self::new();
        s.insert(locale, text);
        s
    }

    pub fn insert(&mut self, locale: impl Into<SmolStr>, text: impl Into<String>) {
        self.0.insert(locale.into(), text.into());
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    /// Text in [`DEFAULT_LOCALE`], falling back to the first localization.
    pub fn default_text(&self) -> Option<&str> {
        self.get(DEFAULT_LOCALE)
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<&str> for InternationalString {
    fn from(text: &str) -> Self {
        Self::localized(DEFAULT_LOCALE, text)
    }
}

// ============================================================================
// ANNOTATIONS
// ============================================================================

/// Free-form annotation attached to an artefact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotation {
    pub id: Option<SmolStr>,
    pub title: Option<String>,
    pub annotation_type: Option<String>,
    pub url: Option<String>,
    pub text: InternationalString,
}

// ============================================================================
// IDENTIFIABLE / MAINTAINABLE
// ============================================================================

/// Id, names and annotations of an item or component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identifiable {
    pub id: SmolStr,
    pub name: InternationalString,
    pub description: InternationalString,
    pub annotations: Vec<Annotation>,
}

impl Identifiable {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builder: add a localized name.
    pub fn with_name(mut self, locale: &str, text: impl Into<String>) -> Self {
        self.name.insert(locale, text);
        self
    }

    /// Builder: add a localized description.
    pub fn with_description(mut self, locale: &str, text: impl Into<String>) -> Self {
        self.description.insert(locale, text);
        self
    }
}

/// Identity and lifecycle metadata of a maintainable artefact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Maintainable {
    pub identifier: Identifier,
    pub name: InternationalString,
    pub description: InternationalString,
    pub annotations: Vec<Annotation>,
    pub is_final: bool,
    /// The definition is a stand-in for an artefact maintained elsewhere.
    pub is_external_reference: bool,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
}

impl Maintainable {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            name: InternationalString::new(),
            description: InternationalString::new(),
            annotations: Vec::new(),
            is_final: false,
            is_external_reference: false,
            valid_from: None,
            valid_to: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.identifier.id
    }

    pub fn agency_id(&self) -> &str {
        &self.identifier.agency_id
    }

    pub fn version(&self) -> &str {
        &self.identifier.version
    }

    /// Builder: add a localized name.
    pub fn with_name(mut self, locale: &str, text: impl Into<String>) -> Self {
        self.name.insert(locale, text);
        self
    }

    /// Builder: mark as final.
    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }
}
