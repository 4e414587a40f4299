//! Artefact classes addressable by URN or reference.

use std::fmt;

/// The class of an identifiable artefact.
///
/// Maintainable classes carry their own identity; item and component
/// classes are addressed through their owning maintainable (see
/// [`ArtefactKind::maintainable_kind`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtefactKind {
    AgencyScheme,
    Agency,
    Codelist,
    Code,
    ConceptScheme,
    Concept,
    CategoryScheme,
    Category,
    DataStructure,
    Dimension,
    TimeDimension,
    MeasureDimension,
    DataAttribute,
    PrimaryMeasure,
    GroupDimensionDescriptor,
    Dataflow,
    ContentConstraint,
}

impl ArtefactKind {
    pub const ALL: [ArtefactKind; 17] = [
        ArtefactKind::AgencyScheme,
        ArtefactKind::Agency,
        ArtefactKind::Codelist,
        ArtefactKind::Code,
        ArtefactKind::ConceptScheme,
        ArtefactKind::Concept,
        ArtefactKind::CategoryScheme,
        ArtefactKind::Category,
        ArtefactKind::DataStructure,
        ArtefactKind::Dimension,
        ArtefactKind::TimeDimension,
        ArtefactKind::MeasureDimension,
        ArtefactKind::DataAttribute,
        ArtefactKind::PrimaryMeasure,
        ArtefactKind::GroupDimensionDescriptor,
        ArtefactKind::Dataflow,
        ArtefactKind::ContentConstraint,
    ];

    /// Information model package, as used in URNs and `package=` attributes.
    pub fn package(&self) -> &'static str {
        match self {
            ArtefactKind::AgencyScheme | ArtefactKind::Agency => "base",
            ArtefactKind::Codelist | ArtefactKind::Code => "codelist",
            ArtefactKind::ConceptScheme | ArtefactKind::Concept => "conceptscheme",
            ArtefactKind::CategoryScheme | ArtefactKind::Category => "categoryscheme",
            ArtefactKind::DataStructure
            | ArtefactKind::Dimension
            | ArtefactKind::TimeDimension
            | ArtefactKind::MeasureDimension
            | ArtefactKind::DataAttribute
            | ArtefactKind::PrimaryMeasure
            | ArtefactKind::GroupDimensionDescriptor
            | ArtefactKind::Dataflow => "datastructure",
            ArtefactKind::ContentConstraint => "registry",
        }
    }

    /// Class name, as used in URNs and `class=` attributes.
    pub fn class_name(&self) -> &'static str {
        match self {
            ArtefactKind::AgencyScheme => "AgencyScheme",
            ArtefactKind::Agency => "Agency",
            ArtefactKind::Codelist => "Codelist",
            ArtefactKind::Code => "Code",
            ArtefactKind::ConceptScheme => "ConceptScheme",
            ArtefactKind::Concept => "Concept",
            ArtefactKind::CategoryScheme => "CategoryScheme",
            ArtefactKind::Category => "Category",
            ArtefactKind::DataStructure => "DataStructure",
            ArtefactKind::Dimension => "Dimension",
            ArtefactKind::TimeDimension => "TimeDimension",
            ArtefactKind::MeasureDimension => "MeasureDimension",
            ArtefactKind::DataAttribute => "DataAttribute",
            ArtefactKind::PrimaryMeasure => "PrimaryMeasure",
            ArtefactKind::GroupDimensionDescriptor => "GroupDimensionDescriptor",
            ArtefactKind::Dataflow => "Dataflow",
            ArtefactKind::ContentConstraint => "ContentConstraint",
        }
    }

    /// Look up a kind by its class name. `Attribute` is accepted as an
    /// alias for `DataAttribute`.
    pub fn from_class_name(name: &str) -> Option<Self> {
        if name == "Attribute" {
            return Some(ArtefactKind::DataAttribute);
        }
        Self::ALL.into_iter().find(|kind| kind.class_name() == name)
    }

    pub fn is_maintainable(&self) -> bool {
        self.maintainable_kind() == *self
    }

    /// Whether this is an item within an item scheme.
    pub fn is_item(&self) -> bool {
        matches!(
            self,
            ArtefactKind::Agency
                | ArtefactKind::Code
                | ArtefactKind::Concept
                | ArtefactKind::Category
        )
    }

    /// The maintainable class that owns artefacts of this class.
    pub fn maintainable_kind(&self) -> ArtefactKind {
        match self {
            ArtefactKind::Agency => ArtefactKind::AgencyScheme,
            ArtefactKind::Code => ArtefactKind::Codelist,
            ArtefactKind::Concept => ArtefactKind::ConceptScheme,
            ArtefactKind::Category => ArtefactKind::CategoryScheme,
            ArtefactKind::Dimension
            | ArtefactKind::TimeDimension
            | ArtefactKind::MeasureDimension
            | ArtefactKind::DataAttribute
            | ArtefactKind::PrimaryMeasure
            | ArtefactKind::GroupDimensionDescriptor => ArtefactKind::DataStructure,
            other => *other,
        }
    }

    /// For item schemes, the class of their items.
    pub fn item_kind(&self) -> Option<ArtefactKind> {
        match self {
            ArtefactKind::AgencyScheme => Some(ArtefactKind::Agency),
            ArtefactKind::Codelist => Some(ArtefactKind::Code),
            ArtefactKind::ConceptScheme => Some(ArtefactKind::Concept),
            ArtefactKind::CategoryScheme => Some(ArtefactKind::Category),
            _ => None,
        }
    }
}

impl fmt::Display for ArtefactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names_round_trip() {
        for kind in ArtefactKind::ALL {
            assert_eq!(ArtefactKind::from_class_name(kind.class_name()), Some(kind));
        }
        assert_eq!(
            ArtefactKind::from_class_name("Attribute"),
            Some(ArtefactKind::DataAttribute)
        );
        assert_eq!(ArtefactKind::from_class_name("Nope"), None);
    }

    #[test]
    fn test_items_belong_to_their_scheme() {
        for kind in ArtefactKind::ALL.into_iter().filter(|k| k.is_item()) {
            let scheme = kind.maintainable_kind();
            assert!(scheme.is_maintainable());
            assert_eq!(scheme.item_kind(), Some(kind));
            assert_eq!(scheme.package(), kind.package());
        }
    }

    #[test]
    fn test_components_belong_to_data_structure() {
        assert_eq!(
            ArtefactKind::TimeDimension.maintainable_kind(),
            ArtefactKind::DataStructure
        );
        assert!(!ArtefactKind::PrimaryMeasure.is_maintainable());
        assert!(ArtefactKind::Dataflow.is_maintainable());
    }
}
