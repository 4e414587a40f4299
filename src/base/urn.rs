//! SDMX URNs.
//!
//! ```text
//! urn:sdmx:org.sdmx.infomodel.<package>.<Class>=<agency>:<id>(<version>)[.<item>]
//! ```
//!
//! Maintainable artefacts have no `<item>` part; items and structure
//! components always do. [`parse_urn`] and [`format_urn`] are inverses on
//! every URN this module accepts.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use super::{ArtefactKind, Identifier};
use crate::error::{Result, SdmxError};

pub const URN_PREFIX: &str = "urn:sdmx:org.sdmx.infomodel.";

/// A parsed SDMX URN.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Urn {
    /// Class of the artefact the URN names (e.g. `Code`, not `Codelist`).
    pub kind: ArtefactKind,
    /// Identity of the owning maintainable artefact.
    pub identifier: Identifier,
    /// Item or component id within the maintainable, if any.
    pub item_id: Option<SmolStr>,
}

impl Urn {
    /// URN of a maintainable artefact.
    pub fn maintainable(kind: ArtefactKind, identifier: Identifier) -> Self {
        Self {
            kind,
            identifier,
            item_id: None,
        }
    }

    /// URN of an item or component inside a maintainable artefact.
    pub fn item(kind: ArtefactKind, identifier: Identifier, item_id: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            identifier,
            item_id: Some(item_id.into()),
        }
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{URN_PREFIX}{}.{}={}",
            self.kind.package(),
            self.kind.class_name(),
            self.identifier
        )?;
        if let Some(item) = &self.item_id {
            write!(f, ".{item}")?;
        }
        Ok(())
    }
}

impl FromStr for Urn {
    type Err = SdmxError;

    fn from_str(s: &str) -> Result<Self> {
        parse_urn(s)
    }
}

/// Format a URN for an artefact of class `kind`.
pub fn format_urn(kind: ArtefactKind, identifier: &Identifier, item_id: Option<&str>) -> String {
    Urn {
        kind,
        identifier: identifier.clone(),
        item_id: item_id.map(SmolStr::new),
    }
    .to_string()
}

/// Parse an SDMX URN, rejecting anything that deviates from the grammar.
pub fn parse_urn(input: &str) -> Result<Urn> {
    let fail = |message: &str| SdmxError::bad_reference(input, message);

    let rest = input
        .strip_prefix(URN_PREFIX)
        .ok_or_else(|| fail("expected prefix 'urn:sdmx:org.sdmx.infomodel.'"))?;
    let (qualified_class, target) = rest
        .split_once('=')
        .ok_or_else(|| fail("missing '=' between class and target"))?;
    let (package, class) = qualified_class
        .rsplit_once('.')
        .ok_or_else(|| fail("missing package before class name"))?;
    let kind = ArtefactKind::from_class_name(class)
        .filter(|k| k.class_name() == class)
        .ok_or_else(|| fail("unknown class"))?;
    if kind.package() != package {
        return Err(fail(&format!(
            "class {class} belongs to package {}, not {package}",
            kind.package()
        )));
    }

    let (agency, rest) = target
        .split_once(':')
        .ok_or_else(|| fail("missing ':' after agency"))?;
    let (id, rest) = rest
        .split_once('(')
        .ok_or_else(|| fail("missing '(' before version"))?;
    let (version, rest) = rest
        .split_once(')')
        .ok_or_else(|| fail("missing ')' after version"))?;

    if !is_agency(agency) {
        return Err(fail("invalid agency id"));
    }
    if !is_id(id) {
        return Err(fail("invalid artefact id"));
    }
    if !is_version(version) {
        return Err(fail("invalid version"));
    }

    let item_id = if rest.is_empty() {
        None
    } else {
        let item = rest
            .strip_prefix('.')
            .ok_or_else(|| fail("unexpected text after version"))?;
        if !item.split('.').all(is_id) {
            return Err(fail("invalid item id"));
        }
        Some(SmolStr::new(item))
    };

    match (kind.is_maintainable(), &item_id) {
        (true, Some(_)) => return Err(fail("maintainable class cannot name an item")),
        (false, None) => return Err(fail("item class requires an item id")),
        _ => {}
    }

    Ok(Urn {
        kind,
        identifier: Identifier::new(agency, id, version),
        item_id,
    })
}

/// Characters allowed in SDMX ids.
pub fn is_id(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'$' | b'-'))
}

/// Agency ids may be nested with `.`.
fn is_agency(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_id)
}

fn is_version(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'+' | b'*' | b'-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_maintainable() {
        let urn = parse_urn("urn:sdmx:org.sdmx.infomodel.codelist.Codelist=ECB:CL_FREQ(1.0)")
            .expect("valid urn");
        assert_eq!(urn.kind, ArtefactKind::Codelist);
        assert_eq!(urn.identifier, Identifier::new("ECB", "CL_FREQ", "1.0"));
        assert_eq!(urn.item_id, None);
    }

    #[test]
    fn test_parse_item() {
        let urn =
            parse_urn("urn:sdmx:org.sdmx.infomodel.conceptscheme.Concept=ECB:ECB_CONCEPTS(1.0).FREQ")
                .expect("valid urn");
        assert_eq!(urn.kind, ArtefactKind::Concept);
        assert_eq!(urn.item_id.as_deref(), Some("FREQ"));
    }

    #[test]
    fn test_nested_agency_and_item_path() {
        let text = "urn:sdmx:org.sdmx.infomodel.categoryscheme.Category=SDMX.ECB:CAT(2.1).A.B";
        let urn = parse_urn(text).expect("valid urn");
        assert_eq!(urn.identifier.agency_id, "SDMX.ECB");
        assert_eq!(urn.item_id.as_deref(), Some("A.B"));
        assert_eq!(urn.to_string(), text);
    }

    #[test]
    fn test_format_urn() {
        let id = Identifier::new("ECB", "ECB_EXR1", "1.0");
        assert_eq!(
            format_urn(ArtefactKind::DataStructure, &id, None),
            "urn:sdmx:org.sdmx.infomodel.datastructure.DataStructure=ECB:ECB_EXR1(1.0)"
        );
        assert_eq!(
            format_urn(ArtefactKind::TimeDimension, &id, Some("TIME_PERIOD")),
            "urn:sdmx:org.sdmx.infomodel.datastructure.TimeDimension=ECB:ECB_EXR1(1.0).TIME_PERIOD"
        );
    }

    #[test]
    fn test_rejects_wrong_package() {
        let err = parse_urn("urn:sdmx:org.sdmx.infomodel.codelist.Concept=ECB:X(1.0).A");
        assert!(matches!(err, Err(SdmxError::MalformedReference { .. })));
    }

    #[test]
    fn test_rejects_missing_item_for_item_class() {
        let err = parse_urn("urn:sdmx:org.sdmx.infomodel.codelist.Code=ECB:CL_FREQ(1.0)");
        assert!(matches!(err, Err(SdmxError::MalformedReference { .. })));
    }
}
