//! Element tree built from quick-xml events.
//!
//! SDMX-ML documents are read in two passes over an in-memory tree: the
//! tree keeps each element's byte offset so errors in the second pass can
//! still point into the input.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use smol_str::SmolStr;

use crate::error::{Location, Result, SdmxError};

#[derive(Clone, Debug, Default)]
pub(crate) struct Node {
    /// Qualified name as written, e.g. `str:Codelist`.
    pub name: SmolStr,
    /// Name without prefix, e.g. `Codelist`.
    pub local: SmolStr,
    /// Attributes by qualified name, in document order.
    pub attrs: IndexMap<SmolStr, String>,
    pub children: Vec<Node>,
    pub text: String,
    pub offset: u64,
}

impl Node {
    /// Attribute by qualified name, falling back to the unprefixed name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.attrs.get(name) {
            return Some(value);
        }
        self.attrs
            .iter()
            .find(|(key, _)| local_part(key) == name && !key.starts_with("xmlns"))
            .map(|(_, value)| value.as_str())
    }

    pub fn required_attr(&self, name: &str) -> Result<&str> {
        self.attr(name)
            .ok_or_else(|| SdmxError::missing(&format!("attribute {name}"), self.location()))
    }

    /// Boolean attribute; absent means `default`.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.attr(name) {
            Some(value) => value == "true" || value == "1",
            None => default,
        }
    }

    pub fn child(&self, local: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.local == local)
    }

    pub fn required_child(&self, local: &str) -> Result<&Node> {
        self.child(local)
            .ok_or_else(|| SdmxError::missing(&format!("element {local}"), self.location()))
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.local == local)
    }

    /// Text content of a child element.
    pub fn child_text(&self, local: &str) -> Option<&str> {
        self.child(local).map(|c| c.text.trim())
    }

    pub fn location(&self) -> Location {
        let mut location = Location::offset(self.offset);
        location.path = match self.attr("id") {
            Some(id) => format!("{}[id={id}]", self.name),
            None => self.name.to_string(),
        };
        location
    }
}

/// Strip a namespace prefix.
pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn xml_error(e: impl std::fmt::Display, position: u64) -> SdmxError {
    SdmxError::malformed(format!("XML parse error: {e}"), Location::offset(position))
}

fn element(e: &BytesStart<'_>, offset: u64) -> Result<Node> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| xml_error(format!("invalid tag name: {err}"), offset))?
        .to_owned();
    let local = local_part(&name).to_owned();
    let mut attrs = IndexMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(format!("attribute error: {err}"), offset))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| xml_error(format!("attribute key error: {err}"), offset))?;
        let value = attr
            .unescape_value()
            .map_err(|err| xml_error(format!("attribute value error: {err}"), offset))?;
        attrs.insert(SmolStr::new(key), value.into_owned());
    }
    Ok(Node {
        name: SmolStr::new(name),
        local: SmolStr::new(local),
        attrs,
        children: Vec::new(),
        text: String::new(),
        offset,
    })
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(SdmxError::malformed(
            format!("second root element <{}>", node.name),
            node.location(),
        ));
    }
    *root = Some(node);
    Ok(())
}

/// Parse a whole document into a tree.
pub(crate) fn parse(input: &[u8]) -> Result<Node> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let offset = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(element(e, offset)?),
            Ok(Event::Empty(ref e)) => {
                let node = element(e, offset)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| xml_error("unexpected closing tag", offset))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| xml_error(e, reader.error_position()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e, reader.error_position())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(SdmxError::malformed(
            format!("unexpected end of document inside <{}>", open.name),
            open.location(),
        ));
    }
    root.ok_or_else(|| SdmxError::malformed("document has no root element", Location::offset(0)))
}

/// Read only the root element (attributes, no children).
pub(crate) fn root_element(input: &[u8]) -> Result<Node> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        let offset = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => return element(e, offset),
            Ok(Event::Eof) => {
                return Err(SdmxError::malformed(
                    "document has no root element",
                    Location::offset(offset),
                ));
            }
            Err(e) => return Err(xml_error(e, reader.error_position())),
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let xml = br#"<?xml version="1.0"?>
<mes:Structure xmlns:mes="urn:m" xmlns:com="urn:c">
  <com:Name xml:lang="en">Exchange &amp; rates</com:Name>
  <str:Codelist id="CL_FREQ"/>
</mes:Structure>"#;
        let root = parse(xml).expect("well-formed");
        assert_eq!(root.local, "Structure");
        assert_eq!(root.name, "mes:Structure");
        let name = root.child("Name").expect("name");
        assert_eq!(name.text, "Exchange & rates");
        assert_eq!(name.attr("xml:lang"), Some("en"));
        assert_eq!(name.attr("lang"), Some("en"));
        assert_eq!(root.child("Codelist").and_then(|c| c.attr("id")), Some("CL_FREQ"));
    }

    #[test]
    fn test_unclosed_element_is_error() {
        let err = parse(b"<a><b></b>");
        assert!(matches!(err, Err(SdmxError::MalformedDocument { .. })));
    }

    #[test]
    fn test_mismatched_end_is_error() {
        assert!(parse(b"<a><b></a>").is_err());
    }

    #[test]
    fn test_empty_document_is_error() {
        assert!(parse(b"<?xml version=\"1.0\"?>").is_err());
    }

    #[test]
    fn test_root_element_only() {
        let root = root_element(b"<?xml version=\"1.0\"?><mes:GenericData xmlns:mes=\"urn:m\"><x/></mes:GenericData>")
            .expect("root");
        assert_eq!(root.local, "GenericData");
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_location_carries_offset() {
        let root = parse(b"<a><b id=\"X\"/></a>").expect("well-formed");
        let loc = root.children[0].location();
        assert_eq!(loc.path, "b[id=X]");
        assert_eq!(loc.offset.map(u32::from), Some(3));
    }
}
