//! Message header and footer.

use smol_str::SmolStr;

use super::tree::Node;
use super::{international_string, reference};
use crate::base::ArtefactKind;
use crate::error::Result;
use crate::message::{Footer, FooterMessage, Header, HeaderStructure, Party, parse_prepared};
use crate::model::{DEFAULT_LOCALE, DimensionAtObservation, InternationalString};

fn party(node: &Node) -> Result<Party> {
    Ok(Party {
        id: SmolStr::new(node.required_attr("id")?),
        name: international_string(node, "Name"),
    })
}

pub(super) fn read_header(node: &Node) -> Result<Header> {
    let mut header = Header {
        id: node.child_text("ID").map(SmolStr::new),
        test: node.child_text("Test") == Some("true"),
        prepared: node.child_text("Prepared").and_then(parse_prepared),
        ..Header::default()
    };
    if let Some(sender) = node.child("Sender") {
        header.sender = Some(party(sender)?);
    }
    for receiver in node.children_named("Receiver") {
        header.receivers.push(party(receiver)?);
    }

    let agency = header
        .sender
        .as_ref()
        .map(|s| s.id.clone())
        .unwrap_or_default();
    for structure in node.children_named("Structure") {
        let structure_id = SmolStr::new(structure.required_attr("structureID")?);
        let target = if let Some(usage) = structure.child("StructureUsage") {
            reference(usage, ArtefactKind::Dataflow, &agency)?
        } else {
            reference(structure.required_child("Structure")?, ArtefactKind::DataStructure, &agency)?
        };
        let dimension_at_observation = match structure.attr("dimensionAtObservation") {
            Some(dim) => DimensionAtObservation::parse(dim),
            None => DimensionAtObservation::AllDimensions,
        };
        header.structures.push(HeaderStructure {
            structure_id,
            structure: target,
            dimension_at_observation,
        });
    }
    Ok(header)
}

/// Footer messages, or the error messages of an error message.
pub(super) fn read_footer(root: &Node) -> Result<Option<Footer>> {
    let messages: Vec<&Node> = match root.child("Footer") {
        Some(footer) => footer.children_named("Message").collect(),
        None => root.children_named("ErrorMessage").collect(),
    };
    if messages.is_empty() && root.child("Footer").is_none() {
        return Ok(None);
    }
    let messages = messages
        .into_iter()
        .map(|m| FooterMessage {
            code: m.attr("code").map(SmolStr::new),
            severity: m.attr("severity").map(SmolStr::new),
            text: m
                .children_named("Text")
                .map(|t| {
                    InternationalString::localized(
                        t.attr("xml:lang").unwrap_or(DEFAULT_LOCALE),
                        t.text.trim(),
                    )
                })
                .collect(),
        })
        .collect();
    Ok(Some(Footer { messages }))
}

#[cfg(test)]
mod tests {
    use super::super::tree;
    use super::*;

    #[test]
    fn test_header_structure_declarations() {
        let xml = r#"<mes:Header xmlns:mes="m" xmlns:com="c">
  <mes:ID>IREF000506</mes:ID>
  <mes:Test>false</mes:Test>
  <mes:Prepared>2010-01-04T16:21:49+01:00</mes:Prepared>
  <mes:Sender id="ECB"><com:Name xml:lang="en">European Central Bank</com:Name></mes:Sender>
  <mes:Structure structureID="ECB_EXR1" dimensionAtObservation="TIME_PERIOD">
    <com:Structure><Ref agencyID="ECB" id="ECB_EXR1" version="1.0"/></com:Structure>
  </mes:Structure>
  <mes:Structure structureID="FLOW" dimensionAtObservation="AllDimensions">
    <com:StructureUsage><Ref id="EXR"/></com:StructureUsage>
  </mes:Structure>
</mes:Header>"#;
        let header = read_header(&tree::parse(xml.as_bytes()).expect("xml")).expect("header");
        assert_eq!(header.id.as_deref(), Some("IREF000506"));
        assert!(!header.test);
        assert!(header.prepared.is_some());
        let sender = header.sender.as_ref().expect("sender");
        assert_eq!(sender.name.get("en"), Some("European Central Bank"));

        let exr = header.structure("ECB_EXR1").expect("declared");
        assert_eq!(exr.structure.kind, ArtefactKind::DataStructure);
        assert_eq!(exr.dimension_at_observation, DimensionAtObservation::time_period());

        let flow = header.structure("FLOW").expect("declared");
        assert_eq!(flow.structure.kind, ArtefactKind::Dataflow);
        assert_eq!(flow.structure.target.agency_id, "ECB");
        assert_eq!(flow.dimension_at_observation, DimensionAtObservation::AllDimensions);
    }

    #[test]
    fn test_error_message_becomes_footer() {
        let xml = r#"<mes:Error xmlns:mes="m" xmlns:com="c">
  <mes:ErrorMessage code="100"><com:Text xml:lang="en">No results found</com:Text></mes:ErrorMessage>
</mes:Error>"#;
        let footer = read_footer(&tree::parse(xml.as_bytes()).expect("xml"))
            .expect("read")
            .expect("footer");
        assert_eq!(footer.messages[0].code.as_deref(), Some("100"));
        assert_eq!(footer.messages[0].text[0].get("en"), Some("No results found"));
    }
}
