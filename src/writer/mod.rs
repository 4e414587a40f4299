//! Message writer: [`Message`] in, bytes out.
//!
//! Both codecs write from the same preparation step: every data set is
//! paired with its data structure and, when the caller asks for a different
//! dimension at observation, regrouped first. The header's structure
//! declarations are rewritten to match what is actually written.

pub mod json;
pub mod xml;

use std::borrow::Cow;

use smol_str::SmolStr;

use crate::dataset::DataSet;
use crate::error::{Result, SdmxError};
use crate::message::{HeaderStructure, Message};
use crate::model::{DataStructureDefinition, DimensionAtObservation, Reference};
use crate::options::WriterOptions;
use crate::reader::observation_order;

/// A written message and the content type it must travel under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Write a message in `options.format`.
pub fn write(message: &Message, options: &WriterOptions) -> Result<Output> {
    let codec = options.format.codec();
    tracing::debug!(codec = codec.name(), format = %options.format, data_sets = message.data.len(), "writing message");
    let bytes = codec.write(message, options)?;
    Ok(Output {
        bytes,
        content_type: options.format.content_type(),
    })
}

/// A data set ready to be written.
pub(crate) struct PreparedData<'a> {
    /// Position in [`Prepared::structures`].
    pub structure: usize,
    pub data: Cow<'a, DataSet>,
    pub dsd: &'a DataStructureDefinition,
}

/// Header declarations and data sets in writing order.
pub(crate) struct Prepared<'a> {
    pub structures: Vec<HeaderStructure>,
    pub data: Vec<PreparedData<'a>>,
}

/// Pair data sets with their structures and declarations, regrouping where
/// `options` selects a dimension at observation.
pub(crate) fn prepare<'a>(message: &'a Message, options: &WriterOptions) -> Result<Prepared<'a>> {
    let mut structures = message.header.structures.clone();
    let mut data = Vec::with_capacity(message.data.len());
    let mut claimed: Vec<usize> = Vec::new();

    for data_set in &message.data {
        let dsd = message.index.structure_of(&data_set.structure).ok_or_else(|| {
            SdmxError::write(format!(
                "data structure {} is not in the message",
                data_set.structure
            ))
        })?;

        let data_set = match &options.dimension_at_observation {
            Some(dim) if *dim != data_set.dimension_at_observation => {
                check_dimension(dsd, dim)?;
                let order = observation_order(&message.index, dsd, dim);
                tracing::debug!(structure = %data_set.structure, dimension_at_observation = %dim, "regrouping data set");
                Cow::Owned(data_set.regroup(dsd, dim.clone(), order)?)
            }
            _ => Cow::Borrowed(data_set),
        };

        let declared = data_set.dataflow.as_ref().unwrap_or(&data_set.structure);
        // A declaration already claimed by a data set with another
        // dimension at observation cannot be shared.
        let position = structures.iter().enumerate().position(|(i, s)| {
            (same_target(&s.structure, declared) || same_target(&s.structure, &data_set.structure))
                && (!claimed.contains(&i) || s.dimension_at_observation == data_set.dimension_at_observation)
        });
        let position = match position {
            Some(position) => {
                structures[position].dimension_at_observation = data_set.dimension_at_observation.clone();
                position
            }
            None => {
                structures.push(HeaderStructure {
                    structure_id: unique_id(&structures, &declared.target.id),
                    structure: declared.clone(),
                    dimension_at_observation: data_set.dimension_at_observation.clone(),
                });
                structures.len() - 1
            }
        };
        claimed.push(position);
        data.push(PreparedData {
            structure: position,
            data: data_set,
            dsd,
        });
    }
    Ok(Prepared { structures, data })
}

fn check_dimension(dsd: &DataStructureDefinition, dim: &DimensionAtObservation) -> Result<()> {
    match dim.dimension() {
        Some(id) if !dsd.dimensions.contains(id) => Err(SdmxError::write(format!(
            "{id} is not a dimension of {}",
            dsd.identifier()
        ))),
        _ => Ok(()),
    }
}

/// Same artefact, regardless of resolution state.
fn same_target(a: &Reference, b: &Reference) -> bool {
    a.kind == b.kind && a.target == b.target
}

fn unique_id(structures: &[HeaderStructure], base: &str) -> SmolStr {
    let taken = |id: &str| structures.iter().any(|s| s.structure_id == id);
    if !taken(base) {
        return SmolStr::new(base);
    }
    (1..)
        .map(|n| SmolStr::new(format!("{base}_{n}")))
        .find(|id| !taken(id))
        .unwrap_or_else(|| SmolStr::new(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{ArtefactKind, Identifier};
    use crate::dataset::{ObsValue, RawDataSet, RawObservation};
    use crate::dataset::DatasetEngine;
    use crate::format::Format;
    use crate::message::{Header, MessageKind};
    use crate::model::{Dimension, DimensionDescriptor, Maintainable, TIME_PERIOD};

    fn message() -> Message {
        let dsd = DataStructureDefinition::new(
            Maintainable::new(Identifier::unversioned("ECB", "ECB_EXR1")),
            DimensionDescriptor::new([Dimension::new("CURRENCY"), Dimension::time(TIME_PERIOD)])
                .expect("dimensions"),
        );
        let structure = Reference::new(ArtefactKind::DataStructure, dsd.identifier().clone());
        let mut raw = RawDataSet::new(structure);
        for (cur, time) in [("CHF", "2000"), ("USD", "2000"), ("CHF", "2001")] {
            raw.observations.push(RawObservation {
                key: [("CURRENCY", cur), (TIME_PERIOD, time)].into_iter().collect(),
                value: ObsValue::from_lexical("1.5"),
                attributes: Default::default(),
            });
        }
        let data = DatasetEngine::new(&dsd)
            .build(raw, DimensionAtObservation::AllDimensions)
            .expect("built");
        let mut message = Message::new(MessageKind::Data, Header::default());
        message.index.register(dsd.into()).expect("register");
        message.data.push(data);
        message
    }

    #[test]
    fn test_prepare_declares_missing_structure() {
        let message = message();
        let prepared = prepare(&message, &WriterOptions::new(Format::GenericDataXml)).expect("prepared");
        assert_eq!(prepared.structures.len(), 1);
        assert_eq!(prepared.structures[0].structure_id, "ECB_EXR1");
        assert_eq!(
            prepared.structures[0].dimension_at_observation,
            DimensionAtObservation::AllDimensions
        );
        assert!(matches!(prepared.data[0].data, Cow::Borrowed(_)));
    }

    #[test]
    fn test_prepare_regroups_on_request() {
        let message = message();
        let options = WriterOptions::new(Format::GenericDataXml)
            .with_dimension_at_observation(DimensionAtObservation::time_period());
        let prepared = prepare(&message, &options).expect("prepared");
        assert_eq!(
            prepared.structures[0].dimension_at_observation,
            DimensionAtObservation::time_period()
        );
        assert_eq!(prepared.data[0].data.series().len(), 2);
        assert_eq!(prepared.data[0].data.observation_count(), 3);
    }

    #[test]
    fn test_prepare_rejects_unknown_dimension() {
        let message = message();
        let options = WriterOptions::new(Format::GenericDataXml)
            .with_dimension_at_observation(DimensionAtObservation::parse("FREQ"));
        assert!(matches!(prepare(&message, &options), Err(SdmxError::Write(_))));
    }

    #[test]
    fn test_write_reports_content_type() {
        let output = write(&message(), &WriterOptions::new(Format::StructureSpecificDataXml))
            .expect("written");
        assert_eq!(output.content_type, Format::StructureSpecificDataXml.content_type());
        assert!(!output.bytes.is_empty());
    }
}
