//! Forward-only observation streaming.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::engine::{DatasetEngine, RawObservation};
use super::Observation;
use crate::diagnostics::Diagnostic;
use crate::model::{AttachmentLevel, DataStructureDefinition, DimensionAtObservation};

/// Adapts raw observations into validated flat observations one at a time.
///
/// Each yielded observation has its full key in descriptor order and only
/// observation-level attributes. Observations the [`DatasetEngine`] would
/// drop are skipped, and the reasons collect in
/// [`diagnostics`](Self::diagnostics).
pub struct ObservationStream<'a, I> {
    engine: DatasetEngine<'a>,
    inner: I,
    seen: FxHashSet<Vec<SmolStr>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, I> ObservationStream<'a, I>
where
    I: Iterator<Item = RawObservation>,
{
    pub fn new(dsd: &'a DataStructureDefinition, observations: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            engine: DatasetEngine::new(dsd),
            inner: observations.into_iter(),
            seen: FxHashSet::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl<I> Iterator for ObservationStream<'_, I>
where
    I: Iterator<Item = RawObservation>,
{
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        loop {
            let raw = self.inner.next()?;
            let Some(key) = self.engine.order_key(&raw.key) else {
                self.diagnostics.push(self.engine.arity_diagnostic(&raw.key));
                continue;
            };
            if !self.seen.insert(key.values().map(SmolStr::new).collect()) {
                self.diagnostics.push(self.engine.duplicate_diagnostic(&key));
                continue;
            }
            let path = format!("DataSet/Obs[{key}]");
            // The engine is never strict here, so filtering cannot fail.
            let attributes = self
                .engine
                .filter_attributes(
                    raw.attributes,
                    AttachmentLevel::Observation,
                    &DimensionAtObservation::AllDimensions,
                    &path,
                    &mut self.diagnostics,
                )
                .unwrap_or_default();
            return Some(Observation {
                key,
                value: raw.value,
                attributes,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Identifier;
    use crate::dataset::ObsValue;
    use crate::diagnostics::codes;
    use crate::model::{Dimension, DimensionDescriptor, Key, Maintainable, TIME_PERIOD};

    fn dsd() -> DataStructureDefinition {
        DataStructureDefinition::new(
            Maintainable::new(Identifier::unversioned("ECB", "ECB_EXR1")),
            DimensionDescriptor::new([Dimension::new("FREQ"), Dimension::time(TIME_PERIOD)])
                .expect("unique ids"),
        )
    }

    fn raw(pairs: &[(&str, &str)]) -> RawObservation {
        RawObservation {
            key: pairs.iter().copied().collect::<Key>(),
            value: ObsValue::from_lexical("1"),
            ..RawObservation::default()
        }
    }

    #[test]
    fn test_stream_is_lazy_and_validates() {
        let dsd = dsd();
        let input = vec![
            raw(&[(TIME_PERIOD, "2000"), ("FREQ", "A")]),
            raw(&[("FREQ", "A")]),
            raw(&[("FREQ", "A"), (TIME_PERIOD, "2000")]),
            raw(&[("FREQ", "A"), (TIME_PERIOD, "2001")]),
        ];
        let mut stream = ObservationStream::new(&dsd, input);

        let first = stream.next().expect("first observation");
        assert_eq!(first.key.to_string(), "A.2000");
        assert!(stream.diagnostics().is_empty());

        let rest: Vec<_> = stream.by_ref().collect();
        assert_eq!(rest.len(), 1);
        let diags = stream.take_diagnostics();
        assert_eq!(diags.len(), 2);
        assert!(diags[0].has_code(codes::KEY_ARITY_MISMATCH));
        assert!(diags[1].has_code(codes::DUPLICATE_OBSERVATION));
    }
}
