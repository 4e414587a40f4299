//! Dataset engine: turns raw observations into a validated [`DataSet`].
//!
//! Readers hand over what they found in the document, without
//! interpretation. The engine then:
//!
//! - checks every attribute value against the level its declaration implies
//!   for the data set's dimension at observation,
//! - drops observations whose key does not cover exactly the structure's
//!   dimensions, and repeated full keys (first one wins),
//! - groups observations into series on all dimensions but the one at
//!   observation, in order of first appearance,
//! - orders observations within a series by codelist position when the
//!   observation dimension is coded, lexically for the time dimension, and
//!   by input order otherwise.
//!
//! Nothing is dropped silently: every rejected value becomes a diagnostic
//! on the resulting data set.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::{AttributeValues, DataSet, DataSetBody, GroupKey, Key, ObsValue, Observation, Series};
use crate::diagnostics::{Diagnostic, codes};
use crate::error::{Location, Result, SdmxError};
use crate::model::{
    AttachmentLevel, DataStructureDefinition, DimensionAtObservation, DimensionKind, ItemScheme,
    Reference, Resolution,
};
use crate::base::ArtefactKind;

// ============================================================================
// RAW INPUT
// ============================================================================

/// An observation as found in a document. In series context `key` holds
/// only the dimension at observation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawObservation {
    pub key: Key,
    pub value: ObsValue,
    pub attributes: AttributeValues,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSeries {
    pub key: Key,
    pub attributes: AttributeValues,
    pub observations: Vec<RawObservation>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawGroup {
    pub group_id: Option<SmolStr>,
    pub key: Key,
    pub attributes: AttributeValues,
}

/// Everything a reader collected for one data set.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDataSet {
    pub structure: Reference,
    pub dataflow: Option<Reference>,
    pub action: Option<SmolStr>,
    pub attributes: AttributeValues,
    pub groups: Vec<RawGroup>,
    pub series: Vec<RawSeries>,
    /// Observations outside any series (flat data).
    pub observations: Vec<RawObservation>,
}

impl RawDataSet {
    pub fn new(structure: Reference) -> Self {
        Self {
            structure,
            dataflow: None,
            action: None,
            attributes: AttributeValues::new(),
            groups: Vec::new(),
            series: Vec::new(),
            observations: Vec::new(),
        }
    }
}

/// Build a data set from flat raw observations.
pub fn build_dataset(
    observations: Vec<RawObservation>,
    dsd: &DataStructureDefinition,
    dimension_at_observation: DimensionAtObservation,
) -> Result<DataSet> {
    let structure = Reference::new(ArtefactKind::DataStructure, dsd.identifier().clone())
        .with_resolution(Resolution::Local);
    let raw = RawDataSet {
        observations,
        ..RawDataSet::new(structure)
    };
    DatasetEngine::new(dsd).build(raw, dimension_at_observation)
}

// ============================================================================
// ENGINE
// ============================================================================

/// Entry waiting to be placed: full key plus its attribute values.
struct Entry {
    key: Key,
    value: ObsValue,
    series_attributes: AttributeValues,
    obs_attributes: AttributeValues,
}

#[derive(Clone, Copy, Debug)]
pub struct DatasetEngine<'a> {
    dsd: &'a DataStructureDefinition,
    obs_order: Option<&'a ItemScheme>,
    strict: bool,
    relocate: bool,
}

impl<'a> DatasetEngine<'a> {
    pub fn new(dsd: &'a DataStructureDefinition) -> Self {
        Self {
            dsd,
            obs_order: None,
            strict: false,
            relocate: false,
        }
    }

    /// Codelist that orders observations within a series.
    pub fn with_obs_order(mut self, codelist: &'a ItemScheme) -> Self {
        self.obs_order = Some(codelist);
        self
    }

    /// Reject attribute values at the wrong level instead of reporting them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Move attribute values found on observations to their declared level
    /// instead of validating where they were found.
    pub(crate) fn relocating(mut self) -> Self {
        self.relocate = true;
        self
    }

    pub fn dsd(&self) -> &'a DataStructureDefinition {
        self.dsd
    }

    pub fn build(&self, raw: RawDataSet, dim_at_obs: DimensionAtObservation) -> Result<DataSet> {
        if let Some(dim) = dim_at_obs.dimension() {
            if !self.dsd.dimensions.contains(dim) {
                return Err(SdmxError::malformed(
                    format!(
                        "dimension at observation {dim} is not a dimension of {}",
                        self.dsd.identifier()
                    ),
                    Location::path("DataSet"),
                ));
            }
        }

        let mut diagnostics = Vec::new();
        let attributes = self.filter_attributes(
            raw.attributes,
            AttachmentLevel::DataSet,
            &dim_at_obs,
            "DataSet",
            &mut diagnostics,
        )?;

        let mut groups = Vec::with_capacity(raw.groups.len());
        for group in raw.groups {
            let path = format!("DataSet/Group[{}]", group.key);
            for dim in group.key.dimensions() {
                if !self.dsd.dimensions.contains(dim) {
                    diagnostics.push(
                        Diagnostic::warning(format!("group key names unknown dimension {dim}"))
                            .with_code(codes::UNKNOWN_DIMENSION)
                            .with_location(Location::path(path.clone())),
                    );
                }
            }
            let attributes = self.filter_attributes(
                group.attributes,
                AttachmentLevel::Group,
                &dim_at_obs,
                &path,
                &mut diagnostics,
            )?;
            let group_id = group.group_id.or_else(|| self.group_over(&group.key));
            groups.push(GroupKey {
                group_id,
                key: group.key,
                attributes,
            });
        }

        let mut entries = Vec::new();
        for series in raw.series {
            let path = format!("DataSet/Series[{}]", series.key);
            let series_attributes = self.filter_attributes(
                series.attributes,
                AttachmentLevel::Series,
                &dim_at_obs,
                &path,
                &mut diagnostics,
            )?;
            for obs in series.observations {
                let (series_extra, obs_attributes) =
                    self.place_observation_attributes(obs.attributes, &dim_at_obs, &path, &mut diagnostics)?;
                let mut merged = series_attributes.clone();
                merged.extend(series_extra);
                entries.push(Entry {
                    key: series.key.merged(&obs.key),
                    value: obs.value,
                    series_attributes: merged,
                    obs_attributes,
                });
            }
        }
        for obs in raw.observations {
            let (series_attributes, obs_attributes) = self.place_observation_attributes(
                obs.attributes,
                &dim_at_obs,
                "DataSet/Obs",
                &mut diagnostics,
            )?;
            entries.push(Entry {
                key: obs.key,
                value: obs.value,
                series_attributes,
                obs_attributes,
            });
        }

        let entries = self.check_keys(entries, &mut diagnostics);
        let body = match &dim_at_obs {
            DimensionAtObservation::AllDimensions => DataSetBody::Flat(
                entries
                    .into_iter()
                    .map(|e| Observation {
                        key: e.key,
                        value: e.value,
                        attributes: e.obs_attributes,
                    })
                    .collect(),
            ),
            DimensionAtObservation::Dimension(dim) => {
                DataSetBody::Series(self.group_series(entries, dim, &mut diagnostics))
            }
        };

        if !diagnostics.is_empty() {
            tracing::debug!(
                structure = %self.dsd.identifier(),
                count = diagnostics.len(),
                "data set built with diagnostics"
            );
        }

        Ok(DataSet {
            structure: raw.structure,
            dataflow: raw.dataflow,
            action: raw.action,
            dimension_at_observation: dim_at_obs,
            attributes,
            groups,
            body,
            diagnostics,
        })
    }

    // ========================================================================
    // ATTRIBUTES
    // ========================================================================

    /// Keep the values acceptable at `found`; report the rest.
    pub(crate) fn filter_attributes(
        &self,
        values: AttributeValues,
        found: AttachmentLevel,
        dim_at_obs: &DimensionAtObservation,
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<AttributeValues> {
        let mut kept = AttributeValues::with_capacity(values.len());
        for (id, value) in values {
            let Some(attribute) = self.dsd.attribute(&id) else {
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "attribute {id} is not declared by {}",
                        self.dsd.identifier()
                    ))
                    .with_code(codes::UNKNOWN_ATTRIBUTE)
                    .with_location(Location::path(path)),
                );
                continue;
            };
            if attribute.accepts(found, dim_at_obs) {
                kept.insert(id, value);
                continue;
            }
            let expected = attribute.attachment_level(dim_at_obs);
            if self.strict {
                return Err(SdmxError::AttachmentLevelMismatch {
                    attribute: id.to_string(),
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
            tracing::warn!(attribute = %id, %expected, %found, "attribute at wrong level");
            diagnostics.push(
                Diagnostic::warning(format!(
                    "attribute {id} found at {found} level, declared at {expected} level"
                ))
                .with_code(codes::ATTACHMENT_LEVEL_MISMATCH)
                .with_location(Location::path(path)),
            );
        }
        Ok(kept)
    }

    /// Split observation attribute values into (series, observation) parts.
    /// Without relocation every value must be observation level.
    fn place_observation_attributes(
        &self,
        values: AttributeValues,
        dim_at_obs: &DimensionAtObservation,
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<(AttributeValues, AttributeValues)> {
        if !self.relocate {
            let obs = self.filter_attributes(
                values,
                AttachmentLevel::Observation,
                dim_at_obs,
                path,
                diagnostics,
            )?;
            return Ok((AttributeValues::new(), obs));
        }
        let mut series = AttributeValues::new();
        let mut obs = AttributeValues::new();
        for (id, value) in values {
            match self
                .dsd
                .attribute(&id)
                .map(|a| a.attachment_level(dim_at_obs))
            {
                Some(AttachmentLevel::Series) => {
                    series.insert(id, value);
                }
                Some(AttachmentLevel::Observation) => {
                    obs.insert(id, value);
                }
                _ => {
                    let mut single = AttributeValues::new();
                    single.insert(id, value);
                    obs.extend(self.filter_attributes(
                        single,
                        AttachmentLevel::Observation,
                        dim_at_obs,
                        path,
                        diagnostics,
                    )?);
                }
            }
        }
        Ok((series, obs))
    }

    // ========================================================================
    // KEYS
    // ========================================================================

    /// The only group descriptor over exactly the key's dimensions. Formats
    /// without group ids name their partial keys this way.
    fn group_over(&self, key: &Key) -> Option<SmolStr> {
        let mut matching = self.dsd.groups.values().filter(|group| {
            group.dimensions.len() == key.len() && group.dimensions.iter().all(|d| key.contains(d))
        });
        let group = matching.next()?;
        matching.next().is_none().then(|| group.base.id.clone())
    }

    /// Full key in descriptor order, or `None` if the key's dimensions are
    /// not exactly the structure's.
    pub(crate) fn order_key(&self, key: &Key) -> Option<Key> {
        if key.len() != self.dsd.dimensions.len() {
            return None;
        }
        let mut out = Key::new();
        for id in self.dsd.dimensions.ids() {
            out.insert(id, key.get(id)?);
        }
        Some(out)
    }

    pub(crate) fn arity_diagnostic(&self, key: &Key) -> Diagnostic {
        let expected: Vec<&str> = self.dsd.dimensions.ids().collect();
        let found: Vec<&str> = key.dimensions().collect();
        Diagnostic::warning(format!(
            "observation key {{{}}} does not match dimensions {{{}}} of {}; observation dropped",
            found.join(", "),
            expected.join(", "),
            self.dsd.identifier()
        ))
        .with_code(codes::KEY_ARITY_MISMATCH)
        .with_location(Location::path(format!("DataSet/Obs[{key}]")))
    }

    pub(crate) fn duplicate_diagnostic(&self, key: &Key) -> Diagnostic {
        Diagnostic::warning(format!(
            "duplicate observation {key}; keeping the first occurrence"
        ))
        .with_code(codes::DUPLICATE_OBSERVATION)
        .with_location(Location::path(format!("DataSet/Obs[{key}]")))
    }

    fn check_keys(&self, entries: Vec<Entry>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Entry> {
        let mut seen: FxHashSet<Vec<SmolStr>> = FxHashSet::default();
        let mut out = Vec::with_capacity(entries.len());
        for mut entry in entries {
            let Some(key) = self.order_key(&entry.key) else {
                diagnostics.push(self.arity_diagnostic(&entry.key));
                continue;
            };
            if !seen.insert(key.values().map(SmolStr::new).collect()) {
                diagnostics.push(self.duplicate_diagnostic(&key));
                continue;
            }
            entry.key = key;
            out.push(entry);
        }
        out
    }

    // ========================================================================
    // GROUPING
    // ========================================================================

    fn group_series(
        &self,
        entries: Vec<Entry>,
        obs_dim: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Series> {
        let mut grouped: IndexMap<Vec<SmolStr>, Series> = IndexMap::new();
        for entry in entries {
            let mut series_key = Key::new();
            let mut obs_key = Key::new();
            for (id, value) in entry.key.iter() {
                if id == obs_dim {
                    obs_key.insert(id, value);
                } else {
                    series_key.insert(id, value);
                }
            }
            let slot: Vec<SmolStr> = series_key.values().map(SmolStr::new).collect();
            let series = grouped.entry(slot).or_insert_with(|| Series {
                key: series_key,
                ..Series::default()
            });
            for (id, value) in entry.series_attributes {
                match series.attributes.get(&id) {
                    None => {
                        series.attributes.insert(id, value);
                    }
                    Some(existing) if *existing == value => {}
                    Some(existing) => diagnostics.push(
                        Diagnostic::warning(format!(
                            "series {} has conflicting values for {id}: {existing:?} and {value:?}; keeping the first",
                            series.key
                        ))
                        .with_code(codes::CONFLICTING_ATTRIBUTE),
                    ),
                }
            }
            series.observations.push(Observation {
                key: obs_key,
                value: entry.value,
                attributes: entry.obs_attributes,
            });
        }

        let mut series: Vec<Series> = grouped.into_values().collect();
        for s in &mut series {
            self.sort_observations(&mut s.observations, obs_dim);
        }
        series
    }

    fn sort_observations(&self, observations: &mut [Observation], obs_dim: &str) {
        if let Some(codelist) = self.obs_order {
            observations.sort_by_key(|o| {
                o.key
                    .get(obs_dim)
                    .and_then(|code| codelist.position(code))
                    .unwrap_or(usize::MAX)
            });
            return;
        }
        let is_time = self
            .dsd
            .dimension(obs_dim)
            .is_some_and(|d| d.kind == DimensionKind::Time);
        if is_time {
            observations.sort_by(|a, b| a.key.get(obs_dim).cmp(&b.key.get(obs_dim)));
        }
    }
}
