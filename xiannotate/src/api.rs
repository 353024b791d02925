//! The annotation pipeline, from request document to response document.
use serde_json::Value;
use tracing::{debug, instrument};

use crate::dialect::{normalize, AnnotationMode, NormalizedRequest};
use crate::engine::{AnnotationEngine, EnrichedSpectrum, RawFragmentMatch, ReferenceEngine};
use crate::error::AnnotationError;
use crate::fragments::aggregate_fragments;
use crate::peptide::{resolve_peptides, ResolvedPeptides};
use crate::precursor::{calculated_mz, precursor_error};
use crate::request::AnnotationRequest;
use crate::response::{loss_records, modification_records, AnnotationResponse, CrosslinkerRecord};
use crate::spectrum::{cluster_records, peak_records, raw_spectrum};

/// Annotates spectra using an [`AnnotationEngine`]. An `Annotator` holds no
/// per-request state and may be shared between threads when its engine can.
#[derive(Debug, Clone)]
pub struct Annotator<E: AnnotationEngine> {
    engine: E,
    version: String,
}

impl Default for Annotator<ReferenceEngine> {
    fn default() -> Self {
        Self::new(ReferenceEngine::new())
    }
}

impl<E: AnnotationEngine> Annotator<E> {
    /// Create an annotator reporting this library's version
    pub fn new(engine: E) -> Self {
        Self::with_version(engine, option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"))
    }

    pub fn with_version(engine: E, version: impl Into<String>) -> Self {
        Self {
            engine,
            version: version.into(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn match_fragments(
        &self,
        normalized: &NormalizedRequest,
        resolved: &ResolvedPeptides<E::Database>,
        spectrum: &EnrichedSpectrum,
    ) -> Result<Vec<RawFragmentMatch>, AnnotationError> {
        let config = &normalized.config;
        let database = &resolved.database;
        let (fragments, peptides) = match normalized.mode {
            AnnotationMode::Linear => {
                let peptide = *resolved
                    .indices
                    .first()
                    .ok_or(AnnotationError::UnsupportedPeptideCount(0))?;
                (
                    self.engine.fragment_linear(database, config, peptide)?,
                    vec![peptide],
                )
            }
            AnnotationMode::Crosslinked { link_sites } => {
                let pair = resolved.pair()?;
                let crosslinker = normalized
                    .crosslinker
                    .as_ref()
                    .ok_or(AnnotationError::MissingCrosslinker)?;
                (
                    self.engine
                        .fragment_crosslinked(database, config, pair, link_sites, crosslinker)?,
                    pair.to_vec(),
                )
            }
            AnnotationMode::NonCovalent => {
                let pair = resolved.pair()?;
                (
                    self.engine.fragment_noncovalent(database, config, pair)?,
                    pair.to_vec(),
                )
            }
        };
        let fragments = self
            .engine
            .include_losses(database, config, fragments, &peptides)?;
        let fragments = self
            .engine
            .spread_charges(fragments, normalized.precursor.charge);
        debug!("Generated {} charged fragments", fragments.len());
        self.engine.annotate(config, spectrum, &fragments)
    }

    /// Annotate the spectrum described by `request` and return the request
    /// with the annotation blocks filled in.
    #[instrument(level = "debug", skip_all)]
    pub fn annotate(&self, request: &Value) -> Result<Value, AnnotationError> {
        let parsed = AnnotationRequest::from_value(request)?;
        let normalized = normalize(&parsed)?;
        let config = &normalized.config;
        debug!(
            "Annotating {} peptides in {:?} mode against {} peaks",
            parsed.peptides.len(),
            normalized.mode,
            parsed.peaks.len()
        );

        let resolved = resolve_peptides(&self.engine, config, &parsed.peptides)?;

        let spectrum = self
            .engine
            .detect_isotopes(config, &raw_spectrum(normalized.precursor, &parsed.peaks))?;

        let matches = self.match_fragments(&normalized, &resolved, &spectrum)?;
        let sequences = resolved.sequences(normalized.return_syntax)?;
        let fragments = aggregate_fragments(matches, &sequences, normalized.return_syntax)?;

        let crosslinker = normalized.crosslinker.as_ref();
        let crosslinker_mass = crosslinker
            .filter(|_| normalized.is_crosslinked())
            .map(|c| c.mass);
        let calculated = calculated_mz(
            resolved.total_mass()?,
            crosslinker_mass,
            normalized.precursor.charge,
        )?;

        let response = AnnotationResponse {
            peaks: peak_records(&spectrum),
            clusters: cluster_records(&spectrum)?,
            fragments,
            clear_link_sites: normalized.mode == AnnotationMode::Linear,
            calculated_mz: calculated,
            precursor_error: precursor_error(normalized.precursor.mz, calculated),
            crosslinker: crosslinker.map(CrosslinkerRecord::from),
            modifications: modification_records(config),
            losses: loss_records(config, normalized.return_syntax),
            version: self.version.clone(),
        };
        debug!(
            "Annotated {} fragments in {} clusters",
            response.fragments.len(),
            response.clusters.len()
        );
        response.compose(request)
    }
}
