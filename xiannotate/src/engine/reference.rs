use tracing::debug;

use crate::config::{CanonicalConfig, Crosslinker};
use crate::error::AnnotationError;

use super::database::{DatabasePeptide, ReferenceDatabase};
use super::fragmentation::{
    backbone_fragments, crosslinked_fragments, noncovalent_fragments, with_charges, with_losses,
};
use super::isotopes::detect_isotope_clusters;
use super::matching::match_fragments;
use super::{
    AnnotationEngine, EnrichedSpectrum, RawFragmentMatch, RawSpectrum, TheoreticalFragment,
};

/// An [`AnnotationEngine`] computing everything from residue masses and the
/// request configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    pub fn new() -> Self {
        Self
    }

    fn pair<'a>(
        database: &'a ReferenceDatabase,
        peptides: [usize; 2],
    ) -> Result<[&'a DatabasePeptide; 2], AnnotationError> {
        Ok([database.get(peptides[0])?, database.get(peptides[1])?])
    }
}

impl AnnotationEngine for ReferenceEngine {
    type Database = ReferenceDatabase;

    fn build_database(
        &self,
        config: &CanonicalConfig,
        peptides: &[String],
    ) -> Result<Self::Database, AnnotationError> {
        ReferenceDatabase::build(config, peptides)
    }

    fn detect_isotopes(
        &self,
        config: &CanonicalConfig,
        spectrum: &RawSpectrum,
    ) -> Result<EnrichedSpectrum, AnnotationError> {
        let enriched = detect_isotope_clusters(
            &spectrum.peaks,
            spectrum.precursor.charge,
            config.ms2_tolerance,
        );
        debug!(
            "Detected {} isotope clusters in {} peaks",
            enriched.cluster_count(),
            enriched.peaks.len()
        );
        Ok(enriched)
    }

    fn fragment_linear(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        peptide: usize,
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError> {
        backbone_fragments(database.get(peptide)?, 1, config)
    }

    fn fragment_crosslinked(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        peptides: [usize; 2],
        link_sites: [usize; 2],
        crosslinker: &Crosslinker,
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError> {
        crosslinked_fragments(Self::pair(database, peptides)?, link_sites, crosslinker, config)
    }

    fn fragment_noncovalent(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        peptides: [usize; 2],
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError> {
        noncovalent_fragments(Self::pair(database, peptides)?, config)
    }

    fn include_losses(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        fragments: Vec<TheoreticalFragment>,
        peptides: &[usize],
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError> {
        let peptides = peptides
            .iter()
            .map(|i| database.get(*i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(with_losses(fragments, &peptides, config))
    }

    fn spread_charges(
        &self,
        fragments: Vec<TheoreticalFragment>,
        precursor_charge: i32,
    ) -> Vec<TheoreticalFragment> {
        with_charges(fragments, precursor_charge)
    }

    fn annotate(
        &self,
        config: &CanonicalConfig,
        spectrum: &EnrichedSpectrum,
        fragments: &[TheoreticalFragment],
    ) -> Result<Vec<RawFragmentMatch>, AnnotationError> {
        let matches = match_fragments(spectrum, fragments, config.ms2_tolerance)?;
        debug!(
            "Matched {} of {} charged fragments",
            matches.len(),
            fragments.len()
        );
        Ok(matches)
    }
}
