//! The computation engine the assembler drives: peptide database, isotope
//! cluster detection, fragment generation and spectrum matching.
//!
//! [`AnnotationEngine`] is the seam between the response assembler and the
//! mass spectrometry computations. [`ReferenceEngine`] is a self-contained
//! implementation of it.
use chemical_elements::PROTON;

use crate::codec::ModSyntax;
use crate::config::{CanonicalConfig, Crosslinker};
use crate::error::AnnotationError;

mod database;
mod fragmentation;
mod isotopes;
mod matching;
mod reference;
mod residues;

pub use database::{DatabasePeptide, ReferenceDatabase};
pub use isotopes::{detect_isotope_clusters, NEUTRON_SHIFT};
pub use reference::ReferenceEngine;
pub use residues::{Mass, Residue, WATER_MASS};

/// A half-open `[start, end)` span of residue positions within one peptide
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResidueSpan {
    pub start: usize,
    pub end: usize,
}

impl ResidueSpan {
    pub const EMPTY: ResidueSpan = ResidueSpan { start: 0, end: 0 };

    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end
    }
}

/// Everything that identifies a theoretical fragment independently of the
/// charge state and spectrum cluster it was matched to.
///
/// The field order is the ordering of fragment records in a response.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentKey {
    /// The ion series letter, or `P` for the precursor
    pub ion_type: String,
    pub index: usize,
    /// 1-based position of the fragmented peptide in the request
    pub peptide_id: usize,
    /// Whether the fragment lies on its own peptide only
    pub is_linear: bool,
    pub loss: String,
    pub loss_count: usize,
    pub stub: String,
    /// The residues covered on the first and second peptide
    pub ranges: [ResidueSpan; 2],
}

impl FragmentKey {
    pub fn new(
        ion_type: &str,
        index: usize,
        peptide_id: usize,
        is_linear: bool,
        ranges: [ResidueSpan; 2],
    ) -> Self {
        Self {
            ion_type: ion_type.to_string(),
            index,
            peptide_id,
            is_linear,
            loss: String::new(),
            loss_count: 0,
            stub: String::new(),
            ranges,
        }
    }

    pub fn is_precursor(&self) -> bool {
        self.ion_type == "P"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TheoreticalFragment {
    pub key: FragmentKey,
    /// Neutral monoisotopic mass
    pub mass: f64,
    /// Zero until charges are spread
    pub charge: i32,
}

impl TheoreticalFragment {
    pub fn new(key: FragmentKey, mass: f64) -> Self {
        Self {
            key,
            mass,
            charge: 0,
        }
    }

    pub fn mz(&self) -> f64 {
        let z = self.charge.max(1) as f64;
        self.mass / z + PROTON
    }
}

/// One match between a charged theoretical fragment and an isotope cluster
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragmentMatch {
    pub key: FragmentKey,
    pub cluster_id: usize,
    pub calculated_mz: f64,
    pub charge: i32,
    pub relative_error: f64,
    pub missing_monoisotopic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumPeak {
    pub mz: f64,
    pub intensity: f64,
}

impl SpectrumPeak {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Precursor {
    pub mz: Option<f64>,
    pub charge: i32,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSpectrum {
    pub precursor: Precursor,
    pub peaks: Vec<SpectrumPeak>,
}

/// A row of the cluster membership table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterPeak {
    pub cluster_id: usize,
    pub peak_id: usize,
}

/// A spectrum with its peaks grouped into isotope clusters. A peak may belong
/// to several clusters, cluster ids are dense and index `cluster_charges`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedSpectrum {
    /// Peaks in m/z order
    pub peaks: Vec<SpectrumPeak>,
    pub cluster_peaks: Vec<ClusterPeak>,
    /// Charge of each cluster, `0` for singletons
    pub cluster_charges: Vec<i32>,
}

impl EnrichedSpectrum {
    pub fn cluster_count(&self) -> usize {
        self.cluster_charges.len()
    }

    /// The peak of the first membership row of each cluster
    pub fn first_peak_ids(&self) -> Result<Vec<usize>, AnnotationError> {
        let mut first: Vec<Option<usize>> = vec![None; self.cluster_count()];
        for row in self.cluster_peaks.iter() {
            match first.get_mut(row.cluster_id) {
                Some(slot) => {
                    if slot.is_none() {
                        *slot = Some(row.peak_id);
                    }
                }
                None => return Err(AnnotationError::EmptyCluster(row.cluster_id)),
            }
        }
        first
            .into_iter()
            .enumerate()
            .map(|(cluster_id, peak)| peak.ok_or(AnnotationError::EmptyCluster(cluster_id)))
            .collect()
    }

    /// The clusters each peak belongs to, in membership table order
    pub fn peak_cluster_ids(&self) -> Vec<Vec<usize>> {
        let mut assignments = vec![Vec::new(); self.peaks.len()];
        for row in self.cluster_peaks.iter() {
            if let Some(ids) = assignments.get_mut(row.peak_id) {
                ids.push(row.cluster_id);
            }
        }
        assignments
    }
}

/// Read access to the peptides registered for one request
pub trait PeptideDatabase {
    fn peptide_count(&self) -> usize;

    /// Neutral monoisotopic mass of the peptide at `index`
    fn mass(&self, index: usize) -> Result<f64, AnnotationError>;

    /// The modified sequence of the peptide at `index` written in `syntax`
    fn sequence(&self, index: usize, syntax: ModSyntax) -> Result<String, AnnotationError>;
}

pub trait AnnotationEngine {
    type Database: PeptideDatabase;

    /// Register peptides given as `modX` encoded modified sequences
    fn build_database(
        &self,
        config: &CanonicalConfig,
        peptides: &[String],
    ) -> Result<Self::Database, AnnotationError>;

    fn detect_isotopes(
        &self,
        config: &CanonicalConfig,
        spectrum: &RawSpectrum,
    ) -> Result<EnrichedSpectrum, AnnotationError>;

    fn fragment_linear(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        peptide: usize,
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError>;

    fn fragment_crosslinked(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        peptides: [usize; 2],
        link_sites: [usize; 2],
        crosslinker: &Crosslinker,
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError>;

    fn fragment_noncovalent(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        peptides: [usize; 2],
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError>;

    /// Extend `fragments` with their neutral loss variants. `peptides` maps
    /// the 1-based peptide ids of the fragments to database indices.
    fn include_losses(
        &self,
        database: &Self::Database,
        config: &CanonicalConfig,
        fragments: Vec<TheoreticalFragment>,
        peptides: &[usize],
    ) -> Result<Vec<TheoreticalFragment>, AnnotationError>;

    fn spread_charges(
        &self,
        fragments: Vec<TheoreticalFragment>,
        precursor_charge: i32,
    ) -> Vec<TheoreticalFragment>;

    fn annotate(
        &self,
        config: &CanonicalConfig,
        spectrum: &EnrichedSpectrum,
        fragments: &[TheoreticalFragment],
    ) -> Result<Vec<RawFragmentMatch>, AnnotationError>;
}
