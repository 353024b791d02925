//! Rendering of an isotope-cluster enriched spectrum as response blocks.
use serde::Serialize;

use crate::engine::{EnrichedSpectrum, Precursor, RawSpectrum, SpectrumPeak};
use crate::error::AnnotationError;
use crate::request::PeakInput;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakRecord {
    pub mz: f64,
    pub intensity: f64,
    #[serde(rename = "clusterIds")]
    pub cluster_ids: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterRecord {
    pub charge: i32,
    #[serde(rename = "firstPeakId")]
    pub first_peak_id: usize,
}

pub fn raw_spectrum(precursor: Precursor, peaks: &[PeakInput]) -> RawSpectrum {
    RawSpectrum {
        precursor,
        peaks: peaks
            .iter()
            .map(|p| SpectrumPeak::new(p.mz, p.intensity))
            .collect(),
    }
}

/// One record per peak in the enriched spectrum's order, listing the clusters
/// it belongs to.
pub fn peak_records(spectrum: &EnrichedSpectrum) -> Vec<PeakRecord> {
    spectrum
        .peaks
        .iter()
        .zip(spectrum.peak_cluster_ids())
        .map(|(peak, cluster_ids)| PeakRecord {
            mz: peak.mz,
            intensity: peak.intensity,
            cluster_ids,
        })
        .collect()
}

/// One record per cluster in cluster id order
pub fn cluster_records(spectrum: &EnrichedSpectrum) -> Result<Vec<ClusterRecord>, AnnotationError> {
    let first_peaks = spectrum.first_peak_ids()?;
    Ok(spectrum
        .cluster_charges
        .iter()
        .zip(first_peaks)
        .map(|(charge, first_peak_id)| ClusterRecord {
            charge: *charge,
            first_peak_id,
        })
        .collect())
}
