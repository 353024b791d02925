use std::collections::HashSet;

use mzpeaks::prelude::*;
use mzpeaks::{CentroidPeak, MZPeakSetType, Tolerance};
use tracing::trace;

use super::{ClusterPeak, EnrichedSpectrum, SpectrumPeak};

/// The mass difference between consecutive isotopic peaks
pub const NEUTRON_SHIFT: f64 = 1.0033548378;

#[derive(Debug, Clone, PartialEq)]
struct IsotopeCluster {
    charge: i32,
    peaks: Vec<usize>,
}

impl IsotopeCluster {
    fn first_peak(&self) -> usize {
        self.peaks[0]
    }
}

/// Group `peaks` into isotope clusters for every charge from 1 to `max_charge`.
///
/// A cluster grows from a peak while the next isotope is found within
/// `error_tolerance` and needs at least two peaks. A peak already claimed as
/// a later isotope of a cluster does not start another one of the same charge.
/// Peaks without any cluster become singleton clusters of charge 0. Clusters
/// are numbered in order of their first peak, then charge.
pub fn detect_isotope_clusters(
    peaks: &[SpectrumPeak],
    max_charge: i32,
    error_tolerance: Tolerance,
) -> EnrichedSpectrum {
    let mut sorted: Vec<SpectrumPeak> = peaks.to_vec();
    sorted.sort_by(|a, b| a.mz.total_cmp(&b.mz));

    let peak_set = MZPeakSetType::new(
        sorted
            .iter()
            .enumerate()
            .map(|(i, p)| CentroidPeak::new(p.mz, p.intensity as f32, i as u32))
            .collect(),
    );

    let mut clusters: Vec<IsotopeCluster> = Vec::new();
    let mut claimed: HashSet<(usize, i32)> = HashSet::new();
    let mut clustered = vec![false; sorted.len()];

    for (i, peak) in sorted.iter().enumerate() {
        for charge in 1..=max_charge.max(1) {
            if claimed.contains(&(i, charge)) {
                continue;
            }
            let spacing = NEUTRON_SHIFT / charge as f64;
            let mut members = vec![i];
            loop {
                let expected = peak.mz + spacing * members.len() as f64;
                let last = members[members.len() - 1];
                match peak_set.has_peak(expected, error_tolerance) {
                    Some(hit) if hit.index as usize > last => members.push(hit.index as usize),
                    _ => break,
                }
            }
            if members.len() < 2 {
                continue;
            }
            for member in members[1..].iter() {
                claimed.insert((*member, charge));
            }
            for member in members.iter() {
                clustered[*member] = true;
            }
            trace!("Isotope cluster at {:0.4} with charge {charge}: {members:?}", peak.mz);
            clusters.push(IsotopeCluster {
                charge,
                peaks: members,
            });
        }
    }

    for (i, in_cluster) in clustered.iter().enumerate() {
        if !in_cluster {
            clusters.push(IsotopeCluster {
                charge: 0,
                peaks: vec![i],
            });
        }
    }
    clusters.sort_by_key(|c| (c.first_peak(), c.charge));

    let mut cluster_peaks = Vec::new();
    let mut cluster_charges = Vec::with_capacity(clusters.len());
    for (cluster_id, cluster) in clusters.into_iter().enumerate() {
        cluster_charges.push(cluster.charge);
        cluster_peaks.extend(cluster.peaks.into_iter().map(|peak_id| ClusterPeak {
            cluster_id,
            peak_id,
        }));
    }

    EnrichedSpectrum {
        peaks: sorted,
        cluster_peaks,
        cluster_charges,
    }
}
