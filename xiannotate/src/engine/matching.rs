use mzpeaks::Tolerance;

use crate::codec::relative_error;
use crate::error::AnnotationError;

use super::isotopes::NEUTRON_SHIFT;
use super::{EnrichedSpectrum, RawFragmentMatch, TheoreticalFragment};

/// Match charged fragments against the monoisotopic peak of every isotope
/// cluster, in cluster order.
///
/// A fragment is compatible with clusters of its own charge and with
/// singleton clusters. When the monoisotopic peak of a charged cluster is
/// one isotope above the fragment, the match is flagged as missing its
/// monoisotopic peak.
pub fn match_fragments(
    spectrum: &EnrichedSpectrum,
    fragments: &[TheoreticalFragment],
    error_tolerance: Tolerance,
) -> Result<Vec<RawFragmentMatch>, AnnotationError> {
    let first_peaks = spectrum.first_peak_ids()?;
    let mut matches = Vec::new();

    for (cluster_id, (charge, peak_id)) in spectrum
        .cluster_charges
        .iter()
        .zip(first_peaks)
        .enumerate()
    {
        let Some(peak) = spectrum.peaks.get(peak_id) else {
            return Err(AnnotationError::EmptyCluster(cluster_id));
        };
        for fragment in fragments {
            if *charge != 0 && *charge != fragment.charge {
                continue;
            }
            let calculated = fragment.mz();
            let (observed, missing_monoisotopic) = if error_tolerance.test(peak.mz, calculated) {
                (peak.mz, false)
            } else if *charge != 0 {
                let shifted = peak.mz - NEUTRON_SHIFT / *charge as f64;
                if error_tolerance.test(shifted, calculated) {
                    (shifted, true)
                } else {
                    continue;
                }
            } else {
                continue;
            };
            matches.push(RawFragmentMatch {
                key: fragment.key.clone(),
                cluster_id,
                calculated_mz: calculated,
                charge: fragment.charge,
                relative_error: relative_error(observed, calculated),
                missing_monoisotopic,
            });
        }
    }
    Ok(matches)
}
