//! Aggregation of raw fragment matches into one record per distinct fragment.
use itertools::Itertools;
use serde::Serialize;

use crate::codec::{to_ppm, ModSyntax, PPM_UNIT};
use crate::engine::{FragmentKey, RawFragmentMatch, ResidueSpan};
use crate::error::AnnotationError;

pub const LOSSY: &str = "lossy";
pub const NON_LOSSY: &str = "non-lossy";

/// One spectrum cluster a fragment was matched to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterInfo {
    #[serde(rename = "Clusterid")]
    pub cluster_id: usize,
    #[serde(rename = "calcMZ")]
    pub calculated_mz: f64,
    pub error: f64,
    #[serde(rename = "errorUnit")]
    pub error_unit: &'static str,
    #[serde(rename = "matchedMissingMonoIsotopic")]
    pub missing_monoisotopic: u8,
    #[serde(rename = "matchedCharge")]
    pub charge: i32,
}

impl From<&RawFragmentMatch> for ClusterInfo {
    fn from(value: &RawFragmentMatch) -> Self {
        Self {
            cluster_id: value.cluster_id,
            calculated_mz: value.calculated_mz,
            error: to_ppm(value.relative_error),
            error_unit: PPM_UNIT,
            missing_monoisotopic: value.missing_monoisotopic as u8,
            charge: value.charge,
        }
    }
}

/// An inclusive residue range on one peptide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeRecord {
    #[serde(rename = "peptideId")]
    pub peptide_id: usize,
    pub from: usize,
    pub to: usize,
}

impl RangeRecord {
    fn new(peptide_id: usize, span: ResidueSpan) -> Self {
        Self {
            peptide_id,
            from: span.start,
            to: span.end.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentRecord {
    pub name: String,
    #[serde(rename = "ionNumber")]
    pub ion_number: usize,
    #[serde(rename = "peptideId")]
    pub peptide_id: usize,
    pub range: Vec<RangeRecord>,
    #[serde(rename = "type")]
    pub ion_type: String,
    pub class: &'static str,
    pub nlosses: usize,
    pub stub: String,
    #[serde(rename = "clusterIds")]
    pub cluster_ids: Vec<usize>,
    #[serde(rename = "clusterInfo")]
    pub cluster_info: Vec<ClusterInfo>,
    pub sequence: String,
}

/// The display name of a fragment, e.g. `b2+P` or `y3_H2Ox1`
pub fn fragment_name(key: &FragmentKey) -> String {
    let mut name = key.ion_type.clone();
    if !key.is_precursor() {
        name.push_str(&key.index.to_string());
    }
    if !key.is_linear {
        name.push_str("+P");
    }
    name.push_str(&key.stub);
    if key.loss_count > 0 {
        name.push('_');
        name.push_str(&key.loss);
    }
    name
}

/// Splits the request peptides into residue tokens once, for slicing out
/// fragment sequences.
struct SequenceSlicer<'a> {
    tokens: Vec<Vec<&'a str>>,
}

impl<'a> SequenceSlicer<'a> {
    fn new(peptides: &'a [String], syntax: ModSyntax) -> Self {
        Self {
            tokens: peptides.iter().map(|p| syntax.tokenize(p)).collect(),
        }
    }

    fn residues(&self, peptide: usize) -> &[&'a str] {
        self.tokens.get(peptide).map(|t| t.as_slice()).unwrap_or_default()
    }

    fn out_of_bounds(&self, peptide: usize, span: ResidueSpan) -> AnnotationError {
        AnnotationError::RangeOutOfBounds {
            peptide,
            start: span.start,
            end: span.end,
            length: self.residues(peptide).len(),
        }
    }

    /// The per-peptide spans a fragment covers, in peptide order. A linear
    /// fragment covers exactly its own peptide, which must not be empty.
    fn spans(&self, key: &FragmentKey) -> Result<Vec<(usize, ResidueSpan)>, AnnotationError> {
        if key.is_linear {
            let own = key.peptide_id.saturating_sub(1);
            let span = key.ranges.get(own).copied().unwrap_or_default();
            if span.is_empty() {
                return Err(self.out_of_bounds(own, span));
            }
            Ok(vec![(own, span)])
        } else {
            Ok(key
                .ranges
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, span)| !span.is_empty())
                .collect())
        }
    }

    fn slice(&self, spans: &[(usize, ResidueSpan)]) -> Result<String, AnnotationError> {
        let mut parts = Vec::with_capacity(spans.len());
        for &(peptide, span) in spans {
            let residues = self
                .residues(peptide)
                .get(span.start..span.end)
                .ok_or_else(|| self.out_of_bounds(peptide, span))?;
            parts.push(residues.concat());
        }
        Ok(parts.join(" + "))
    }
}

/// Sort `matches` by fragment and collapse the matches of each fragment into a
/// single record. `peptides` are the request's peptides written in `syntax`.
pub fn aggregate_fragments(
    mut matches: Vec<RawFragmentMatch>,
    peptides: &[String],
    syntax: ModSyntax,
) -> Result<Vec<FragmentRecord>, AnnotationError> {
    matches.sort_by(|a, b| a.key.cmp(&b.key));
    let slicer = SequenceSlicer::new(peptides, syntax);

    let grouped = matches.iter().group_by(|m| m.key.clone());
    let mut records = Vec::new();
    for (key, members) in &grouped {
        let cluster_info: Vec<ClusterInfo> = members.map(ClusterInfo::from).collect();
        let spans = slicer.spans(&key)?;
        records.push(FragmentRecord {
            name: fragment_name(&key),
            ion_number: key.index,
            peptide_id: key.peptide_id.saturating_sub(1),
            range: spans
                .iter()
                .map(|&(peptide, span)| RangeRecord::new(peptide, span))
                .collect(),
            ion_type: key.ion_type.clone(),
            class: if key.loss_count > 0 { LOSSY } else { NON_LOSSY },
            nlosses: key.loss_count,
            stub: key.stub.clone(),
            cluster_ids: cluster_info.iter().map(|c| c.cluster_id).collect(),
            cluster_info,
            sequence: slicer.slice(&spans)?,
        });
    }
    Ok(records)
}
