//! Typed view of an annotation request.
//!
//! The request itself is echoed back in the response, so these types only
//! capture the fields that drive the annotation.
use serde::Deserialize;
use serde_json::Value;

use crate::config::CanonicalConfig;
use crate::error::AnnotationError;

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRequest {
    #[serde(rename = "Peptides")]
    pub peptides: Vec<PeptideInput>,
    pub peaks: Vec<PeakInput>,
    pub annotation: AnnotationBlock,
    #[serde(rename = "LinkSite", default)]
    pub link_sites: Vec<LinkSite>,
}

impl AnnotationRequest {
    pub fn from_value(value: &Value) -> Result<Self, AnnotationError> {
        Ok(Self::deserialize(value)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PeakInput {
    pub mz: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LinkSite {
    #[serde(rename = "linkSite")]
    pub link_site: i64,
}

/// A peptide as given by the client, either as a residue list with
/// modification prefixes or as a base sequence with positioned modifications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PeptideInput {
    Positional {
        base_sequence: String,
        #[serde(default)]
        modification_ids: Vec<String>,
        #[serde(default)]
        modification_positions: Vec<i64>,
    },
    Residues {
        sequence: Vec<ResidueInput>,
    },
}

impl PeptideInput {
    pub fn residue_count(&self) -> usize {
        match self {
            Self::Positional { base_sequence, .. } => base_sequence.chars().count(),
            Self::Residues { sequence } => sequence.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResidueInput {
    #[serde(rename = "aminoAcid")]
    pub amino_acid: String,
    #[serde(rename = "Modification", default)]
    pub modification: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "AnnotationFields")]
pub struct AnnotationBlock {
    pub precursor_charge: i32,
    pub precursor_mz: Option<f64>,
    pub precursor_intensity: f64,
    pub return_mod_syntax: Option<String>,
    pub crosslinker_id: Option<i64>,
    pub dialect: AnnotationDialect,
}

#[derive(Debug, Clone)]
pub enum AnnotationDialect {
    /// An embedded configuration object
    Structured(Box<CanonicalConfig>),
    /// The flat legacy field layout
    Legacy(LegacyAnnotation),
}

#[derive(Debug, Clone)]
pub struct LegacyAnnotation {
    pub fragment_tolerance: FragmentTolerance,
    pub ions: Vec<IonInput>,
    pub crosslinker: Option<LegacyCrosslinker>,
    pub modifications: Vec<LegacyModification>,
    pub losses: Option<Vec<LegacyLoss>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FragmentTolerance {
    pub tolerance: Value,
    pub unit: String,
}

impl FragmentTolerance {
    /// Render as `<value> <unit>`
    pub fn as_text(&self) -> String {
        match &self.tolerance {
            Value::String(s) => format!("{} {}", s, self.unit),
            other => format!("{} {}", other, self.unit),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IonInput {
    #[serde(rename = "type")]
    pub ion_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCrosslinker {
    #[serde(rename = "modMass")]
    pub mod_mass: f64,
    #[serde(default)]
    pub stubs1: Vec<String>,
    #[serde(default)]
    pub stubs2: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyModification {
    pub id: String,
    pub mass: f64,
    #[serde(rename = "aminoAcids", default)]
    pub amino_acids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyLoss {
    pub id: String,
    #[serde(default)]
    pub specificity: Vec<String>,
    pub mass: f64,
}

#[derive(Debug, Deserialize)]
struct AnnotationFields {
    #[serde(rename = "precursorCharge")]
    precursor_charge: i32,
    #[serde(rename = "precursorMZ", default)]
    precursor_mz: Option<f64>,
    #[serde(rename = "precursorIntensity", default)]
    precursor_intensity: Option<f64>,
    #[serde(rename = "returnModSyntax", default)]
    return_mod_syntax: Option<String>,
    #[serde(rename = "crosslinkerID", default)]
    crosslinker_id: Option<i64>,
    #[serde(default)]
    config: Option<CanonicalConfig>,
    #[serde(rename = "fragmentTolerance", default)]
    fragment_tolerance: Option<FragmentTolerance>,
    #[serde(default)]
    ions: Option<Vec<IonInput>>,
    #[serde(default)]
    crosslinker: Option<LegacyCrosslinker>,
    #[serde(default)]
    modifications: Option<Vec<LegacyModification>>,
    #[serde(default)]
    losses: Option<Vec<LegacyLoss>>,
}

impl TryFrom<AnnotationFields> for AnnotationBlock {
    type Error = AnnotationError;

    fn try_from(value: AnnotationFields) -> Result<Self, Self::Error> {
        let dialect = match value.config {
            Some(config) => AnnotationDialect::Structured(Box::new(config)),
            None => AnnotationDialect::Legacy(LegacyAnnotation {
                fragment_tolerance: value
                    .fragment_tolerance
                    .ok_or(AnnotationError::MissingAnnotationField("fragmentTolerance"))?,
                ions: value
                    .ions
                    .ok_or(AnnotationError::MissingAnnotationField("ions"))?,
                crosslinker: value.crosslinker,
                modifications: value
                    .modifications
                    .ok_or(AnnotationError::MissingAnnotationField("modifications"))?,
                losses: value.losses,
            }),
        };
        Ok(Self {
            precursor_charge: value.precursor_charge,
            precursor_mz: value.precursor_mz,
            precursor_intensity: value.precursor_intensity.unwrap_or(-1.0),
            return_mod_syntax: value.return_mod_syntax,
            crosslinker_id: value.crosslinker_id,
            dialect,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_request() {
        let value = json!({
            "Peptides": [
                {"sequence": [{"aminoAcid": "A", "Modification": ""}, {"aminoAcid": "K", "Modification": ""}]},
                {"base_sequence": "KMR", "modification_ids": [], "modification_positions": []}
            ],
            "LinkSite": [{"id": 0, "peptideId": 0, "linkSite": 1}, {"id": 0, "peptideId": 1, "linkSite": 0}],
            "peaks": [{"mz": 100.5, "intensity": 12.0}],
            "annotation": {
                "precursorCharge": 3,
                "fragmentTolerance": {"tolerance": 20, "unit": "ppm"},
                "ions": [{"type": "BIon"}, {"type": "YIon"}],
                "crosslinker": {"modMass": 138.06808},
                "modifications": []
            }
        });
        let request = AnnotationRequest::from_value(&value).unwrap();
        assert_eq!(request.peptides.len(), 2);
        assert!(matches!(request.peptides[0], PeptideInput::Residues { .. }));
        assert!(matches!(request.peptides[1], PeptideInput::Positional { .. }));
        assert_eq!(request.link_sites[0].link_site, 1);
        assert_eq!(request.annotation.precursor_intensity, -1.0);
        match &request.annotation.dialect {
            AnnotationDialect::Legacy(legacy) => {
                assert_eq!(legacy.fragment_tolerance.as_text(), "20 ppm");
                assert_eq!(legacy.ions.len(), 2);
                assert!(legacy.losses.is_none());
            }
            AnnotationDialect::Structured(_) => panic!("expected the legacy dialect"),
        }
    }

    #[test]
    fn test_structured_request() {
        let value = json!({
            "Peptides": [{"base_sequence": "AM", "modification_ids": ["ox"], "modification_positions": [1]}],
            "peaks": [],
            "annotation": {
                "precursorCharge": 2,
                "precursorMZ": 120.0,
                "config": {"ms2_tol": "20 ppm"}
            }
        });
        let request = AnnotationRequest::from_value(&value).unwrap();
        assert!(request.link_sites.is_empty());
        assert_eq!(request.annotation.precursor_mz, Some(120.0));
        assert!(matches!(request.annotation.dialect, AnnotationDialect::Structured(_)));
    }

    #[test]
    fn test_missing_legacy_fields() {
        let value = json!({
            "Peptides": [],
            "peaks": [],
            "annotation": {"precursorCharge": 2, "ions": [], "modifications": []}
        });
        let err = AnnotationRequest::from_value(&value).unwrap_err();
        assert!(err.to_string().contains("fragmentTolerance"), "{err}");

        let value = json!({"Peptides": [], "peaks": []});
        assert!(AnnotationRequest::from_value(&value).is_err());
    }
}
