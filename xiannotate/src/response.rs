//! Assembly of the annotation response from the echoed request.
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::codec::{encode_stub, ModSyntax};
use crate::config::{CanonicalConfig, CleavageStub, Crosslinker};
use crate::error::AnnotationError;
use crate::fragments::FragmentRecord;
use crate::spectrum::{ClusterRecord, PeakRecord};

const CTERM: &str = "CTerm";
const NTERM: &str = "NTerm";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossRecord {
    pub id: String,
    pub specificity: Vec<String>,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModificationRecord {
    pub id: String,
    #[serde(rename = "aminoAcids")]
    pub amino_acids: Vec<String>,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosslinkerRecord {
    pub name: String,
    #[serde(rename = "modMass")]
    pub mod_mass: f64,
    pub specificity: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stubs1: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stubs2: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleavage_stubs: Option<Vec<CleavageStub>>,
}

impl From<&Crosslinker> for CrosslinkerRecord {
    fn from(value: &Crosslinker) -> Self {
        let (stubs, cleavage_stubs) = if value.has_stubs() {
            let encoded: Vec<String> = value.cleavage_stubs.iter().map(encode_stub).collect();
            (Some(encoded), Some(value.cleavage_stubs.clone()))
        } else {
            (None, None)
        };
        Self {
            name: value.name.clone(),
            mod_mass: value.mass,
            specificity: value.specificity.clone(),
            stubs1: stubs.clone(),
            stubs2: stubs,
            cleavage_stubs,
        }
    }
}

/// The configured losses in the legacy layout. Residue tokens are respelled
/// when the return syntax differs from the configuration's, terminus flags
/// become trailing `CTerm` / `NTerm` tokens.
pub fn loss_records(config: &CanonicalConfig, return_syntax: ModSyntax) -> Vec<LossRecord> {
    config
        .fragmentation
        .losses
        .iter()
        .map(|loss| {
            let mut specificity: Vec<String> = if return_syntax != config.mod_syntax {
                loss.specificity
                    .iter()
                    .map(|s| return_syntax.respell(s))
                    .collect()
            } else {
                loss.specificity.clone()
            };
            if loss.cterm {
                specificity.push(CTERM.to_string());
            }
            if loss.nterm {
                specificity.push(NTERM.to_string());
            }
            LossRecord {
                id: loss.name.clone(),
                specificity,
                mass: loss.mass,
            }
        })
        .collect()
}

pub fn modification_records(config: &CanonicalConfig) -> Vec<ModificationRecord> {
    config
        .modifications()
        .iter()
        .map(|m| ModificationRecord {
            id: m.name.clone(),
            amino_acids: m.specificity.clone(),
            mass: m.mass,
        })
        .collect()
}

/// Everything an annotation adds to or replaces in the echoed request
#[derive(Debug, Clone)]
pub struct AnnotationResponse {
    pub peaks: Vec<PeakRecord>,
    pub clusters: Vec<ClusterRecord>,
    pub fragments: Vec<FragmentRecord>,
    pub clear_link_sites: bool,
    pub calculated_mz: f64,
    pub precursor_error: Value,
    pub crosslinker: Option<CrosslinkerRecord>,
    pub modifications: Vec<ModificationRecord>,
    pub losses: Vec<LossRecord>,
    pub version: String,
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, AnnotationError> {
    Ok(serde_json::to_value(value)?)
}

fn not_an_object(field: &str) -> AnnotationError {
    AnnotationError::MalformedRequest(serde::de::Error::custom(format!(
        "{field} must be a JSON object"
    )))
}

impl AnnotationResponse {
    /// Write the response into a copy of `request`, leaving every field this
    /// response does not own as it was.
    pub fn compose(&self, request: &Value) -> Result<Value, AnnotationError> {
        let mut response: Map<String, Value> = request
            .as_object()
            .cloned()
            .ok_or_else(|| not_an_object("The annotation request"))?;

        response.insert("peaks".into(), to_value(&self.peaks)?);
        response.insert("clusters".into(), to_value(&self.clusters)?);
        response.insert("fragments".into(), to_value(&self.fragments)?);
        if self.clear_link_sites {
            response.insert("LinkSite".into(), json!([]));
        }

        let annotation = response
            .get_mut("annotation")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| not_an_object("annotation"))?;
        annotation.insert("calculatedMZ".into(), json!(self.calculated_mz));
        annotation.insert("precursorError".into(), self.precursor_error.clone());
        if let Some(crosslinker) = self.crosslinker.as_ref() {
            annotation.insert("crosslinker".into(), to_value(crosslinker)?);
        }
        annotation.insert("modifications".into(), to_value(&self.modifications)?);
        annotation.insert("losses".into(), to_value(&self.losses)?);
        annotation.insert("xiVersion".into(), json!(self.version));

        Ok(Value::Object(response))
    }
}

/// The body returned for a failed annotation when errors are reported to the
/// client
pub fn error_envelope(error: &AnnotationError) -> Value {
    json!({
        "error": error.to_string(),
        "stacktrace": error.trace(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Loss, Modification, ModificationConfig};

    fn response() -> AnnotationResponse {
        AnnotationResponse {
            peaks: vec![PeakRecord {
                mz: 100.0,
                intensity: 5.0,
                cluster_ids: vec![0],
            }],
            clusters: vec![ClusterRecord {
                charge: 0,
                first_peak_id: 0,
            }],
            fragments: Vec::new(),
            clear_link_sites: true,
            calculated_mz: 297.5,
            precursor_error: json!(""),
            crosslinker: None,
            modifications: Vec::new(),
            losses: Vec::new(),
            version: "1.2.3".into(),
        }
    }

    #[test]
    fn test_default_loss_records() {
        let config = CanonicalConfig::default();
        let losses = to_value(&loss_records(&config, ModSyntax::ModX)).unwrap();
        assert_eq!(
            losses,
            json!([
                {"id": "H2O", "specificity": ["S", "T", "D", "E", "CTerm"], "mass": 18.01056027},
                {"id": "NH3", "specificity": ["R", "K", "N", "Q", "NTerm"], "mass": 17.02654493}
            ])
        );
    }

    #[test]
    fn test_loss_records_respelled() {
        let mut config = CanonicalConfig::default();
        config.fragmentation.losses = vec![Loss::new("CH4SO", &["oxM", "cterm"], 63.99828547)];
        let records = loss_records(&config, ModSyntax::XMod);
        assert_eq!(records[0].specificity, ["Mox", "CTerm"]);
        let records = loss_records(&config, ModSyntax::ModX);
        assert_eq!(records[0].specificity, ["oxM", "CTerm"]);
    }

    #[test]
    fn test_modification_records() {
        let config = CanonicalConfig {
            modification: ModificationConfig {
                modifications: vec![Modification {
                    name: "cm".into(),
                    specificity: vec!["C".into()],
                    mass: 57.0215,
                }],
            },
            ..Default::default()
        };
        let value = to_value(&modification_records(&config)).unwrap();
        assert_eq!(value, json!([{"aminoAcids": ["C"], "id": "cm", "mass": 57.0215}]));
    }

    #[test]
    fn test_crosslinker_record() {
        let bs3 = Crosslinker::named("BS3").unwrap();
        let value = to_value(&CrosslinkerRecord::from(&bs3)).unwrap();
        assert_eq!(value["modMass"], json!(138.06807961));
        assert!(value.get("stubs1").is_none());
        assert!(value.get("cleavage_stubs").is_none());

        let stubbed = Crosslinker::new(
            "MockCL",
            138.06808,
            vec!["X".into()],
            vec![
                CleavageStub {
                    name: "b".into(),
                    mass: 138.06808,
                    pairs_with: vec!["o".into()],
                },
                CleavageStub {
                    name: "o".into(),
                    mass: 0.0,
                    pairs_with: vec!["b".into()],
                },
            ],
        );
        let value = to_value(&CrosslinkerRecord::from(&stubbed)).unwrap();
        assert_eq!(value["stubs1"], json!(["b:138.06808:o", "o:0.0:b"]));
        assert_eq!(value["stubs1"], value["stubs2"]);
        assert_eq!(value["cleavage_stubs"][1]["pairs_with"], json!(["b"]));
    }

    #[test]
    fn test_compose_echoes_request() {
        let request = json!({
            "Peptides": [{"base_sequence": "AKT"}],
            "LinkSite": [{"linkSite": 1}],
            "peaks": [{"mz": 100.0, "intensity": 5.0}],
            "annotation": {"precursorCharge": 3, "custom": "kept"},
            "extra": {"untouched": true}
        });
        let value = response().compose(&request).unwrap();
        assert_eq!(value["LinkSite"], json!([]));
        assert_eq!(value["extra"], request["extra"]);
        assert_eq!(value["Peptides"], request["Peptides"]);
        assert_eq!(value["annotation"]["custom"], "kept");
        assert_eq!(value["annotation"]["precursorError"], "");
        assert_eq!(value["annotation"]["xiVersion"], "1.2.3");
        assert_eq!(value["peaks"][0]["clusterIds"], json!([0]));
        assert_eq!(value["fragments"], json!([]));
        assert_eq!(request["LinkSite"], json!([{"linkSite": 1}]));
    }

    #[test]
    fn test_compose_rejects_non_objects() {
        assert!(response().compose(&json!([1, 2])).is_err());
        assert!(response().compose(&json!({"annotation": []})).is_err());
    }

    #[test]
    fn test_error_envelope() {
        let envelope = error_envelope(&AnnotationError::AmbiguousCrosslinker);
        assert_eq!(
            envelope["error"],
            "More than 1 crosslinker in config without defined crosslinkerID"
        );
        assert!(envelope["stacktrace"].as_str().unwrap().starts_with("More than 1"));
    }
}
