//! Normalization of both request dialects into a [`NormalizedRequest`].
use tracing::debug;

use crate::codec::{
    decode_stub, merge_stub_arms, parse_tolerance, specificity_from_legacy, ModSyntax,
};
use crate::config::{
    default_losses, CanonicalConfig, Crosslinker, FragmentationConfig, Loss, Modification,
    ModificationConfig, DEFAULT_MAX_LOSSES,
};
use crate::engine::Precursor;
use crate::error::AnnotationError;
use crate::request::{
    AnnotationDialect, AnnotationRequest, LegacyAnnotation, LinkSite, PeptideInput,
};

/// The name given to the crosslinker synthesized from a legacy request
pub const LEGACY_CROSSLINKER_NAME: &str = "MockCL";

/// Link site value marking two peptides as non-covalently associated
pub const NO_LINK: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationMode {
    Linear,
    Crosslinked { link_sites: [usize; 2] },
    NonCovalent,
}

impl AnnotationMode {
    pub fn peptide_count(&self) -> usize {
        match self {
            Self::Linear => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub config: CanonicalConfig,
    pub crosslinker: Option<Crosslinker>,
    pub return_syntax: ModSyntax,
    pub mode: AnnotationMode,
    pub precursor: Precursor,
}

impl NormalizedRequest {
    pub fn is_crosslinked(&self) -> bool {
        matches!(self.mode, AnnotationMode::Crosslinked { .. })
    }
}

/// Build the configuration a legacy annotation block describes
pub fn legacy_config(legacy: &LegacyAnnotation) -> Result<CanonicalConfig, AnnotationError> {
    let crosslinkers = match &legacy.crosslinker {
        Some(crosslinker) => {
            let stubs = merge_stub_arms(&crosslinker.stubs1, &crosslinker.stubs2)
                .iter()
                .map(|s| decode_stub(s))
                .collect::<Result<Vec<_>, _>>()?;
            vec![Crosslinker::new(
                LEGACY_CROSSLINKER_NAME,
                crosslinker.mod_mass,
                vec!["X".to_string()],
                stubs,
            )]
        }
        None => Vec::new(),
    };

    let modifications = legacy
        .modifications
        .iter()
        .map(|m| Modification {
            name: m.id.clone(),
            specificity: m.amino_acids.clone(),
            mass: m.mass,
        })
        .collect();

    let ms2_tolerance = parse_tolerance(&legacy.fragment_tolerance.as_text())?;

    let mut nterm_ions = Vec::new();
    let mut cterm_ions = Vec::new();
    let mut add_precursor = false;
    for ion in legacy.ions.iter() {
        match ion.ion_type.as_str() {
            "AIon" | "BIon" | "CIon" => nterm_ions.push(ion.ion_type[..1].to_ascii_lowercase()),
            "XIon" | "YIon" | "ZIon" => cterm_ions.push(ion.ion_type[..1].to_ascii_lowercase()),
            "PeptideIon" => add_precursor = true,
            other => debug!("Ignoring ion type {other}"),
        }
    }

    let losses = match &legacy.losses {
        Some(losses) => losses
            .iter()
            .map(|loss| {
                let specificity: Vec<String> = loss
                    .specificity
                    .iter()
                    .map(|s| specificity_from_legacy(s))
                    .collect();
                Loss::new(&loss.id, specificity.as_slice(), loss.mass)
            })
            .collect(),
        None => default_losses(),
    };

    Ok(CanonicalConfig {
        ms2_tolerance,
        mod_syntax: ModSyntax::ModX,
        fragmentation: FragmentationConfig {
            nterm_ions,
            cterm_ions,
            add_precursor,
            losses,
            max_losses: DEFAULT_MAX_LOSSES,
        },
        modification: ModificationConfig { modifications },
        crosslinkers,
    })
}

/// Pick the crosslinker a request refers to, if the configuration has any
pub fn select_crosslinker(
    config: &CanonicalConfig,
    crosslinker_id: Option<i64>,
) -> Result<Option<Crosslinker>, AnnotationError> {
    let n = config.crosslinkers.len();
    if n == 0 {
        return Ok(None);
    }
    let index = match crosslinker_id {
        Some(id) => usize::try_from(id)
            .ok()
            .filter(|i| *i < n)
            .ok_or(AnnotationError::CrosslinkerOutOfRange(id, n))?,
        None if n == 1 => 0,
        None => return Err(AnnotationError::AmbiguousCrosslinker),
    };
    Ok(Some(config.crosslinkers[index].clone()))
}

fn checked_link_site(site: i64, peptide: usize, length: usize) -> Result<usize, AnnotationError> {
    usize::try_from(site)
        .ok()
        .filter(|s| *s < length)
        .ok_or(AnnotationError::LinkSiteOutOfBounds {
            peptide,
            site,
            length,
        })
}

/// Decide how the peptides of a request relate to each other
pub fn annotation_mode(
    peptides: &[PeptideInput],
    link_sites: &[LinkSite],
    has_crosslinker: bool,
) -> Result<AnnotationMode, AnnotationError> {
    match peptides.len() {
        1 => Ok(AnnotationMode::Linear),
        2 => {
            if link_sites.len() < 2 {
                return Err(AnnotationError::MissingLinkSites(link_sites.len()));
            }
            let (first, second) = (link_sites[0].link_site, link_sites[1].link_site);
            match (first == NO_LINK, second == NO_LINK) {
                (true, true) => Ok(AnnotationMode::NonCovalent),
                (false, false) => {
                    if !has_crosslinker {
                        return Err(AnnotationError::MissingCrosslinker);
                    }
                    let first = checked_link_site(first, 0, peptides[0].residue_count())?;
                    let second = checked_link_site(second, 1, peptides[1].residue_count())?;
                    Ok(AnnotationMode::Crosslinked {
                        link_sites: [first, second],
                    })
                }
                _ => Err(AnnotationError::InvalidLinkSites(first, second)),
            }
        }
        n => Err(AnnotationError::UnsupportedPeptideCount(n)),
    }
}

/// Resolve a request of either dialect into one configuration, crosslinker,
/// output syntax and annotation mode. The request is left untouched.
pub fn normalize(request: &AnnotationRequest) -> Result<NormalizedRequest, AnnotationError> {
    let annotation = &request.annotation;
    let config = match &annotation.dialect {
        AnnotationDialect::Structured(config) => config.as_ref().clone(),
        AnnotationDialect::Legacy(legacy) => legacy_config(legacy)?,
    };

    let return_syntax = match annotation.return_mod_syntax.as_deref() {
        Some(syntax) => syntax.parse()?,
        None => config.mod_syntax,
    };

    let crosslinker = select_crosslinker(&config, annotation.crosslinker_id)?;

    if annotation.precursor_charge < 1 {
        return Err(AnnotationError::InvalidPrecursorCharge(annotation.precursor_charge));
    }

    let mode = annotation_mode(&request.peptides, &request.link_sites, crosslinker.is_some())?;

    Ok(NormalizedRequest {
        config,
        crosslinker,
        return_syntax,
        mode,
        precursor: Precursor {
            mz: annotation.precursor_mz,
            charge: annotation.precursor_charge,
            intensity: annotation.precursor_intensity,
        },
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use mzpeaks::Tolerance;
    use serde_json::{json, Value};

    fn peptides(n: usize) -> Value {
        let peptide = json!({"base_sequence": "AKT", "modification_ids": [], "modification_positions": []});
        Value::Array(vec![peptide; n])
    }

    fn legacy_request() -> Value {
        json!({
            "Peptides": peptides(2),
            "LinkSite": [{"linkSite": 1}, {"linkSite": 0}],
            "peaks": [],
            "annotation": {
                "precursorCharge": 3,
                "fragmentTolerance": {"tolerance": 20, "unit": "ppm"},
                "ions": [{"type": "BIon"}, {"type": "YIon"}, {"type": "PeptideIon"}, {"type": "Unknown"}],
                "crosslinker": {"modMass": 138.06808, "stubs1": ["b:138.06808:o", "o:0.0:b"], "stubs2": ["o:0.0:b"]},
                "modifications": [{"id": "cm", "mass": 57.0215, "aminoAcids": ["C"]}],
                "losses": [{"id": "H2O", "specificity": ["S", "T", "CTerm"], "mass": 18.01056027}]
            }
        })
    }

    fn structured_request() -> Value {
        json!({
            "Peptides": peptides(2),
            "LinkSite": [{"linkSite": 1}, {"linkSite": 0}],
            "peaks": [],
            "annotation": {
                "precursorCharge": 3,
                "config": {
                    "ms2_tol": "20 ppm",
                    "fragmentation": {"nterm_ions": ["b"], "cterm_ions": ["y"], "add_precursor": true,
                        "losses": [{"name": "H2O", "specificity": ["S", "T", "cterm"], "mass": 18.01056027}]},
                    "modification": {"modifications": [{"name": "cm", "mass": 57.0215, "specificity": ["C"]}]},
                    "crosslinker": [{"name": "MockCL", "mass": 138.06808, "specificity": ["X"],
                        "cleavage_stubs": [
                            {"name": "b", "mass": 138.06808, "pairs_with": ["o"]},
                            {"name": "o", "mass": 0.0, "pairs_with": ["b"]}
                        ]}]
                }
            }
        })
    }

    fn normalize_value(value: &Value) -> Result<NormalizedRequest, AnnotationError> {
        normalize(&AnnotationRequest::from_value(value)?)
    }

    #[test]
    fn test_legacy_and_structured_agree() {
        let legacy = normalize_value(&legacy_request()).unwrap();
        let structured = normalize_value(&structured_request()).unwrap();

        for normalized in [&legacy, &structured] {
            assert!(matches!(normalized.config.ms2_tolerance, Tolerance::PPM(v) if v == 20.0));
            assert_eq!(normalized.config.fragmentation.nterm_ions, ["b"]);
            assert_eq!(normalized.config.fragmentation.cterm_ions, ["y"]);
            assert!(normalized.config.fragmentation.add_precursor);
            assert_eq!(normalized.return_syntax, ModSyntax::ModX);
            assert_eq!(
                normalized.mode,
                AnnotationMode::Crosslinked { link_sites: [1, 0] }
            );
        }
        assert_eq!(legacy.config.fragmentation.losses, structured.config.fragmentation.losses);
        assert_eq!(legacy.config.modifications(), structured.config.modifications());
        assert_eq!(legacy.crosslinker, structured.crosslinker);
    }

    #[test]
    fn test_legacy_stub_merge() {
        let normalized = normalize_value(&legacy_request()).unwrap();
        let crosslinker = normalized.crosslinker.unwrap();
        assert_eq!(crosslinker.name, LEGACY_CROSSLINKER_NAME);
        assert_eq!(crosslinker.specificity, ["X"]);
        assert_eq!(crosslinker.cleavage_stubs.len(), 2);
    }

    #[test]
    fn test_legacy_default_losses() {
        let mut request = legacy_request();
        request["annotation"].as_object_mut().unwrap().remove("losses");
        let normalized = normalize_value(&request).unwrap();
        assert_eq!(normalized.config.fragmentation.losses, default_losses());
    }

    #[test]
    fn test_malformed_stub() {
        let mut request = legacy_request();
        request["annotation"]["crosslinker"]["stubs2"] = json!(["o:0.0"]);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::MalformedStub(_))
        ));
    }

    #[test]
    fn test_return_syntax() {
        let mut request = structured_request();
        request["annotation"]["returnModSyntax"] = json!("Xmod");
        assert_eq!(normalize_value(&request).unwrap().return_syntax, ModSyntax::XMod);
        request["annotation"]["returnModSyntax"] = json!("xmod");
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::UnknownModSyntax(_))
        ));
    }

    #[test]
    fn test_crosslinker_selection() {
        let mut request = structured_request();
        request["annotation"]["config"]["crosslinker"] = json!(["BS3", "DSSO"]);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::AmbiguousCrosslinker)
        ));
        request["annotation"]["crosslinkerID"] = json!(1);
        let normalized = normalize_value(&request).unwrap();
        assert_eq!(normalized.crosslinker.unwrap().name, "DSSO");
        request["annotation"]["crosslinkerID"] = json!(2);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::CrosslinkerOutOfRange(2, 2))
        ));
    }

    #[test]
    fn test_modes() {
        let mut request = structured_request();
        request["LinkSite"] = json!([{"linkSite": -1}, {"linkSite": -1}]);
        assert_eq!(normalize_value(&request).unwrap().mode, AnnotationMode::NonCovalent);

        request["LinkSite"] = json!([{"linkSite": -1}, {"linkSite": 2}]);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::InvalidLinkSites(-1, 2))
        ));

        request["LinkSite"] = json!([{"linkSite": 3}, {"linkSite": 2}]);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::LinkSiteOutOfBounds { site: 3, .. })
        ));

        request["LinkSite"] = json!([{"linkSite": 1}]);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::MissingLinkSites(1))
        ));

        request["Peptides"] = peptides(3);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::UnsupportedPeptideCount(3))
        ));

        request["Peptides"] = peptides(1);
        request["LinkSite"] = json!([{"linkSite": 1}]);
        assert_eq!(normalize_value(&request).unwrap().mode, AnnotationMode::Linear);
    }

    #[test]
    fn test_missing_crosslinker() {
        let mut request = structured_request();
        request["annotation"]["config"]
            .as_object_mut()
            .unwrap()
            .remove("crosslinker");
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::MissingCrosslinker)
        ));
    }

    #[test]
    fn test_precursor_charge() {
        let mut request = structured_request();
        request["annotation"]["precursorCharge"] = json!(0);
        assert!(matches!(
            normalize_value(&request),
            Err(AnnotationError::InvalidPrecursorCharge(0))
        ));
    }
}
