//! The canonical annotation configuration every request dialect is
//! normalized into.
use mzpeaks::Tolerance;
use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::{parse_tolerance, ModSyntax};
use crate::composition::composition_mass;
use crate::error::AnnotationError;

pub const H2O_LOSS_MASS: f64 = 18.01056027;
pub const NH3_LOSS_MASS: f64 = 17.02654493;

pub const DEFAULT_MS2_TOLERANCE_PPM: f64 = 20.0;
pub const DEFAULT_MAX_LOSSES: usize = 2;

const NTERM: &str = "nterm";
const CTERM: &str = "cterm";

#[derive(Debug, Clone, Deserialize)]
pub struct CanonicalConfig {
    #[serde(
        rename = "ms2_tol",
        deserialize_with = "deserialize_tolerance",
        default = "default_ms2_tolerance"
    )]
    pub ms2_tolerance: Tolerance,
    #[serde(rename = "mod_peptide_syntax", default)]
    pub mod_syntax: ModSyntax,
    #[serde(default)]
    pub fragmentation: FragmentationConfig,
    #[serde(rename = "modification", default)]
    pub modification: ModificationConfig,
    #[serde(rename = "crosslinker", default)]
    pub crosslinkers: Vec<Crosslinker>,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            ms2_tolerance: default_ms2_tolerance(),
            mod_syntax: ModSyntax::default(),
            fragmentation: FragmentationConfig::default(),
            modification: ModificationConfig::default(),
            crosslinkers: Vec::new(),
        }
    }
}

impl CanonicalConfig {
    pub fn modifications(&self) -> &[Modification] {
        &self.modification.modifications
    }

    pub fn find_modification(&self, name: &str) -> Option<&Modification> {
        self.modifications().iter().find(|m| m.name == name)
    }
}

fn default_ms2_tolerance() -> Tolerance {
    Tolerance::PPM(DEFAULT_MS2_TOLERANCE_PPM)
}

fn deserialize_tolerance<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tolerance, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_tolerance(&text).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct FragmentationConfig {
    #[serde(default = "default_nterm_ions")]
    pub nterm_ions: Vec<String>,
    #[serde(default = "default_cterm_ions")]
    pub cterm_ions: Vec<String>,
    #[serde(default = "default_add_precursor")]
    pub add_precursor: bool,
    /// Absent loss lists fall back to [`default_losses`], an explicitly
    /// empty list disables losses.
    #[serde(default = "default_losses")]
    pub losses: Vec<Loss>,
    #[serde(rename = "max_nloss", default = "default_max_losses")]
    pub max_losses: usize,
}

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self {
            nterm_ions: default_nterm_ions(),
            cterm_ions: default_cterm_ions(),
            add_precursor: default_add_precursor(),
            losses: default_losses(),
            max_losses: default_max_losses(),
        }
    }
}

fn default_nterm_ions() -> Vec<String> {
    vec!["b".to_string()]
}

fn default_cterm_ions() -> Vec<String> {
    vec!["y".to_string()]
}

fn default_add_precursor() -> bool {
    true
}

fn default_max_losses() -> usize {
    DEFAULT_MAX_LOSSES
}

/// The water and ammonia losses used when a configuration does not list any
pub fn default_losses() -> Vec<Loss> {
    vec![
        Loss::new(
            "H2O",
            &["S", "T", "D", "E", CTERM],
            H2O_LOSS_MASS,
        ),
        Loss::new(
            "NH3",
            &["R", "K", "N", "Q", NTERM],
            NH3_LOSS_MASS,
        ),
    ]
}

/// A neutral loss. Terminus keywords in the specificity are kept as flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MassDefinition")]
pub struct Loss {
    pub name: String,
    /// Residue tokens in the configuration's modification syntax
    pub specificity: Vec<String>,
    pub nterm: bool,
    pub cterm: bool,
    pub mass: f64,
}

impl Loss {
    pub fn new<S: AsRef<str>>(name: &str, specificity: &[S], mass: f64) -> Self {
        let mut residues = Vec::with_capacity(specificity.len());
        let mut nterm = false;
        let mut cterm = false;
        for token in specificity {
            match token.as_ref() {
                NTERM => nterm = true,
                CTERM => cterm = true,
                residue => residues.push(residue.to_string()),
            }
        }
        Self {
            name: name.to_string(),
            specificity: residues,
            nterm,
            cterm,
            mass,
        }
    }

    pub fn applies_to(&self, residue: &str) -> bool {
        self.specificity.iter().any(|s| s == residue)
    }
}

impl TryFrom<MassDefinition> for Loss {
    type Error = AnnotationError;

    fn try_from(value: MassDefinition) -> Result<Self, Self::Error> {
        let mass = value.resolve_mass()?;
        Ok(Self::new(&value.name, value.specificity.as_slice(), mass))
    }
}

/// The shared shape of modification and loss definitions, which may give
/// their mass directly or as an elemental composition.
#[derive(Debug, Clone, Deserialize)]
pub struct MassDefinition {
    pub name: String,
    #[serde(default)]
    pub specificity: Vec<String>,
    #[serde(default)]
    pub mass: Option<f64>,
    #[serde(default)]
    pub composition: Option<String>,
}

impl MassDefinition {
    fn resolve_mass(&self) -> Result<f64, AnnotationError> {
        match (self.mass, self.composition.as_deref()) {
            (Some(mass), _) => Ok(mass),
            (None, Some(formula)) => composition_mass(formula),
            (None, None) => Err(AnnotationError::MissingMass(self.name.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModificationConfig {
    #[serde(default)]
    pub modifications: Vec<Modification>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MassDefinition")]
pub struct Modification {
    pub name: String,
    pub specificity: Vec<String>,
    pub mass: f64,
}

impl TryFrom<MassDefinition> for Modification {
    type Error = AnnotationError;

    fn try_from(value: MassDefinition) -> Result<Self, Self::Error> {
        let mass = value.resolve_mass()?;
        Ok(Self {
            name: value.name,
            specificity: value.specificity,
            mass,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleavageStub {
    pub name: String,
    pub mass: f64,
    pub pairs_with: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "CrosslinkerEntry")]
pub struct Crosslinker {
    pub name: String,
    pub mass: f64,
    pub specificity: Vec<String>,
    pub cleavage_stubs: Vec<CleavageStub>,
}

/// Either the name of a well-known crosslinker or a full definition
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CrosslinkerEntry {
    Named(String),
    Defined {
        name: String,
        #[serde(default)]
        mass: Option<f64>,
        #[serde(default)]
        composition: Option<String>,
        #[serde(default)]
        specificity: Vec<String>,
        #[serde(default)]
        cleavage_stubs: Vec<CleavageStub>,
    },
}

impl TryFrom<CrosslinkerEntry> for Crosslinker {
    type Error = AnnotationError;

    fn try_from(value: CrosslinkerEntry) -> Result<Self, Self::Error> {
        match value {
            CrosslinkerEntry::Named(name) => {
                Crosslinker::named(&name).ok_or(AnnotationError::UnknownCrosslinker(name))
            }
            CrosslinkerEntry::Defined {
                name,
                mass,
                composition,
                specificity,
                cleavage_stubs,
            } => {
                let mass = MassDefinition {
                    name: name.clone(),
                    specificity: Vec::new(),
                    mass,
                    composition,
                }
                .resolve_mass()?;
                Ok(Self {
                    name,
                    mass,
                    specificity,
                    cleavage_stubs,
                })
            }
        }
    }
}

const AMINE_REACTIVE: [&str; 5] = ["K", "S", "T", "Y", NTERM];

impl Crosslinker {
    pub fn new(
        name: &str,
        mass: f64,
        specificity: Vec<String>,
        cleavage_stubs: Vec<CleavageStub>,
    ) -> Self {
        Self {
            name: name.to_string(),
            mass,
            specificity,
            cleavage_stubs,
        }
    }

    /// Look up a crosslinker by its common name
    pub fn named(name: &str) -> Option<Self> {
        let amine = || AMINE_REACTIVE.iter().map(|s| s.to_string()).collect();
        match name.to_ascii_uppercase().as_str() {
            "BS3" => Some(Self::new("BS3", 138.06807961, amine(), Vec::new())),
            "DSS" => Some(Self::new("DSS", 138.06807961, amine(), Vec::new())),
            "DSSO" => Some(Self::new(
                "DSSO",
                158.0037648,
                amine(),
                vec![
                    CleavageStub {
                        name: "a".into(),
                        mass: 54.01056468,
                        pairs_with: vec!["s".into(), "t".into()],
                    },
                    CleavageStub {
                        name: "s".into(),
                        mass: 103.99320037,
                        pairs_with: vec!["a".into()],
                    },
                    CleavageStub {
                        name: "t".into(),
                        mass: 85.98263568,
                        pairs_with: vec!["a".into()],
                    },
                ],
            )),
            _ => None,
        }
    }

    pub fn has_stubs(&self) -> bool {
        !self.cleavage_stubs.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_losses() {
        let losses = default_losses();
        assert_eq!(losses.len(), 2);
        assert_eq!(losses[0].name, "H2O");
        assert_eq!(losses[0].specificity, ["S", "T", "D", "E"]);
        assert!(losses[0].cterm && !losses[0].nterm);
        assert_eq!(losses[1].name, "NH3");
        assert!(losses[1].nterm && !losses[1].cterm);
        assert!(losses[1].applies_to("K"));
    }

    #[test]
    fn test_structured_defaults() {
        let config: CanonicalConfig = serde_json::from_str(r#"{"ms2_tol": "20 ppm"}"#).unwrap();
        assert_eq!(config.mod_syntax, ModSyntax::ModX);
        assert!(config.fragmentation.add_precursor);
        assert_eq!(config.fragmentation.losses, default_losses());
        assert!(config.crosslinkers.is_empty());
        assert!(config.modifications().is_empty());
    }

    #[test]
    fn test_losses_injected_only_when_absent() {
        let config: CanonicalConfig = serde_json::from_str(
            r#"{"ms2_tol": "10 ppm", "fragmentation": {"nterm_ions": ["a", "b"], "cterm_ions": ["y"]}}"#,
        )
        .unwrap();
        assert_eq!(config.fragmentation.losses.len(), 2);
        assert_eq!(config.fragmentation.nterm_ions, ["a", "b"]);

        let config: CanonicalConfig = serde_json::from_str(
            r#"{"ms2_tol": "10 ppm", "fragmentation": {"losses": []}}"#,
        )
        .unwrap();
        assert!(config.fragmentation.losses.is_empty());
    }

    #[test]
    fn test_composition_modification() {
        let config: CanonicalConfig = serde_json::from_str(
            r#"{
                "ms2_tol": "20 ppm",
                "modification": {"modifications": [
                    {"specificity": ["M"], "name": "ox", "composition": "O", "type": "variable"}
                ]}
            }"#,
        )
        .unwrap();
        let ox = config.find_modification("ox").unwrap();
        assert!((ox.mass - 15.99491461956).abs() < 1e-6);
        assert_eq!(ox.specificity, ["M"]);
    }

    #[test]
    fn test_missing_mass() {
        let result: Result<CanonicalConfig, _> = serde_json::from_str(
            r#"{"modification": {"modifications": [{"specificity": ["M"], "name": "ox"}]}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_crosslinkers() {
        let config: CanonicalConfig = serde_json::from_str(
            r#"{
                "crosslinker": [
                    "BS3",
                    {"name": "SDA", "mass": 82.04186484, "specificity": ["K", "S", "T", "Y", "X"]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.crosslinkers.len(), 2);
        assert_eq!(config.crosslinkers[0].name, "BS3");
        assert_eq!(config.crosslinkers[1].mass, 82.04186484);

        let result: Result<CanonicalConfig, _> =
            serde_json::from_str(r#"{"crosslinker": ["NotACrosslinker"]}"#);
        assert!(result.is_err());

        let dsso = Crosslinker::named("dsso").unwrap();
        assert!(dsso.has_stubs());
        let total = dsso.cleavage_stubs[0].mass + dsso.cleavage_stubs[1].mass;
        assert!((total - dsso.mass).abs() < 1e-6);
    }

    #[test]
    fn test_bad_tolerance() {
        let result: Result<CanonicalConfig, _> = serde_json::from_str(r#"{"ms2_tol": "twenty"}"#);
        assert!(result.is_err());
    }
}
