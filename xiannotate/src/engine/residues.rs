use crate::codec::ModSyntax;
use crate::config::CanonicalConfig;
use crate::error::AnnotationError;

pub const WATER_MASS: f64 = 18.0105646863;

pub trait Mass {
    fn monoisotopic(&self) -> Option<f64>;
}

impl Mass for char {
    fn monoisotopic(&self) -> Option<f64> {
        let mass = match self {
            'A' => 71.03711381,
            'R' => 156.10111103,
            'N' => 114.04292744,
            'D' => 115.02694303,
            'C' => 103.00918448,
            'E' => 129.04259309,
            'Q' => 128.05857751,
            'G' => 57.02146373,
            'H' => 137.05891188,
            'I' => 113.08406401,
            'L' => 113.08406401,
            'K' => 128.09496302,
            'M' => 131.04048461,
            'F' => 147.06841391,
            'P' => 97.05276385,
            'S' => 87.03202841,
            'T' => 101.04767846,
            'W' => 186.07931300,
            'Y' => 163.06332853,
            'V' => 99.06841391,
            'U' => 150.95363559,
            'O' => 237.14772605,
            _ => return None,
        };
        Some(mass)
    }
}

/// An amino acid with an optional modification
#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub amino_acid: char,
    pub modification: Option<String>,
    pub mass: f64,
}

impl Residue {
    /// The residue token in `syntax`, e.g. `oxM` or `Mox`
    pub fn token(&self, syntax: ModSyntax) -> String {
        match (&self.modification, syntax) {
            (None, _) => self.amino_acid.to_string(),
            (Some(m), ModSyntax::ModX) => format!("{m}{}", self.amino_acid),
            (Some(m), ModSyntax::XMod) => format!("{}{m}", self.amino_acid),
        }
    }
}

/// Parse a `modX` encoded peptide, resolving modifications against `config`
pub fn parse_modx(sequence: &str, config: &CanonicalConfig) -> Result<Vec<Residue>, AnnotationError> {
    let tokens = ModSyntax::ModX.tokenize(sequence);
    let covered: usize = tokens.iter().map(|t| t.len()).sum();
    if covered != sequence.len() {
        let tail = sequence.trim_end_matches(|c: char| !c.is_ascii_uppercase());
        return Err(AnnotationError::UnknownModification(
            sequence[tail.len()..].to_string(),
            sequence.to_string(),
        ));
    }

    let mut residues = Vec::with_capacity(tokens.len());
    for token in tokens {
        let (modification, amino_acid) = token.split_at(token.len() - 1);
        let amino_acid = amino_acid.chars().next().unwrap_or_default();
        let mut mass = amino_acid
            .monoisotopic()
            .ok_or_else(|| AnnotationError::UnknownResidue(amino_acid, sequence.to_string()))?;
        let modification = if modification.is_empty() {
            None
        } else {
            let definition = config.find_modification(modification).ok_or_else(|| {
                AnnotationError::UnknownModification(modification.to_string(), sequence.to_string())
            })?;
            mass += definition.mass;
            Some(modification.to_string())
        };
        residues.push(Residue {
            amino_acid,
            modification,
            mass,
        });
    }
    Ok(residues)
}

pub fn render(residues: &[Residue], syntax: ModSyntax) -> String {
    residues.iter().map(|r| r.token(syntax)).collect()
}
