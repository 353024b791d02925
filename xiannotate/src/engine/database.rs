use tracing::debug;

use crate::codec::ModSyntax;
use crate::config::CanonicalConfig;
use crate::error::AnnotationError;

use super::residues::{parse_modx, render, Residue, WATER_MASS};
use super::PeptideDatabase;

#[derive(Debug, Clone, PartialEq)]
pub struct DatabasePeptide {
    pub residues: Vec<Residue>,
    pub mass: f64,
}

impl DatabasePeptide {
    pub fn new(residues: Vec<Residue>) -> Self {
        let mass = residues.iter().map(|r| r.mass).sum::<f64>() + WATER_MASS;
        Self { residues, mass }
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// The peptides of a single request. Registering the same modified
/// sequence twice yields a single entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceDatabase {
    peptides: Vec<DatabasePeptide>,
}

impl ReferenceDatabase {
    pub fn build(config: &CanonicalConfig, sequences: &[String]) -> Result<Self, AnnotationError> {
        let mut peptides: Vec<DatabasePeptide> = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            let peptide = DatabasePeptide::new(parse_modx(sequence, config)?);
            if peptides.iter().any(|p| p.residues == peptide.residues) {
                debug!("{sequence} is already registered");
                continue;
            }
            peptides.push(peptide);
        }
        Ok(Self { peptides })
    }

    pub fn get(&self, index: usize) -> Result<&DatabasePeptide, AnnotationError> {
        self.peptides
            .get(index)
            .ok_or(AnnotationError::PeptideIndexOutOfRange(index))
    }

    pub fn residues(&self, index: usize) -> Result<&[Residue], AnnotationError> {
        self.get(index).map(|p| p.residues.as_slice())
    }
}

impl PeptideDatabase for ReferenceDatabase {
    fn peptide_count(&self) -> usize {
        self.peptides.len()
    }

    fn mass(&self, index: usize) -> Result<f64, AnnotationError> {
        self.get(index).map(|p| p.mass)
    }

    fn sequence(&self, index: usize, syntax: ModSyntax) -> Result<String, AnnotationError> {
        self.get(index).map(|p| render(&p.residues, syntax))
    }
}
