//! Re-identification of the request's peptides in the engine's peptide database.
use tracing::debug;

use crate::codec::ModSyntax;
use crate::config::CanonicalConfig;
use crate::engine::{AnnotationEngine, PeptideDatabase};
use crate::error::AnnotationError;
use crate::request::PeptideInput;

/// Write a peptide as a `modX` modified sequence, each modification id
/// directly before the residue it modifies.
pub fn encode_peptide(peptide: &PeptideInput) -> Result<String, AnnotationError> {
    match peptide {
        PeptideInput::Residues { sequence } => Ok(sequence
            .iter()
            .map(|residue| format!("{}{}", residue.modification, residue.amino_acid))
            .collect()),
        PeptideInput::Positional {
            base_sequence,
            modification_ids,
            modification_positions,
        } => {
            if modification_ids.len() != modification_positions.len() {
                return Err(AnnotationError::MisalignedModifications(
                    base_sequence.clone(),
                    modification_ids.len(),
                    modification_positions.len(),
                ));
            }
            let length = base_sequence.chars().count();
            let mut prefixes = vec![String::new(); length];
            for (id, position) in modification_ids.iter().zip(modification_positions.iter()) {
                let slot = usize::try_from(*position)
                    .ok()
                    .and_then(|i| prefixes.get_mut(i))
                    .ok_or_else(|| AnnotationError::ModificationPositionOutOfBounds {
                        sequence: base_sequence.clone(),
                        position: *position,
                    })?;
                slot.push_str(id);
            }
            Ok(prefixes
                .into_iter()
                .zip(base_sequence.chars())
                .map(|(prefix, residue)| format!("{prefix}{residue}"))
                .collect())
        }
    }
}

/// The peptide database of one request together with the database index of
/// every request peptide, in request order.
#[derive(Debug)]
pub struct ResolvedPeptides<D> {
    pub database: D,
    pub indices: Vec<usize>,
}

impl<D: PeptideDatabase> ResolvedPeptides<D> {
    /// The sum of the neutral masses of the request's peptides
    pub fn total_mass(&self) -> Result<f64, AnnotationError> {
        self.indices
            .iter()
            .map(|i| self.database.mass(*i))
            .sum()
    }

    /// Each request peptide rendered in `syntax`
    pub fn sequences(&self, syntax: ModSyntax) -> Result<Vec<String>, AnnotationError> {
        self.indices
            .iter()
            .map(|i| self.database.sequence(*i, syntax))
            .collect()
    }

    pub fn pair(&self) -> Result<[usize; 2], AnnotationError> {
        match self.indices.as_slice() {
            [first, second] => Ok([*first, *second]),
            other => Err(AnnotationError::UnsupportedPeptideCount(other.len())),
        }
    }
}

/// Register the request peptides with `engine` and find each one again in the
/// resulting database.
pub fn resolve_peptides<E: AnnotationEngine>(
    engine: &E,
    config: &CanonicalConfig,
    peptides: &[PeptideInput],
) -> Result<ResolvedPeptides<E::Database>, AnnotationError> {
    let encoded = peptides
        .iter()
        .map(encode_peptide)
        .collect::<Result<Vec<_>, _>>()?;
    let database = engine.build_database(config, &encoded)?;
    let registered = (0..database.peptide_count())
        .map(|i| database.sequence(i, ModSyntax::ModX))
        .collect::<Result<Vec<_>, _>>()?;

    let indices = encoded
        .iter()
        .map(|sequence| {
            registered
                .iter()
                .position(|s| s == sequence)
                .ok_or_else(|| AnnotationError::PeptideNotFound(sequence.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Resolved peptides {encoded:?} to database entries {indices:?}");
    Ok(ResolvedPeptides { database, indices })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Modification, ModificationConfig};
    use crate::engine::ReferenceEngine;
    use crate::request::ResidueInput;

    fn positional(sequence: &str, ids: &[&str], positions: &[i64]) -> PeptideInput {
        PeptideInput::Positional {
            base_sequence: sequence.to_string(),
            modification_ids: ids.iter().map(|s| s.to_string()).collect(),
            modification_positions: positions.to_vec(),
        }
    }

    fn config() -> CanonicalConfig {
        CanonicalConfig {
            modification: ModificationConfig {
                modifications: vec![Modification {
                    name: "cm".into(),
                    specificity: vec!["C".into()],
                    mass: 57.0215,
                }],
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_encode() {
        let residues = PeptideInput::Residues {
            sequence: vec![
                ResidueInput {
                    amino_acid: "N".into(),
                    modification: String::new(),
                },
                ResidueInput {
                    amino_acid: "C".into(),
                    modification: "cm".into(),
                },
            ],
        };
        assert_eq!(encode_peptide(&residues).unwrap(), "NcmC");
        assert_eq!(encode_peptide(&positional("NCE", &["cm"], &[1])).unwrap(), "NcmCE");
        assert_eq!(encode_peptide(&positional("NCE", &[], &[])).unwrap(), "NCE");
    }

    #[test]
    fn test_encode_errors() {
        assert!(matches!(
            encode_peptide(&positional("NCE", &["cm"], &[])),
            Err(AnnotationError::MisalignedModifications(_, 1, 0))
        ));
        assert!(matches!(
            encode_peptide(&positional("NCE", &["cm"], &[3])),
            Err(AnnotationError::ModificationPositionOutOfBounds { position: 3, .. })
        ));
        assert!(matches!(
            encode_peptide(&positional("NCE", &["cm"], &[-1])),
            Err(AnnotationError::ModificationPositionOutOfBounds { position: -1, .. })
        ));
    }

    #[test]
    fn test_resolve_repeated_peptide() {
        let peptides = vec![positional("NCE", &["cm"], &[1]), positional("NCE", &["cm"], &[1])];
        let resolved = resolve_peptides(&ReferenceEngine::new(), &config(), &peptides).unwrap();
        assert_eq!(resolved.database.peptide_count(), 1);
        assert_eq!(resolved.indices, vec![0, 0]);
        assert_eq!(resolved.pair().unwrap(), [0, 0]);
        assert_eq!(
            resolved.sequences(ModSyntax::XMod).unwrap(),
            vec!["NCcmE".to_string(), "NCcmE".to_string()]
        );
    }

    #[test]
    fn test_resolve_order() {
        let peptides = vec![positional("KMR", &[], &[]), positional("AKT", &[], &[])];
        let resolved = resolve_peptides(&ReferenceEngine::new(), &config(), &peptides).unwrap();
        assert_eq!(resolved.indices, vec![0, 1]);
        let total = resolved.total_mass().unwrap();
        let expected = resolved.database.mass(0).unwrap() + resolved.database.mass(1).unwrap();
        assert_eq!(total, expected);
    }
}
