use std::error::Error as _;

use thiserror::Error;

/// Broad classes of annotation failures, used by the service boundary to
/// decide how to render them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request is malformed or inconsistent
    Request,
    /// A value that must exist after building the peptide database or the
    /// enriched spectrum could not be found
    Lookup,
    /// The computation engine reported a failure of its own
    Engine,
}

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Malformed annotation request: {0}")]
    MalformedRequest(
        #[source]
        #[from]
        serde_json::Error,
    ),
    #[error("The annotation block is missing the {0} field")]
    MissingAnnotationField(&'static str),
    #[error("Unsupported number of peptides given: {0}")]
    UnsupportedPeptideCount(usize),
    #[error("Two peptides require a LinkSite entry for each peptide, found {0}")]
    MissingLinkSites(usize),
    #[error("Invalid link sites {0} and {1}: use -1 for both or a residue position for both")]
    InvalidLinkSites(i64, i64),
    #[error("Link site {site} is outside of peptide {peptide} of length {length}")]
    LinkSiteOutOfBounds {
        peptide: usize,
        site: i64,
        length: usize,
    },
    #[error("2 peptides with crosslink positions defined but no crosslinker")]
    MissingCrosslinker,
    #[error("More than 1 crosslinker in config without defined crosslinkerID")]
    AmbiguousCrosslinker,
    #[error("crosslinkerID {0} does not refer to one of the {1} configured crosslinkers")]
    CrosslinkerOutOfRange(i64, usize),
    #[error("Unknown crosslinker {0}")]
    UnknownCrosslinker(String),
    #[error("Crosslinker stub {0} not in expected format [name]:[mass]:[pairs with]")]
    MalformedStub(String),
    #[error("Unknown modification syntax {0}, expected modX or Xmod")]
    UnknownModSyntax(String),
    #[error("Could not parse tolerance {0:?}")]
    MalformedTolerance(String),
    #[error("Could not parse chemical composition {0:?}")]
    MalformedComposition(String),
    #[error("{0} must define either a mass or a composition")]
    MissingMass(String),
    #[error("Unknown modification {0:?} in peptide {1}")]
    UnknownModification(String, String),
    #[error("Unknown amino acid {0:?} in peptide {1}")]
    UnknownResidue(char, String),
    #[error("Modification position {position} is outside of peptide {sequence}")]
    ModificationPositionOutOfBounds { sequence: String, position: i64 },
    #[error("Peptide {0} has {1} modification ids but {2} modification positions")]
    MisalignedModifications(String, usize, usize),
    #[error("Unknown ion type {0:?}")]
    UnknownIonType(String),
    #[error("Precursor charge must be positive, got {0}")]
    InvalidPrecursorCharge(i32),
    #[error("Peptide {0} could not be found in the peptide database")]
    PeptideNotFound(String),
    #[error("Isotope cluster {0} has no member peaks")]
    EmptyCluster(usize),
    #[error("Fragment range {start}..{end} exceeds peptide {peptide} of length {length}")]
    RangeOutOfBounds {
        peptide: usize,
        start: usize,
        end: usize,
        length: usize,
    },
    #[error("Peptide index {0} is not in the peptide database")]
    PeptideIndexOutOfRange(usize),
    #[error("The annotation engine failed: {0}")]
    Engine(String),
}

impl AnnotationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PeptideNotFound(_)
            | Self::EmptyCluster(_)
            | Self::RangeOutOfBounds { .. }
            | Self::PeptideIndexOutOfRange(_) => ErrorKind::Lookup,
            Self::Engine(_) => ErrorKind::Engine,
            _ => ErrorKind::Request,
        }
    }

    /// Render the error message followed by its chain of causes, one per line.
    pub fn trace(&self) -> String {
        let mut buffer = format!("{self}");
        let mut source = self.source();
        while let Some(cause) = source {
            buffer.push_str("\nCaused by: ");
            buffer.push_str(&cause.to_string());
            source = cause.source();
        }
        buffer
    }
}
