//! Fragment annotation of linear, crosslinked and non-covalently associated
//! peptide spectra.
//!
//! An [`Annotator`] takes an annotation request document in either the legacy
//! or the structured dialect, drives an [`AnnotationEngine`] through peptide
//! registration, isotope cluster detection, fragmentation and matching, and
//! returns the request with its `peaks`, `clusters`, `fragments` and
//! annotation blocks filled in.
pub mod api;
pub mod codec;
pub mod composition;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod fragments;
pub mod peptide;
pub mod precursor;
pub mod request;
pub mod response;
pub mod spectrum;

pub use crate::api::Annotator;
pub use crate::codec::ModSyntax;
pub use crate::config::{CanonicalConfig, CleavageStub, Crosslinker, Loss, Modification};
pub use crate::dialect::{normalize, AnnotationMode, NormalizedRequest};
pub use crate::engine::{AnnotationEngine, PeptideDatabase, ReferenceEngine};
pub use crate::error::{AnnotationError, ErrorKind};
pub use crate::response::error_envelope;
