//! Error types for the decode/derive core.
//!
//! Individual tokens or rows that fail to parse are not errors: decoders
//! skip them and keep going. The variants here cover whole-input failures
//! and misuse of the motif and derivation APIs.

use thiserror::Error;

/// A decoder found no usable note in otherwise-present input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no valid notes found in `{source_name}`")]
    NoNotes { source_name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MotifError {
    #[error("cannot extract motifs from a melody with no notes")]
    EmptyMelody,
    #[error("motif stride must be at least 1")]
    ZeroStride,
    #[error("minimum motif length must be at least 1")]
    ZeroMinLength,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeriveError {
    #[error("cannot derive a record from a melody with no notes")]
    EmptyMelody,
}

/// A pitch spelling that maps to no chromatic index.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized pitch spelling `{spelling}`")]
pub struct PitchParseError {
    pub spelling: String,
}

impl PitchParseError {
    pub(crate) fn new(spelling: &str) -> Self {
        Self {
            spelling: spelling.to_string(),
        }
    }
}
