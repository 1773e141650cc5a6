//! Error types for snapman-fetch.

use thiserror::Error;

use crate::codec::CodecError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every variant is terminal for the whole artifact.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Manifest(#[from] snapman_manifest::Error),

    #[error("part {part}: hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        part:     usize,
        expected: String,
        actual:   String,
    },

    #[error("part {part}: size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { part: usize, expected: u64, actual: u64 },

    #[error("part {part}: decompression failed: {source}")]
    Decompression {
        part:   usize,
        #[source]
        source: CodecError,
    },

    #[error("artifact compression: {0}")]
    Codec(#[from] CodecError),

    #[error("part {part}: fetch from '{url}' failed: {source}")]
    Fetch {
        part:   usize,
        url:    String,
        #[source]
        source: BoxError,
    },

    #[error("part {part}: write to '{path}' failed: {source}")]
    Store {
        part:   usize,
        path:   String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Index of the part that failed, if the failure belongs to one part.
    pub fn part(&self) -> Option<usize> {
        match self {
            Error::HashMismatch { part, .. }
            | Error::SizeMismatch { part, .. }
            | Error::Decompression { part, .. }
            | Error::Fetch { part, .. }
            | Error::Store { part, .. } => Some(*part),
            Error::Manifest(_) | Error::Codec(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
