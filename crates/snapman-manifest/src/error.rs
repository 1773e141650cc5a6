//! Error types for snapman-manifest.

use thiserror::Error;

use crate::trust::TrustReport;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid manifest field `{field}`: {reason}")]
    Encoding { field: String, reason: String },

    #[error("unsupported manifest schema '{0}'")]
    UnsupportedSchema(String),

    #[error("malformed signature entry #{index}: {source}")]
    MalformedSignature {
        index:  usize,
        #[source]
        source: MalformedSignature,
    },

    #[error("signature threshold not met: {valid} of {required} trusted signatures verified ({report})")]
    ThresholdNotMet {
        valid:    usize,
        required: usize,
        /// Which entries counted, failed, or were skipped.
        report:   TrustReport,
    },

    #[error("manifest checksum mismatch: declared '{declared}', computed '{computed}'")]
    ChecksumMismatch { declared: String, computed: String },

    #[error("invalid trust policy: {0}")]
    InvalidPolicy(String),

    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trust policy config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn encoding(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            field:  field.into(),
            reason: reason.into(),
        }
    }
}

/// Key or signature bytes that cannot be valid for the declared algorithm.
///
/// Distinct from a signature that is well-formed but does not verify, which
/// is an ordinary `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MalformedSignature(pub String);

pub type Result<T> = std::result::Result<T, Error>;
