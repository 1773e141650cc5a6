use std::fmt;
use std::str::FromStr;

use crate::{Result, VerificationError};

/// A SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const LEN: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String { hex::encode(self.0) }

    /// Parse 64 hex characters, either case, no prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != Self::LEN * 2 {
            return Err(VerificationError::InvalidHex {
                value:  s.to_string(),
                reason: "expected 64 hex characters",
            });
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|_| VerificationError::InvalidHex {
            value:  s.to_string(),
            reason: "non-hex character",
        })?;
        Ok(Self(out))
    }

    /// Compare against a declared hex digest, ignoring case.
    ///
    /// A malformed declaration never matches.
    pub fn matches_hex(&self, declared: &str) -> bool {
        Self::from_hex(declared).is_ok_and(|d| d == *self)
    }
}

impl FromStr for Hash256 {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self> { Self::from_hex(s.trim()) }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_hex()) }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Hash256({})", self.to_hex()) }
}

/// `digest(bytes) -> Hash256`.
pub fn digest(data: &[u8]) -> Hash256 { crate::Sha256Hasher::digest(data) }
