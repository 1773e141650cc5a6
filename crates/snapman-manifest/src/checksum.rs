use snapman_verify::{Hash256, digest};

use crate::canonical::encode;
use crate::model::Manifest;
use crate::{Error, Result};

/// `ManifestSha256 = digest(encode(manifest))`.
pub fn manifest_sha256(manifest: &Manifest) -> Result<Hash256> { Ok(digest(&encode(manifest)?)) }

impl Manifest {
    /// Compute the manifest checksum and store it in `checks.manifestSha256`.
    pub fn seal(&mut self) -> Result<Hash256> {
        let sum = manifest_sha256(self)?;
        self.checks.manifest_sha256 = sum.to_hex();
        Ok(sum)
    }

    /// Recompute the checksum and compare it with the declared one.
    pub fn verify_checksum(&self) -> Result<Hash256> {
        let computed = manifest_sha256(self)?;
        if computed.matches_hex(&self.checks.manifest_sha256) {
            Ok(computed)
        } else {
            Err(Error::ChecksumMismatch {
                declared: self.checks.manifest_sha256.clone(),
                computed: computed.to_hex(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_manifest;

    #[test]
    fn test_seal_then_verify() {
        let mut m = sample_manifest();
        let sum = m.seal().unwrap();
        assert_eq!(m.checks.manifest_sha256, sum.to_hex());
        assert_eq!(m.verify_checksum().unwrap(), sum);
    }

    #[test]
    fn test_declared_checksum_compare_ignores_case() {
        let mut m = sample_manifest();
        m.seal().unwrap();
        m.checks.manifest_sha256 = m.checks.manifest_sha256.to_uppercase();
        m.verify_checksum().unwrap();
    }

    #[test]
    fn test_unsealed_manifest_fails() {
        let m = sample_manifest();
        match m.verify_checksum() {
            Err(Error::ChecksumMismatch { declared, computed }) => {
                assert!(declared.is_empty());
                assert_eq!(computed.len(), 64);
            }
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_edit_after_seal_is_detected() {
        let mut m = sample_manifest();
        m.seal().unwrap();
        m.height += 1;
        assert!(matches!(m.verify_checksum(), Err(Error::ChecksumMismatch { .. })));
    }
}
