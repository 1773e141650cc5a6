//! Threshold trust over a manifest's signatures.
//!
//! The trusted key set and `k` are passed in explicitly; nothing here holds
//! process-wide trust state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use snapman_verify::Hash256;

use crate::canonical::encode;
use crate::error::MalformedSignature;
use crate::model::Manifest;
use crate::sign::{self, SignatureAlgorithm, decode_public_key, decode_text, encode_public_key};
use crate::{Error, Result};

/// A set of trusted public keys and the number of distinct ones that must sign.
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    keys:      BTreeMap<[u8; 32], VerifyingKey>,
    threshold: usize,
}

/// On-disk form of a [`TrustPolicy`].
///
/// ```toml
/// threshold = 2
/// keys = ["<hex or base64 ed25519 key>", "..."]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TrustPolicyConfig {
    pub threshold: usize,
    pub keys:      Vec<String>,
}

impl TrustPolicy {
    pub fn new(keys: impl IntoIterator<Item = VerifyingKey>, threshold: usize) -> Result<Self> {
        let keys: BTreeMap<[u8; 32], VerifyingKey> =
            keys.into_iter().map(|k| (k.to_bytes(), k)).collect();
        if threshold == 0 {
            return Err(Error::InvalidPolicy("threshold must be at least 1".into()));
        }
        if threshold > keys.len() {
            return Err(Error::InvalidPolicy(format!(
                "threshold {threshold} exceeds the {} distinct trusted keys",
                keys.len()
            )));
        }
        Ok(Self { keys, threshold })
    }

    pub fn from_config(config: &TrustPolicyConfig) -> Result<Self> {
        let keys = config
            .keys
            .iter()
            .enumerate()
            .map(|(i, text)| {
                decode_public_key(text)
                    .map_err(|e| Error::InvalidPolicy(format!("trusted key #{i}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(keys, config.threshold)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: TrustPolicyConfig = toml::from_str(s)?;
        Self::from_config(&config)
    }

    pub fn threshold(&self) -> usize { self.threshold }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    pub fn is_trusted(&self, key: &[u8; 32]) -> bool { self.keys.contains_key(key) }
}

/// Outcome of evaluating every signature entry against a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustReport {
    /// Hex keys of distinct trusted signers whose signature verified.
    pub signers:    Vec<String>,
    /// Entries from trusted keys whose signature did not verify.
    pub invalid:    Vec<usize>,
    /// Entries skipped: unknown algorithm or key outside the trusted set.
    pub ignored:    Vec<usize>,
    /// Valid entries from a signer already counted.
    pub duplicates: Vec<usize>,
}

impl TrustReport {
    pub fn valid(&self) -> usize { self.signers.len() }
}

impl fmt::Display for TrustReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signers {:?}, invalid entries {:?}, ignored entries {:?}, duplicate entries {:?}",
            self.signers, self.invalid, self.ignored, self.duplicates
        )
    }
}

/// Check each `Sig` against `canonical` and count distinct trusted signers.
///
/// Fails only on structurally malformed entries. Whether the threshold is met
/// is left to the caller; see [`verify_manifest`].
pub fn evaluate_signatures(
    manifest: &Manifest,
    canonical: &[u8],
    policy: &TrustPolicy,
) -> Result<TrustReport> {
    let mut report = TrustReport::default();
    let mut counted: BTreeSet<[u8; 32]> = BTreeSet::new();

    for (index, entry) in manifest.sigs.iter().enumerate() {
        let Some(alg) = SignatureAlgorithm::from_name(&entry.alg) else {
            tracing::debug!(index, alg = %entry.alg, "ignoring signature with unknown algorithm");
            report.ignored.push(index);
            continue;
        };

        let malformed = |source: MalformedSignature| Error::MalformedSignature { index, source };
        let key = decode_public_key(&entry.public_key).map_err(malformed)?;
        let raw_sig = decode_text(&entry.sig, alg.signature_len(), "signature").map_err(malformed)?;
        let key_bytes = key.to_bytes();

        if !policy.is_trusted(&key_bytes) {
            tracing::debug!(index, signer = %entry.public_key, "ignoring signature from untrusted key");
            report.ignored.push(index);
            continue;
        }

        if !sign::verify(&key_bytes, canonical, &raw_sig).map_err(malformed)? {
            tracing::warn!(index, signer = %encode_public_key(&key), "trusted signature failed to verify");
            report.invalid.push(index);
            continue;
        }

        if counted.insert(key_bytes) {
            report.signers.push(encode_public_key(&key));
        } else {
            report.duplicates.push(index);
        }
    }

    Ok(report)
}

/// A manifest whose checksum and signature threshold have both been checked.
///
/// Only [`verify_manifest`] constructs one.
#[derive(Debug, Clone)]
pub struct VerifiedManifest {
    manifest: Manifest,
    checksum: Hash256,
    report:   TrustReport,
}

impl VerifiedManifest {
    pub fn manifest(&self) -> &Manifest { &self.manifest }

    pub fn checksum(&self) -> Hash256 { self.checksum }

    pub fn report(&self) -> &TrustReport { &self.report }

    pub fn into_inner(self) -> Manifest { self.manifest }
}

/// Decide whether a manifest can be trusted.
///
/// Checks run in this order and the first failure is returned: schema and
/// structure, declared checksum against the recomputed one, then at least
/// `k` distinct trusted signers over the same canonical bytes.
pub fn verify_manifest(manifest: &Manifest, policy: &TrustPolicy) -> Result<VerifiedManifest> {
    let canonical = encode(manifest)?;

    let checksum = snapman_verify::digest(&canonical);
    if !checksum.matches_hex(&manifest.checks.manifest_sha256) {
        tracing::warn!(
            declared = %manifest.checks.manifest_sha256,
            computed = %checksum,
            "manifest checksum mismatch"
        );
        return Err(Error::ChecksumMismatch {
            declared: manifest.checks.manifest_sha256.clone(),
            computed: checksum.to_hex(),
        });
    }

    let report = evaluate_signatures(manifest, &canonical, policy)?;
    if report.valid() < policy.threshold() {
        tracing::warn!(
            valid = report.valid(),
            required = policy.threshold(),
            invalid = ?report.invalid,
            "signature threshold not met"
        );
        return Err(Error::ThresholdNotMet {
            valid: report.valid(),
            required: policy.threshold(),
            report,
        });
    }

    tracing::debug!(
        chain = %manifest.chain,
        height = manifest.height,
        signers = report.valid(),
        "manifest verified"
    );
    Ok(VerifiedManifest {
        manifest: manifest.clone(),
        checksum,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sig;
    use crate::test_support::{sample_manifest, signing_key};

    fn policy(seeds: &[u8], k: usize) -> TrustPolicy {
        TrustPolicy::new(seeds.iter().map(|s| signing_key(*s).verifying_key()), k).unwrap()
    }

    #[test]
    fn test_policy_rejects_bad_thresholds() {
        let keys = || [signing_key(1).verifying_key(), signing_key(2).verifying_key()];
        assert!(matches!(TrustPolicy::new(keys(), 0), Err(Error::InvalidPolicy(_))));
        assert!(matches!(TrustPolicy::new(keys(), 3), Err(Error::InvalidPolicy(_))));
        TrustPolicy::new(keys(), 2).unwrap();
    }

    #[test]
    fn test_policy_counts_distinct_keys() {
        let k = signing_key(1).verifying_key();
        assert!(TrustPolicy::new([k, k], 2).is_err());
    }

    #[test]
    fn test_policy_from_toml() {
        let a = hex::encode(signing_key(1).verifying_key().as_bytes());
        let b = hex::encode(signing_key(2).verifying_key().as_bytes());
        let toml = format!("threshold = 1\nkeys = [\"{a}\", \"{b}\"]\n");
        let p = TrustPolicy::from_toml_str(&toml).unwrap();
        assert_eq!(p.threshold(), 1);
        assert_eq!(p.len(), 2);

        assert!(matches!(
            TrustPolicy::from_toml_str("threshold = 1\nkeys = [\"zz\"]\n"),
            Err(Error::InvalidPolicy(_))
        ));
        assert!(matches!(TrustPolicy::from_toml_str("threshold ="), Err(Error::Config(_))));
    }

    #[test]
    fn test_two_of_three_with_one_invalid_is_trusted() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(1)).unwrap();
        m.sign_with(&signing_key(2)).unwrap();
        m.sign_with(&signing_key(3)).unwrap();
        // Corrupt the third signature while keeping it well-formed.
        let other = {
            let mut tampered = m.clone();
            tampered.chain = "othernet".into();
            tampered.sigs.clear();
            tampered.sign_with(&signing_key(3)).unwrap().sig.clone()
        };
        m.sigs[2].sig = other;

        let verified = verify_manifest(&m, &policy(&[1, 2, 3], 2)).unwrap();
        assert_eq!(verified.report().valid(), 2);
        assert_eq!(verified.report().invalid, vec![2]);

        // Down to one good signature: the failure names the bad entries.
        m.sigs[1].sig = m.sigs[2].sig.clone();
        match verify_manifest(&m, &policy(&[1, 2, 3], 2)).unwrap_err() {
            Error::ThresholdNotMet { valid, required, report } => {
                assert_eq!((valid, required), (1, 2));
                assert_eq!(report.invalid, vec![1, 2]);
                assert_eq!(report.signers, vec![encode_public_key(&signing_key(1).verifying_key())]);
            }
            other => panic!("expected threshold failure, got {other:?}"),
        }
    }

    #[test]
    fn test_one_valid_of_three_is_not_trusted() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(1)).unwrap();
        m.sign_with(&signing_key(9)).unwrap();
        let err = verify_manifest(&m, &policy(&[1, 2, 3], 2)).unwrap_err();
        assert!(matches!(
            &err,
            Error::ThresholdNotMet { valid: 1, required: 2, report }
                if report.ignored == vec![1] && report.invalid.is_empty()
        ));
        assert!(err.to_string().contains("ignored entries [1]"), "{err}");
    }

    #[test]
    fn test_duplicate_signer_counts_once() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(1)).unwrap();
        m.sign_with(&signing_key(1)).unwrap();
        let err = verify_manifest(&m, &policy(&[1, 2], 2)).unwrap_err();
        assert!(matches!(err, Error::ThresholdNotMet { valid: 1, required: 2, .. }));

        let report = evaluate_signatures(&m, &encode(&m).unwrap(), &policy(&[1, 2], 1)).unwrap();
        assert_eq!(report.duplicates, vec![1]);
    }

    #[test]
    fn test_untrusted_and_unknown_entries_are_ignored() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(9)).unwrap();
        m.sigs.push(Sig {
            alg:        "future-scheme".into(),
            public_key: "???".into(),
            sig:        "???".into(),
        });
        m.sign_with(&signing_key(1)).unwrap();

        let verified = verify_manifest(&m, &policy(&[1], 1)).unwrap();
        assert_eq!(verified.report().ignored, vec![0, 1]);
        assert_eq!(verified.report().signers.len(), 1);
    }

    #[test]
    fn test_malformed_entry_fails_fast_with_index() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(1)).unwrap();
        m.sigs.push(Sig {
            alg:        "ed25519".into(),
            public_key: m.sigs[0].public_key.clone(),
            sig:        "abcd".into(),
        });
        let err = verify_manifest(&m, &policy(&[1], 1)).unwrap_err();
        assert!(matches!(err, Error::MalformedSignature { index: 1, .. }));
    }

    #[test]
    fn test_checksum_checked_before_signatures() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(1)).unwrap();
        m.artifact.parts[0].size += 1;
        let err = verify_manifest(&m, &policy(&[1], 1)).unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_resealed_tamper_still_fails_signatures() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(1)).unwrap();
        m.artifact.parts[0].url = "https://evil.example/part-0".into();
        m.seal().unwrap();
        let err = verify_manifest(&m, &policy(&[1], 1)).unwrap_err();
        assert!(matches!(
            err,
            Error::ThresholdNotMet { valid: 0, required: 1, ref report } if report.invalid == vec![0]
        ));
    }
}
