//! Signing and single-signature verification over canonical bytes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use snapman_verify::digest;

use crate::canonical::encode;
use crate::error::MalformedSignature;
use crate::model::{Manifest, Sig};
use crate::Result;

/// Signature schemes a `Sig.alg` may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Ed25519,
}

impl SignatureAlgorithm {
    /// `None` for schemes this build does not know; such entries are skipped
    /// during trust evaluation rather than failing it.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ed25519" => Some(Self::Ed25519),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Ed25519 => "ed25519",
        }
    }

    pub fn public_key_len(&self) -> usize {
        match self {
            SignatureAlgorithm::Ed25519 => ed25519_dalek::PUBLIC_KEY_LENGTH,
        }
    }

    pub fn signature_len(&self) -> usize {
        match self {
            SignatureAlgorithm::Ed25519 => ed25519_dalek::SIGNATURE_LENGTH,
        }
    }
}

/// `sign(privateKey, canonicalBytes) -> SignatureBytes`.
///
/// Ed25519 is deterministic: the same key and bytes give the same signature.
pub fn sign(key: &SigningKey, canonical: &[u8]) -> [u8; 64] { key.sign(canonical).to_bytes() }

/// `verify(publicKey, canonicalBytes, signatureBytes) -> bool`.
///
/// A well-formed signature that does not match is `Ok(false)`. Key or
/// signature bytes of the wrong length, a key that is not a curve point, or a
/// small-order key are `Err`. Verification is strict, so non-canonical
/// signature encodings do not verify.
pub fn verify(
    public_key: &[u8],
    canonical: &[u8],
    signature: &[u8],
) -> std::result::Result<bool, MalformedSignature> {
    let key = verifying_key_from_bytes(public_key)?;
    let signature: [u8; 64] = signature.try_into().map_err(|_| {
        MalformedSignature(format!(
            "signature is {} bytes, ed25519 requires {}",
            signature.len(),
            ed25519_dalek::SIGNATURE_LENGTH
        ))
    })?;
    Ok(key.verify_strict(canonical, &Signature::from_bytes(&signature)).is_ok())
}

pub(crate) fn verifying_key_from_bytes(
    bytes: &[u8],
) -> std::result::Result<VerifyingKey, MalformedSignature> {
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        MalformedSignature(format!(
            "public key is {} bytes, ed25519 requires {}",
            bytes.len(),
            ed25519_dalek::PUBLIC_KEY_LENGTH
        ))
    })?;
    let key = VerifyingKey::from_bytes(&bytes)
        .map_err(|_| MalformedSignature("public key is not a valid curve point".into()))?;
    if key.is_weak() {
        return Err(MalformedSignature("public key has small order".into()));
    }
    Ok(key)
}

/// Decode a text-encoded key or signature of a known byte length.
///
/// Hex and standard base64 never produce the same length for the sizes used
/// here, so the length of the text picks the decoder.
pub fn decode_text(
    text: &str,
    expected_len: usize,
    what: &str,
) -> std::result::Result<Vec<u8>, MalformedSignature> {
    let text = text.trim();
    let bytes = if text.len() == expected_len * 2 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        hex::decode(text).map_err(|e| MalformedSignature(format!("invalid hex {what}: {e}")))?
    } else {
        B64.decode(text)
            .map_err(|e| MalformedSignature(format!("{what} is neither hex nor base64: {e}")))?
    };
    if bytes.len() != expected_len {
        return Err(MalformedSignature(format!(
            "{what} decodes to {} bytes, expected {expected_len}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Decode a hex or base64 Ed25519 public key.
pub fn decode_public_key(text: &str) -> std::result::Result<VerifyingKey, MalformedSignature> {
    let bytes = decode_text(text, ed25519_dalek::PUBLIC_KEY_LENGTH, "public key")?;
    verifying_key_from_bytes(&bytes)
}

pub fn encode_public_key(key: &VerifyingKey) -> String { hex::encode(key.as_bytes()) }

impl Sig {
    pub fn ed25519(key: &VerifyingKey, signature: &[u8; 64]) -> Self {
        Self {
            alg:        SignatureAlgorithm::Ed25519.as_str().to_string(),
            public_key: encode_public_key(key),
            sig:        B64.encode(signature),
        }
    }
}

impl Manifest {
    /// Recompute and store `checks.manifestSha256` (every call, not only the
    /// first), sign the canonical bytes and append the signature.
    ///
    /// Existing signatures stay valid: neither `checks` nor `signatures` are
    /// part of what is signed.
    pub fn sign_with(&mut self, key: &SigningKey) -> Result<&Sig> {
        let canonical = encode(self)?;
        self.checks.manifest_sha256 = digest(&canonical).to_hex();

        let sig = Sig::ed25519(&key.verifying_key(), &sign(key, &canonical));
        tracing::debug!(signer = %sig.public_key, height = self.height, "signed manifest");
        self.sigs.push(sig);
        Ok(&self.sigs[self.sigs.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_manifest, signing_key};

    #[test]
    fn test_algorithm_names() {
        assert_eq!(SignatureAlgorithm::from_name("ed25519"), Some(SignatureAlgorithm::Ed25519));
        assert_eq!(SignatureAlgorithm::from_name("ecdsa-p256"), None);
        assert_eq!(SignatureAlgorithm::Ed25519.as_str(), "ed25519");
        assert_eq!(SignatureAlgorithm::Ed25519.public_key_len(), 32);
        assert_eq!(SignatureAlgorithm::Ed25519.signature_len(), 64);
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let key = signing_key(1);
        let canonical = encode(&sample_manifest()).unwrap();
        let sig = sign(&key, &canonical);
        assert!(verify(key.verifying_key().as_bytes(), &canonical, &sig).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = signing_key(1);
        assert_eq!(sign(&key, b"payload"), sign(&key, b"payload"));
    }

    #[test]
    fn test_wrong_key_or_message_is_false_not_error() {
        let canonical = encode(&sample_manifest()).unwrap();
        let sig = sign(&signing_key(1), &canonical);

        assert!(!verify(signing_key(2).verifying_key().as_bytes(), &canonical, &sig).unwrap());
        assert!(!verify(signing_key(1).verifying_key().as_bytes(), b"other", &sig).unwrap());
    }

    #[test]
    fn test_wrong_lengths_are_malformed() {
        let key = signing_key(1);
        let sig = sign(&key, b"m");
        assert!(verify(&key.verifying_key().as_bytes()[..31], b"m", &sig).is_err());
        assert!(verify(key.verifying_key().as_bytes(), b"m", &sig[..63]).is_err());
    }

    #[test]
    fn test_small_order_key_is_malformed() {
        // The identity point encodes as 0x01 followed by zeros.
        let mut identity = [0u8; 32];
        identity[0] = 1;
        let err = verify(&identity, b"m", &[0u8; 64]).unwrap_err();
        assert!(err.0.contains("small order"));
    }

    #[test]
    fn test_decode_text_accepts_hex_and_base64() {
        let key = signing_key(3).verifying_key();
        let hex_text = hex::encode(key.as_bytes());
        let b64_text = B64.encode(key.as_bytes());

        assert_eq!(decode_public_key(&hex_text).unwrap(), key);
        assert_eq!(decode_public_key(&hex_text.to_uppercase()).unwrap(), key);
        assert_eq!(decode_public_key(&b64_text).unwrap(), key);
        assert!(decode_public_key("not a key").is_err());
        assert!(decode_text(&B64.encode([0u8; 31]), 32, "public key").is_err());
    }

    #[test]
    fn test_sign_with_seals_and_appends() {
        let mut m = sample_manifest();
        let key = signing_key(7);
        let sig = m.sign_with(&key).unwrap().clone();

        assert_eq!(sig.alg, "ed25519");
        assert_eq!(sig.public_key, encode_public_key(&key.verifying_key()));
        m.verify_checksum().unwrap();

        let raw = decode_text(&sig.sig, 64, "signature").unwrap();
        assert!(verify(key.verifying_key().as_bytes(), &encode(&m).unwrap(), &raw).unwrap());

        m.sign_with(&signing_key(8)).unwrap();
        assert_eq!(m.sigs.len(), 2);
        assert_eq!(m.sigs[0], sig);
    }

    #[test]
    fn test_sign_with_reseals_after_edit() {
        let mut m = sample_manifest();
        m.sign_with(&signing_key(1)).unwrap();
        let first = m.checks.manifest_sha256.clone();

        m.height += 1;
        assert!(m.verify_checksum().is_err());

        m.sign_with(&signing_key(2)).unwrap();
        assert_ne!(m.checks.manifest_sha256, first);
        m.verify_checksum().unwrap();
    }
}
