//! Signed manifests for chunked, compressed node-state snapshots.
//!
//! A [`Manifest`] attests to a snapshot's roots (state root, block hash,
//! transaction and receipt roots) and describes how the artifact is laid out
//! in parts. Producers seal and sign it; consumers verify it before touching
//! any part.
//!
//! # Flow
//!
//! - [`encode`] - canonical bytes of everything except `checks` and `signatures`
//! - [`manifest_sha256`] / [`Manifest::seal`] - the declared checksum
//! - [`sign`] / [`Manifest::sign_with`] - Ed25519 over the canonical bytes
//! - [`verify`] - one signature, `Ok(false)` on mismatch, `Err` on malformed input
//! - [`verify_manifest`] - checksum plus `k`-of-`n` distinct trusted signers,
//!   yielding a [`VerifiedManifest`]
//!
//! # Example
//!
//! ```
//! use snapman_manifest::{Manifest, SigningKey, TrustPolicy, verify_manifest};
//!
//! # fn main() -> snapman_manifest::Result<()> {
//! # let json = r#"{
//! #   "schema": "snapman/v1", "chain": "mainnet",
//! #   "client": {"name": "node", "version": "1.0.0", "flags": []},
//! #   "height": 100, "timestamp": "2024-05-01T12:00:00Z",
//! #   "roots": {
//! #     "stateRoot": "1111111111111111111111111111111111111111111111111111111111111111",
//! #     "blockHash": "2222222222222222222222222222222222222222222222222222222222222222",
//! #     "txRoot": "3333333333333333333333333333333333333333333333333333333333333333",
//! #     "receiptsRoot": "4444444444444444444444444444444444444444444444444444444444444444"
//! #   },
//! #   "artifact": {"layout": "raw", "compress": {"algo": "none", "chunkSize": ""}, "parts": []}
//! # }"#;
//! let mut manifest = Manifest::from_json(json)?;
//! let key = SigningKey::from_bytes(&[7u8; 32]);
//! manifest.sign_with(&key)?;
//!
//! let policy = TrustPolicy::new([key.verifying_key()], 1)?;
//! let verified = verify_manifest(&manifest, &policy)?;
//! assert_eq!(verified.report().valid(), 1);
//! # Ok(())
//! # }
//! ```

mod canonical;
mod checksum;
mod error;
mod model;
mod sign;
mod trust;
mod validate;

pub use canonical::encode;
pub use checksum::manifest_sha256;
pub use error::{Error, MalformedSignature, Result};
pub use model::{Artifact, Checks, Client, Compress, Manifest, Part, Roots, SCHEMA_V1, Sig};
pub use sign::{SignatureAlgorithm, decode_public_key, decode_text, encode_public_key, sign, verify};
pub use trust::{
    TrustPolicy, TrustPolicyConfig, TrustReport, VerifiedManifest, evaluate_signatures,
    verify_manifest,
};

pub use ed25519_dalek::{SigningKey, VerifyingKey};
