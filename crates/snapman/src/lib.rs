//! Signed snapshot manifests and fail-closed artifact assembly.
//!
//! A producer builds a [`Manifest`], then [`Manifest::sign_with`] seals it and
//! appends a signature for each signer. A consumer calls
//! [`verify_and_assemble`], which:
//!
//! 1. recomputes the canonical encoding and checks `checks.manifestSha256`;
//! 2. requires `k` distinct trusted signers over those same bytes;
//! 3. only then fetches every part, checks size and SHA-256 on the bytes as
//!    delivered, decompresses, and writes parts in declared order.
//!
//! The first failure is returned and nothing is exposed as partially trusted.
//!
//! The building blocks are re-exported as [`verify`], [`manifest`] and
//! [`fetch`].

pub use snapman_fetch as fetch;
pub use snapman_manifest as manifest;
pub use snapman_verify as verify;

#[cfg(feature = "reqwest")]
pub use snapman_fetch::ReqwestFetcher;
pub use snapman_fetch::{
    ArtifactPipeline, AssembledArtifact, AssembledPart, Error, FsSink, MemorySink, PartFetcher,
    PartProgress, PartSink, PartState, PipelineOptions, Result,
};
pub use snapman_manifest::{
    Manifest, SigningKey, TrustPolicy, TrustReport, VerifiedManifest, VerifyingKey, verify_manifest,
};
pub use snapman_verify::{Hash256, digest};

/// Verify a manifest against `policy` and, only if it is trusted, assemble
/// its artifact through `fetcher` into `sink`.
///
/// No part is requested when the checksum or the signature threshold fails.
pub async fn verify_and_assemble<F, S>(
    manifest: &Manifest,
    policy: &TrustPolicy,
    fetcher: F,
    sink: S,
    options: PipelineOptions,
) -> Result<AssembledArtifact>
where
    F: PartFetcher,
    S: PartSink,
{
    let verified = verify_manifest(manifest, policy)?;
    tracing::info!(
        chain = %manifest.chain,
        height = manifest.height,
        checksum = %verified.checksum(),
        signers = verified.report().valid(),
        "manifest trusted"
    );

    ArtifactPipeline::new(fetcher, sink).with_options(options).run(&verified).await
}
