//! Fail-closed fetching and assembly of snapshot artifact parts.
//!
//! The pipeline takes a manifest that already passed checksum and signature
//! checks and drives each declared part through
//! `Pending -> Fetched -> HashVerified -> Decompressed -> Assembled`.
//!
//! - The SHA-256 and size of a part are checked on the bytes exactly as the
//!   transport delivered them, before decompression.
//! - Parts are processed concurrently but written strictly in declared order.
//! - Any failure rejects the whole artifact. Parts after the failing one are
//!   never written.
//!
//! Transport and storage are collaborators behind [`PartFetcher`] and
//! [`PartSink`]. Retries and timeouts are theirs to own.
//!
//! # Example
//!
//! ```no_run
//! use snapman_fetch::{ArtifactPipeline, FsSink, PipelineOptions, ReqwestFetcher};
//! use snapman_manifest::{Manifest, TrustPolicy, verify_manifest};
//!
//! # async fn run(json: &str, policy: TrustPolicy) -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::from_json(json)?;
//! let verified = verify_manifest(&manifest, &policy)?;
//!
//! let pipeline = ArtifactPipeline::new(ReqwestFetcher::new()?, FsSink::new("/var/lib/node"))
//!     .with_options(PipelineOptions::default().concurrency(8));
//! let artifact = pipeline.run(&verified).await?;
//! println!("assembled {} bytes", artifact.total_assembled_bytes());
//! # Ok(())
//! # }
//! ```

mod codec;
mod data;
mod effects;
mod error;
mod pipeline;

pub use codec::{Codec, CodecError, decompress};
pub use data::{AssembledArtifact, AssembledPart, PartProgress, PartState, PipelineOptions, ProgressFn};
#[cfg(feature = "reqwest")]
pub use effects::ReqwestFetcher;
pub use effects::{BoxStream, FsSink, MemorySink, PartFetcher, PartSink, SinkError};
pub use error::{BoxError, Error, Result};
pub use pipeline::ArtifactPipeline;
