//! The artifact integrity pipeline.
//!
//! Each part runs `Pending -> Fetched -> HashVerified -> Decompressed` on its
//! own, up to `concurrency` parts at once. The `Assembled` step is a single
//! ordering gate: results are consumed in declared order and written one by
//! one, so part `i` is never written before parts `0..i` are. The first
//! failure drops every in-flight part and nothing after it is written.

use std::io;
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use snapman_manifest::{Part, VerifiedManifest};
use snapman_verify::{Hasher, Sha256Hasher};

use crate::codec::{Codec, CodecError};
use crate::data::{AssembledArtifact, AssembledPart, PartProgress, PartState, PipelineOptions};
use crate::effects::{PartFetcher, PartSink};
use crate::error::{BoxError, Error, Result};

/// Upper bound on the buffer reserved up front from a declared part size.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// A part that passed every per-part check and waits for its turn to be written.
struct Prepared {
    index:       usize,
    fetched_len: u64,
    bytes:       Vec<u8>,
}

pub struct ArtifactPipeline<F: PartFetcher, S: PartSink> {
    fetcher: F,
    sink:    S,
    options: PipelineOptions,
}

impl<F: PartFetcher, S: PartSink> ArtifactPipeline<F, S> {
    pub fn new(fetcher: F, sink: S) -> Self {
        Self {
            fetcher,
            sink,
            options: PipelineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions { &self.options }

    pub fn sink(&self) -> &S { &self.sink }

    /// Fetch, verify, decompress and assemble every part of a trusted manifest.
    ///
    /// Only a [`VerifiedManifest`] is accepted, so no part is ever requested
    /// for a manifest whose checksum or signature threshold failed.
    pub async fn run(&self, verified: &VerifiedManifest) -> Result<AssembledArtifact> {
        let manifest = verified.manifest();
        let compress = &manifest.artifact.compress;
        let parts = &manifest.artifact.parts;

        let codec = Codec::from_name(&compress.algo)?;
        let dictionary = self.resolve_dictionary(codec, compress.dictionary())?;

        tracing::debug!(
            parts = parts.len(),
            codec = codec.as_str(),
            concurrency = self.options.concurrency,
            "assembling artifact"
        );

        let mut prepared = stream::iter(parts.iter().enumerate())
            .map(|(index, part)| self.prepare(index, part, codec, dictionary.clone()))
            .buffered(self.options.concurrency.max(1));

        let mut assembled = Vec::with_capacity(parts.len());
        while let Some(outcome) = prepared.next().await {
            let ready = match outcome {
                Ok(ready) => ready,
                Err(e) => return Err(self.reject(parts, e)),
            };
            let part = &parts[ready.index];

            if let Err(e) = self.sink.write(&part.path, &ready.bytes).await {
                let err = Error::Store {
                    part:   ready.index,
                    path:   part.path.clone(),
                    source: Box::new(e),
                };
                return Err(self.reject(parts, err));
            }

            let assembled_len = ready.bytes.len() as u64;
            self.emit(ready.index, part, PartState::Assembled, assembled_len);
            assembled.push(AssembledPart {
                index: ready.index,
                path: part.path.clone(),
                fetched_len: ready.fetched_len,
                assembled_len,
            });
        }

        let artifact = AssembledArtifact {
            manifest_sha256: verified.checksum().to_hex(),
            parts:           assembled,
        };
        tracing::info!(
            chain = %manifest.chain,
            height = manifest.height,
            parts = artifact.parts.len(),
            bytes = artifact.total_assembled_bytes(),
            "artifact assembled"
        );
        Ok(artifact)
    }

    fn resolve_dictionary(&self, codec: Codec, named: Option<&str>) -> Result<Option<Arc<[u8]>>> {
        let Some(name) = named else {
            if self.options.dictionary.is_some() {
                tracing::debug!("manifest names no dictionary; supplied bytes are unused");
            }
            return Ok(None);
        };
        if !codec.supports_dictionary() {
            return Err(CodecError::DictionaryNotSupported(codec.as_str()).into());
        }
        match &self.options.dictionary {
            Some(bytes) => Ok(Some(Arc::clone(bytes))),
            None => Err(CodecError::MissingDictionary(name.to_string()).into()),
        }
    }

    /// Run one part up to `Decompressed`.
    async fn prepare(
        &self,
        index: usize,
        part: &Part,
        codec: Codec,
        dictionary: Option<Arc<[u8]>>,
    ) -> Result<Prepared> {
        let fetch_err = |source: BoxError| Error::Fetch {
            part: index,
            url: part.url.clone(),
            source,
        };

        let mut chunks = self
            .fetcher
            .stream(&part.url)
            .await
            .map_err(|e| fetch_err(Box::new(e)))?;

        let mut hasher = Sha256Hasher::new();
        let mut raw = Vec::with_capacity(part.size.min(MAX_PREALLOC) as usize);
        while let Some(chunk) = chunks.try_next().await.map_err(|e| fetch_err(Box::new(e)))? {
            hasher.update(&chunk);
            if hasher.bytes_hashed() > part.size {
                return Err(Error::SizeMismatch {
                    part:     index,
                    expected: part.size,
                    actual:   hasher.bytes_hashed(),
                });
            }
            raw.extend_from_slice(&chunk);
        }
        drop(chunks);

        let fetched_len = hasher.bytes_hashed();
        self.emit(index, part, PartState::Fetched, fetched_len);

        if fetched_len != part.size {
            return Err(Error::SizeMismatch {
                part:     index,
                expected: part.size,
                actual:   fetched_len,
            });
        }
        let actual = hasher.finish();
        if !actual.matches_hex(&part.sha256) {
            return Err(Error::HashMismatch {
                part:     index,
                expected: part.sha256.clone(),
                actual:   actual.to_hex(),
            });
        }
        self.emit(index, part, PartState::HashVerified, fetched_len);

        let bytes = tokio::task::spawn_blocking(move || codec.decompress(dictionary.as_deref(), &raw))
            .await
            .map_err(|join| Error::Decompression {
                part:   index,
                source: CodecError::Corrupt {
                    codec:  codec.as_str(),
                    source: io::Error::other(join),
                },
            })?
            .map_err(|source| Error::Decompression { part: index, source })?;
        self.emit(index, part, PartState::Decompressed, bytes.len() as u64);

        Ok(Prepared {
            index,
            fetched_len,
            bytes,
        })
    }

    fn reject(&self, parts: &[Part], err: Error) -> Error {
        if let Some(part) = err.part().and_then(|i| parts.get(i).map(|p| (i, p))) {
            self.emit(part.0, part.1, PartState::Rejected, 0);
        }
        tracing::warn!(part = ?err.part(), error = %err, "artifact rejected");
        err
    }

    fn emit(&self, index: usize, part: &Part, state: PartState, bytes: u64) {
        tracing::debug!(index, path = %part.path, %state, bytes, "part transition");
        if let Some(ref callback) = self.options.on_progress {
            callback(&PartProgress {
                index,
                path: part.path.clone(),
                state,
                bytes,
            });
        }
    }
}
