//! Transport and storage collaborators.
//!
//! The pipeline only sees these traits. Retries, timeouts and backoff belong
//! to the implementations, never to the pipeline.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::Stream;

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Delivers the raw bytes stored at a part's URL.
pub trait PartFetcher: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn stream(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<BoxStream<'static, Result<Bytes, Self::Error>>, Self::Error>> + Send;
}

/// Receives assembled part bytes at their relative manifest path.
pub trait PartSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn write(&self, path: &str, bytes: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl<T: PartSink> PartSink for &T {
    type Error = T::Error;

    fn write(&self, path: &str, bytes: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).write(path, bytes)
    }
}

impl<T: PartFetcher> PartFetcher for &T {
    type Error = T::Error;

    fn stream(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<BoxStream<'static, Result<Bytes, Self::Error>>, Self::Error>> + Send {
        (**self).stream(url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("path '{path}' escapes the output root")]
    UnsafePath { path: String },

    #[error("failed to write '{path}': {source}")]
    Write {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes parts under a root directory.
///
/// Each write goes to a temporary sibling first and is renamed into place, so
/// a path is either absent, a previous complete write, or the new one.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    /// Resolve a manifest path under the root, refusing anything that could
    /// land outside it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SinkError> {
        let unsafe_path = || SinkError::UnsafePath { path: path.to_string() };
        if path.is_empty() || path.contains('\0') {
            return Err(unsafe_path());
        }
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_path());
                }
            }
        }
        if resolved == self.root {
            return Err(unsafe_path());
        }
        Ok(resolved)
    }
}

impl PartSink for FsSink {
    type Error = SinkError;

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), SinkError> {
        let target = self.resolve(path)?;
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SinkError::Write { path, source }
        };

        let parent = target.parent().unwrap_or(&self.root);
        tokio::fs::create_dir_all(parent).await.map_err(write_err(parent))?;

        let tmp = parent.join(format!(".tmp.{}.snapman", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes).await.map_err(write_err(&tmp))?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(&target)(e));
        }
        Ok(())
    }
}

/// Keeps assembled parts in memory, in write order.
#[derive(Debug, Default)]
pub struct MemorySink {
    parts: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self { Self::default() }

    /// Paths in the order they were written.
    pub fn written(&self) -> Vec<String> {
        self.lock().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().iter().rev().find(|(p, _)| p == path).map(|(_, b)| b.clone())
    }

    /// Latest bytes per path.
    pub fn into_map(self) -> BTreeMap<String, Vec<u8>> {
        let parts = self.parts.into_inner().unwrap_or_else(|e| e.into_inner());
        parts.into_iter().collect()
    }

    /// All parts concatenated in write order, as a concatenated-stream layout
    /// would be consumed.
    pub fn concat(&self) -> Vec<u8> {
        self.lock().iter().flat_map(|(_, b)| b.iter().copied()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<u8>)>> {
        self.parts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PartSink for MemorySink {
    type Error = std::convert::Infallible;

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.lock().push((path.to_string(), bytes.to_vec()));
        Ok(())
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_fetcher {
    use super::*;
    use reqwest::Client;

    /// HTTP(S) transport. Non-success statuses are errors.
    pub struct ReqwestFetcher {
        client: Client,
    }

    impl ReqwestFetcher {
        pub fn new() -> Result<Self, reqwest::Error> {
            let client = Client::builder().build()?;
            Ok(Self { client })
        }

        pub fn with_client(client: Client) -> Self { Self { client } }
    }

    impl PartFetcher for ReqwestFetcher {
        type Error = reqwest::Error;

        async fn stream(
            &self,
            url: &str,
        ) -> Result<BoxStream<'static, Result<Bytes, Self::Error>>, Self::Error> {
            let response = self.client.get(url).send().await?.error_for_status()?;
            Ok(Box::pin(response.bytes_stream()))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_fetcher::ReqwestFetcher;
