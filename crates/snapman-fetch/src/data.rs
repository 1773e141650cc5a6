//! Data layer: part states, progress events and pipeline options.

use std::fmt;
use std::sync::Arc;

/// Where one part is in the integrity pipeline.
///
/// Parts move forward through these states in order. `Rejected` is terminal
/// and aborts the whole artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartState {
    #[default]
    Pending,
    /// Raw bytes delivered by the transport. Nothing checked yet.
    Fetched,
    /// Size and SHA-256 of the fetched bytes match the manifest.
    HashVerified,
    Decompressed,
    /// Written to its path, after every earlier part.
    Assembled,
    Rejected,
}

impl fmt::Display for PartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartState::Pending => write!(f, "Pending"),
            PartState::Fetched => write!(f, "Fetched"),
            PartState::HashVerified => write!(f, "HashVerified"),
            PartState::Decompressed => write!(f, "Decompressed"),
            PartState::Assembled => write!(f, "Assembled"),
            PartState::Rejected => write!(f, "Rejected"),
        }
    }
}

/// A state transition of one part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartProgress {
    pub index: usize,
    pub path:  String,
    pub state: PartState,
    /// Bytes held for this part in its current state: fetched length up to
    /// `HashVerified`, decompressed length afterwards.
    pub bytes: u64,
}

pub type ProgressFn = Arc<dyn Fn(&PartProgress) + Send + Sync>;

/// Options for [`crate::ArtifactPipeline`].
///
/// # Examples
///
/// ```
/// use snapman_fetch::PipelineOptions;
///
/// let options = PipelineOptions::default()
///     .concurrency(8)
///     .on_progress(|p| println!("part {} -> {}", p.index, p.state));
/// ```
#[derive(Clone)]
pub struct PipelineOptions {
    /// Parts fetched, hashed and decompressed at once. Assembly is always
    /// sequential in declared order regardless.
    ///
    /// Default: 4
    pub concurrency: usize,

    /// Resolved bytes of the dictionary named by `artifact.compress.dict`.
    ///
    /// Default: None
    pub dictionary: Option<Arc<[u8]>>,

    /// Invoked on every part state transition.
    ///
    /// Default: None
    pub on_progress: Option<ProgressFn>,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("concurrency", &self.concurrency)
            .field("dictionary", &self.dictionary.as_ref().map(|d| d.len()))
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            dictionary:  None,
            on_progress: None,
        }
    }
}

impl PipelineOptions {
    /// Values below 1 are treated as 1.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn dictionary(mut self, dictionary: impl Into<Arc<[u8]>>) -> Self {
        self.dictionary = Some(dictionary.into());
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(&PartProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

/// One part after assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPart {
    pub index:        usize,
    pub path:         String,
    pub fetched_len:  u64,
    pub assembled_len: u64,
}

/// Result of a fully assembled artifact. Only produced when every part
/// reached [`PartState::Assembled`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledArtifact {
    pub manifest_sha256: String,
    pub parts:           Vec<AssembledPart>,
}

impl AssembledArtifact {
    pub fn total_assembled_bytes(&self) -> u64 { self.parts.iter().map(|p| p.assembled_len).sum() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let o = PipelineOptions::default();
        assert_eq!(o.concurrency, 4);
        assert!(o.dictionary.is_none());
        assert!(o.on_progress.is_none());
    }

    #[test]
    fn test_concurrency_floor() {
        assert_eq!(PipelineOptions::default().concurrency(0).concurrency, 1);
    }

    #[test]
    fn test_debug_hides_dictionary_bytes() {
        let o = PipelineOptions::default().dictionary(vec![7u8; 16]);
        let debug = format!("{o:?}");
        assert!(debug.contains("Some(16)"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PartState::HashVerified.to_string(), "HashVerified");
        assert_eq!(PartState::default(), PartState::Pending);
    }
}
