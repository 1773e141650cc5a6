use sha2::Digest;

use crate::Hash256;

/// Incremental hasher fed chunk by chunk as bytes arrive from a transport.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

pub struct Sha256Hasher {
    inner: sha2::Sha256,
    len:   u64,
}

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.len += data.len() as u64;
    }

    fn finalize(self) -> Vec<u8> { self.inner.finalize().to_vec() }
}

impl Default for Sha256Hasher {
    fn default() -> Self { Self::new() }
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self {
            inner: sha2::Sha256::new(),
            len:   0,
        }
    }

    /// Bytes hashed so far.
    pub fn bytes_hashed(&self) -> u64 { self.len }

    pub fn finish(self) -> Hash256 { Hash256(self.inner.finalize().into()) }

    pub fn digest(data: &[u8]) -> Hash256 { Hash256(sha2::Sha256::digest(data).into()) }
}
