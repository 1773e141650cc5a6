//! Digest primitives for snapshot manifests and artifact parts.
//!
//! Two inputs are ever hashed with these types, and they must never be
//! confused:
//!
//! - the canonical encoding of a manifest (without signatures), which yields
//!   `checks.manifestSha256`;
//! - the exact bytes a transport delivered for one part, before any
//!   decompression, which yield `parts[i].sha256`.
//!
//! Comparison against declared hex is case-insensitive. A mismatch is a
//! terminal verification failure, never something to retry here.
//!
//! # Example
//!
//! ```
//! use snapman_verify::{Hasher, Sha256Hasher, digest};
//!
//! let mut hasher = Sha256Hasher::new();
//! hasher.update(b"A");
//! hasher.update(b"A");
//!
//! let h = hasher.finish();
//! assert_eq!(h, digest(b"AA"));
//! assert!(h.matches_hex("58BB119C35513A451D24DC20EF0E9031EC85B35BFC919D263E7E5D9868909CB5"));
//! ```

pub use self::error::{Result, VerificationError};
pub use self::hash::{Hash256, digest};
pub use self::hasher::{Hasher, Sha256Hasher};

mod error;
mod hash;
mod hasher;
