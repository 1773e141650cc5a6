//! Manifest document model.
//!
//! Field names follow the exchanged JSON document. The model is a plain value:
//! it is built by a producer, sealed, signed, and from then on only read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// The only schema whose canonical form this crate knows how to produce.
pub const SCHEMA_V1: &str = "snapman/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema:   String,
    pub chain:    String,
    pub client:   Client,
    pub height:   i64,
    #[serde(rename = "timestamp")]
    pub time:     DateTime<Utc>,
    pub roots:    Roots,
    pub artifact: Artifact,
    #[serde(default)]
    pub checks:   Checks,
    #[serde(rename = "signatures", default)]
    pub sigs:     Vec<Sig>,
}

/// Producer identity. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name:    String,
    pub version: String,
    #[serde(default)]
    pub flags:   Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roots {
    pub state_root:    String,
    pub block_hash:    String,
    pub tx_root:       String,
    pub receipts_root: String,
}

impl Roots {
    pub(crate) fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("stateRoot", &self.state_root),
            ("blockHash", &self.block_hash),
            ("txRoot", &self.tx_root),
            ("receiptsRoot", &self.receipts_root),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub layout:   String,
    pub compress: Compress,
    /// Assembly order is the order of this list.
    pub parts:    Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compress {
    pub algo:       String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dict:       Option<String>,
    #[serde(rename = "chunkSize", default)]
    pub chunk_size: String,
}

impl Compress {
    /// The dictionary reference, treating an empty string as absent.
    pub fn dictionary(&self) -> Option<&str> { self.dict.as_deref().filter(|d| !d.is_empty()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Relative output location.
    pub path:   String,
    /// Length of the part as fetched, before decompression.
    pub size:   u64,
    /// Hex SHA-256 of the part as fetched, before decompression.
    pub sha256: String,
    pub url:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checks {
    #[serde(default)]
    pub manifest_sha256: String,
}

/// One signature over the canonical encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sig {
    pub alg: String,
    #[serde(rename = "pub")]
    pub public_key: String,
    pub sig: String,
}

impl Manifest {
    pub fn from_json(s: &str) -> Result<Self> { Ok(serde_json::from_str(s)?) }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> { Ok(serde_json::from_slice(bytes)?) }

    /// Human-oriented rendering. Not the signed form; see [`crate::encode`].
    pub fn to_json_pretty(&self) -> Result<String> { Ok(serde_json::to_string_pretty(self)?) }
}
