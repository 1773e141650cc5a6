//! Canonical encoding of manifest content (`snapman/v1`).
//!
//! The signed and hashed bytes are compact JSON with every object's keys in
//! byte order, integers only, and absent optionals as `null`. Hex fields are
//! lowercased and the timestamp is RFC 3339 UTC with a `Z` suffix and no
//! trailing zeros in the fraction.
//! `signatures` and `checks` are never part of the encoding.
//!
//! The writer below walks the value tree itself and sorts keys on output, so
//! the bytes do not depend on how `serde_json` orders its maps.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::model::Manifest;
use crate::{Error, Result};

/// `encode(manifest) -> bytes`.
pub fn encode(manifest: &Manifest) -> Result<Vec<u8>> {
    manifest.validate()?;
    let mut out = Vec::with_capacity(256 + manifest.artifact.parts.len() * 192);
    write_value(&mut out, &canonical_value(manifest))?;
    Ok(out)
}

fn canonical_value(m: &Manifest) -> Value {
    let parts: Vec<Value> = m
        .artifact
        .parts
        .iter()
        .map(|p| {
            json!({
                "path": p.path,
                "sha256": p.sha256.to_ascii_lowercase(),
                "size": p.size,
                "url": p.url,
            })
        })
        .collect();

    json!({
        "schema": m.schema,
        "chain": m.chain,
        "client": {
            "name": m.client.name,
            "version": m.client.version,
            "flags": m.client.flags,
        },
        "height": m.height,
        "timestamp": canonical_timestamp(&m.time),
        "roots": {
            "stateRoot": m.roots.state_root.to_ascii_lowercase(),
            "blockHash": m.roots.block_hash.to_ascii_lowercase(),
            "txRoot": m.roots.tx_root.to_ascii_lowercase(),
            "receiptsRoot": m.roots.receipts_root.to_ascii_lowercase(),
        },
        "artifact": {
            "layout": m.artifact.layout,
            "compress": {
                "algo": m.artifact.compress.algo,
                "dict": m.artifact.compress.dictionary(),
                "chunkSize": m.artifact.compress.chunk_size,
            },
            "parts": parts,
        },
    })
}

/// RFC 3339 UTC with `Z` and the shortest fraction that keeps every
/// non-zero digit: `12:00:00Z`, `12:00:00.25Z`, `12:00:00.000000001Z`.
fn canonical_timestamp(time: &DateTime<Utc>) -> String {
    let full = time.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let Some(body) = full.strip_suffix('Z') else {
        return full;
    };
    match body.split_once('.') {
        Some((seconds, fraction)) => match fraction.trim_end_matches('0') {
            "" => format!("{seconds}Z"),
            digits => format!("{seconds}.{digits}Z"),
        },
        None => full,
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => out.extend_from_slice(if *b { "true" } else { "false" }.as_bytes()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                write!(out, "{i}").map_err(|e| Error::encoding("number", e.to_string()))?;
            } else if let Some(u) = n.as_u64() {
                write!(out, "{u}").map_err(|e| Error::encoding("number", e.to_string()))?;
            } else {
                return Err(Error::encoding("number", format!("non-integer value {n}")));
            }
        }
        Value::String(s) => serde_json::to_writer(&mut *out, s)?,
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_value(out, item)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}
