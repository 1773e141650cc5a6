use std::collections::HashMap;
use std::path::{Component, Path};

use crate::model::{Manifest, SCHEMA_V1};
use crate::{Error, Result};

impl Manifest {
    /// Check the structural invariants that must hold before a manifest can
    /// be encoded, sealed, or signed.
    pub fn validate(&self) -> Result<()> {
        if self.schema != SCHEMA_V1 {
            return Err(Error::UnsupportedSchema(self.schema.clone()));
        }
        if self.height < 0 {
            return Err(Error::encoding("height", format!("must be non-negative, got {}", self.height)));
        }

        for (name, value) in self.roots.fields() {
            validate_root(name, value)?;
        }

        if self.artifact.compress.algo.is_empty() {
            return Err(Error::encoding("artifact.compress.algo", "must not be empty"));
        }

        let mut seen = HashMap::with_capacity(self.artifact.parts.len());
        for (i, part) in self.artifact.parts.iter().enumerate() {
            let key = normalized_part_path(i, &part.path)?;
            if let Some(first) = seen.insert(key, i) {
                return Err(Error::encoding(
                    format!("artifact.parts[{i}].path"),
                    format!("duplicate path '{}' (same file as parts[{first}])", part.path),
                ));
            }
            if !is_hex_of_len(&part.sha256, 64) {
                return Err(Error::encoding(
                    format!("artifact.parts[{i}].sha256"),
                    "expected 64 hex characters",
                ));
            }
            if part.url.is_empty() {
                return Err(Error::encoding(format!("artifact.parts[{i}].url"), "must not be empty"));
            }
        }

        Ok(())
    }
}

fn validate_root(name: &str, value: &str) -> Result<()> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    if is_hex_of_len(digits, 64) {
        Ok(())
    } else {
        Err(Error::encoding(format!("roots.{name}"), "expected a 32-byte hex hash"))
    }
}

/// The `/`-joined normal components of a part path, which is what a sink
/// writes to. Two paths with the same key name the same file.
fn normalized_part_path(index: usize, path: &str) -> Result<String> {
    let field = || format!("artifact.parts[{index}].path");
    if path.is_empty() {
        return Err(Error::encoding(field(), "must not be empty"));
    }
    if path.contains('\0') {
        return Err(Error::encoding(field(), "contains a null byte"));
    }
    let mut normal = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(name) => normal.push(name.to_string_lossy()),
            Component::CurDir => {}
            Component::ParentDir => return Err(Error::encoding(field(), "must not contain '..'")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::encoding(field(), "must be relative"));
            }
        }
    }
    if normal.is_empty() {
        return Err(Error::encoding(field(), "does not name a file"));
    }
    Ok(normal.join("/"))
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use crate::test_support::sample_manifest;
    use crate::Error;

    #[test]
    fn test_sample_is_valid() {
        sample_manifest().validate().unwrap();
    }

    #[test]
    fn test_negative_height_rejected() {
        let mut m = sample_manifest();
        m.height = -1;
        assert!(matches!(m.validate(), Err(Error::Encoding { field, .. }) if field == "height"));
    }

    #[test]
    fn test_unknown_schema_rejected() {
        let mut m = sample_manifest();
        m.schema = "snapman/v2".into();
        assert!(matches!(m.validate(), Err(Error::UnsupportedSchema(s)) if s == "snapman/v2"));
    }

    #[test]
    fn test_root_accepts_0x_prefix_and_rejects_short_hash() {
        let mut m = sample_manifest();
        m.roots.block_hash = format!("0x{}", "ab".repeat(32));
        m.validate().unwrap();

        m.roots.tx_root = "abcd".into();
        assert!(matches!(m.validate(), Err(Error::Encoding { field, .. }) if field == "roots.txRoot"));
    }

    #[test]
    fn test_duplicate_part_paths_rejected() {
        let mut m = sample_manifest();
        let dup = m.artifact.parts[0].clone();
        m.artifact.parts.push(dup);
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate path"));
    }

    #[test]
    fn test_aliased_part_paths_rejected() {
        for alias in ["./state/part-0000.tar", "state//part-0000.tar", "state/./part-0000.tar/"] {
            let mut m = sample_manifest();
            m.artifact.parts[1].path = alias.into();
            let err = m.validate().unwrap_err();
            assert!(
                matches!(&err, Error::Encoding { field, reason }
                    if field == "artifact.parts[1].path" && reason.contains("parts[0]")),
                "{alias:?}: {err}"
            );
        }
    }

    #[test]
    fn test_distinct_normalized_paths_accepted() {
        let mut m = sample_manifest();
        m.artifact.parts[1].path = "./state/part-0001.tar".into();
        m.validate().unwrap();
    }

    #[test]
    fn test_escaping_part_paths_rejected() {
        for bad in ["../state.bin", "/etc/passwd", "a/../../b", "", ".", "./", "./."] {
            let mut m = sample_manifest();
            m.artifact.parts[0].path = bad.into();
            assert!(m.validate().is_err(), "path {bad:?} should be rejected");
        }
    }

    #[test]
    fn test_bad_part_hash_rejected() {
        let mut m = sample_manifest();
        m.artifact.parts[1].sha256 = "zz".repeat(32);
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("parts[1].sha256"));
    }
}
