//! `decompress(algo, dict, bytes) -> bytes` for hash-verified parts.

use std::io::{self, Read};

/// Error type for part decompression.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported compression algorithm '{0}'")]
    Unsupported(String),

    #[error("{0} does not take a dictionary")]
    DictionaryNotSupported(&'static str),

    #[error("manifest names dictionary '{0}' but none was supplied")]
    MissingDictionary(String),

    #[error("corrupt {codec} stream: {source}")]
    Corrupt {
        codec:  &'static str,
        #[source]
        source: io::Error,
    },
}

/// Compression applied to each part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    None,
    Gzip,
    Zstd,
}

impl Codec {
    pub fn from_name(name: &str) -> Result<Self, CodecError> {
        match name {
            "none" | "identity" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            #[cfg(feature = "zstd")]
            "zstd" | "zst" => Ok(Self::Zstd),
            _ => Err(CodecError::Unsupported(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Gzip => "gzip",
            Codec::Zstd => "zstd",
        }
    }

    pub fn supports_dictionary(&self) -> bool { matches!(self, Codec::Zstd) }

    pub fn decompress(self, dict: Option<&[u8]>, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        if dict.is_some() && !self.supports_dictionary() {
            return Err(CodecError::DictionaryNotSupported(self.as_str()));
        }
        let corrupt = |source| CodecError::Corrupt {
            codec: self.as_str(),
            source,
        };

        match self {
            Codec::None => Ok(input.to_vec()),
            Codec::Gzip => {
                let mut out = Vec::with_capacity(input.len() * 2);
                flate2::read::GzDecoder::new(input).read_to_end(&mut out).map_err(corrupt)?;
                Ok(out)
            }
            #[cfg(feature = "zstd")]
            Codec::Zstd => {
                let mut out = Vec::with_capacity(input.len() * 3);
                match dict {
                    Some(dict) => {
                        zstd::stream::read::Decoder::with_dictionary(input, dict)
                            .and_then(|mut d| d.read_to_end(&mut out))
                            .map_err(corrupt)?;
                    }
                    None => {
                        zstd::stream::read::Decoder::new(input)
                            .and_then(|mut d| d.read_to_end(&mut out))
                            .map_err(corrupt)?;
                    }
                }
                Ok(out)
            }
            #[cfg(not(feature = "zstd"))]
            Codec::Zstd => Err(CodecError::Unsupported(self.as_str().to_string())),
        }
    }
}

/// One-shot form taking the manifest's algorithm name.
pub fn decompress(algo: &str, dict: Option<&[u8]>, input: &[u8]) -> Result<Vec<u8>, CodecError> {
    Codec::from_name(algo)?.decompress(dict, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(Codec::from_name("none").unwrap(), Codec::None);
        assert_eq!(Codec::from_name("gzip").unwrap(), Codec::Gzip);
        assert!(matches!(Codec::from_name("lz4"), Err(CodecError::Unsupported(a)) if a == "lz4"));
    }

    #[test]
    fn test_none_is_passthrough() {
        assert_eq!(decompress("none", None, b"AA").unwrap(), b"AA");
    }

    #[test]
    fn test_gzip_decompress() {
        let packed = gzip(b"state chunk");
        assert_eq!(decompress("gzip", None, &packed).unwrap(), b"state chunk");
    }

    #[test]
    fn test_gzip_corrupt_stream() {
        let mut packed = gzip(b"state chunk");
        packed.truncate(packed.len() / 2);
        assert!(matches!(decompress("gzip", None, &packed), Err(CodecError::Corrupt { codec: "gzip", .. })));
    }

    #[test]
    fn test_dictionary_rejected_for_gzip() {
        let packed = gzip(b"x");
        assert!(matches!(
            decompress("gzip", Some(b"dict"), &packed),
            Err(CodecError::DictionaryNotSupported("gzip"))
        ));
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_decompress() {
        let packed = zstd::stream::encode_all(&b"zstd chunk"[..], 3).unwrap();
        assert_eq!(decompress("zstd", None, &packed).unwrap(), b"zstd chunk");
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_with_dictionary() {
        let dict = b"snapshot-dictionary-snapshot-dictionary".repeat(8);
        let mut packed = Vec::new();
        {
            let mut enc = zstd::stream::write::Encoder::with_dictionary(&mut packed, 3, &dict).unwrap();
            enc.write_all(b"snapshot-dictionary payload").unwrap();
            enc.finish().unwrap();
        }
        assert_eq!(
            decompress("zstd", Some(&dict), &packed).unwrap(),
            b"snapshot-dictionary payload"
        );
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_garbage_is_corrupt() {
        assert!(matches!(
            decompress("zstd", None, b"definitely not zstd"),
            Err(CodecError::Corrupt { codec: "zstd", .. })
        ));
    }
}
