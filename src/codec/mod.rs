//! Payload codecs: GZIP compression, at-rest encryption, and the
//! serializer seam between typed values and stored bytes

mod compress;
mod encrypt;

pub use compress::{
    ASYNC_CODEC_THRESHOLD, DEFAULT_COMPRESSION_LEVEL, MIN_PROFITABLE_RATIO, clamp_level, compress,
    compress_offloaded, decompress, decompress_offloaded, shannon_entropy, should_compress,
};
pub use encrypt::{DEFAULT_PBKDF2_ITERATIONS, EncryptionAlgorithm, EncryptionOptions};

use crate::error::CodecError;
use bytes::Bytes;

/// Converts between JSON values and the payload bytes handed to adapters.
///
/// The engine serializes typed values through `serde_json::Value` and then
/// through one of these; registering a custom serializer changes the on-disk
/// payload encoding without touching the adapters.
pub trait PayloadSerializer: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, value: &serde_json::Value) -> Result<Bytes, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError>;
}

/// Default serializer: compact JSON text
pub struct JsonSerializer;

impl PayloadSerializer for JsonSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &serde_json::Value) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode(&self, bytes: &[u8]) -> Result<serde_json::Value, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_serializer_round_trip() {
        let serializer = JsonSerializer;
        let value = json!({"id": 7, "tags": ["a", "b"]});
        let bytes = serializer.encode(&value).unwrap();
        assert_eq!(serializer.decode(&bytes).unwrap(), value);
        assert_eq!(serializer.name(), "json");
    }

    #[test]
    fn test_json_serializer_rejects_garbage() {
        assert!(JsonSerializer.decode(b"{truncated").is_err());
    }
}
