//! Error types for stratacache

use thiserror::Error;

/// Main error type for stratacache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Item too large: {size} bytes exceeds per-item limit of {max_size}")]
    ItemTooLarge { size: u64, max_size: u64 },

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("No adapter registered under name: {0}")]
    AdapterNotFound(String),

    #[error("No serializer registered under name: {0}")]
    SerializerNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Item encoding error: {0}")]
    Encoding(String),

    #[error("Item decoding error: {0}")]
    Decoding(String),
}

/// Compression / value-codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression failed: {0}")]
    Compress(String),

    #[error("Decompression failed: {0}")]
    Decompress(String),

    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encryption errors
///
/// Unlike codec errors these are fatal for the operation that hit them;
/// the engine never falls back to returning ciphertext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("Encryption key missing")]
    MissingKey,

    #[error("Invalid key length: {0} bytes (expected 32)")]
    InvalidKeyLength(usize),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed (wrong key or corrupted data)")]
    Decrypt,
}

// Adapter-level encryption failures surface as the distinct top-level kind,
// not buried inside a storage error.
impl From<StorageError> for CacheError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Encryption(e) => CacheError::Encryption(e),
            other => CacheError::Storage(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_errors_lift_out_of_storage() {
        let err: CacheError = StorageError::Encryption(EncryptionError::Decrypt).into();
        assert!(matches!(err, CacheError::Encryption(EncryptionError::Decrypt)));

        let err: CacheError = StorageError::Backend("down".into()).into();
        assert!(matches!(err, CacheError::Storage(_)));
    }
}
