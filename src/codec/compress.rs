//! GZIP compression with an entropy-based profitability heuristic
//!
//! Auto-mode compression only fires for payloads that look compressible:
//! at least `MIN_COMPRESS_LEN` bytes with a Shannon entropy below
//! `ENTROPY_CUTOFF` bits/byte over a bounded sample. Callers in Auto mode
//! additionally discard the compressed form when the achieved ratio is
//! below `MIN_PROFITABLE_RATIO`.

use crate::error::CodecError;
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

/// Default GZIP level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Payloads larger than this are (de)compressed on the blocking pool
/// by the `*_offloaded` variants
pub const ASYNC_CODEC_THRESHOLD: usize = 50_000;

/// Minimum `original / compressed` ratio for Auto mode to keep the result
pub const MIN_PROFITABLE_RATIO: f64 = 1.1;

/// Sample size for the entropy heuristic
const ENTROPY_SAMPLE: usize = 500;

/// Minimum payload length worth compressing
const MIN_COMPRESS_LEN: usize = 100;

/// Entropy (bits/byte) above which data is assumed incompressible
const ENTROPY_CUTOFF: f64 = 6.0;

/// Clamp a GZIP level into the valid 1..=9 range
pub fn clamp_level(level: u32) -> u32 {
    level.clamp(1, 9)
}

/// Shannon entropy in bits per byte over at most the first
/// `ENTROPY_SAMPLE` bytes
pub fn shannon_entropy(data: &[u8]) -> f64 {
    let sample = &data[..data.len().min(ENTROPY_SAMPLE)];
    if sample.is_empty() {
        return 0.0;
    }

    let mut counts = [0u32; 256];
    for &byte in sample {
        counts[byte as usize] += 1;
    }

    let len = sample.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = f64::from(c) / len;
            -p * p.log2()
        })
        .sum()
}

/// Heuristic for Auto-mode compression
pub fn should_compress(data: &[u8]) -> bool {
    data.len() >= MIN_COMPRESS_LEN && shannon_entropy(data) < ENTROPY_CUTOFF
}

/// GZIP-compress at the given (clamped) level
pub fn compress(data: &[u8], level: u32) -> Result<Bytes, CodecError> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::new(clamp_level(level)),
    );
    encoder
        .write_all(data)
        .map_err(|e| CodecError::Compress(e.to_string()))?;
    encoder
        .finish()
        .map(Bytes::from)
        .map_err(|e| CodecError::Compress(e.to_string()))
}

/// GZIP-decompress
pub fn decompress(data: &[u8]) -> Result<Bytes, CodecError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompress(e.to_string()))?;
    Ok(Bytes::from(out))
}

/// Compress, moving to the blocking pool when the payload exceeds
/// [`ASYNC_CODEC_THRESHOLD`]
pub async fn compress_offloaded(data: Bytes, level: u32) -> Result<Bytes, CodecError> {
    if data.len() <= ASYNC_CODEC_THRESHOLD {
        return compress(&data, level);
    }
    tokio::task::spawn_blocking(move || compress(&data, level))
        .await
        .map_err(|e| CodecError::Compress(format!("codec task failed: {e}")))?
}

/// Decompress, moving to the blocking pool when the payload exceeds
/// [`ASYNC_CODEC_THRESHOLD`]
pub async fn decompress_offloaded(data: Bytes) -> Result<Bytes, CodecError> {
    if data.len() <= ASYNC_CODEC_THRESHOLD {
        return decompress(&data);
    }
    tokio::task::spawn_blocking(move || decompress(&data))
        .await
        .map_err(|e| CodecError::Decompress(format!("codec task failed: {e}")))?
}
