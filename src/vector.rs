//! Embedding vector codec and similarity math.
//!
//! Vectors are stored as raw native-endian f32 blobs, 4 bytes per
//! dimension. The engine never assumes a fixed dimensionality — only
//! that two compared vectors have the same length.

use crate::error::{EngineError, Result};

/// Encode a vector as a `4 × len` byte blob.
pub fn to_blob(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_ne_bytes());
    }
    bytes
}

/// Decode a blob back into a vector. The copy sidesteps any alignment
/// constraints on the source bytes.
pub fn from_blob(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.is_empty() {
        return Err(EngineError::ZeroLengthVector);
    }
    if bytes.len() % 4 != 0 {
        return Err(EngineError::VectorLenMismatch {
            left: bytes.len(),
            right: bytes.len() / 4 * 4,
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity in [-1, 1].
///
/// Zero-magnitude input on either side yields 0.0 rather than dividing
/// by zero. Length mismatch and empty vectors are errors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(EngineError::ZeroLengthVector);
    }
    if a.len() != b.len() {
        return Err(EngineError::VectorLenMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
