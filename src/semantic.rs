//! Embedding seam: the provider trait, the deterministic local hashing
//! backend, and the vector helpers shared by the store and retriever.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Maps batches of text to fixed-dimensionality, unit-normalized vectors.
///
/// A provider is constructed once by the top-level caller and passed by
/// reference into chunk embedding, query embedding, and MMR similarity
/// computation. Model-backed providers live outside this crate and
/// implement the same trait; they must normalize their output so that
/// inner product equals cosine similarity.
pub trait EmbeddingProvider {
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, each of
    /// `dimensions()` length. An empty batch yields an empty batch.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed(&[text])?;
        batch.pop().ok_or_else(|| {
            Error::Configuration("embedding provider returned an empty batch".to_string())
        })
    }
}

/// Deterministic offline embedder: hashed word and bigram features with
/// signed weights, l2-normalized. No model weights, no network.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(8),
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| hashed_feature_vector(text, self.dimensions))
            .collect())
    }
}

fn hashed_feature_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0_f32; dimensions];
    let features = feature_tokens(text);
    if features.is_empty() {
        return vector;
    }

    for feature in features {
        let hash = stable_hash(&feature);
        let slot = (hash as usize) % dimensions;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
        vector[slot] += sign * weight;
    }

    normalize_vector(&mut vector);
    vector
}

fn feature_tokens(text: &str) -> Vec<String> {
    let words = text
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|character| character.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<String>>();

    if words.is_empty() {
        return Vec::new();
    }

    let mut features = Vec::<String>::with_capacity(words.len() * 2);
    for (index, word) in words.iter().enumerate() {
        features.push(format!("w:{word}"));
        if let Some(next) = words.get(index + 1) {
            features.push(format!("b:{word}_{next}"));
        }
    }
    features
}

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Inner product of two vectors, accumulated in f64. For unit-normalized
/// inputs this equals cosine similarity. Mismatched lengths score 0.
pub fn inner_product(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    left.iter()
        .zip(right.iter())
        .map(|(left_value, right_value)| f64::from(*left_value) * f64::from(*right_value))
        .sum::<f64>() as f32
}

pub fn normalize_vector(values: &mut [f32]) {
    let squared_norm = values
        .iter()
        .map(|value| f64::from(*value) * f64::from(*value))
        .sum::<f64>();

    if squared_norm <= 0.0 {
        return;
    }

    let norm = squared_norm.sqrt() as f32;
    for value in values {
        *value /= norm;
    }
}

pub fn encode_vector_blob(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::<u8>::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_vector_blob(blob: &[u8], expected_len: usize) -> Option<Vec<f32>> {
    if blob.len() != expected_len.checked_mul(4)? {
        return None;
    }

    let mut out = Vec::<f32>::with_capacity(expected_len);
    for chunk in blob.chunks_exact(4) {
        out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let first = embedder.embed_one("the api gateway handles auth").unwrap();
        let second = embedder.embed_one("the api gateway handles auth").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hash_embedder_output_is_unit_normalized() {
        let embedder = HashEmbedder::new(64);
        let vector = embedder.embed_one("daily backups with 30 day retention").unwrap();
        let norm = vector.iter().map(|v| f64::from(*v).powi(2)).sum::<f64>();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hash_embedder_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let vector = embedder.embed_one("   ").unwrap();
        assert_eq!(vector.len(), 16);
        assert!(vector.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn hash_embedder_enforces_minimum_dimensionality() {
        let embedder = HashEmbedder::new(2);
        assert_eq!(embedder.dimensions(), 8);
    }

    #[test]
    fn identical_texts_have_maximum_similarity() {
        let embedder = HashEmbedder::new(64);
        let left = embedder.embed_one("kubernetes namespace isolation").unwrap();
        let right = embedder.embed_one("kubernetes namespace isolation").unwrap();
        assert!((inner_product(&left, &right) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn inner_product_handles_orthogonal_and_mismatched_inputs() {
        assert_eq!(inner_product(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(inner_product(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(inner_product(&[], &[]), 0.0);
    }

    #[test]
    fn vector_blob_round_trips() {
        let values = vec![0.25_f32, -1.5, 3.75, 0.0];
        let blob = encode_vector_blob(&values);
        assert_eq!(decode_vector_blob(&blob, 4), Some(values));
    }

    #[test]
    fn vector_blob_rejects_wrong_length() {
        let blob = encode_vector_blob(&[1.0, 2.0]);
        assert_eq!(decode_vector_blob(&blob, 3), None);
    }
}
