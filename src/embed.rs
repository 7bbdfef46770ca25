//! Deterministic text embedding for the in-process similarity backends.
//!
//! Feature hashing over a bag of tokens: each token lands in a hash-derived
//! bucket with a hash-derived sign, and the result is L2-normalized. No
//! external embedding service is involved, and identical text always maps to
//! an identical vector.

use std::collections::hash_map::DefaultHasher;
use std::hash::{ Hash, Hasher };

/// Dimension shared by every vector produced here and by the index backends.
pub const EMBEDDING_DIM: usize = 256;

/// Tokenize text for embedding: lowercase, split on whitespace and
/// punctuation, drop single characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|s| s.len() > 1)
        .collect()
}

/// Embed `text` into a normalized vector of `dim` components.
pub fn embed_text(text: &str, dim: usize) -> Vec<f32> {
    let mut components = vec![0.0f32; dim];
    for token in tokenize(text) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let hashed = hasher.finish();
        let bucket = (hashed % (dim as u64)) as usize;
        let sign = if hashed & (1 << 63) == 0 { 1.0 } else { -1.0 };
        components[bucket] += sign;
    }
    normalize(&mut components);
    components
}

/// Cosine similarity between two vectors; zero vectors compare as 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn normalize(components: &mut [f32]) {
    let magnitude: f32 = components.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for component in components.iter_mut() {
            *component /= magnitude;
        }
    }
}
