use coderag_code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// A code chunk together with its embedding.
///
/// Owned by the store once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: CodeChunk,
    pub embedding: Vec<f32>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl EmbeddedChunk {
    pub fn new(chunk: CodeChunk, embedding: Vec<f32>) -> Self {
        let now = SystemTime::now();
        Self {
            chunk,
            embedding,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: CodeChunk,

    /// Cosine similarity to the query (higher is better)
    pub score: f32,
}

/// Aggregate numbers about one project's chunks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreStats {
    pub total_chunks: usize,
    pub total_files: usize,
    pub total_tokens: usize,
    /// Embedding length, once anything is stored
    pub dimensions: Option<usize>,
    pub last_updated: Option<SystemTime>,
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.0];
        let c = vec![-1.0, -2.0, -3.0];
        let zero = vec![0.0, 0.0, 0.0];

        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);
        assert!((cosine_similarity(&a, &c) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
    }
}
