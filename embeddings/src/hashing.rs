use crate::error::EmbeddingError;
use crate::provider::{EmbeddingModelInfo, EmbeddingProvider};
use async_trait::async_trait;

pub const DEFAULT_HASHING_DIMENSIONS: usize = 384;

/// Offline provider that embeds identifier tokens by feature hashing.
///
/// Every identifier contributes itself plus its camelCase / snake_case parts,
/// so `parseConfig` lands near both `parse_config` and `config`. Vectors are
/// L2-normalized and identical inputs always produce identical vectors.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokens(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    fn model_info(&self) -> EmbeddingModelInfo {
        EmbeddingModelInfo {
            provider: "hashing".to_string(),
            model: format!("feature-hash-{}", self.dimensions),
            dimensions: Some(self.dimensions),
            max_batch_size: None,
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Lowercased identifiers and their word parts.
fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    for word in text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
    {
        let parts = split_identifier(word);
        if parts.len() > 1 {
            out.extend(parts);
        }
        out.push(word.to_lowercase());
    }

    out
}

fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in word.chars() {
        if ch == '_' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts
}
