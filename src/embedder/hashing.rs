// hashing.rs - deterministic local embedder for offline runs
use super::{EmbedError, Embedder, EmbeddingModelInfo};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Feature-hashing embedder: lowercased word unigrams and bigrams are hashed
/// into signed buckets and the result is L2-normalized. No model weights, no
/// randomness, identical output on every platform.
pub struct HashingEmbedder {
    model: EmbeddingModelInfo,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            model: EmbeddingModelInfo::new("feature-hashing", dim.max(1), usize::MAX),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let dim = self.model.dim;
        let mut v = vec![0f32; dim];

        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        for token in &tokens {
            add_feature(&mut v, token);
        }
        for pair in tokens.windows(2) {
            add_feature(&mut v, &format!("{} {}", pair[0], pair[1]));
        }

        l2_normalize_in_place(&mut v);
        v
    }
}

fn add_feature(v: &mut [f32], feature: &str) {
    let digest = Sha256::digest(feature.as_bytes());
    let mut bucket = [0u8; 8];
    bucket.copy_from_slice(&digest[..8]);

    let idx = (u64::from_le_bytes(bucket) % v.len() as u64) as usize;
    let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
    v[idx] += sign;
}

fn l2_normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model(&self) -> &EmbeddingModelInfo {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
