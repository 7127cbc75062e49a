// model.rs - metadata about the sentence-embedding model behind the embedder
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingModelInfo {
    pub dim: usize,
    pub name: String,
    pub max_batch: usize,
}

impl EmbeddingModelInfo {
    pub fn new(name: impl Into<String>, dim: usize, max_batch: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            max_batch,
        }
    }

    /// Small general-purpose model; good enough for short support queries.
    pub fn minilm_l6() -> Self {
        Self::new("sentence-transformers/all-MiniLM-L6-v2", 384, 64)
    }
}

impl Default for EmbeddingModelInfo {
    fn default() -> Self {
        Self::minilm_l6()
    }
}
