pub mod batcher;
pub mod client;
pub mod error;
pub mod hashing;
pub mod model;
pub mod types;


pub use batcher::Batcher;
pub use client::EmbeddingClient;
pub use error::EmbedError;
pub use hashing::HashingEmbedder;
pub use model::EmbeddingModelInfo;
pub use types::{EmbeddingRequest, EmbeddingResponse, HealthResponse};

use async_trait::async_trait;

/// Maps texts to fixed-length vectors, index-aligned with the input.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &EmbeddingModelInfo;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Verify one vector per text and a single dimensionality across all of them.
/// With `expected_dim` unset, the first vector's length is the reference.
pub fn check_alignment(
    expected_count: usize,
    embeddings: &[Vec<f32>],
    expected_dim: Option<usize>,
) -> Result<(), EmbedError> {
    if embeddings.len() != expected_count {
        return Err(EmbedError::CountMismatch {
            expected: expected_count,
            actual: embeddings.len(),
        });
    }

    let Some(dim) = expected_dim.or_else(|| embeddings.first().map(Vec::len)) else {
        return Ok(());
    };

    for (index, e) in embeddings.iter().enumerate() {
        if e.len() != dim {
            return Err(EmbedError::DimensionMismatch {
                index,
                expected: dim,
                actual: e.len(),
            });
        }
    }

    Ok(())
}
