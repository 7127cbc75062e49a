// the embedding server contract
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct EmbeddingRequest<'a> {
    pub texts: &'a [String],
}

#[derive(Deserialize)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dim: Option<usize>,
}
