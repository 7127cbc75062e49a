use thiserror::Error;

use crate::clusterer::ClusterError;
use crate::embedder::EmbedError;
use crate::reducer::ReduceError;

/// Fatal pipeline failures. Labeling problems never show up here; they
/// degrade to fallback labels instead.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No queries to analyze")]
    EmptyInput,

    #[error("Target topic count must be at least 1")]
    InvalidTargetTopics,

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Dimensionality reduction failed: {0}")]
    Reduction(#[from] ReduceError),

    #[error("Clustering failed: {0}")]
    Clustering(#[from] ClusterError),

    #[error("{stage} produced {actual} rows for {expected} queries")]
    Misaligned {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },
}
