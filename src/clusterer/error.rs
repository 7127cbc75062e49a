use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Nothing to cluster: input is empty")]
    Empty,

    #[error("Point {index} has dimension {actual} (expected {expected})")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Clustering backend failed: {0}")]
    Backend(String),
}
