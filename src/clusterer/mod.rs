mod error;
mod hdbscan;
mod types;

#[cfg(test)]
mod tests;

pub use error::ClusterError;
pub use self::hdbscan::HdbscanClusterer;
pub use types::{ClusterParams, ClusterSummary, NOISE, cluster_sizes, summarize_labels};

/// Density-based partition of points, one label per point, index-aligned.
/// Points in no cluster get [`NOISE`].
pub trait Clusterer: Send + Sync {
    fn cluster(&self, points: &[Vec<f32>]) -> Result<Vec<i32>, ClusterError>;
}
