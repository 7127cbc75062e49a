use crate::clusterer::{
    Clusterer,
    error::ClusterError,
    types::{ClusterParams, NOISE, summarize_labels},
};
use ::hdbscan::{DistanceMetric, Hdbscan, HdbscanHyperParams};

/// HDBSCAN over Euclidean distance with excess-of-mass cluster selection
/// (the `hdbscan` crate's selection policy), favouring fewer stable clusters
/// over many leaf fragments.
#[derive(Debug, Clone, Default)]
pub struct HdbscanClusterer {
    params: ClusterParams,
}

impl HdbscanClusterer {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }
}

impl Clusterer for HdbscanClusterer {
    fn cluster(&self, points: &[Vec<f32>]) -> Result<Vec<i32>, ClusterError> {
        let Some(first) = points.first() else {
            return Err(ClusterError::Empty);
        };
        let expected = first.len();
        for (index, p) in points.iter().enumerate() {
            if p.len() != expected {
                return Err(ClusterError::DimensionMismatch {
                    index,
                    expected,
                    actual: p.len(),
                });
            }
        }

        let n = points.len();
        let min_cluster_size = self.params.min_cluster_size.max(2);
        if n < min_cluster_size {
            tracing::warn!(
                n,
                min_cluster_size,
                "too few points for a single cluster; everything is noise"
            );
            return Ok(vec![NOISE; n]);
        }
        let min_samples = self.params.min_samples.clamp(1, n - 1);

        let hyper_params = HdbscanHyperParams::builder()
            .min_cluster_size(min_cluster_size)
            .min_samples(min_samples)
            .dist_metric(DistanceMetric::Euclidean)
            .build();

        let labels = Hdbscan::new(points, hyper_params)
            .cluster()
            .map_err(|e| ClusterError::Backend(format!("{:?}", e)))?;

        let summary = summarize_labels(&labels);
        tracing::info!(
            n_clusters = summary.n_clusters,
            n_noise = summary.n_noise,
            noise_fraction = summary.noise_fraction,
            "clustering complete"
        );

        Ok(labels)
    }
}
