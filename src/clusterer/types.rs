use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label assigned to points that belong to no cluster.
pub const NOISE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Clusters smaller than this dissolve into noise.
    pub min_cluster_size: usize,
    /// Neighbourhood size for core distances; higher is stricter.
    pub min_samples: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            min_cluster_size: 50,
            min_samples: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub n_clusters: usize,
    pub n_noise: usize,
    pub noise_fraction: f64,
}

/// Population per cluster id; noise is not counted.
pub fn cluster_sizes(labels: &[i32]) -> BTreeMap<i32, usize> {
    let mut sizes = BTreeMap::new();
    for &label in labels.iter().filter(|l| **l != NOISE) {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes
}

pub fn summarize_labels(labels: &[i32]) -> ClusterSummary {
    let n_clusters = cluster_sizes(labels).len();
    let n_noise = labels.iter().filter(|l| **l == NOISE).count();
    let noise_fraction = if labels.is_empty() {
        0.0
    } else {
        n_noise as f64 / labels.len() as f64
    };

    ClusterSummary {
        n_clusters,
        n_noise,
        noise_fraction,
    }
}
