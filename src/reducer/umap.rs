use super::curve::find_ab_params;
use super::fuzzy::fuzzy_simplicial_set;
use super::knn::nearest_neighbors;
use super::layout::{LayoutParams, optimize_layout, prune_edges, random_init};
use super::{DimensionReducer, ReduceError, validate_input};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// UMAP settings. Defaults favour density-based clustering downstream: a tight
/// `min_dist` of 0 and a handful of output dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UmapParams {
    pub n_components: usize,
    pub n_neighbors: usize,
    pub min_dist: f32,
    pub spread: f32,
    pub seed: u64,
    /// `None` picks 500 epochs for up to 10k points, 200 beyond.
    pub n_epochs: Option<usize>,
    pub negative_sample_rate: usize,
    pub learning_rate: f32,
}

impl Default for UmapParams {
    fn default() -> Self {
        Self {
            n_components: 5,
            n_neighbors: 15,
            min_dist: 0.0,
            spread: 1.0,
            seed: 42,
            n_epochs: None,
            negative_sample_rate: 5,
            learning_rate: 1.0,
        }
    }
}

impl UmapParams {
    pub fn validate(&self) -> Result<(), ReduceError> {
        if self.n_components == 0 {
            return Err(ReduceError::InvalidParams("n_components must be at least 1".into()));
        }
        if self.n_neighbors < 2 {
            return Err(ReduceError::InvalidParams("n_neighbors must be at least 2".into()));
        }
        if !(self.spread > 0.0) || self.min_dist < 0.0 || self.min_dist > self.spread {
            return Err(ReduceError::InvalidParams(format!(
                "min_dist {} must lie in [0, spread {}]",
                self.min_dist, self.spread
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ReduceError::InvalidParams("learning_rate must be positive".into()));
        }
        Ok(())
    }

    fn epochs_for(&self, n: usize) -> usize {
        self.n_epochs
            .unwrap_or(if n <= 10_000 { 500 } else { 200 })
            .max(1)
    }
}

/// Cosine-metric UMAP. Seeded, so identical input gives identical output.
#[derive(Debug, Clone, Default)]
pub struct Umap {
    params: UmapParams,
}

impl Umap {
    pub fn new(params: UmapParams) -> Result<Self, ReduceError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &UmapParams {
        &self.params
    }
}

impl DimensionReducer for Umap {
    fn output_dim(&self) -> usize {
        self.params.n_components
    }

    fn reduce(&self, vectors: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, ReduceError> {
        validate_input(vectors)?;

        let n = vectors.len();
        let p = &self.params;
        if n == 1 {
            return Ok(vec![vec![0.0; p.n_components]]);
        }

        let k = p.n_neighbors.min(n - 1);
        let knn = nearest_neighbors(vectors, k);
        let edges = fuzzy_simplicial_set(&knn, (k + 1) as f32);

        let n_epochs = p.epochs_for(n);
        let edges = prune_edges(&edges, n_epochs);
        let (a, b) = find_ab_params(p.spread, p.min_dist);

        tracing::debug!(n, k, edges = edges.len(), n_epochs, a, b, "umap graph built");

        let mut rng = ChaCha8Rng::seed_from_u64(p.seed);
        let mut embedding = random_init(n, p.n_components, &mut rng);

        let layout = LayoutParams {
            a,
            b,
            n_epochs,
            negative_sample_rate: p.negative_sample_rate,
            learning_rate: p.learning_rate,
            repulsion_strength: 1.0,
        };
        optimize_layout(&mut embedding, &edges, &layout, &mut rng);

        Ok(embedding)
    }
}
