// layout.rs - stochastic gradient descent over the fuzzy graph
use super::fuzzy::Edge;
use super::similarity::squared_euclidean;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

const GRAD_CLIP: f32 = 4.0;
const REPULSION_EPS: f32 = 0.001;

#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    pub a: f32,
    pub b: f32,
    pub n_epochs: usize,
    pub negative_sample_rate: usize,
    pub learning_rate: f32,
    pub repulsion_strength: f32,
}

fn clip(v: f32) -> f32 {
    v.clamp(-GRAD_CLIP, GRAD_CLIP)
}

/// Uniform random start in [-10, 10] per coordinate.
pub fn random_init(n: usize, dim: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-10.0f32..10.0)).collect())
        .collect()
}

/// Drop edges too weak to be sampled within `n_epochs`.
pub fn prune_edges(edges: &[Edge], n_epochs: usize) -> Vec<Edge> {
    let max_w = edges.iter().map(|e| e.weight).fold(0.0f32, f32::max);
    let floor = max_w / n_epochs.max(1) as f32;
    edges.iter().copied().filter(|e| e.weight >= floor).collect()
}

/// Attract along edges, repel from negative samples. Each edge is sampled in
/// proportion to its weight; the learning rate decays linearly to zero.
pub fn optimize_layout(
    embedding: &mut [Vec<f32>],
    edges: &[Edge],
    params: &LayoutParams,
    rng: &mut ChaCha8Rng,
) {
    let n_vertices = embedding.len();
    if edges.is_empty() || n_vertices < 2 {
        return;
    }
    let dim = embedding[0].len();
    let (a, b) = (params.a, params.b);

    let max_w = edges.iter().map(|e| e.weight).fold(0.0f32, f32::max);
    let epochs_per_sample: Vec<f32> = edges.iter().map(|e| max_w / e.weight).collect();
    let neg_rate = params.negative_sample_rate.max(1) as f32;
    let epochs_per_negative: Vec<f32> = epochs_per_sample.iter().map(|e| e / neg_rate).collect();

    let mut next_sample = epochs_per_sample.clone();
    let mut next_negative = epochs_per_negative.clone();

    for epoch in 0..params.n_epochs {
        let n = epoch as f32;
        let alpha = params.learning_rate * (1.0 - n / params.n_epochs as f32);

        for (i, edge) in edges.iter().enumerate() {
            if next_sample[i] > n {
                continue;
            }

            let (j, k) = (edge.head, edge.tail);
            let dist_sq = squared_euclidean(&embedding[j], &embedding[k]);
            let attract = if dist_sq > 0.0 {
                -2.0 * a * b * dist_sq.powf(b - 1.0) / (a * dist_sq.powf(b) + 1.0)
            } else {
                0.0
            };

            for d in 0..dim {
                let diff = embedding[j][d] - embedding[k][d];
                let grad = clip(attract * diff);
                embedding[j][d] += grad * alpha;
                embedding[k][d] -= grad * alpha;
            }

            next_sample[i] += epochs_per_sample[i];

            let n_neg = ((n - next_negative[i]) / epochs_per_negative[i]).max(0.0) as usize;
            for _ in 0..n_neg {
                let other = rng.gen_range(0..n_vertices);
                if other == j {
                    continue;
                }

                let dist_sq = squared_euclidean(&embedding[j], &embedding[other]);
                let repel = if dist_sq > 0.0 {
                    2.0 * params.repulsion_strength * b
                        / ((REPULSION_EPS + dist_sq) * (a * dist_sq.powf(b) + 1.0))
                } else {
                    0.0
                };

                for d in 0..dim {
                    let grad = if repel > 0.0 {
                        clip(repel * (embedding[j][d] - embedding[other][d]))
                    } else {
                        GRAD_CLIP
                    };
                    embedding[j][d] += grad * alpha;
                }
            }

            next_negative[i] += n_neg as f32 * epochs_per_negative[i];
        }
    }
}
