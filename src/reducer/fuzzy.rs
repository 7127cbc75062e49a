use super::knn::KnnGraph;
use std::collections::BTreeMap;

const SMOOTH_K_TOLERANCE: f32 = 1e-5;
const MIN_K_DIST_SCALE: f32 = 1e-3;
const BINARY_SEARCH_ITERS: usize = 64;

/// Weighted undirected edge of the fuzzy graph, listed once per direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub head: usize,
    pub tail: usize,
    pub weight: f32,
}

/// Per-point `(sigma, rho)`: `rho` is the distance to the nearest distinct
/// neighbour and `sigma` scales the rest so memberships sum to `log2(k)`.
pub fn smooth_knn_dist(distances: &[Vec<f32>], k: f32) -> (Vec<f32>, Vec<f32>) {
    let target = k.max(2.0).log2();

    let (sum_all, count_all) = distances
        .iter()
        .flatten()
        .fold((0.0f32, 0usize), |(s, c), d| (s + d, c + 1));
    let mean_all = if count_all > 0 {
        sum_all / count_all as f32
    } else {
        0.0
    };

    let mut sigmas = Vec::with_capacity(distances.len());
    let mut rhos = Vec::with_capacity(distances.len());

    for row in distances {
        let rho = row.iter().copied().find(|d| *d > 0.0).unwrap_or(0.0);

        let mut lo = 0.0f32;
        let mut hi = f32::INFINITY;
        let mut mid = 1.0f32;

        for _ in 0..BINARY_SEARCH_ITERS {
            let psum: f32 = row
                .iter()
                .map(|d| {
                    let d = d - rho;
                    if d > 0.0 { (-d / mid).exp() } else { 1.0 }
                })
                .sum();

            if (psum - target).abs() < SMOOTH_K_TOLERANCE {
                break;
            }

            if psum > target {
                hi = mid;
                mid = (lo + hi) / 2.0;
            } else {
                lo = mid;
                if hi.is_infinite() {
                    mid *= 2.0;
                } else {
                    mid = (lo + hi) / 2.0;
                }
            }
        }

        let mut sigma = mid;
        if rho > 0.0 {
            let mean_row = row.iter().sum::<f32>() / row.len().max(1) as f32;
            sigma = sigma.max(MIN_K_DIST_SCALE * mean_row);
        } else {
            sigma = sigma.max(MIN_K_DIST_SCALE * mean_all);
        }

        sigmas.push(sigma);
        rhos.push(rho);
    }

    (sigmas, rhos)
}

/// Fuzzy simplicial set: directed memberships combined by probabilistic
/// union `a + b - a*b`. Edges come out in (head, tail) order.
pub fn fuzzy_simplicial_set(knn: &KnnGraph, k: f32) -> Vec<Edge> {
    let (sigmas, rhos) = smooth_knn_dist(&knn.distances, k);

    let mut directed: BTreeMap<(usize, usize), f32> = BTreeMap::new();
    for (i, (neighbors, dists)) in knn.indices.iter().zip(&knn.distances).enumerate() {
        for (&j, &d) in neighbors.iter().zip(dists) {
            let excess = d - rhos[i];
            let w = if excess <= 0.0 || sigmas[i] == 0.0 {
                1.0
            } else {
                (-excess / sigmas[i]).exp()
            };
            directed.insert((i, j), w);
        }
    }

    let mut graph: BTreeMap<(usize, usize), f32> = BTreeMap::new();
    for (&(i, j), &a) in &directed {
        let b = directed.get(&(j, i)).copied().unwrap_or(0.0);
        let w = a + b - a * b;
        graph.insert((i, j), w);
        graph.insert((j, i), w);
    }

    graph
        .into_iter()
        .filter(|(_, w)| *w > 0.0)
        .map(|((head, tail), weight)| Edge { head, tail, weight })
        .collect()
}
