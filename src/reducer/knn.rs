use super::similarity::cosine_distance;
use rayon::prelude::*;

/// Exact nearest neighbours. Rows exclude the point itself and are sorted by
/// ascending distance, ties broken by index.
#[derive(Debug, Clone)]
pub struct KnnGraph {
    pub indices: Vec<Vec<usize>>,
    pub distances: Vec<Vec<f32>>,
}

pub fn nearest_neighbors(data: &[Vec<f32>], k: usize) -> KnnGraph {
    let rows: Vec<(Vec<usize>, Vec<f32>)> = (0..data.len())
        .into_par_iter()
        .map(|i| {
            let mut candidates: Vec<(usize, f32)> = data
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, v)| (j, cosine_distance(&data[i], v)))
                .collect();

            candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            candidates.truncate(k);
            candidates.into_iter().unzip()
        })
        .collect();

    let (indices, distances) = rows.into_iter().unzip();
    KnnGraph { indices, distances }
}
