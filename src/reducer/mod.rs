mod curve;
mod fuzzy;
mod knn;
mod layout;
pub mod similarity;
mod umap;


pub use curve::find_ab_params;
pub use fuzzy::{Edge, fuzzy_simplicial_set, smooth_knn_dist};
pub use knn::{KnnGraph, nearest_neighbors};
pub use umap::{Umap, UmapParams};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("Nothing to reduce: input is empty")]
    Empty,

    #[error("Vector {index} has dimension {actual} (expected {expected})")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Vector {index} contains a non-finite value")]
    NonFinite { index: usize },

    #[error("Invalid reducer parameters: {0}")]
    InvalidParams(String),
}

/// Batch projection into a lower-dimensional space, same count and order as
/// the input.
pub trait DimensionReducer: Send + Sync {
    fn output_dim(&self) -> usize;

    fn reduce(&self, vectors: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, ReduceError>;
}

pub(crate) fn validate_input(vectors: &[Vec<f32>]) -> Result<(), ReduceError> {
    let Some(first) = vectors.first() else {
        return Err(ReduceError::Empty);
    };
    let expected = first.len();
    if expected == 0 {
        return Err(ReduceError::DimensionMismatch {
            index: 0,
            expected: 1,
            actual: 0,
        });
    }

    for (index, v) in vectors.iter().enumerate() {
        if v.len() != expected {
            return Err(ReduceError::DimensionMismatch {
                index,
                expected,
                actual: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(ReduceError::NonFinite { index });
        }
    }

    Ok(())
}
