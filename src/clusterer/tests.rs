use super::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn blobs(centers: &[(f32, f32)], per_blob: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = Vec::new();
    for &(cx, cy) in centers {
        for _ in 0..per_blob {
            points.push(vec![
                cx + rng.gen_range(-1.0f32..1.0),
                cy + rng.gen_range(-1.0f32..1.0),
            ]);
        }
    }
    points
}

#[test]
fn test_three_blobs() {
    let per_blob = 40;
    let points = blobs(&[(0.0, 0.0), (50.0, 50.0), (-50.0, 50.0)], per_blob, 42);
    let clusterer = HdbscanClusterer::new(ClusterParams {
        min_cluster_size: 10,
        min_samples: 5,
    });

    let labels = clusterer.cluster(&points).unwrap();
    assert_eq!(labels.len(), points.len());
    assert!(labels.iter().all(|l| *l >= NOISE));

    let summary = summarize_labels(&labels);
    assert_eq!(summary.n_clusters, 3);

    // each blob is dominated by a single label, and the labels differ
    let mut majority = Vec::new();
    for blob in labels.chunks(per_blob) {
        let sizes = cluster_sizes(blob);
        let (&label, &count) = sizes.iter().max_by_key(|(_, c)| **c).unwrap();
        assert!(count >= per_blob * 3 / 4);
        majority.push(label);
    }
    majority.sort();
    majority.dedup();
    assert_eq!(majority.len(), 3);
}

#[test]
fn test_too_few_points_is_all_noise() {
    let points = blobs(&[(0.0, 0.0)], 4, 1);
    let clusterer = HdbscanClusterer::default();

    let labels = clusterer.cluster(&points).unwrap();
    assert_eq!(labels, vec![NOISE; 4]);
}

#[test]
fn test_empty_input_is_an_error() {
    let clusterer = HdbscanClusterer::default();
    assert!(matches!(clusterer.cluster(&[]), Err(ClusterError::Empty)));
}

#[test]
fn test_dimension_mismatch_is_an_error() {
    let clusterer = HdbscanClusterer::default();
    let points = vec![vec![0.0, 0.0], vec![1.0]];
    assert!(matches!(
        clusterer.cluster(&points),
        Err(ClusterError::DimensionMismatch { index: 1, .. })
    ));
}

#[test]
fn test_summary_counts_noise() {
    let labels = vec![0, 0, 1, NOISE, 2, NOISE, 1, 0];
    let summary = summarize_labels(&labels);

    assert_eq!(summary.n_clusters, 3);
    assert_eq!(summary.n_noise, 2);
    assert!((summary.noise_fraction - 0.25).abs() < 1e-12);
}

#[test]
fn test_cluster_sizes_skip_noise() {
    let sizes = cluster_sizes(&[3, NOISE, 3, 0, NOISE]);
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[&3], 2);
    assert_eq!(sizes[&0], 1);
    assert!(!sizes.contains_key(&NOISE));
}

#[test]
fn test_summary_of_empty_labels() {
    let summary = summarize_labels(&[]);
    assert_eq!(summary.n_clusters, 0);
    assert_eq!(summary.noise_fraction, 0.0);
}
