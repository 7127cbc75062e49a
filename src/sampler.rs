//! Deterministic exemplar extraction for clusters.
//!
//! Members are taken at a fixed stride in the order they were encountered,
//! so the same input always yields the same representatives.

use crate::clusterer::NOISE;
use std::collections::BTreeMap;

/// Default number of representatives pulled from each cluster.
pub const DEFAULT_REPRESENTATIVES: usize = 10;

/// Every `stride`-th member, where `stride = max(1, population / min(n, population))`,
/// truncated to `min(n, population)` items.
pub fn sample<T: Clone>(members: &[T], n: usize) -> Vec<T> {
    let sample_size = n.min(members.len());
    if sample_size == 0 {
        return Vec::new();
    }
    let stride = (members.len() / sample_size).max(1);

    members
        .iter()
        .step_by(stride)
        .take(sample_size)
        .cloned()
        .collect()
}

/// Non-noise queries grouped by cluster id, in original query order.
pub fn group_members(queries: &[String], labels: &[i32]) -> BTreeMap<i32, Vec<String>> {
    let mut groups: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    for (query, &label) in queries.iter().zip(labels) {
        if label != NOISE {
            groups.entry(label).or_default().push(query.clone());
        }
    }
    groups
}

pub fn representatives(
    groups: &BTreeMap<i32, Vec<String>>,
    n: usize,
) -> BTreeMap<i32, Vec<String>> {
    groups
        .iter()
        .map(|(&cluster_id, members)| (cluster_id, sample(members, n)))
        .collect()
}
