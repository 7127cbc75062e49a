use std::collections::BTreeMap;

use crate::catalog::{MAX_TOPIC_EXAMPLES, Topic, TopicCatalog};
use crate::clusterer::NOISE;
use crate::labeler::TopicLabel;

pub const DEFAULT_TARGET_TOPICS: usize = 10;

/// The `n` most populated clusters, largest first. Equal sizes are ordered
/// by ascending cluster id. Noise is never ranked.
pub fn rank_clusters(sizes: &BTreeMap<i32, usize>, n: usize) -> Vec<(i32, usize)> {
    let mut ranked: Vec<(i32, usize)> = sizes
        .iter()
        .filter(|(id, _)| **id != NOISE)
        .map(|(&id, &count)| (id, count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Builds the ranked catalog from per-cluster sizes, labels and
/// representatives. Clusters outside the top `target_topics` are dropped.
pub fn assemble(
    sizes: &BTreeMap<i32, usize>,
    labels: &BTreeMap<i32, TopicLabel>,
    representatives: &BTreeMap<i32, Vec<String>>,
    total_queries: usize,
    target_topics: usize,
) -> TopicCatalog {
    let topics: Vec<Topic> = rank_clusters(sizes, target_topics)
        .into_iter()
        .enumerate()
        .map(|(i, (cluster_id, count))| {
            let label = labels.get(&cluster_id).cloned().unwrap_or_else(|| {
                TopicLabel::fallback(cluster_id, "cluster was not labeled")
            });
            let examples = representatives
                .get(&cluster_id)
                .map(|reps| reps.iter().take(MAX_TOPIC_EXAMPLES).cloned().collect())
                .unwrap_or_default();

            Topic {
                rank: i + 1,
                cluster_id,
                topic_name: label.topic_name,
                description: label.description,
                count,
                percentage: percentage(count, total_queries),
                representative_queries: examples,
            }
        })
        .collect();

    let excluded = sizes.keys().filter(|id| **id != NOISE).count() - topics.len();
    if excluded > 0 {
        tracing::info!(excluded, "clusters beyond the target topic count left out");
    }

    TopicCatalog {
        total_queries,
        n_topics: topics.len(),
        topics,
    }
}
