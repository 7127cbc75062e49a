use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use crate::assembler::{DEFAULT_TARGET_TOPICS, assemble, rank_clusters};
use crate::catalog::TopicCatalog;
use crate::clusterer::{ClusterSummary, Clusterer, cluster_sizes, summarize_labels};
use crate::embedder::{Embedder, check_alignment};
use crate::error::DiscoveryError;
use crate::labeler::{ClusterLabeler, TopicLabel};
use crate::progress::{ProgressReporter, ProgressSnapshot, Stage};
use crate::reducer::DimensionReducer;
use crate::sampler::{DEFAULT_REPRESENTATIVES, group_members, representatives};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub target_topics: usize,
    /// Exemplars extracted per cluster before labeling.
    pub representative_samples: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            target_topics: DEFAULT_TARGET_TOPICS,
            representative_samples: DEFAULT_REPRESENTATIVES,
        }
    }
}

/// Run diagnostics. Advisory only, not part of the catalog contract.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub run_id: Uuid,
    pub input_digest: String,
    pub n_queries: usize,
    pub embedding_dim: usize,
    pub reduced_dim: usize,
    pub clusters: ClusterSummary,
    pub n_topics: usize,
    pub fallback_labels: usize,
    pub elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
}

/// SHA-256 over the ordered query list, hex encoded.
pub fn input_digest(queries: &[String]) -> String {
    let mut hasher = Sha256::new();
    for query in queries {
        hasher.update(query.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Drives embed → reduce → cluster → sample → label → assemble.
pub struct TopicDiscoverer {
    embedder: Box<dyn Embedder>,
    reducer: Box<dyn DimensionReducer>,
    clusterer: Box<dyn Clusterer>,
    labeler: ClusterLabeler,
    settings: DiscoverySettings,
    progress: ProgressReporter,
}

impl TopicDiscoverer {
    pub fn new(
        embedder: Box<dyn Embedder>,
        reducer: Box<dyn DimensionReducer>,
        clusterer: Box<dyn Clusterer>,
        labeler: ClusterLabeler,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            embedder,
            reducer,
            clusterer,
            labeler,
            settings,
            progress: ProgressReporter::new(),
        }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    pub async fn discover(
        &self,
        queries: &[String],
        target_topics: usize,
    ) -> Result<TopicCatalog, DiscoveryError> {
        self.discover_with_report(queries, target_topics)
            .await
            .map(|(catalog, _)| catalog)
    }

    pub async fn discover_with_report(
        &self,
        queries: &[String],
        target_topics: usize,
    ) -> Result<(TopicCatalog, DiscoveryReport), DiscoveryError> {
        let run_id = Uuid::new_v4();
        let result = self.run(run_id, queries, target_topics).await;

        match &result {
            Ok((catalog, report)) => {
                self.progress.publish(
                    run_id,
                    Stage::Complete,
                    format!("{} topics identified", catalog.n_topics),
                );
                tracing::info!(
                    run_id = %report.run_id,
                    input_digest = %report.input_digest,
                    n_queries = report.n_queries,
                    n_clusters = report.clusters.n_clusters,
                    noise_fraction = report.clusters.noise_fraction,
                    n_topics = report.n_topics,
                    fallback_labels = report.fallback_labels,
                    elapsed_ms = report.elapsed_ms,
                    "topic discovery complete"
                );
            }
            Err(e) => {
                self.progress.publish(run_id, Stage::Failed, e.to_string());
                tracing::error!(run_id = %run_id, error = %e, "topic discovery failed");
            }
        }

        result
    }

    async fn run(
        &self,
        run_id: Uuid,
        queries: &[String],
        target_topics: usize,
    ) -> Result<(TopicCatalog, DiscoveryReport), DiscoveryError> {
        if queries.is_empty() {
            return Err(DiscoveryError::EmptyInput);
        }
        if target_topics == 0 {
            return Err(DiscoveryError::InvalidTargetTopics);
        }
        let start = Instant::now();
        let n = queries.len();

        self.progress
            .publish(run_id, Stage::Embedding, format!("embedding {} queries", n));
        tracing::info!(
            stage = "embed",
            n_queries = n,
            model = %self.embedder.model().name,
            "generating embeddings"
        );
        let embeddings = self.embedder.embed(queries).await?;
        check_alignment(n, &embeddings, None)?;
        let embedding_dim = embeddings.first().map_or(0, Vec::len);

        self.progress.publish(run_id, Stage::Reducing, "reducing dimensions");
        tracing::info!(
            stage = "reduce",
            embedding_dim,
            target_dim = self.reducer.output_dim(),
            "reducing dimensions"
        );
        let reduced = self.reducer.reduce(&embeddings)?;
        if reduced.len() != n {
            return Err(DiscoveryError::Misaligned {
                stage: "reducer",
                expected: n,
                actual: reduced.len(),
            });
        }
        let reduced_dim = reduced.first().map_or(0, Vec::len);

        self.progress.publish(run_id, Stage::Clustering, "clustering");
        tracing::info!(stage = "cluster", "clustering reduced vectors");
        let labels = self.clusterer.cluster(&reduced)?;
        if labels.len() != n {
            return Err(DiscoveryError::Misaligned {
                stage: "clusterer",
                expected: n,
                actual: labels.len(),
            });
        }
        let summary = summarize_labels(&labels);
        let sizes = cluster_sizes(&labels);

        self.progress.publish(run_id, Stage::Sampling, "extracting representative queries");
        let groups = group_members(queries, &labels);
        let reps = representatives(&groups, self.settings.representative_samples);

        let top = rank_clusters(&sizes, target_topics);
        let topic_labels = self.label_clusters(run_id, &top, &reps).await;
        let fallback_labels = topic_labels.values().filter(|l| l.error).count();

        self.progress.publish(run_id, Stage::Assembling, "assembling topic catalog");
        let catalog = assemble(&sizes, &topic_labels, &reps, n, target_topics);

        let report = DiscoveryReport {
            run_id,
            input_digest: input_digest(queries),
            n_queries: n,
            embedding_dim,
            reduced_dim,
            clusters: summary,
            n_topics: catalog.n_topics,
            fallback_labels,
            elapsed_ms: start.elapsed().as_millis() as u64,
            generated_at: Utc::now(),
        };

        Ok((catalog, report))
    }

    /// Labels the selected clusters one at a time. Call pacing is enforced by
    /// the labeler.
    async fn label_clusters(
        &self,
        run_id: Uuid,
        top: &[(i32, usize)],
        reps: &BTreeMap<i32, Vec<String>>,
    ) -> BTreeMap<i32, TopicLabel> {
        let span = Stage::Assembling.base_fraction() - Stage::Labeling.base_fraction();
        let mut labels = BTreeMap::new();

        for (i, &(cluster_id, count)) in top.iter().enumerate() {
            self.progress.publish_fraction(
                run_id,
                Stage::Labeling,
                Stage::Labeling.base_fraction() + span * i as f32 / top.len() as f32,
                format!("labeling cluster {} ({}/{})", cluster_id, i + 1, top.len()),
            );
            tracing::info!(stage = "label", cluster_id, count, "labeling cluster");

            let exemplars = reps.get(&cluster_id).map(Vec::as_slice).unwrap_or(&[]);
            let label = self.labeler.label(exemplars, cluster_id).await;
            labels.insert(cluster_id, label);
        }

        labels
    }
}
