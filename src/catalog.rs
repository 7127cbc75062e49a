use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::clusterer::NOISE;

/// At most this many example queries are kept per topic.
pub const MAX_TOPIC_EXAMPLES: usize = 5;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

impl CatalogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub rank: usize,
    pub cluster_id: i32,
    pub topic_name: String,
    pub description: String,
    pub count: usize,
    pub percentage: f64,
    pub representative_queries: Vec<String>,
}

/// Ranked topics discovered in one run, persisted as the topic schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCatalog {
    pub total_queries: usize,
    pub n_topics: usize,
    pub topics: Vec<Topic>,
}

impl TopicCatalog {
    pub fn topic_names(&self) -> Vec<&str> {
        self.topics.iter().map(|t| t.topic_name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Checks the structural contract: contiguous ranks from 1, descending
    /// counts, no noise cluster, bounded examples.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.n_topics != self.topics.len() {
            return Err(CatalogError::Invalid(format!(
                "n_topics is {} but {} topics are listed",
                self.n_topics,
                self.topics.len()
            )));
        }

        for (i, topic) in self.topics.iter().enumerate() {
            if topic.rank != i + 1 {
                return Err(CatalogError::Invalid(format!(
                    "topic at position {} has rank {}",
                    i, topic.rank
                )));
            }
            if topic.cluster_id == NOISE {
                return Err(CatalogError::Invalid(format!(
                    "topic {} is the noise cluster",
                    topic.rank
                )));
            }
            if topic.representative_queries.len() > MAX_TOPIC_EXAMPLES {
                return Err(CatalogError::Invalid(format!(
                    "topic {} has {} representative queries",
                    topic.rank,
                    topic.representative_queries.len()
                )));
            }
        }

        if self.topics.windows(2).any(|w| w[0].count < w[1].count) {
            return Err(CatalogError::Invalid(
                "topics are not ordered by descending count".to_string(),
            ));
        }

        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let catalog: TopicCatalog = serde_json::from_str(&contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Writes the catalog as pretty JSON via a temporary file in the target
    /// directory followed by a rename, so readers never observe a partial file.
    pub fn write_atomic(&self, path: &Path) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(self)?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| CatalogError::Invalid(format!("{} is not a file path", path.display())))?;
        let temp_path = dir.join(format!(
            ".{}.{}.tmp",
            file_name.to_string_lossy(),
            Uuid::new_v4()
        ));

        let written = (|| -> std::io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&temp_path, path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(CatalogError::io(path, e));
        }

        tracing::debug!(path = %path.display(), n_topics = self.n_topics, "catalog written");
        Ok(())
    }
}
