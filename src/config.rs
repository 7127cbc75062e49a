use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::clusterer::ClusterParams;
use crate::embedder::EmbeddingModelInfo;
use crate::labeler::{DEFAULT_BASE_URL, DEFAULT_LABEL_MODEL, LabelerSettings, RetryConfig};
use crate::pipeline::DiscoverySettings;
use crate::reducer::UmapParams;

/// Environment variables with this prefix override file settings, e.g.
/// `TOPICLENS__CLUSTERING__MIN_CLUSTER_SIZE=25`.
pub const ENV_PREFIX: &str = "TOPICLENS";
pub const DEFAULT_CONFIG_NAME: &str = "topiclens";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Remote sentence-embedding server.
    Http,
    /// Local feature hashing, no model required.
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub backend: EmbeddingBackend,
    pub endpoint: String,
    pub model: EmbeddingModelInfo,
    pub timeout_secs: u64,
    /// Vector size for the hashing backend.
    pub hashing_dim: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Http,
            endpoint: "http://localhost:18115".to_string(),
            model: EmbeddingModelInfo::default(),
            timeout_secs: 120,
            hashing_dim: 384,
        }
    }
}

impl EmbeddingSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingSection {
    pub base_url: String,
    pub model: String,
    /// Falls back to `GROQ_API_KEY` when unset.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub call_timeout_secs: u64,
    pub retry: RetryConfig,
    /// Minimum spacing between generation calls, retries included.
    pub pacing_ms: u64,
}

impl Default for LabelingSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_LABEL_MODEL.to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 200,
            call_timeout_secs: 30,
            retry: RetryConfig::default(),
            pacing_ms: 2_000,
        }
    }
}

impl LabelingSection {
    pub fn labeler_settings(&self) -> LabelerSettings {
        LabelerSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            retry: self.retry,
            pacing: Duration::from_millis(self.pacing_ms),
        }
    }

    /// Configured key, else the `GROQ_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingSection,
    pub reduction: UmapParams,
    pub clustering: ClusterParams,
    pub labeling: LabelingSection,
    pub discovery: DiscoverySettings,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingSection::default(),
            reduction: UmapParams::default(),
            clustering: ClusterParams::default(),
            labeling: LabelingSection::default(),
            discovery: DiscoverySettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `path` (required) or `topiclens.toml` in the working directory
    /// (optional), then applies `TOPICLENS__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config: AppConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.model.dim == 0 || self.embedding.hashing_dim == 0 {
            return Err(ConfigError::Invalid(
                "embedding dimension must be positive".to_string(),
            ));
        }
        self.reduction
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.clustering.min_cluster_size < 2 {
            return Err(ConfigError::Invalid(
                "clustering.min_cluster_size must be at least 2".to_string(),
            ));
        }
        if self.discovery.target_topics == 0 {
            return Err(ConfigError::Invalid(
                "discovery.target_topics must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file() -> NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.reduction.n_components, 5);
        assert_eq!(cfg.reduction.n_neighbors, 15);
        assert_eq!(cfg.reduction.seed, 42);
        assert_eq!(cfg.clustering.min_cluster_size, 50);
        assert_eq!(cfg.clustering.min_samples, 10);
        assert_eq!(cfg.discovery.target_topics, 10);
        assert_eq!(cfg.labeling.labeler_settings().pacing, Duration::from_secs(2));
        assert_eq!(cfg.labeling.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.labeling.retry.max_retries, 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = toml_file();
        writeln!(
            file,
            r#"
log_level = "debug"

[clustering]
min_cluster_size = 15

[embedding]
backend = "hashing"
hashing_dim = 256

[labeling.retry]
max_retries = 4
"#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.clustering.min_cluster_size, 15);
        // untouched fields keep their defaults
        assert_eq!(cfg.clustering.min_samples, 10);
        assert_eq!(cfg.embedding.backend, EmbeddingBackend::Hashing);
        assert_eq!(cfg.embedding.hashing_dim, 256);
        assert_eq!(cfg.embedding.model.dim, 384);
        assert_eq!(cfg.labeling.retry.max_retries, 4);
        assert_eq!(cfg.labeling.retry.base_delay_ms, 500);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/topiclens.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut file = toml_file();
        writeln!(file, "[discovery]\ntarget_topics = 0").unwrap();

        let result = AppConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_labeler_settings_from_section() {
        let section = LabelingSection {
            call_timeout_secs: 5,
            api_key: Some("key-from-config".to_string()),
            ..Default::default()
        };

        let settings = section.labeler_settings();
        assert_eq!(settings.call_timeout, Duration::from_secs(5));
        assert_eq!(settings.max_tokens, 200);
        assert_eq!(section.resolve_api_key().as_deref(), Some("key-from-config"));
    }
}
