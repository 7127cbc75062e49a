// Public API exports
pub mod assembler;
pub mod catalog;
pub mod classifier;
pub mod clusterer;
pub mod config;
pub mod embedder;
pub mod error;
pub mod input;
pub mod labeler;
pub mod pipeline;
pub mod progress;
pub mod reducer;
pub mod sampler;

// Re-export main types for convenience
pub use embedder::{
    Batcher, EmbedError, Embedder, EmbeddingClient, EmbeddingModelInfo, HashingEmbedder,
};

pub use reducer::{DimensionReducer, ReduceError, Umap, UmapParams};

pub use clusterer::{
    ClusterError, ClusterParams, ClusterSummary, Clusterer, HdbscanClusterer, NOISE,
};

pub use labeler::{
    ChatCompletionsClient, ClusterLabeler, GenerationError, GenerationRequest, LabelerSettings,
    TextGenerator, TopicLabel,
};

pub use assembler::{DEFAULT_TARGET_TOPICS, assemble, rank_clusters};
pub use catalog::{CatalogError, Topic, TopicCatalog};
pub use classifier::{AccuracyReport, Classification, Confidence, TopicClassifier};
pub use self::config::{AppConfig, ConfigError};
pub use error::DiscoveryError;
pub use pipeline::{DiscoveryReport, DiscoverySettings, TopicDiscoverer};
pub use progress::{ProgressReporter, ProgressSnapshot, Stage};
