use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use topiclens::classifier::holdout_samples;
use topiclens::config::EmbeddingBackend;
use topiclens::input::load_queries;
use topiclens::{
    AppConfig, ChatCompletionsClient, ClusterLabeler, Embedder, EmbeddingClient, HashingEmbedder,
    HdbscanClusterer, TextGenerator, TopicCatalog, TopicClassifier, TopicDiscoverer, Umap,
};
use tracing_subscriber::{EnvFilter, fmt};

/// Topic discovery for customer-service queries
#[derive(Parser)]
#[command(name = "topiclens")]
#[command(version)]
#[command(about = "Discover, label and classify topics in customer-service queries")]
struct Cli {
    /// Configuration file (defaults to ./topiclens.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the discovery pipeline and write a topic catalog
    Discover {
        /// JSON array of strings, or one query per line
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the catalog JSON
        #[arg(short, long)]
        output: PathBuf,

        /// Number of topics to keep (overrides config)
        #[arg(short = 'n', long)]
        target_topics: Option<usize>,

        /// Use the local hashing embedder instead of the embedding server
        #[arg(long)]
        offline: bool,
    },
    /// Classify queries against an existing catalog
    Classify {
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Measure few-shot accuracy on held-out representative queries
    Evaluate {
        #[arg(short, long)]
        catalog: PathBuf,

        /// Maximum number of held-out samples
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.log_level, cli.json_logs);

    match cli.command {
        Command::Discover {
            input,
            output,
            target_topics,
            offline,
        } => discover(&config, &input, &output, target_topics, offline).await,
        Command::Classify { catalog, queries } => classify(&config, &catalog, &queries).await,
        Command::Evaluate { catalog, limit } => evaluate(&config, &catalog, limit).await,
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn text_generator(config: &AppConfig) -> Result<Arc<dyn TextGenerator>> {
    let api_key = config.labeling.resolve_api_key();
    if api_key.is_none() {
        tracing::warn!("GROQ_API_KEY is not set; every label will be a fallback");
    }
    let client = ChatCompletionsClient::new(&config.labeling.base_url, api_key)
        .context("Failed to build text-generation client")?;
    Ok(Arc::new(client))
}

async fn build_embedder(config: &AppConfig, offline: bool) -> Result<Box<dyn Embedder>> {
    let backend = if offline {
        EmbeddingBackend::Hashing
    } else {
        config.embedding.backend
    };

    let embedder: Box<dyn Embedder> = match backend {
        EmbeddingBackend::Hashing => Box::new(HashingEmbedder::new(config.embedding.hashing_dim)),
        EmbeddingBackend::Http => Box::new(
            EmbeddingClient::connect(
                config.embedding.endpoint.clone(),
                config.embedding.model.clone(),
                config.embedding.timeout(),
            )
            .await
            .context("Embedding model is unavailable")?,
        ),
    };
    Ok(embedder)
}

async fn discover(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    target_topics: Option<usize>,
    offline: bool,
) -> Result<()> {
    let start_time = Instant::now();

    let queries = load_queries(input).context("Failed to load queries")?;
    println!("Loaded {} queries from {}", queries.len(), input.display());

    let embedder = build_embedder(config, offline).await?;
    let reducer = Umap::new(config.reduction.clone()).context("Invalid reduction settings")?;
    let clusterer = HdbscanClusterer::new(config.clustering.clone());
    let labeler = ClusterLabeler::new(text_generator(config)?, config.labeling.labeler_settings());

    let discoverer = TopicDiscoverer::new(
        embedder,
        Box::new(reducer),
        Box::new(clusterer),
        labeler,
        config.discovery.clone(),
    );

    let mut progress = discoverer.progress();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            eprintln!("[{:>3.0}%] {}", snapshot.fraction * 100.0, snapshot.message);
            if snapshot.stage.is_terminal() {
                break;
            }
        }
    });

    let target = target_topics.unwrap_or(config.discovery.target_topics);
    let result = discoverer.discover_with_report(&queries, target).await;
    drop(discoverer);
    if let Err(e) = watcher.await {
        tracing::warn!(error = %e, "progress watcher stopped abnormally");
    }
    let (catalog, report) = result.context("Topic discovery failed")?;

    catalog
        .write_atomic(output)
        .with_context(|| format!("Failed to write catalog to {}", output.display()))?;

    print_catalog(&catalog);
    println!(
        "\n✓ {} topics identified ({} clusters, {:.1}% noise, {} fallback labels) [{:.2}s]",
        catalog.n_topics,
        report.clusters.n_clusters,
        report.clusters.noise_fraction * 100.0,
        report.fallback_labels,
        start_time.elapsed().as_secs_f64()
    );
    println!("Results saved to: {}", output.display());

    Ok(())
}

fn print_catalog(catalog: &TopicCatalog) {
    println!("\n=== DISCOVERED TOPICS ===");
    for topic in &catalog.topics {
        println!("\n{}. {}", topic.rank, topic.topic_name);
        println!("   {}", topic.description);
        println!(
            "   Volume: {} queries ({:.1}%)",
            topic.count, topic.percentage
        );
        println!("   Examples:");
        for (i, query) in topic.representative_queries.iter().enumerate() {
            println!("      {}. {}", i + 1, query);
        }
    }
}

async fn classify(config: &AppConfig, catalog_path: &Path, queries: &[String]) -> Result<()> {
    let catalog = TopicCatalog::load(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
    let classifier = TopicClassifier::new(catalog, text_generator(config)?);

    let results = classifier.classify_batch(queries).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn evaluate(config: &AppConfig, catalog_path: &Path, limit: usize) -> Result<()> {
    let catalog = TopicCatalog::load(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;

    let samples = holdout_samples(&catalog, limit);
    if samples.is_empty() {
        bail!("Catalog has no held-out representative queries to evaluate on");
    }

    let classifier = TopicClassifier::new(catalog, text_generator(config)?);
    let report = classifier.evaluate_accuracy(&samples).await;

    println!("Few-shot accuracy: {:.1}%", report.accuracy * 100.0);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
