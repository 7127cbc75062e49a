// client.rs - HTTP client for the sentence-embedding server
use super::{Batcher, EmbedError, Embedder, EmbeddingModelInfo, check_alignment};
use super::types::{EmbeddingRequest, EmbeddingResponse, HealthResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct EmbeddingClient {
    http: Client,
    endpoint: String,
    model: EmbeddingModelInfo,
    batcher: Batcher,
}

impl EmbeddingClient {
    pub fn new(endpoint: impl Into<String>, model: EmbeddingModelInfo) -> Result<Self, EmbedError> {
        Self::with_timeout(endpoint, model, Duration::from_secs(120))
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: EmbeddingModelInfo,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let http = Client::builder().timeout(timeout).build()?;
        let batcher = Batcher::new(model.max_batch);

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model,
            batcher,
        })
    }

    /// Build a client and verify the model is loaded. Any failure here is an
    /// initialization error: callers should abort rather than embed partially.
    pub async fn connect(
        endpoint: impl Into<String>,
        model: EmbeddingModelInfo,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let client = Self::with_timeout(endpoint, model, timeout)?;
        let health = client
            .health_check()
            .await
            .map_err(|e| EmbedError::Unavailable(format!("{} ({})", client.endpoint, e)))?;

        if !health.status.eq_ignore_ascii_case("ok") {
            return Err(EmbedError::Unavailable(format!(
                "{} reported status '{}'",
                client.endpoint, health.status
            )));
        }

        if let Some(served) = health.model.as_deref() {
            if served != client.model.name {
                tracing::warn!(
                    configured = %client.model.name,
                    served,
                    "embedding server is serving a different model"
                );
            }
        }

        tracing::info!(endpoint = %client.endpoint, model = %client.model.name, "embedding server ready");
        Ok(client)
    }

    /// Check if the embedding server is healthy
    pub async fn health_check(&self) -> Result<HealthResponse, EmbedError> {
        let response = self
            .http
            .get(format!("{}/health", self.endpoint))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbedError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let req = EmbeddingRequest { texts };
        let response = self
            .http
            .post(format!("{}/embed", self.endpoint))
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbedError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let res: EmbeddingResponse = response.json().await?;
        Ok(res.embeddings)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    fn model(&self) -> &EmbeddingModelInfo {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let total = self.batcher.batch_count(texts.len());
        let batches = self.batcher.split(texts);
        let mut embeddings = Vec::with_capacity(texts.len());

        for (i, batch) in batches.into_iter().enumerate() {
            let vectors = self.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbedError::CountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }
            embeddings.extend(vectors);
            tracing::debug!(batch = i + 1, total, "embedded batch");
        }

        check_alignment(texts.len(), &embeddings, Some(self.model.dim))?;
        Ok(embeddings)
    }
}
