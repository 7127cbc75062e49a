mod client;
mod parse;
mod prompt;
mod retry;

#[cfg(test)]
mod tests;

pub use client::{
    ChatCompletionsClient, DEFAULT_BASE_URL, GenerationError, GenerationRequest, TextGenerator,
};
pub use parse::{LabelFields, ParseFailure, ParseStrategy, ParsedLabel, parse_label};
pub use prompt::{LABEL_SYSTEM_PROMPT, MAX_PROMPT_EXEMPLARS, build_label_prompt};
pub use retry::{RetryConfig, RetryOutcome, retry_async};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_LABEL_MODEL: &str = "llama-3.1-8b-instant";

/// Name and description for one cluster. `error` marks a fallback label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicLabel {
    pub topic_name: String,
    pub description: String,
    #[serde(default)]
    pub error: bool,
}

impl TopicLabel {
    pub fn fallback(cluster_id: i32, message: &str) -> Self {
        Self {
            topic_name: format!("Topic {}", cluster_id),
            description: format!("Error during labeling: {}", message),
            error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelerSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub call_timeout: Duration,
    pub retry: RetryConfig,
    /// Minimum spacing between the starts of any two generation calls,
    /// retries included.
    pub pacing: Duration,
}

impl Default for LabelerSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_LABEL_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 200,
            call_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            pacing: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Error)]
pub enum LabelFailure {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

impl LabelFailure {
    /// Malformed output is worth another sample from the model.
    pub fn is_retryable(&self) -> bool {
        match self {
            LabelFailure::Generation(e) => e.is_retryable(),
            LabelFailure::Parse(_) => true,
        }
    }
}

/// Names clusters from their exemplars through a text generator.
///
/// Labeling never fails: once retries are exhausted (or the failure is not
/// worth retrying) a [`TopicLabel::fallback`] is returned instead.
pub struct ClusterLabeler {
    generator: Arc<dyn TextGenerator>,
    settings: LabelerSettings,
    last_call: Mutex<Option<Instant>>,
}

impl ClusterLabeler {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: LabelerSettings) -> Self {
        Self {
            generator,
            settings,
            last_call: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &LabelerSettings {
        &self.settings
    }

    pub async fn label(&self, exemplars: &[String], cluster_id: i32) -> TopicLabel {
        if exemplars.is_empty() {
            return TopicLabel::fallback(cluster_id, "No queries provided");
        }

        let request = GenerationRequest {
            system: LABEL_SYSTEM_PROMPT.to_string(),
            prompt: build_label_prompt(exemplars),
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let request = &request;

        let outcome = retry_async(
            &self.settings.retry,
            move |_| self.attempt(request),
            |e: &LabelFailure| e.is_retryable(),
        )
        .await;

        match outcome.result {
            Ok(fields) => TopicLabel {
                topic_name: fields.topic_name,
                description: fields.description,
                error: false,
            },
            Err(e) => {
                tracing::warn!(
                    cluster_id,
                    attempts = outcome.attempts,
                    error = %e,
                    "labeling failed, using fallback label"
                );
                TopicLabel::fallback(cluster_id, &e.to_string())
            }
        }
    }

    /// Waits until `pacing` has passed since the previous call started.
    async fn pace(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(prev) = *last_call {
            tokio::time::sleep_until(prev + self.settings.pacing).await;
        }
        *last_call = Some(Instant::now());
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<LabelFields, LabelFailure> {
        self.pace().await;

        let timeout = self.settings.call_timeout;
        let text = tokio::time::timeout(timeout, self.generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))??;

        let parsed = parse_label(&text)?;
        tracing::debug!(strategy = %parsed.strategy, "parsed label");
        Ok(parsed.fields)
    }
}
