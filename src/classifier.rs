//! Few-shot classification of new queries against a discovered catalog.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::TopicCatalog;
use crate::labeler::{DEFAULT_LABEL_MODEL, GenerationError, GenerationRequest, TextGenerator};

pub const UNKNOWN_TOPIC: &str = "Unknown";

const CLASSIFIER_SYSTEM_PROMPT: &str =
    "You are a precise topic classifier. Respond only with the topic name.";

/// Topics that contribute examples to the prompt.
const EXAMPLE_TOPICS: usize = 8;
const EXAMPLES_PER_TOPIC: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub query: String,
    pub topic_name: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledQuery {
    pub query: String,
    pub true_topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub accuracy: f64,
    pub correct: usize,
    pub total: usize,
    pub predictions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub call_timeout: Duration,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_LABEL_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 50,
            call_timeout: Duration::from_secs(30),
        }
    }
}

pub struct TopicClassifier {
    catalog: TopicCatalog,
    generator: Arc<dyn TextGenerator>,
    settings: ClassifierSettings,
    few_shot_prompt: String,
}

impl TopicClassifier {
    pub fn new(catalog: TopicCatalog, generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_settings(catalog, generator, ClassifierSettings::default())
    }

    pub fn with_settings(
        catalog: TopicCatalog,
        generator: Arc<dyn TextGenerator>,
        settings: ClassifierSettings,
    ) -> Self {
        let few_shot_prompt = build_few_shot_prompt(&catalog);
        Self {
            catalog,
            generator,
            settings,
            few_shot_prompt,
        }
    }

    pub fn few_shot_prompt(&self) -> &str {
        &self.few_shot_prompt
    }

    pub async fn classify(&self, query: &str) -> Classification {
        if self.catalog.is_empty() {
            return unknown(query);
        }

        match self.predict(query).await {
            Ok(raw) => Classification {
                query: query.to_string(),
                topic_name: self.resolve(&raw),
                confidence: Confidence::High,
            },
            Err(e) => {
                tracing::warn!(error = %e, "classification failed");
                unknown(query)
            }
        }
    }

    pub async fn classify_batch(&self, queries: &[String]) -> Vec<Classification> {
        tracing::info!(n_queries = queries.len(), "classifying queries");

        let mut results = Vec::with_capacity(queries.len());
        for (i, query) in queries.iter().enumerate() {
            if i > 0 && i % 50 == 0 {
                tracing::info!(processed = i, total = queries.len(), "classification progress");
            }
            results.push(self.classify(query).await);
        }
        results
    }

    pub async fn evaluate_accuracy(&self, samples: &[LabeledQuery]) -> AccuracyReport {
        tracing::info!(n_samples = samples.len(), "evaluating classifier");

        let mut correct = 0;
        let mut predictions = Vec::with_capacity(samples.len());
        for sample in samples {
            let prediction = self.classify(&sample.query).await;
            if prediction.topic_name == sample.true_topic {
                correct += 1;
            }
            predictions.push(prediction.topic_name);
        }

        let accuracy = if samples.is_empty() {
            0.0
        } else {
            correct as f64 / samples.len() as f64
        };
        tracing::info!(accuracy_pct = accuracy * 100.0, correct, "few-shot accuracy");

        AccuracyReport {
            accuracy,
            correct,
            total: samples.len(),
            predictions,
        }
    }

    async fn predict(&self, query: &str) -> Result<String, GenerationError> {
        let request = GenerationRequest {
            system: CLASSIFIER_SYSTEM_PROMPT.to_string(),
            prompt: format!("{}\nQuery: \"{}\"\nTopic:", self.few_shot_prompt, query),
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let timeout = self.settings.call_timeout;
        tokio::time::timeout(timeout, self.generator.generate(&request))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))?
    }

    /// Maps raw model output onto a catalog topic name.
    fn resolve(&self, raw: &str) -> String {
        let prediction = raw.replace("**", "");
        let prediction = prediction.trim();
        let names = self.catalog.topic_names();

        if names.contains(&prediction) {
            return prediction.to_string();
        }

        let lowered = prediction.to_lowercase();
        names
            .iter()
            .find(|name| {
                let name = name.to_lowercase();
                lowered.contains(&name) || name.contains(&lowered)
            })
            .or_else(|| names.first())
            .map_or_else(|| UNKNOWN_TOPIC.to_string(), |name| name.to_string())
    }
}

fn unknown(query: &str) -> Classification {
    Classification {
        query: query.to_string(),
        topic_name: UNKNOWN_TOPIC.to_string(),
        confidence: Confidence::Low,
    }
}

pub fn build_few_shot_prompt(catalog: &TopicCatalog) -> String {
    let mut parts = vec![
        "You are a customer service query classifier. Classify queries into one of these topics:\n"
            .to_string(),
    ];

    for (i, topic) in catalog.topics.iter().enumerate() {
        parts.push(format!(
            "{}. **{}**: {}",
            i + 1,
            topic.topic_name,
            topic.description
        ));
    }

    parts.push("\n**Examples:**\n".to_string());
    for topic in catalog.topics.iter().take(EXAMPLE_TOPICS) {
        for example in topic.representative_queries.iter().take(EXAMPLES_PER_TOPIC) {
            parts.push(format!("Query: \"{}\"", example));
            parts.push(format!("Topic: {}\n", topic.topic_name));
        }
    }

    parts.push("\n**Task**: Classify the following query into ONE of the topics above.\n".to_string());
    parts.push("Respond with ONLY the topic name, nothing else.\n".to_string());

    parts.join("\n")
}

/// Representative queries not shown as prompt examples, paired with their
/// topic, up to `limit` samples.
pub fn holdout_samples(catalog: &TopicCatalog, limit: usize) -> Vec<LabeledQuery> {
    catalog
        .topics
        .iter()
        .flat_map(|topic| {
            topic
                .representative_queries
                .iter()
                .skip(EXAMPLES_PER_TOPIC)
                .map(|query| LabeledQuery {
                    query: query.clone(),
                    true_topic: topic.topic_name.clone(),
                })
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Topic;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers by looking for a keyword of the query in its table.
    struct KeywordGenerator {
        answers: HashMap<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for KeywordGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let query = request
                .prompt
                .rsplit("Query: ")
                .next()
                .unwrap_or_default();
            self.answers
                .iter()
                .find(|(keyword, _)| query.contains(*keyword))
                .map(|(_, answer)| answer.to_string())
                .ok_or(GenerationError::ServerError {
                    status: 503,
                    body: "unavailable".to_string(),
                })
        }
    }

    fn generator(pairs: &[(&'static str, &'static str)]) -> Arc<KeywordGenerator> {
        Arc::new(KeywordGenerator {
            answers: pairs.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn topic(rank: usize, name: &str, queries: &[&str]) -> Topic {
        Topic {
            rank,
            cluster_id: rank as i32,
            topic_name: name.to_string(),
            description: format!("{} requests", name),
            count: 100 - rank,
            percentage: 10.0,
            representative_queries: queries.iter().map(|q| q.to_string()).collect(),
        }
    }

    fn catalog() -> TopicCatalog {
        TopicCatalog {
            total_queries: 300,
            n_topics: 2,
            topics: vec![
                topic(
                    1,
                    "Order Cancellation",
                    &["cancel order", "stop my order", "undo purchase", "cancel it now"],
                ),
                topic(
                    2,
                    "Refund Status",
                    &["where is my refund", "refund late", "money back", "refund pending", "no refund yet"],
                ),
            ],
        }
    }

    #[test]
    fn test_prompt_lists_topics_and_examples() {
        let prompt = build_few_shot_prompt(&catalog());

        assert!(prompt.contains("1. **Order Cancellation**: Order Cancellation requests"));
        assert!(prompt.contains("2. **Refund Status**"));
        assert!(prompt.contains("Query: \"undo purchase\""));
        assert!(!prompt.contains("Query: \"cancel it now\""));
        assert!(prompt.contains("Respond with ONLY the topic name"));
    }

    #[tokio::test]
    async fn test_exact_and_fuzzy_matches() {
        let generator = generator(&[
            ("exact", "Refund Status"),
            ("bold", "**Order Cancellation**"),
            ("wordy", "The topic is refund status."),
            ("gibberish", "Something else entirely"),
        ]);
        let classifier = TopicClassifier::new(catalog(), generator);

        let exact = classifier.classify("exact question").await;
        assert_eq!(exact.topic_name, "Refund Status");
        assert_eq!(exact.confidence, Confidence::High);

        assert_eq!(
            classifier.classify("bold question").await.topic_name,
            "Order Cancellation"
        );
        assert_eq!(
            classifier.classify("wordy question").await.topic_name,
            "Refund Status"
        );
        // no match falls back to the first topic
        assert_eq!(
            classifier.classify("gibberish question").await.topic_name,
            "Order Cancellation"
        );
    }

    #[tokio::test]
    async fn test_service_failure_is_unknown_low() {
        let classifier = TopicClassifier::new(catalog(), generator(&[]));

        let result = classifier.classify("anything").await;
        assert_eq!(result.topic_name, UNKNOWN_TOPIC);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.query, "anything");
    }

    #[tokio::test]
    async fn test_empty_catalog_skips_the_call() {
        let generator = generator(&[("q", "Refund Status")]);
        let empty = TopicCatalog {
            total_queries: 0,
            n_topics: 0,
            topics: Vec::new(),
        };
        let classifier = TopicClassifier::new(empty, generator.clone());

        let result = classifier.classify("q").await;
        assert_eq!(result.topic_name, UNKNOWN_TOPIC);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_keeps_order() {
        let classifier = TopicClassifier::new(
            catalog(),
            generator(&[("cancel", "Order Cancellation"), ("refund", "Refund Status")]),
        );
        let queries = vec!["refund please".to_string(), "cancel please".to_string()];

        let results = classifier.classify_batch(&queries).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].query, "refund please");
        assert_eq!(results[0].topic_name, "Refund Status");
        assert_eq!(results[1].topic_name, "Order Cancellation");
    }

    #[test]
    fn test_holdout_skips_prompt_examples() {
        let samples = holdout_samples(&catalog(), 50);
        let queries: Vec<&str> = samples.iter().map(|s| s.query.as_str()).collect();

        assert_eq!(queries, vec!["cancel it now", "refund pending", "no refund yet"]);
        assert_eq!(samples[0].true_topic, "Order Cancellation");
        assert_eq!(holdout_samples(&catalog(), 2).len(), 2);
    }

    #[tokio::test]
    async fn test_evaluate_accuracy() {
        let classifier = TopicClassifier::new(
            catalog(),
            generator(&[("cancel", "Order Cancellation"), ("refund", "Order Cancellation")]),
        );
        let samples = holdout_samples(&catalog(), 50);

        let report = classifier.evaluate_accuracy(&samples).await;
        assert_eq!(report.total, 3);
        assert_eq!(report.correct, 1);
        assert!((report.accuracy - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.predictions.len(), 3);

        let empty = classifier.evaluate_accuracy(&[]).await;
        assert_eq!(empty.accuracy, 0.0);
    }
}
