use super::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replays canned completions in order; the last one repeats.
struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            match script.front() {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(_)) | None => Err(GenerationError::EmptyCompletion),
            }
        }
    }
}

/// Always rambles, and remembers when each call arrived.
struct TimedGenerator {
    arrivals: Mutex<Vec<std::time::Instant>>,
}

#[async_trait]
impl TextGenerator for TimedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        self.arrivals.lock().unwrap().push(std::time::Instant::now());
        Ok("I could not decide on a name for these.".to_string())
    }
}

struct SlowGenerator;

#[async_trait]
impl TextGenerator for SlowGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(r#"{"topic_name": "Too Late", "description": "never seen"}"#.to_string())
    }
}

fn fast_settings(max_retries: u32) -> LabelerSettings {
    LabelerSettings {
        call_timeout: Duration::from_millis(200),
        retry: RetryConfig::default()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false),
        pacing: Duration::ZERO,
        ..Default::default()
    }
}

fn exemplars() -> Vec<String> {
    vec![
        "I was charged twice for my order".to_string(),
        "Why is there an extra fee on my bill?".to_string(),
    ]
}

#[test]
fn test_parse_fenced_block() {
    let text = "Sure!\n```json\n{\"topic_name\": \"Billing\", \"description\": \"Charges\"}\n```";
    let parsed = parse_label(text).unwrap();

    assert_eq!(parsed.strategy, ParseStrategy::FencedBlock);
    assert_eq!(parsed.fields.topic_name, "Billing");
    assert_eq!(parsed.fields.description, "Charges");
}

#[test]
fn test_parse_untagged_fence() {
    let text = "```\n{\"topic_name\": \"Returns\", \"description\": \"Sending items back\"}\n```";
    let parsed = parse_label(text).unwrap();
    assert_eq!(parsed.strategy, ParseStrategy::FencedBlock);
    assert_eq!(parsed.fields.topic_name, "Returns");
}

#[test]
fn test_parse_brace_scan() {
    let text = "Here is the label: {\"topic_name\": \"Shipping Delays\", \"description\": \"Late parcels\"} hope it helps";
    let parsed = parse_label(text).unwrap();

    assert_eq!(parsed.strategy, ParseStrategy::BraceScan);
    assert_eq!(parsed.fields.topic_name, "Shipping Delays");
}

#[test]
fn test_parse_whole_text_trims_fields() {
    let text = "{\"topic_name\": \"  Password Reset \", \"description\": \" Login help \"}";
    let parsed = parse_label(text).unwrap();

    // brace scan covers the same span as the whole text, so it wins
    assert_eq!(parsed.strategy, ParseStrategy::BraceScan);
    assert_eq!(parsed.fields.topic_name, "Password Reset");
    assert_eq!(parsed.fields.description, "Login help");
}

#[test]
fn test_parse_falls_through_broken_fence() {
    let text = "```json\n{\"topic_name\": }\n```\nActually: {\"topic_name\": \"Refunds\"}";
    let failure = parse_label(text).unwrap_err();
    // fence is broken and the brace span covers both objects
    assert_eq!(failure.tried, 3);

    let text = "```json\n{broken}\n```";
    assert!(parse_label(text).is_err());
}

#[test]
fn test_parse_rejects_prose_and_empty_names() {
    let failure = parse_label("I think these are about billing.").unwrap_err();
    assert_eq!(failure.tried, 1);

    assert!(parse_label("{\"topic_name\": \"   \", \"description\": \"x\"}").is_err());
    assert!(parse_label("{\"description\": \"no name\"}").is_err());
}

#[test]
fn test_prompt_caps_exemplars() {
    let queries: Vec<String> = (0..12).map(|i| format!("query number {}", i)).collect();
    let prompt = build_label_prompt(&queries);

    assert!(prompt.contains("- query number 7"));
    assert!(!prompt.contains("- query number 8"));
    assert!(prompt.contains("\"topic_name\""));
    assert!(prompt.contains("\"description\""));
}

#[test]
fn test_retry_delay_grows_and_caps() {
    let config = RetryConfig::default().with_jitter(false);
    assert_eq!(config.delay_for(0), Duration::from_millis(500));
    assert_eq!(config.delay_for(1), Duration::from_millis(1000));
    assert_eq!(config.delay_for(10), Duration::from_millis(5000));

    let jittered = RetryConfig::default().delay_for(0);
    assert!(jittered >= Duration::from_millis(500) && jittered <= Duration::from_millis(750));
}

#[test]
fn test_generation_error_retryability() {
    assert!(GenerationError::Timeout(Duration::from_secs(1)).is_retryable());
    assert!(
        GenerationError::ServerError {
            status: 429,
            body: String::new()
        }
        .is_retryable()
    );
    assert!(
        GenerationError::ServerError {
            status: 503,
            body: String::new()
        }
        .is_retryable()
    );
    assert!(
        !GenerationError::ServerError {
            status: 401,
            body: String::new()
        }
        .is_retryable()
    );
    assert!(!GenerationError::MissingApiKey.is_retryable());
}

#[tokio::test]
async fn test_label_from_fenced_completion() {
    let generator = ScriptedGenerator::replying(
        "```json\n{\"topic_name\": \"Billing\", \"description\": \"Charges\"}\n```",
    );
    let labeler = ClusterLabeler::new(generator.clone(), fast_settings(2));

    let label = labeler.label(&exemplars(), 3).await;
    assert_eq!(
        label,
        TopicLabel {
            topic_name: "Billing".to_string(),
            description: "Charges".to_string(),
            error: false,
        }
    );
    assert_eq!(generator.calls(), 1);
    assert!(generator.prompts.lock().unwrap()[0].contains("- I was charged twice"));
}

#[tokio::test]
async fn test_unparseable_prose_falls_back_after_retries() {
    let generator = ScriptedGenerator::replying("These customers are upset about money.");
    let labeler = ClusterLabeler::new(generator.clone(), fast_settings(2));

    let label = labeler.label(&exemplars(), 7).await;
    assert!(label.error);
    assert_eq!(label.topic_name, "Topic 7");
    assert!(label.description.starts_with("Error during labeling:"));
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let generator = ScriptedGenerator::new(vec![
        Err(GenerationError::ServerError {
            status: 429,
            body: "slow down".to_string(),
        }),
        Ok("not json".to_string()),
        Ok("{\"topic_name\": \"Order Status\", \"description\": \"Tracking\"}".to_string()),
    ]);
    let labeler = ClusterLabeler::new(generator.clone(), fast_settings(2));

    let label = labeler.label(&exemplars(), 0).await;
    assert!(!label.error);
    assert_eq!(label.topic_name, "Order Status");
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_non_retryable_failure_falls_back_immediately() {
    let generator = ScriptedGenerator::new(vec![
        Err(GenerationError::MissingApiKey),
        Ok("{\"topic_name\": \"Unreached\"}".to_string()),
    ]);
    let labeler = ClusterLabeler::new(generator.clone(), fast_settings(2));

    let label = labeler.label(&exemplars(), 4).await;
    assert!(label.error);
    assert!(label.description.contains("API key"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_timeout_is_a_labeling_failure() {
    let labeler = ClusterLabeler::new(Arc::new(SlowGenerator), fast_settings(0));

    let label = labeler.label(&exemplars(), 12).await;
    assert!(label.error);
    assert_eq!(label.topic_name, "Topic 12");
    assert!(label.description.contains("Timeout"));
}

#[tokio::test]
async fn test_retries_respect_pacing_floor() {
    let pacing = Duration::from_millis(80);
    let generator = Arc::new(TimedGenerator {
        arrivals: Mutex::new(Vec::new()),
    });
    let labeler = ClusterLabeler::new(
        generator.clone(),
        LabelerSettings {
            pacing,
            ..fast_settings(2)
        },
    );

    // two clusters, each failing through its full retry budget
    let first = labeler.label(&exemplars(), 0).await;
    let second = labeler.label(&exemplars(), 1).await;
    assert!(first.error && second.error);

    let arrivals = generator.arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 6);
    for pair in arrivals.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= pacing, "gap {:?} below floor {:?}", gap, pacing);
    }
}

#[test]
fn test_default_pacing_floor() {
    assert_eq!(LabelerSettings::default().pacing, Duration::from_secs(2));
}

#[tokio::test]
async fn test_empty_exemplars_skip_the_call() {
    let generator = ScriptedGenerator::replying("{\"topic_name\": \"X\"}");
    let labeler = ClusterLabeler::new(generator.clone(), fast_settings(2));

    let label = labeler.label(&[], 5).await;
    assert_eq!(label, TopicLabel::fallback(5, "No queries provided"));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_client_without_api_key_is_not_retryable() {
    let client = ChatCompletionsClient::new(DEFAULT_BASE_URL, None).unwrap();
    let request = GenerationRequest {
        system: LABEL_SYSTEM_PROMPT.to_string(),
        prompt: "hello".to_string(),
        model: DEFAULT_LABEL_MODEL.to_string(),
        temperature: 0.3,
        max_tokens: 10,
    };

    let err = client.generate(&request).await.unwrap_err();
    assert!(matches!(err, GenerationError::MissingApiKey));
}

// Integration test - requires GROQ_API_KEY and network access
#[tokio::test]
#[ignore]
async fn test_live_labeling() {
    let client =
        ChatCompletionsClient::new(DEFAULT_BASE_URL, std::env::var("GROQ_API_KEY").ok()).unwrap();
    let labeler = ClusterLabeler::new(Arc::new(client), LabelerSettings::default());

    let label = labeler.label(&exemplars(), 0).await;
    assert!(!label.error, "{:?}", label);
}
