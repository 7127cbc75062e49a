use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Embedding,
    Reducing,
    Clustering,
    Sampling,
    Labeling,
    Assembling,
    Complete,
    Failed,
}

impl Stage {
    /// Overall progress when a stage starts.
    pub fn base_fraction(self) -> f32 {
        match self {
            Stage::Pending => 0.0,
            Stage::Embedding => 0.05,
            Stage::Reducing => 0.30,
            Stage::Clustering => 0.45,
            Stage::Sampling => 0.55,
            Stage::Labeling => 0.60,
            Stage::Assembling => 0.95,
            Stage::Complete | Stage::Failed => 1.0,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed)
    }
}

/// Immutable view of a run's progress at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: Uuid,
    pub stage: Stage,
    pub fraction: f32,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

/// Single writer for progress snapshots; readers hold a [`watch::Receiver`].
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot {
            run_id: Uuid::nil(),
            stage: Stage::Pending,
            fraction: 0.0,
            message: "waiting".to_string(),
            updated_at: Utc::now(),
        });
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    pub fn publish(&self, run_id: Uuid, stage: Stage, message: impl Into<String>) {
        self.publish_fraction(run_id, stage, stage.base_fraction(), message);
    }

    pub fn publish_fraction(
        &self,
        run_id: Uuid,
        stage: Stage,
        fraction: f32,
        message: impl Into<String>,
    ) {
        let message = message.into();
        tracing::debug!(stage = ?stage, fraction, %message, "progress");
        self.tx.send_replace(ProgressSnapshot {
            run_id,
            stage,
            fraction: fraction.clamp(0.0, 1.0),
            message,
            updated_at: Utc::now(),
        });
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
