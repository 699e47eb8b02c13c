// Job Domain Model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Remote job status as reported by the queue API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InQueue,
    InProgress,
    Completed,
    Error,
    CancellationRequested,
    AlreadyCompleted,
}

impl JobStatus {
    /// Parse the wire representation. Unknown strings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "IN_QUEUE" => Some(JobStatus::InQueue),
            "IN_PROGRESS" => Some(JobStatus::InProgress),
            "COMPLETED" => Some(JobStatus::Completed),
            "ERROR" => Some(JobStatus::Error),
            "CANCELLATION_REQUESTED" => Some(JobStatus::CancellationRequested),
            "ALREADY_COMPLETED" => Some(JobStatus::AlreadyCompleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InQueue => "IN_QUEUE",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Error => "ERROR",
            JobStatus::CancellationRequested => "CANCELLATION_REQUESTED",
            JobStatus::AlreadyCompleted => "ALREADY_COMPLETED",
        }
    }

    /// Still waiting or running
    pub fn is_processing(&self) -> bool {
        matches!(self, JobStatus::InQueue | JobStatus::InProgress)
    }

    /// Finished, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::AlreadyCompleted
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }

    pub fn has_error(&self) -> bool {
        matches!(self, JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue priority hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    #[default]
    Normal,
    Low,
}

impl QueuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueuePriority::Normal => "normal",
            QueuePriority::Low => "low",
        }
    }
}

impl std::str::FromStr for QueuePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(QueuePriority::Normal),
            "low" => Ok(QueuePriority::Low),
            other => Err(format!("unknown queue priority: {}", other)),
        }
    }
}

/// A unit of work to submit: identifier + input, plus optional delivery and
/// scheduling hints.
///
/// Built once by the caller and consumed by the client; there are no setters
/// after construction, only the consuming `with_*` builders.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    identifier: String,
    input: Map<String, Value>,
    webhook_url: Option<String>,
    priority: Option<QueuePriority>,
    hint: Option<String>,
}

impl JobRequest {
    /// Create a new request
    ///
    /// # Arguments
    ///
    /// * `identifier` - Model id (`fal-ai/fast-sdxl`) or workflow path (`workflows/acme/foo`)
    /// * `input` - Ordered input fields sent as the JSON body
    pub fn new(identifier: impl Into<String>, input: Map<String, Value>) -> Self {
        Self {
            identifier: identifier.into(),
            input,
            webhook_url: None,
            priority: None,
            hint: None,
        }
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_priority(mut self, priority: QueuePriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Routing hint forwarded to the runner selection
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn input(&self) -> &Map<String, Value> {
        &self.input
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    pub fn priority(&self) -> Option<QueuePriority> {
        self.priority
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}
