// Job Outcome - snapshot of a remote job

use super::job::JobStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Message used when a job reports ERROR without any detail
pub const UNSPECIFIED_ERROR: &str = "unknown error";

/// One log line attached to a status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
            source: None,
            timestamp: None,
        }
    }

    /// Decode a single log record. Bare strings become message-only entries.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(message) => Some(Self::new(message.clone())),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

/// Snapshot of a job's status, result or failure.
///
/// Every remote interaction produces a fresh outcome; outcomes are never
/// updated in place. At most one of `error` and `payload` is set, and an
/// `ERROR` status always carries a non-empty `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) queue_position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) logs: Option<Vec<LogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) metrics: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) response_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) status_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cancel_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) gateway_request_id: Option<String>,
}

impl JobOutcome {
    /// Failed outcome with the given detail
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            UNSPECIFIED_ERROR.to_string()
        } else {
            error
        };
        Self {
            status: Some(JobStatus::Error),
            error: Some(error),
            ..Self::default()
        }
    }

    /// Completed outcome carrying a result payload
    pub fn completed(payload: Value) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            payload: Some(payload),
            ..Self::default()
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.status
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn queue_position(&self) -> Option<u64> {
        self.queue_position
    }

    pub fn logs(&self) -> Option<&[LogEntry]> {
        self.logs.as_deref()
    }

    pub fn metrics(&self) -> Option<&BTreeMap<String, f64>> {
        self.metrics.as_ref()
    }

    pub fn response_url(&self) -> Option<&str> {
        self.response_url.as_deref()
    }

    pub fn status_url(&self) -> Option<&str> {
        self.status_url.as_deref()
    }

    pub fn cancel_url(&self) -> Option<&str> {
        self.cancel_url.as_deref()
    }

    pub fn gateway_request_id(&self) -> Option<&str> {
        self.gateway_request_id.as_deref()
    }

    pub fn is_processing(&self) -> bool {
        self.status.is_some_and(|s| s.is_processing())
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_some_and(|s| s.is_finished())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|s| s.is_success())
    }

    pub fn has_error(&self) -> bool {
        self.status.is_some_and(|s| s.has_error())
    }
}
