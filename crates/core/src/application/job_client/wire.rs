// Request construction for the queue API

use crate::application::normalize::InputNormalizer;
use crate::domain::error::{DomainError, Result};
use crate::domain::JobRequest;
use serde_json::{Map, Value};

pub const WEBHOOK_QUERY: &str = "fal_webhook";
pub const LOGS_QUERY: &str = "logs";
pub const HINT_FIELD: &str = "__hint";
pub const PRIORITY_FIELD: &str = "__priority";
pub const STREAM_FIELD: &str = "stream";
pub const WEBHOOK_FIELD: &str = "webhook_url";
pub const EVENT_STREAM: &str = "text/event-stream";

/// Normalized input plus the scheduling passthrough fields
pub fn submission_body(request: &JobRequest, normalizer: &InputNormalizer) -> Map<String, Value> {
    let mut body = normalizer.normalize(request.input());
    if let Some(hint) = request.hint() {
        body.insert(HINT_FIELD.to_string(), Value::String(hint.to_string()));
    }
    if let Some(priority) = request.priority() {
        body.insert(
            PRIORITY_FIELD.to_string(),
            Value::String(priority.as_str().to_string()),
        );
    }
    body
}

/// Body for a streaming submission: the webhook travels in the body
pub fn streaming_body(request: &JobRequest, normalizer: &InputNormalizer) -> Map<String, Value> {
    let mut body = submission_body(request, normalizer);
    body.insert(STREAM_FIELD.to_string(), Value::Bool(true));
    if let Some(url) = request.webhook_url() {
        body.insert(WEBHOOK_FIELD.to_string(), Value::String(url.to_string()));
    }
    body
}

/// `<path>/requests/<request_id>[/<suffix>]`
pub fn request_path(path: &str, request_id: &str, suffix: Option<&str>) -> Result<String> {
    let request_id = request_id.trim();
    if request_id.is_empty() || request_id.contains('/') {
        return Err(DomainError::InvalidIdentifier(format!(
            "invalid request id: {:?}",
            request_id
        )));
    }
    Ok(match suffix {
        Some(suffix) => format!("{}/requests/{}/{}", path, request_id, suffix),
        None => format!("{}/requests/{}", path, request_id),
    })
}
