// Response classification: (status, headers, body) -> JobOutcome
//
// Decoding is an explicit pipeline of ordered rules. Each rule either
// recognizes the response as one `ResponseShape` or passes; the first match
// wins. Classification never fails: every input maps to some outcome.

use crate::domain::outcome::UNSPECIFIED_ERROR;
use crate::domain::{Headers, JobOutcome, JobStatus, LogEntry};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

pub const EMPTY_BODY_ERROR: &str = "empty response body";
pub const INVALID_FORMAT_ERROR: &str = "invalid response format";
pub const STATUS_ERROR_WITHOUT_DETAIL: &str = "job reported ERROR status";

/// Raw transport output being classified
pub struct RawResponse<'a> {
    pub status_code: u16,
    pub headers: &'a Headers,
    pub body: &'a [u8],
    text: String,
    json: Result<Value, String>,
}

impl<'a> RawResponse<'a> {
    pub fn new(status_code: u16, headers: &'a Headers, body: &'a [u8]) -> Self {
        Self {
            status_code,
            headers,
            body,
            text: String::from_utf8_lossy(body).into_owned(),
            json: serde_json::from_slice(body).map_err(|e| e.to_string()),
        }
    }
}

/// Follow-up identifiers and links the API returns with most responses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Links {
    pub request_id: Option<String>,
    pub response_url: Option<String>,
    pub status_url: Option<String>,
    pub cancel_url: Option<String>,
    pub gateway_request_id: Option<String>,
}

/// Every shape a response body can take
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    EmptyBody,
    HtmlPage {
        error: String,
    },
    NonJson {
        error: String,
    },
    ApiError {
        error: String,
        links: Links,
    },
    StatusReport {
        status: JobStatus,
        detail: Option<String>,
        payload: Option<Value>,
        queue_position: Option<u64>,
        logs: Option<Vec<LogEntry>>,
        metrics: Option<BTreeMap<String, f64>>,
        links: Links,
    },
    Acknowledgement {
        links: Links,
    },
    BareResult {
        document: Value,
    },
    /// A bare document returned with an HTTP error status
    HttpFailure {
        error: String,
    },
}

impl ResponseShape {
    pub fn into_outcome(self) -> JobOutcome {
        match self {
            ResponseShape::EmptyBody => JobOutcome::failure(EMPTY_BODY_ERROR),
            ResponseShape::HtmlPage { error }
            | ResponseShape::NonJson { error }
            | ResponseShape::HttpFailure { error } => JobOutcome::failure(error),
            ResponseShape::ApiError { error, links } => {
                with_links(JobOutcome::failure(error), links)
            }
            ResponseShape::StatusReport {
                status,
                detail,
                payload,
                queue_position,
                logs,
                metrics,
                links,
            } => {
                let base = if status.has_error() {
                    JobOutcome::failure(detail.unwrap_or_else(|| {
                        STATUS_ERROR_WITHOUT_DETAIL.to_string()
                    }))
                } else {
                    JobOutcome {
                        status: Some(status),
                        payload,
                        ..JobOutcome::default()
                    }
                };
                with_links(
                    JobOutcome {
                        queue_position,
                        logs,
                        metrics,
                        ..base
                    },
                    links,
                )
            }
            ResponseShape::Acknowledgement { links } => with_links(JobOutcome::default(), links),
            ResponseShape::BareResult { document } => JobOutcome::completed(document),
        }
    }
}

fn with_links(outcome: JobOutcome, links: Links) -> JobOutcome {
    JobOutcome {
        request_id: links.request_id,
        response_url: links.response_url,
        status_url: links.status_url,
        cancel_url: links.cancel_url,
        gateway_request_id: links.gateway_request_id,
        ..outcome
    }
}

type Rule = fn(&RawResponse<'_>) -> Option<ResponseShape>;

/// Classification rules, in precedence order
pub const RULES: &[(&str, Rule)] = &[
    ("empty-body", empty_body),
    ("html-page", html_page),
    ("non-json", non_json),
    ("api-error", api_error_rule),
    ("status-report", status_report_rule),
    ("acknowledgement", acknowledgement_rule),
    ("bare-result", bare_result),
];

/// Name of the first rule matching `response`
pub fn matching_rule(response: &RawResponse<'_>) -> &'static str {
    RULES
        .iter()
        .find(|(_, rule)| rule(response).is_some())
        .map(|(name, _)| *name)
        .unwrap_or("bare-result")
}

/// Decode a response into its shape
pub fn decode(response: &RawResponse<'_>) -> ResponseShape {
    for (name, rule) in RULES {
        if let Some(shape) = rule(response) {
            debug!(rule = %name, status_code = response.status_code, "Classified response");
            return shape;
        }
    }
    // non-json and bare-result between them cover every parse result
    ResponseShape::NonJson {
        error: INVALID_FORMAT_ERROR.to_string(),
    }
}

/// Classify raw transport output into a job outcome
pub fn classify(status_code: u16, headers: &Headers, body: &[u8]) -> JobOutcome {
    decode(&RawResponse::new(status_code, headers, body)).into_outcome()
}

/// Classify an already-parsed JSON document (event-stream payloads).
///
/// Only the JSON rules apply; the empty/HTML/non-JSON rules are transport
/// level and never occur mid-stream.
pub fn classify_json(value: Value) -> JobOutcome {
    decode_json(value, 200).into_outcome()
}

fn decode_json(value: Value, status_code: u16) -> ResponseShape {
    if let Value::Object(object) = &value {
        if let Some(shape) = api_error(object)
            .or_else(|| status_report(object))
            .or_else(|| acknowledgement(object))
        {
            return shape;
        }
    }
    bare_document(value, status_code)
}

// ----------------------------------------------------------------------------
// Rules
// ----------------------------------------------------------------------------

fn empty_body(response: &RawResponse<'_>) -> Option<ResponseShape> {
    response
        .text
        .trim()
        .is_empty()
        .then_some(ResponseShape::EmptyBody)
}

fn html_page(response: &RawResponse<'_>) -> Option<ResponseShape> {
    let trimmed = response.text.trim_start();
    let looks_like_html =
        trimmed.starts_with('<') || response.text.to_ascii_lowercase().contains("<!doctype");
    if !looks_like_html {
        return None;
    }

    let error = title_error(&response.text)
        .or_else(|| leading_line_error(&strip_tags(&response.text)))
        .unwrap_or_else(|| INVALID_FORMAT_ERROR.to_string());
    Some(ResponseShape::HtmlPage { error })
}

fn non_json(response: &RawResponse<'_>) -> Option<ResponseShape> {
    let parse_error = response.json.as_ref().err()?;
    let error = leading_line_error(&response.text)
        .unwrap_or_else(|| format!("invalid JSON response: {}", parse_error));
    Some(ResponseShape::NonJson { error })
}

fn document<'r>(response: &'r RawResponse<'_>) -> Option<&'r Map<String, Value>> {
    response.json.as_ref().ok()?.as_object()
}

fn api_error_rule(response: &RawResponse<'_>) -> Option<ResponseShape> {
    document(response).and_then(api_error)
}

fn status_report_rule(response: &RawResponse<'_>) -> Option<ResponseShape> {
    document(response).and_then(status_report)
}

fn acknowledgement_rule(response: &RawResponse<'_>) -> Option<ResponseShape> {
    document(response).and_then(acknowledgement)
}

fn api_error(object: &Map<String, Value>) -> Option<ResponseShape> {
    let error = match field(object, &["error"])? {
        Value::String(message) if message.trim().is_empty() => UNSPECIFIED_ERROR.to_string(),
        Value::String(message) => message.clone(),
        other => other.to_string(),
    };
    Some(ResponseShape::ApiError {
        error,
        links: links(object),
    })
}

fn status_report(object: &Map<String, Value>) -> Option<ResponseShape> {
    let raw = field(object, &["status"])?;
    let parsed = raw.as_str().and_then(JobStatus::parse);
    let (status, detail) = match parsed {
        Some(status) => (status, string_field(object, &["detail", "message"])),
        None => {
            let raw = raw.as_str().map(str::to_string).unwrap_or_else(|| raw.to_string());
            (JobStatus::Error, Some(format!("unrecognized status: {}", raw)))
        }
    };

    let payload = field(object, &["response"])
        .or_else(|| field(object, &["output"]))
        .cloned();
    let queue_position = field(object, &["queue_position", "queuePosition"]).and_then(Value::as_u64);
    let logs = field(object, &["logs"])
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(LogEntry::from_value).collect());
    let metrics = field(object, &["metrics"]).and_then(Value::as_object).map(|m| {
        m.iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
            .collect()
    });

    Some(ResponseShape::StatusReport {
        status,
        detail,
        payload,
        queue_position,
        logs,
        metrics,
        links: links(object),
    })
}

fn acknowledgement(object: &Map<String, Value>) -> Option<ResponseShape> {
    string_field(object, &["request_id", "requestId"])?;
    Some(ResponseShape::Acknowledgement {
        links: links(object),
    })
}

fn bare_result(response: &RawResponse<'_>) -> Option<ResponseShape> {
    let value = response.json.as_ref().ok()?.clone();
    Some(bare_document(value, response.status_code))
}

fn bare_document(document: Value, status_code: u16) -> ResponseShape {
    if status_code >= 400 {
        let error = document
            .as_object()
            .and_then(|object| field(object, &["detail", "message"]))
            .map(|detail| match detail {
                Value::String(s) => format!("HTTP {}: {}", status_code, s),
                other => format!("HTTP {}: {}", status_code, other),
            })
            .unwrap_or_else(|| format!("HTTP {}", status_code));
        return ResponseShape::HttpFailure { error };
    }
    ResponseShape::BareResult { document }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// First non-null value under any of `names`
fn field<'m>(object: &'m Map<String, Value>, names: &[&str]) -> Option<&'m Value> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find(|value| !value.is_null())
}

fn string_field(object: &Map<String, Value>, names: &[&str]) -> Option<String> {
    field(object, names)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn links(object: &Map<String, Value>) -> Links {
    Links {
        request_id: string_field(object, &["request_id", "requestId"]),
        response_url: string_field(object, &["response_url", "responseUrl"]),
        status_url: string_field(object, &["status_url", "statusUrl"]),
        cancel_url: string_field(object, &["cancel_url", "cancelUrl"]),
        gateway_request_id: string_field(object, &["gateway_request_id", "gatewayRequestId"]),
    }
}

fn title_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?is)<title[^>]*>\s*(\d{3})\s*:\s*(.*?)\s*</title>")
            .expect("title regex must compile")
    })
}

fn status_line_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"^(\d{3})\s*:\s*(.+?)\s*$").expect("status line regex must compile")
    })
}

fn tag_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag regex must compile"))
}

fn title_error(text: &str) -> Option<String> {
    let captures = title_regex().captures(text)?;
    let message = captures.get(2)?.as_str().trim();
    (!message.is_empty()).then(|| format!("HTTP {}: {}", &captures[1], message))
}

/// `HTTP <code>: <message>` from the first non-blank line, if it has that form
fn leading_line_error(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    let captures = status_line_regex().captures(line)?;
    Some(format!("HTTP {}: {}", &captures[1], &captures[2]))
}

fn strip_tags(text: &str) -> String {
    tag_regex().replace_all(text, "\n").into_owned()
}
