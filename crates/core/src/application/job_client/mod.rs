// Job Client - queue operations over an injected transport

pub mod wire;


use super::classify::classify;
use super::endpoint::{resolve, EndpointPolicies};
use super::normalize::InputNormalizer;
use super::stream::StatusStream;
use crate::domain::{JobOutcome, JobRequest};
use crate::error::Result;
use crate::port::{HttpRequest, Transport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use wire::{request_path, streaming_body, submission_body, EVENT_STREAM, LOGS_QUERY, WEBHOOK_QUERY};

/// Queue client (submit, inspect, cancel, stream).
///
/// Remote failures come back as ERROR outcomes; only transport failures and
/// invalid identifiers are returned as errors.
pub struct JobClient {
    transport: Arc<dyn Transport>,
    run_transport: Option<Arc<dyn Transport>>,
    normalizer: InputNormalizer,
    policies: EndpointPolicies,
}

impl JobClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            run_transport: None,
            normalizer: InputNormalizer::default(),
            policies: EndpointPolicies::default(),
        }
    }

    /// Transport for direct (non-queued) runs; defaults to the queue transport
    pub fn with_run_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.run_transport = Some(transport);
        self
    }

    pub fn with_normalizer(mut self, normalizer: InputNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_policies(mut self, policies: EndpointPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn policies(&self) -> &EndpointPolicies {
        &self.policies
    }

    /// Submit a job to the queue
    pub fn submit(&self, request: &JobRequest) -> Result<JobOutcome> {
        let http = self.submission(request)?;
        info!(
            identifier = %request.identifier(),
            path = %http.path,
            webhook = request.webhook_url().is_some(),
            "Submitting job"
        );
        self.execute(&*self.transport, &http)
    }

    /// Current status snapshot, optionally with logs
    pub fn status(&self, identifier: &str, request_id: &str, with_logs: bool) -> Result<JobOutcome> {
        let path = resolve(identifier, self.policies.status)?;
        let mut http = HttpRequest::get(request_path(&path, request_id, Some("status"))?);
        if with_logs {
            http = http.with_query(LOGS_QUERY, "1");
        }
        debug!(request_id = %request_id, "Checking job status");
        self.execute(&*self.transport, &http)
    }

    /// Fetch the result of a finished job
    pub fn result(&self, identifier: &str, request_id: &str) -> Result<JobOutcome> {
        let path = resolve(identifier, self.policies.result)?;
        let http = HttpRequest::get(request_path(&path, request_id, None)?);
        debug!(request_id = %request_id, "Fetching job result");
        self.execute(&*self.transport, &http)
    }

    pub fn cancel(&self, identifier: &str, request_id: &str) -> Result<JobOutcome> {
        let path = resolve(identifier, self.policies.cancel)?;
        let http = HttpRequest::put(request_path(&path, request_id, Some("cancel"))?);
        info!(request_id = %request_id, "Cancelling job");
        self.execute(&*self.transport, &http)
    }

    /// Stream status updates until the job completes.
    ///
    /// A broken event stream falls back to a single status check.
    pub fn stream_status(
        &self,
        identifier: &str,
        request_id: &str,
        with_logs: bool,
    ) -> Result<StatusStream> {
        let path = resolve(identifier, self.policies.stream)?;
        let mut stream =
            HttpRequest::get(request_path(&path, request_id, Some("status/stream"))?)
                .with_header("Accept", EVENT_STREAM);
        let mut fallback = HttpRequest::get(request_path(&path, request_id, Some("status"))?);
        if with_logs {
            stream = stream.with_query(LOGS_QUERY, "1");
            fallback = fallback.with_query(LOGS_QUERY, "1");
        }

        debug!(request_id = %request_id, path = %stream.path, "Opening status stream");
        Ok(StatusStream::open(self.transport.clone(), &stream, fallback)?)
    }

    /// Submit and stream the job's updates in one call.
    ///
    /// A broken event stream falls back to a plain submission.
    pub fn submit_streaming(&self, request: &JobRequest) -> Result<StatusStream> {
        let path = resolve(request.identifier(), self.policies.submit)?;
        let stream = HttpRequest::post(
            path,
            Value::Object(streaming_body(request, &self.normalizer)),
        )
        .with_header("Accept", EVENT_STREAM);
        let fallback = self.submission(request)?;

        info!(identifier = %request.identifier(), path = %stream.path, "Submitting streaming job");
        Ok(StatusStream::open(self.transport.clone(), &stream, fallback)?)
    }

    /// Run a job synchronously, bypassing the queue
    pub fn run(&self, request: &JobRequest) -> Result<JobOutcome> {
        let path = resolve(request.identifier(), self.policies.run)?;
        let http = HttpRequest::post(
            path,
            Value::Object(submission_body(request, &self.normalizer)),
        );
        let transport = self.run_transport.as_ref().unwrap_or(&self.transport);
        info!(identifier = %request.identifier(), path = %http.path, "Running job");
        self.execute(&**transport, &http)
    }

    fn submission(&self, request: &JobRequest) -> Result<HttpRequest> {
        let path = resolve(request.identifier(), self.policies.submit)?;
        let mut http = HttpRequest::post(
            path,
            Value::Object(submission_body(request, &self.normalizer)),
        );
        if let Some(url) = request.webhook_url() {
            http = http.with_query(WEBHOOK_QUERY, url);
        }
        Ok(http)
    }

    fn execute(&self, transport: &dyn Transport, request: &HttpRequest) -> Result<JobOutcome> {
        let response = transport.send(request)?;
        let outcome = classify(response.status, &response.headers, &response.body);
        debug!(
            method = %request.method,
            path = %request.path,
            http_status = response.status,
            status = ?outcome.status(),
            "Request classified"
        );
        Ok(outcome)
    }
}
