//! Fal Client Implementation

use crate::config::ClientConfig;
use crate::error::Result;
use falqueue_core::application::{JobClient, WebhookVerifier};
use falqueue_core::domain::{JobOutcome, JobRequest};
use falqueue_core::port::time_provider::SystemTimeProvider;
use falqueue_core::port::{KeyCache, Transport};
use falqueue_infra_http::{HttpKeyFetcher, ReqwestTransport};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// High-level client for the queue and direct-run APIs.
///
/// # Example
///
/// ```no_run
/// use falqueue_sdk::{ClientConfig, FalClient};
/// use serde_json::json;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = FalClient::new(ClientConfig::new("my-key"))?;
/// let input = json!({"prompt": "a lighthouse at dusk"});
/// let request = client.request("fal-ai/fast-sdxl", input.as_object().cloned().unwrap_or_default());
///
/// let outcome = client.queue().submit(&request)?;
/// println!("queued as {:?}", outcome.request_id());
/// # Ok(())
/// # }
/// ```
pub struct FalClient {
    config: ClientConfig,
    jobs: JobClient,
}

impl FalClient {
    /// Build a client over the reqwest adapters
    pub fn new(config: ClientConfig) -> Result<Self> {
        let queue: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(
            config.queue_url.clone(),
            config.api_key.clone(),
            config.timeout,
            config.stream_timeout,
        )?);
        let run: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(
            config.run_url.clone(),
            config.api_key.clone(),
            config.timeout,
            config.stream_timeout,
        )?);
        debug!(queue_url = %config.queue_url, run_url = %config.run_url, "Fal client created");

        Ok(Self::with_transports(config, queue, run))
    }

    /// Build a client from `FAL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Build a client over caller-supplied transports
    pub fn with_transports(
        config: ClientConfig,
        queue: Arc<dyn Transport>,
        run: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            jobs: JobClient::new(queue).with_run_transport(run),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Queue operations (submit, status, result, cancel, streams)
    pub fn queue(&self) -> &JobClient {
        &self.jobs
    }

    /// New request carrying the configured default webhook, if any
    pub fn request(&self, identifier: impl Into<String>, input: Map<String, Value>) -> JobRequest {
        let request = JobRequest::new(identifier, input);
        match &self.config.webhook_url {
            Some(url) => request.with_webhook(url.clone()),
            None => request,
        }
    }

    /// Run a job synchronously on the direct host
    pub fn run(&self, request: &JobRequest) -> Result<JobOutcome> {
        Ok(self.jobs.run(request)?)
    }

    /// Webhook verifier using `cache` for the public key
    pub fn webhook_verifier(&self, cache: Arc<dyn KeyCache>) -> Result<WebhookVerifier> {
        webhook_verifier(self.config.timeout, cache)
    }
}

/// Webhook verifier over the HTTP key fetcher and the system clock.
///
/// Needs no API key, so webhook receivers can verify without a full client.
pub fn webhook_verifier(timeout: Duration, cache: Arc<dyn KeyCache>) -> Result<WebhookVerifier> {
    let fetcher = HttpKeyFetcher::new(timeout)?;
    Ok(WebhookVerifier::new(
        cache,
        Arc::new(fetcher),
        Arc::new(SystemTimeProvider),
    ))
}
