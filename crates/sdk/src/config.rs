//! Client configuration

use crate::error::{Result, SdkError};
use std::time::Duration;

pub const ENV_API_KEY: &str = "FAL_KEY";
pub const ENV_QUEUE_URL: &str = "FAL_QUEUE_URL";
pub const ENV_RUN_URL: &str = "FAL_RUN_URL";
pub const ENV_TIMEOUT_SECS: &str = "FAL_TIMEOUT_SECS";
pub const ENV_STREAM_TIMEOUT_SECS: &str = "FAL_STREAM_TIMEOUT_SECS";
pub const ENV_WEBHOOK_URL: &str = "FAL_WEBHOOK_URL";

pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";
pub const DEFAULT_RUN_URL: &str = "https://fal.run";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 300;

/// Connection settings for [`crate::FalClient`]
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub queue_url: String,
    pub run_url: String,
    pub timeout: Duration,
    /// Upper bound on an event stream once connected
    pub stream_timeout: Duration,
    /// Applied to requests built with [`crate::FalClient::request`]
    pub webhook_url: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("queue_url", &self.queue_url)
            .field("run_url", &self.run_url)
            .field("timeout", &self.timeout)
            .field("stream_timeout", &self.stream_timeout)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            run_url: DEFAULT_RUN_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            stream_timeout: Duration::from_secs(DEFAULT_STREAM_TIMEOUT_SECS),
            webhook_url: None,
        }
    }

    /// Load from `FAL_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = var(ENV_API_KEY).ok_or(SdkError::MissingApiKey(ENV_API_KEY))?;
        let mut config = Self::new(api_key);

        if let Some(url) = var(ENV_QUEUE_URL) {
            config.queue_url = url;
        }
        if let Some(url) = var(ENV_RUN_URL) {
            config.run_url = url;
        }
        if let Some(raw) = var(ENV_TIMEOUT_SECS) {
            config.timeout = parse_secs(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = var(ENV_STREAM_TIMEOUT_SECS) {
            config.stream_timeout = parse_secs(ENV_STREAM_TIMEOUT_SECS, &raw)?;
        }
        config.webhook_url = var(ENV_WEBHOOK_URL);

        Ok(config)
    }

    pub fn with_queue_url(mut self, url: impl Into<String>) -> Self {
        self.queue_url = url.into();
        self
    }

    pub fn with_run_url(mut self, url: impl Into<String>) -> Self {
        self.run_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse()
        .map(Duration::from_secs)
        .map_err(|_| SdkError::Config(format!("{} must be a whole number of seconds: {}", name, raw)))
}
