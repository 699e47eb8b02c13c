//! Falqueue SDK - Rust Client Library for the fal.ai queue
//!
//! Wires the protocol core to the reqwest adapters.
//!
//! # Example
//!
//! ```no_run
//! use falqueue_sdk::FalClient;
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // FAL_KEY must be set
//!     let client = FalClient::from_env()?;
//!
//!     let input = json!({"prompt": "a lighthouse at dusk", "image_urls": "https://example.com/a.png"});
//!     let request = client.request("fal-ai/flux/dev", input.as_object().cloned().unwrap_or_default());
//!
//!     let submitted = client.queue().submit(&request)?;
//!     let request_id = submitted.request_id().unwrap_or_default().to_string();
//!
//!     for update in client.queue().stream_status("fal-ai/flux/dev", &request_id, false)? {
//!         println!("{:?}", update?.status());
//!     }
//!
//!     let result = client.queue().result("fal-ai/flux/dev", &request_id)?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::{webhook_verifier, FalClient};
pub use config::{
    ClientConfig, DEFAULT_QUEUE_URL, DEFAULT_RUN_URL, DEFAULT_STREAM_TIMEOUT_SECS,
    DEFAULT_TIMEOUT_SECS,
};
pub use error::{Result, SdkError};

pub use falqueue_core::domain::{Headers, JobOutcome, JobRequest, JobStatus, QueuePriority};
pub use falqueue_core::port::{KeyCache, MemoryKeyCache};
pub use falqueue_core::{AppError, StatusStream, VerificationError, WebhookVerifier};
