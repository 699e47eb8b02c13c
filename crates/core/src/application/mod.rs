// Application Layer - Use Cases and Business Logic

pub mod classify;
pub mod endpoint;
pub mod job_client;
pub mod normalize;
pub mod stream;
pub mod webhook;

// Re-exports
pub use classify::{classify, classify_json, ResponseShape};
pub use endpoint::{resolve, resolve_base_path, resolve_full_path, EndpointPolicies, ResolvePolicy};
pub use job_client::JobClient;
pub use normalize::{normalize, InputNormalizer};
pub use stream::{StatusStream, StreamStatusReader};
pub use webhook::{VerificationError, WebhookVerifier};
