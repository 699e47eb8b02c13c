// Falqueue Core - Domain Logic & Ports
// NO infrastructure dependencies (hexagonal: adapters live in sibling crates)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{JobClient, StatusStream, VerificationError, WebhookVerifier};
pub use domain::{Headers, JobOutcome, JobRequest, JobStatus, QueuePriority};
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
