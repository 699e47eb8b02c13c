// Domain Layer - Pure value types shared by every component

pub mod error;
pub mod headers;
pub mod job;
pub mod outcome;

// Re-exports
pub use error::DomainError;
pub use headers::Headers;
pub use job::{JobRequest, JobStatus, QueuePriority};
pub use outcome::{JobOutcome, LogEntry};
