//! SDK Error Types

use falqueue_core::port::TransportError;
use falqueue_core::AppError;
use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Client(#[from] AppError),
}

impl From<TransportError> for SdkError {
    fn from(e: TransportError) -> Self {
        SdkError::Client(AppError::Transport(e))
    }
}
