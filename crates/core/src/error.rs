// Central Error Type for the Application

use crate::application::webhook::VerificationError;
use crate::domain::DomainError;
use crate::port::TransportError;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Carried as-is from the transport
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Webhook verification failed: {0}")]
    Verification(#[from] VerificationError),
}

impl AppError {
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_not_reworded() {
        let err: AppError = TransportError::Timeout("after 60s".into()).into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Request timed out: after 60s");
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: AppError = DomainError::InvalidIdentifier("identifier is empty".into()).into();
        assert_eq!(
            err.to_string(),
            "Domain error: Invalid job identifier: identifier is empty"
        );
    }
}
