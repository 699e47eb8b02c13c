// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid job identifier: {0}")]
    InvalidIdentifier(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
