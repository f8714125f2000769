use std::time::Duration;
use thiserror::Error;

use crate::network::TransportError;

/// Error types returned by the service layer API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timed out after {0:?} waiting for the service registry lock")]
    Timeout(Duration),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl From<std::collections::TryReserveError> for ServiceError {
    fn from(err: std::collections::TryReserveError) -> Self {
        ServiceError::OutOfMemory(err.to_string())
    }
}
