//! Service controller errors

use std::io;
use std::time::Duration;

/// Errors returned by service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service '{0}' already exists")]
    AlreadyExist(String),

    #[error("service '{0}' not found")]
    NotFound(String),

    #[error("service '{name}' did not reach the expected state within {waited:?}")]
    Timeout { name: String, waited: Duration },

    #[error("service manager is not connected")]
    Disconnected,

    #[error("'{command}' failed with status {}: {stderr}", exit_status(.status))]
    Command {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ServiceError {
    /// True for the expected "registration missing" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }

    /// True when a state transition ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Timeout { .. })
    }
}

fn exit_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
