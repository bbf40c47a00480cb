//! Engine errors

use std::io;
use std::path::PathBuf;

use guest_repo::RepoError;
use guest_service::ServiceError;

use crate::probe::ProbeError;
use crate::release::HttpError;

/// Errors returned by [`UpdateEngine`](super::UpdateEngine) operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("repository: {0}")]
    Repo(#[from] RepoError),

    #[error("service: {0}")]
    Service(#[from] ServiceError),

    #[error("release: {0}")]
    Http(#[from] HttpError),

    #[error("installed version: {0}")]
    Probe(#[from] ProbeError),

    #[error("version {0} is not in the repository")]
    MissingVersion(String),

    #[error("invalid installed version: '{0}'")]
    InvalidVersion(String),

    #[error("install path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to install version {version}: {source}")]
    InstallFailed {
        version: String,
        source: Box<EngineError>,
    },

    #[error(
        "failed to install version {version} ({forward}) \
         and to roll back to version {previous} ({rollback})"
    )]
    RollbackFailed {
        version: String,
        previous: String,
        forward: Box<EngineError>,
        rollback: Box<EngineError>,
    },
}

impl EngineError {
    /// Service or version missing, as opposed to a hard failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::Service(e) => e.is_not_found(),
            EngineError::MissingVersion(_) => true,
            _ => false,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
