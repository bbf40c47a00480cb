//! Repository errors

use std::io;
use std::path::PathBuf;

/// Errors returned by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("repository root path is empty")]
    EmptyRoot,

    #[error("artifact filename is empty")]
    EmptyFilename,

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotDir(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotFile(PathBuf),

    #[error("version {0} is already in the repository")]
    AlreadyAdded(String),

    #[error("invalid semantic version: '{0}'")]
    InvalidVersion(String),

    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
