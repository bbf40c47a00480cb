//! Guest agent version repository
//!
//! Keeps verified copies of agent executables on local disk, one directory
//! per semantic version:
//!
//! ```text
//! <root>/<version>/<filename>
//! <root>/<version>/<filename>.sha256
//! ```
//!
//! The repository is reconstructed from disk on every load. Entries that fail
//! validation are deleted, and the number of cached versions is bounded by a
//! [`RetentionPolicy`].

mod checksum;
mod error;
mod repository;
mod retention;
mod version;

pub use checksum::{checksum_path, read_checksum, sha256_file, verify_artifact, write_checksum};
pub use error::{RepoError, RepoResult};
pub use repository::LocalRepository;
pub use retention::{RetentionPolicy, DEFAULT_KEEP_VERSIONS};
pub use version::{compare_versions, parse_version, sort_descending};
