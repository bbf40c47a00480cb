//! Filesystem-backed version repository

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::checksum::{checksum_path, verify_artifact};
use crate::error::{RepoError, RepoResult};
use crate::retention::RetentionPolicy;
use crate::version::{compare_versions, parse_version, sort_descending};

/// Prefix for in-flight `add` directories. Never a valid version name, so a
/// leftover staging directory is evicted by the next load.
const STAGING_PREFIX: &str = ".staging-";

/// Local repository of verified agent executables.
#[derive(Debug)]
pub struct LocalRepository {
    root: PathBuf,
    filename: String,
    retention: RetentionPolicy,
    /// Valid versions on disk, newest first
    versions: Vec<String>,
}

impl LocalRepository {
    /// Create a repository handle. Nothing touches the disk until [`init`].
    ///
    /// [`init`]: LocalRepository::init
    pub fn new(root: impl Into<PathBuf>, filename: impl Into<String>) -> RepoResult<Self> {
        let root = root.into();
        let filename = filename.into();
        if root.as_os_str().is_empty() {
            return Err(RepoError::EmptyRoot);
        }
        if filename.is_empty() {
            return Err(RepoError::EmptyFilename);
        }
        Ok(Self {
            root,
            filename,
            retention: RetentionPolicy::default(),
            versions: Vec::new(),
        })
    }

    /// Override the retention policy.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if needed, then load state from disk.
    pub fn init(&mut self) -> RepoResult<()> {
        create_root(&self.root)?;
        self.load()
    }

    /// Cached versions, newest first.
    pub fn list(&self) -> &[String] {
        &self.versions
    }

    /// Path of the cached binary for `version`, if present.
    pub fn get(&self, version: &str) -> Option<PathBuf> {
        self.contains(version)
            .then(|| self.version_dir(version).join(&self.filename))
    }

    /// Newest cached version.
    pub fn latest(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }

    /// Newest cached version strictly older than `version`.
    pub fn previous(&self, version: &str) -> Option<&str> {
        self.versions
            .iter()
            .find(|v| compare_versions(v, version) == Some(Ordering::Less))
            .map(String::as_str)
    }

    /// Add a binary and its adjacent `.sha256` file under `version`.
    ///
    /// Both files are copied into a staging directory and verified there
    /// before the directory is renamed into place, so a version directory
    /// only ever appears fully written.
    pub fn add(&mut self, path: &Path, version: &str) -> RepoResult<()> {
        if self.contains(version) {
            return Err(RepoError::AlreadyAdded(version.to_string()));
        }
        if parse_version(version).is_none() {
            return Err(RepoError::InvalidVersion(version.to_string()));
        }

        let checksum = checksum_path(path);
        verify_artifact(path, &checksum)?;

        let staging = self.root.join(format!("{STAGING_PREFIX}{}", Uuid::new_v4()));
        let target = self.version_dir(version);
        if let Err(err) = self
            .stage(path, &checksum, &staging)
            .and_then(|()| fs::rename(&staging, &target).map_err(RepoError::from))
        {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    debug!(
                        path = %staging.display(),
                        error = %cleanup,
                        "failed to clean staging directory"
                    );
                }
            }
            return Err(err);
        }

        self.versions.push(version.to_string());
        sort_descending(&mut self.versions);
        info!(%version, "added version to repository");
        Ok(())
    }

    /// Delete `version` from disk and reload. Absent versions are a no-op.
    pub fn remove(&mut self, version: &str) -> RepoResult<()> {
        if !self.contains(version) {
            return Ok(());
        }
        fs::remove_dir_all(self.version_dir(version))?;
        info!(%version, "removed version from repository");
        self.load()
    }

    fn contains(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    fn stage(&self, binary: &Path, checksum: &Path, staging: &Path) -> RepoResult<()> {
        fs::create_dir(staging)?;
        let staged_binary = staging.join(&self.filename);
        let staged_checksum = checksum_path(&staged_binary);
        fs::copy(binary, &staged_binary)?;
        fs::copy(checksum, &staged_checksum)?;
        verify_artifact(&staged_binary, &staged_checksum)
    }

    /// Validate every entry under the root, evict invalid ones, then apply
    /// retention.
    fn load(&mut self) -> RepoResult<()> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            match self.validate_entry(&name, &path) {
                Ok(()) => versions.push(name),
                Err(reason) => {
                    warn!(entry = %name, %reason, "evicting invalid repository entry");
                    evict(&path)?;
                }
            }
        }
        sort_descending(&mut versions);

        let excess = self.retention.excess(&versions).to_vec();
        self.versions = versions;
        if excess.is_empty() {
            debug!(versions = ?self.versions, "repository loaded");
            return Ok(());
        }

        for version in &excess {
            info!(
                %version,
                keep = self.retention.max_versions,
                "evicting version over retention bound"
            );
            fs::remove_dir_all(self.version_dir(version))?;
        }
        self.load()
    }

    fn validate_entry(&self, name: &str, path: &Path) -> RepoResult<()> {
        if parse_version(name).is_none() {
            return Err(RepoError::InvalidVersion(name.to_string()));
        }
        if !fs::symlink_metadata(path)?.is_dir() {
            return Err(RepoError::NotDir(path.to_path_buf()));
        }
        let binary = path.join(&self.filename);
        verify_artifact(&binary, &checksum_path(&binary))
    }
}

fn evict(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn create_root(root: &Path) -> RepoResult<()> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(RepoError::NotDir(root.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(root)?;
    debug!(root = %root.display(), "created repository root");
    Ok(())
}
