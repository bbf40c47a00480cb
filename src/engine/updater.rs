//! Update engine
//!
//! Reconciles three version observations: the installed agent, the newest
//! cached version in the repository, and the latest published release.
//! `check` reports what `update` would do; `update` performs it with
//! rollback to the previous cached version when an install fails.
//!
//! Repository mutation always completes before the service is touched, so
//! the service never points at an artifact that has not been verified.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use guest_repo::{checksum_path, compare_versions, parse_version, write_checksum};
use guest_service::ServiceSpec;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use super::action::{Action, Step};
use super::collaborators::{
    ArtifactSource, InstalledVersionProbe, PublishedVersions, Repository, ServiceControl,
};
use super::error::{EngineError, EngineResult};
use crate::cancel::CancelToken;

/// Collaborators injected into the engine.
pub struct Collaborators {
    pub repository: Box<dyn Repository>,
    pub service: Box<dyn ServiceControl>,
    pub published: Box<dyn PublishedVersions>,
    pub artifacts: Box<dyn ArtifactSource>,
    pub probe: Box<dyn InstalledVersionProbe>,
}

/// Host paths and service registration for the installed agent.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    /// Directory holding only the agent executable
    pub install_dir: PathBuf,
    /// Executable file name, also the artifact name in the repository
    pub executable: String,
    /// Scratch space for downloads
    pub temp_dir: PathBuf,
    /// Service registration; `executable` points into `install_dir`
    pub service: ServiceSpec,
}

impl InstallLayout {
    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(&self.executable)
    }
}

pub struct UpdateEngine {
    repo: Box<dyn Repository>,
    service: Box<dyn ServiceControl>,
    published: Box<dyn PublishedVersions>,
    artifacts: Box<dyn ArtifactSource>,
    probe: Box<dyn InstalledVersionProbe>,
    layout: InstallLayout,
    cancel: CancelToken,
}

impl UpdateEngine {
    pub fn new(collaborators: Collaborators, layout: InstallLayout, cancel: CancelToken) -> Self {
        let Collaborators {
            repository,
            service,
            published,
            artifacts,
            probe,
        } = collaborators;
        Self {
            repo: repository,
            service,
            published,
            artifacts,
            probe,
            layout,
            cancel,
        }
    }

    /// Cached versions, newest first.
    pub fn cached_versions(&self) -> Vec<String> {
        self.repo.list()
    }

    /// Load the repository, connect to the service manager, and register
    /// the installed agent in the repository if it is not cached yet.
    pub fn init(&mut self) -> EngineResult<()> {
        self.repo.init()?;
        self.service.init()?;
        self.register_installed()
    }

    /// Report what `update` would do. Read-only.
    pub fn check(&self) -> EngineResult<Action> {
        self.ensure_active()?;

        let installed = self.installed_version()?;
        let cached = self.repo.latest();
        let published = self.published.latest_published()?;
        debug!(?installed, ?cached, ?published, "version observations");

        let download = published
            .as_deref()
            .is_some_and(|v| self.repo.get(v).is_none());

        let Some(installed) = installed else {
            return Ok(Action::compose(download, Some(Step::Install)));
        };

        let update = is_newer(published.as_deref(), &installed)
            || is_newer(cached.as_deref(), &installed);
        Ok(Action::compose(download, update.then_some(Step::Update)))
    }

    /// Cache the latest published version, then install the newest cached
    /// version if it is ahead of the installed one.
    ///
    /// A failed install is rolled back to the previous cached version. The
    /// call succeeds if the rollback does.
    pub fn update(&mut self) -> EngineResult<()> {
        self.ensure_active()?;
        self.ensure_latest_added()?;

        let Some(target) = self.repo.latest() else {
            info!("repository is empty, nothing to install");
            return Ok(());
        };

        if let Some(installed) = self.installed_version()? {
            let current = parse_version(&installed)
                .ok_or_else(|| EngineError::InvalidVersion(installed.clone()))?;
            let candidate = parse_version(&target)
                .ok_or_else(|| EngineError::MissingVersion(target.clone()))?;
            if current.cmp_precedence(&candidate) != Ordering::Less {
                info!(%installed, cached = %target, "installed agent is up to date");
                return Ok(());
            }
        }

        self.ensure_active()?;
        match self.install(&target) {
            Ok(()) => {
                info!(version = %target, "agent installed");
                Ok(())
            }
            Err(forward) => self.roll_back(&target, forward),
        }
    }

    /// Stop and delete the service registration, then delete the install
    /// directory.
    pub fn remove(&mut self) -> EngineResult<()> {
        self.ensure_active()?;

        let name = self.layout.service.name.as_str();
        if self.service.is_exist(name)? {
            if !self.service.is_stopped(name)? {
                self.service.stop(name)?;
            }
            self.service.delete(name)?;
        }

        let dir = &self.layout.install_dir;
        if dir.is_dir() {
            clear_directory(dir)?;
            fs::remove_dir(dir)?;
            info!(path = %dir.display(), "removed install directory");
        }
        Ok(())
    }

    pub fn start(&self) -> EngineResult<()> {
        self.service.start(&self.layout.service.name)?;
        Ok(())
    }

    pub fn stop(&self) -> EngineResult<()> {
        self.ensure_active()?;
        self.service.stop(&self.layout.service.name)?;
        Ok(())
    }

    /// Release the service manager connection.
    pub fn close(&mut self) -> EngineResult<()> {
        self.service.close()?;
        Ok(())
    }

    fn ensure_active(&self) -> EngineResult<()> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    fn installed_version(&self) -> EngineResult<Option<String>> {
        Ok(self.probe.installed_version(&self.layout.executable_path())?)
    }

    fn register_installed(&mut self) -> EngineResult<()> {
        let Some(version) = self.installed_version()? else {
            return Ok(());
        };
        if self.repo.get(&version).is_some() {
            return Ok(());
        }
        if parse_version(&version).is_none() {
            warn!(%version, "installed agent reports an invalid version, not caching it");
            return Ok(());
        }

        let binary = self.layout.executable_path();
        let checksum = write_checksum(&binary)?;
        let added = self.repo.add(&binary, &version);
        let cleaned = remove_if_exists(&checksum);
        added?;
        cleaned?;
        info!(%version, "cached installed agent");
        Ok(())
    }

    fn ensure_latest_added(&mut self) -> EngineResult<()> {
        let Some(latest) = self.published.latest_published()? else {
            debug!("no published version");
            return Ok(());
        };
        if self.repo.get(&latest).is_some() {
            debug!(version = %latest, "published version already cached");
            return Ok(());
        }

        self.ensure_active()?;
        let binary = self
            .layout
            .temp_dir
            .join(format!("{}-{}", Uuid::new_v4(), self.layout.executable));
        let checksum = checksum_path(&binary);
        info!(version = %latest, "downloading published version");
        self.artifacts.download(&latest, &binary, &checksum)?;

        let added = self.repo.add(&binary, &latest);
        let binary_removed = remove_if_exists(&binary);
        let checksum_removed = remove_if_exists(&checksum);
        added?;
        binary_removed?;
        checksum_removed?;
        Ok(())
    }

    fn roll_back(&mut self, version: &str, forward: EngineError) -> EngineResult<()> {
        let Some(previous) = self.repo.previous(version) else {
            return Err(EngineError::InstallFailed {
                version: version.to_string(),
                source: Box::new(forward),
            });
        };

        warn!(%version, %previous, error = %forward, "install failed, rolling back");
        match self.install(&previous) {
            Ok(()) => {
                error!(
                    %version,
                    %previous,
                    error = %forward,
                    "install failed, rolled back to previous version"
                );
                Ok(())
            }
            Err(rollback) => Err(EngineError::RollbackFailed {
                version: version.to_string(),
                previous,
                forward: Box::new(forward),
                rollback: Box::new(rollback),
            }),
        }
    }

    /// Replace the live installation with `version` from the repository.
    fn install(&mut self, version: &str) -> EngineResult<()> {
        let source = self
            .repo
            .get(version)
            .ok_or_else(|| EngineError::MissingVersion(version.to_string()))?;

        self.remove()?;
        ensure_directory(&self.layout.install_dir)?;
        copy_executable(&source, &self.layout.executable_path())?;

        let spec = &self.layout.service;
        if !self.service.is_exist(&spec.name)? {
            self.service.create(spec)?;
        }
        self.service.start(&spec.name)?;
        Ok(())
    }
}

/// True when `candidate` parses and is strictly newer than `installed`.
fn is_newer(candidate: Option<&str>, installed: &str) -> bool {
    candidate.and_then(|c| compare_versions(installed, c)) == Some(Ordering::Less)
}

fn ensure_directory(path: &Path) -> EngineResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(EngineError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn copy_executable(source: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = File::create(dest)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Delete everything beneath `dir`, deepest entries first.
fn clear_directory(dir: &Path) -> io::Result<()> {
    for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_newer() {
        assert!(is_newer(Some("0.0.2"), "0.0.1"));
        assert!(!is_newer(Some("0.0.1"), "0.0.1"));
        assert!(!is_newer(Some("0.0.1"), "0.0.2"));
        assert!(!is_newer(None, "0.0.1"));
        assert!(!is_newer(Some("garbage"), "0.0.1"));
        assert!(!is_newer(Some("0.0.2"), "garbage"));
    }

    #[test]
    fn test_clear_directory_keeps_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("agent");
        fs::create_dir_all(dir.join("nested/deeper")).unwrap();
        fs::write(dir.join("guest-agent"), b"bin").unwrap();
        fs::write(dir.join("nested/deeper/log"), b"log").unwrap();
        let sibling = temp.path().join("agent-data");
        fs::create_dir_all(&sibling).unwrap();

        clear_directory(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        assert!(sibling.is_dir());
    }

    #[test]
    fn test_ensure_directory_rejects_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("agent");
        fs::write(&path, b"file").unwrap();

        assert!(matches!(
            ensure_directory(&path),
            Err(EngineError::NotADirectory(_))
        ));
        ensure_directory(&temp.path().join("fresh/dir")).unwrap();
    }
}
