//! Capability traits consumed by the engine
//!
//! The engine owns its collaborators as trait objects passed to its
//! constructor. Production wiring uses the concrete types below; tests
//! substitute their own.

use std::path::{Path, PathBuf};

use guest_repo::{LocalRepository, RepoResult};
use guest_service::{Controller, ServiceBackend, ServiceResult, ServiceSpec};

use crate::probe::{CommandProbe, ProbeError};
use crate::release::{HttpResult, ReleaseClient};

/// Local cache of verified versions.
pub trait Repository {
    fn init(&mut self) -> RepoResult<()>;
    /// Cached versions, newest first.
    fn list(&self) -> Vec<String>;
    fn get(&self, version: &str) -> Option<PathBuf>;
    fn add(&mut self, path: &Path, version: &str) -> RepoResult<()>;
    fn latest(&self) -> Option<String>;
    /// Newest cached version strictly older than `version`.
    fn previous(&self, version: &str) -> Option<String>;
}

/// Lifecycle control over the agent's service registration.
pub trait ServiceControl {
    fn init(&mut self) -> ServiceResult<()>;
    fn close(&mut self) -> ServiceResult<()>;
    fn is_exist(&self, name: &str) -> ServiceResult<bool>;
    fn is_stopped(&self, name: &str) -> ServiceResult<bool>;
    fn create(&self, spec: &ServiceSpec) -> ServiceResult<()>;
    fn start(&self, name: &str) -> ServiceResult<()>;
    fn stop(&self, name: &str) -> ServiceResult<()>;
    fn delete(&self, name: &str) -> ServiceResult<()>;
}

/// Source of the latest published version.
pub trait PublishedVersions {
    /// `Ok(None)` means nothing is published or the channel is unavailable.
    fn latest_published(&self) -> HttpResult<Option<String>>;
}

/// Fetches release artifacts.
pub trait ArtifactSource {
    /// Write the binary for `version` to `binary` and its checksum to
    /// `checksum`.
    fn download(&self, version: &str, binary: &Path, checksum: &Path) -> HttpResult<()>;
}

/// Reports the version of the installed agent.
pub trait InstalledVersionProbe {
    /// `Ok(None)` means the agent is not installed.
    fn installed_version(&self, executable: &Path) -> Result<Option<String>, ProbeError>;
}

impl Repository for LocalRepository {
    fn init(&mut self) -> RepoResult<()> {
        LocalRepository::init(self)
    }

    fn list(&self) -> Vec<String> {
        LocalRepository::list(self).to_vec()
    }

    fn get(&self, version: &str) -> Option<PathBuf> {
        LocalRepository::get(self, version)
    }

    fn add(&mut self, path: &Path, version: &str) -> RepoResult<()> {
        LocalRepository::add(self, path, version)
    }

    fn latest(&self) -> Option<String> {
        LocalRepository::latest(self).map(str::to_string)
    }

    fn previous(&self, version: &str) -> Option<String> {
        LocalRepository::previous(self, version).map(str::to_string)
    }
}

impl<B: ServiceBackend> ServiceControl for Controller<B> {
    fn init(&mut self) -> ServiceResult<()> {
        Controller::init(self)
    }

    fn close(&mut self) -> ServiceResult<()> {
        Controller::close(self)
    }

    fn is_exist(&self, name: &str) -> ServiceResult<bool> {
        Controller::is_exist(self, name)
    }

    fn is_stopped(&self, name: &str) -> ServiceResult<bool> {
        Controller::is_stopped(self, name)
    }

    fn create(&self, spec: &ServiceSpec) -> ServiceResult<()> {
        Controller::create(self, spec)
    }

    fn start(&self, name: &str) -> ServiceResult<()> {
        Controller::start(self, name)
    }

    fn stop(&self, name: &str) -> ServiceResult<()> {
        Controller::stop(self, name)
    }

    fn delete(&self, name: &str) -> ServiceResult<()> {
        Controller::delete(self, name)
    }
}

impl PublishedVersions for ReleaseClient {
    fn latest_published(&self) -> HttpResult<Option<String>> {
        self.fetch_latest()
    }
}

impl ArtifactSource for ReleaseClient {
    fn download(&self, version: &str, binary: &Path, checksum: &Path) -> HttpResult<()> {
        self.fetch_artifact(version, binary, checksum)
    }
}

impl InstalledVersionProbe for CommandProbe {
    fn installed_version(&self, executable: &Path) -> Result<Option<String>, ProbeError> {
        self.probe(executable)
    }
}
