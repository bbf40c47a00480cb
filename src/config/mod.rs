//! Updater configuration
//!
//! Loaded from a TOML file (default `/etc/guest-agent-updater/config.toml`).
//! Every section and field is optional:
//!
//! ```toml
//! [repository]
//! root = "/var/lib/guest-agent-updater/repository"
//! retention = 5
//!
//! [install]
//! dir = "/opt/guest-agent"
//! executable = "guest-agent"
//!
//! [service]
//! name = "yc-guest-agent"
//! timeout_secs = 60
//!
//! [release]
//! endpoint = "https://storage.yandexcloud.net"
//! prefix = "yandexcloud-guestagent"
//! ```

mod defaults;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use defaults::DEFAULT_CONFIG_PATH;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Complete updater configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdaterConfig {
    pub repository: RepositorySection,
    pub install: InstallSection,
    pub service: ServiceSection,
    pub release: ReleaseSection,
}

/// Local version cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositorySection {
    #[serde(default = "defaults::repository_root")]
    pub root: PathBuf,

    /// Versions kept in the cache (0 = unlimited)
    #[serde(default = "defaults::retention")]
    pub retention: usize,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            root: defaults::repository_root(),
            retention: defaults::retention(),
        }
    }
}

/// Where the live agent executable is installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    #[serde(default = "defaults::install_dir")]
    pub dir: PathBuf,

    #[serde(default = "defaults::executable")]
    pub executable: String,

    /// Scratch directory for downloads (default: system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            dir: defaults::install_dir(),
            executable: defaults::executable(),
            temp_dir: None,
        }
    }
}

impl InstallSection {
    pub fn executable_path(&self) -> PathBuf {
        self.dir.join(&self.executable)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Service registration and transition timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    #[serde(default = "defaults::service_name")]
    pub name: String,

    #[serde(default = "defaults::service_display_name")]
    pub display_name: String,

    #[serde(default = "defaults::service_description")]
    pub description: String,

    #[serde(default = "defaults::service_args")]
    pub args: Vec<String>,

    #[serde(default = "defaults::service_tick_ms")]
    pub tick_ms: u64,

    #[serde(default = "defaults::service_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "defaults::systemctl")]
    pub systemctl: PathBuf,

    #[serde(default = "defaults::unit_dir")]
    pub unit_dir: PathBuf,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: defaults::service_name(),
            display_name: defaults::service_display_name(),
            description: defaults::service_description(),
            args: defaults::service_args(),
            tick_ms: defaults::service_tick_ms(),
            timeout_secs: defaults::service_timeout_secs(),
            systemctl: defaults::systemctl(),
            unit_dir: defaults::unit_dir(),
        }
    }
}

impl ServiceSection {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Release storage and HTTP client behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseSection {
    #[serde(default = "defaults::release_endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::release_prefix")]
    pub prefix: String,

    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Extra attempts after a failed request
    #[serde(default = "defaults::retries")]
    pub retries: u32,

    #[serde(default = "defaults::retry_wait_ms")]
    pub retry_wait_ms: u64,

    #[serde(default = "defaults::retry_max_wait_ms")]
    pub retry_max_wait_ms: u64,

    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ReleaseSection {
    fn default() -> Self {
        Self {
            endpoint: defaults::release_endpoint(),
            prefix: defaults::release_prefix(),
            user_agent: defaults::user_agent(),
            retries: defaults::retries(),
            retry_wait_ms: defaults::retry_wait_ms(),
            retry_max_wait_ms: defaults::retry_max_wait_ms(),
            request_timeout_secs: defaults::request_timeout_secs(),
        }
    }
}

impl UpdaterConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// if present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without validating it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check values that would make the updater unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("repository.root", self.repository.root.as_os_str().is_empty())?;
        require_non_empty("install.dir", self.install.dir.as_os_str().is_empty())?;
        require_non_empty("install.executable", self.install.executable.is_empty())?;
        require_non_empty("service.name", self.service.name.is_empty())?;
        require_non_empty("release.endpoint", self.release.endpoint.is_empty())?;
        require_non_empty("release.prefix", self.release.prefix.is_empty())?;

        if self.install.executable.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                field: "install.executable",
                reason: "must be a file name, not a path".to_string(),
            });
        }
        if self.service.tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "service.tick_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "service.timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.release.retry_wait_ms > self.release.retry_max_wait_ms {
            return Err(ConfigError::InvalidValue {
                field: "release.retry_wait_ms",
                reason: format!(
                    "must not exceed release.retry_max_wait_ms ({})",
                    self.release.retry_max_wait_ms
                ),
            });
        }
        Ok(())
    }
}

fn require_non_empty(field: &'static str, empty: bool) -> Result<(), ConfigError> {
    if empty {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = UpdaterConfig::default();
        config.validate().unwrap();
        assert_eq!(config.repository.retention, 5);
        assert_eq!(config.service.args, vec!["start"]);
        assert_eq!(config.service.timeout(), Duration::from_secs(60));
        assert_eq!(
            config.install.executable_path(),
            PathBuf::from("/opt/guest-agent/guest-agent")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[repository]\nretention = 3\n\n[release]\nendpoint = \"http://127.0.0.1:8080\"\n",
        )
        .unwrap();

        let config = UpdaterConfig::load(Some(&path)).unwrap();
        assert_eq!(config.repository.retention, 3);
        assert_eq!(config.repository.root, PathBuf::from(defaults::REPOSITORY_ROOT));
        assert_eq!(config.release.endpoint, "http://127.0.0.1:8080");
        assert_eq!(config.release.prefix, defaults::RELEASE_PREFIX);
        assert_eq!(config.service, ServiceSection::default());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = UpdaterConfig::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[service]\nnmae = \"typo\"\n").unwrap();

        let err = UpdaterConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = UpdaterConfig::default();
        config.service.name.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "service.name", .. })
        ));

        let mut config = UpdaterConfig::default();
        config.install.executable = "bin/guest-agent".to_string();
        assert!(config.validate().is_err());

        let mut config = UpdaterConfig::default();
        config.service.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = UpdaterConfig::default();
        config.release.retry_wait_ms = 60_000;
        assert!(config.validate().is_err());
    }
}
