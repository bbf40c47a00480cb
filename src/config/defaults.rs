//! Built-in defaults
//!
//! Every configuration value falls back to one of these when the config file
//! is missing or leaves a field out.

use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/guest-agent-updater/config.toml";

pub const REPOSITORY_ROOT: &str = "/var/lib/guest-agent-updater/repository";
pub const RETENTION: usize = 5;

pub const INSTALL_DIR: &str = "/opt/guest-agent";
pub const EXECUTABLE: &str = "guest-agent";

pub const SERVICE_NAME: &str = "yc-guest-agent";
pub const SERVICE_DISPLAY_NAME: &str = "Yandex.Cloud Guest Agent";
pub const SERVICE_DESCRIPTION: &str = "Yandex.Cloud Guest Agent";
pub const SERVICE_START_ARG: &str = "start";
pub const SERVICE_TICK_MS: u64 = 1000;
pub const SERVICE_TIMEOUT_SECS: u64 = 60;
pub const SYSTEMCTL: &str = "systemctl";
pub const UNIT_DIR: &str = "/etc/systemd/system";

pub const RELEASE_ENDPOINT: &str = "https://storage.yandexcloud.net";
pub const RELEASE_PREFIX: &str = "yandexcloud-guestagent";
pub const USER_AGENT: &str = "Yandex.Cloud.Guest.Agent.Updater";
pub const RETRIES: u32 = 5;
pub const RETRY_WAIT_MS: u64 = 1000;
pub const RETRY_MAX_WAIT_MS: u64 = 30_000;
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

pub(super) fn repository_root() -> PathBuf {
    PathBuf::from(REPOSITORY_ROOT)
}

pub(super) fn retention() -> usize {
    RETENTION
}

pub(super) fn install_dir() -> PathBuf {
    PathBuf::from(INSTALL_DIR)
}

pub(super) fn executable() -> String {
    EXECUTABLE.to_string()
}

pub(super) fn service_name() -> String {
    SERVICE_NAME.to_string()
}

pub(super) fn service_display_name() -> String {
    SERVICE_DISPLAY_NAME.to_string()
}

pub(super) fn service_description() -> String {
    SERVICE_DESCRIPTION.to_string()
}

pub(super) fn service_args() -> Vec<String> {
    vec![SERVICE_START_ARG.to_string()]
}

pub(super) fn service_tick_ms() -> u64 {
    SERVICE_TICK_MS
}

pub(super) fn service_timeout_secs() -> u64 {
    SERVICE_TIMEOUT_SECS
}

pub(super) fn systemctl() -> PathBuf {
    PathBuf::from(SYSTEMCTL)
}

pub(super) fn unit_dir() -> PathBuf {
    PathBuf::from(UNIT_DIR)
}

pub(super) fn release_endpoint() -> String {
    RELEASE_ENDPOINT.to_string()
}

pub(super) fn release_prefix() -> String {
    RELEASE_PREFIX.to_string()
}

pub(super) fn user_agent() -> String {
    USER_AGENT.to_string()
}

pub(super) fn retries() -> u32 {
    RETRIES
}

pub(super) fn retry_wait_ms() -> u64 {
    RETRY_WAIT_MS
}

pub(super) fn retry_max_wait_ms() -> u64 {
    RETRY_MAX_WAIT_MS
}

pub(super) fn request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}
