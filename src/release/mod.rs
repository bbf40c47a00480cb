//! Release storage client
//!
//! Talks to the object storage that publishes agent builds:
//!
//! ```text
//! <endpoint>/<prefix>/release/stable                        latest version
//! <endpoint>/<prefix>/release/<version>/<os>/<arch>/<file>  binary
//! <endpoint>/<prefix>/release/<version>/<os>/<arch>/<file>.sha256
//! ```
//!
//! Transport errors and 5xx responses are retried with backoff. Every request
//! carries a fresh `X-Request-ID`. Redirects are not followed.

mod retry;

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ReleaseSection;

pub use retry::RetryPolicy;

const REQUEST_ID_HEADER: &str = "X-Request-ID";
const STABLE_CHANNEL: &str = "stable";

/// Errors from the release client.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type HttpResult<T> = Result<T, HttpError>;

/// Blocking client for published agent releases.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    client: Client,
    base: String,
    filename: String,
    retry: RetryPolicy,
}

impl ReleaseClient {
    /// Build a client for `filename` artifacts from release settings.
    pub fn new(settings: &ReleaseSection, filename: &str) -> HttpResult<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .redirect(Policy::none())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: release_base(&settings.endpoint, &settings.prefix),
            filename: filename.to_string(),
            retry: RetryPolicy {
                max_retries: settings.retries,
                wait: Duration::from_millis(settings.retry_wait_ms),
                max_wait: Duration::from_millis(settings.retry_max_wait_ms),
            },
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the stable-channel version marker.
    pub fn stable_url(&self) -> String {
        format!("{}/{}", self.base, STABLE_CHANNEL)
    }

    /// URL of the binary for `version` on this host's platform.
    pub fn artifact_url(&self, version: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.base,
            version,
            std::env::consts::OS,
            release_arch(std::env::consts::ARCH),
            self.filename
        )
    }

    /// Latest published version, or `None` when the channel is empty or
    /// unavailable.
    pub fn fetch_latest(&self) -> HttpResult<Option<String>> {
        let url = self.stable_url();
        let response = self.get(&url)?;
        let status = response.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "no published version");
            return Ok(None);
        }

        let body = response.text()?;
        let version = body.trim();
        if guest_repo::parse_version(version).is_none() {
            warn!(%url, body = %version, "published version is not a valid semver");
            return Ok(None);
        }
        Ok(Some(version.to_string()))
    }

    /// Download the binary for `version` and its checksum.
    ///
    /// Partial files are removed on failure.
    pub fn fetch_artifact(&self, version: &str, binary: &Path, checksum: &Path) -> HttpResult<()> {
        let url = self.artifact_url(version);
        let result = self
            .download_to(&url, binary)
            .and_then(|()| self.download_to(&format!("{url}.sha256"), checksum));
        if result.is_err() {
            remove_partial(binary);
            remove_partial(checksum);
        } else {
            info!(%version, %url, "downloaded release artifact");
        }
        result
    }

    fn download_to(&self, url: &str, dest: &Path) -> HttpResult<()> {
        let mut response = self.get(url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let mut file = File::create(dest)?;
        let bytes = response.copy_to(&mut file)?;
        file.sync_all()?;
        debug!(%url, bytes, dest = %dest.display(), "saved response body");
        Ok(())
    }

    fn get(&self, url: &str) -> HttpResult<Response> {
        let mut attempt = 0;
        loop {
            let request_id = Uuid::new_v4().to_string();
            let result = self
                .client
                .get(url)
                .header(REQUEST_ID_HEADER, &request_id)
                .send();

            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!(%url, status = status.as_u16(), %request_id, "received response");
                    if !status.is_server_error() || !self.retry.should_retry(attempt) {
                        return Ok(response);
                    }
                    warn!(%url, status = status.as_u16(), attempt, "server error, retrying");
                }
                Err(err) => {
                    if !self.retry.should_retry(attempt) {
                        return Err(err.into());
                    }
                    warn!(%url, error = %err, attempt, "request failed, retrying");
                }
            }

            thread::sleep(self.retry.backoff(attempt));
            attempt += 1;
        }
    }
}

/// Architecture name used in release paths.
pub fn release_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

fn release_base(endpoint: &str, prefix: &str) -> String {
    format!(
        "{}/{}/release",
        endpoint.trim_end_matches('/'),
        prefix.trim_matches('/')
    )
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial download");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> ReleaseClient {
        let settings = ReleaseSection {
            endpoint: endpoint.to_string(),
            ..ReleaseSection::default()
        };
        ReleaseClient::new(&settings, "guest-agent").unwrap()
    }

    #[test]
    fn test_release_arch_mapping() {
        assert_eq!(release_arch("x86_64"), "amd64");
        assert_eq!(release_arch("aarch64"), "arm64");
        assert_eq!(release_arch("riscv64"), "riscv64");
    }

    #[test]
    fn test_stable_url() {
        let client = client("https://storage.yandexcloud.net/");
        assert_eq!(
            client.stable_url(),
            "https://storage.yandexcloud.net/yandexcloud-guestagent/release/stable"
        );
    }

    #[test]
    fn test_artifact_url_layout() {
        let client = client("https://storage.yandexcloud.net");
        let url = client.artifact_url("1.2.3");
        let expected_prefix = format!(
            "https://storage.yandexcloud.net/yandexcloud-guestagent/release/1.2.3/{}/{}/",
            std::env::consts::OS,
            release_arch(std::env::consts::ARCH)
        );
        assert!(url.starts_with(&expected_prefix));
        assert!(url.ends_with("/guest-agent"));
    }

    #[test]
    fn test_unreachable_endpoint_is_error() {
        let client = client("http://127.0.0.1:1").with_retry(RetryPolicy::none());
        assert!(matches!(client.fetch_latest(), Err(HttpError::Request(_))));
    }

    #[test]
    fn test_failed_download_leaves_no_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let binary = temp.path().join("agent");
        let checksum = temp.path().join("agent.sha256");
        let client = client("http://127.0.0.1:1").with_retry(RetryPolicy::none());

        assert!(client.fetch_artifact("1.0.0", &binary, &checksum).is_err());
        assert!(!binary.exists());
        assert!(!checksum.exists());
    }
}
