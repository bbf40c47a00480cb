//! Installed agent version probe
//!
//! Runs `<executable> version` and reads the version from stdout.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

const VERSION_ARG: &str = "version";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run {}: {source}", .path.display())]
    Spawn { path: PathBuf, source: io::Error },

    #[error("{} version exited with status {}: {stderr}", .path.display(), exit_status(.status))]
    Failed {
        path: PathBuf,
        status: Option<i32>,
        stderr: String,
    },
}

fn exit_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

/// Asks the installed executable for its version.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProbe;

impl CommandProbe {
    /// Installed version, or `None` when no executable is present.
    pub fn probe(&self, executable: &Path) -> Result<Option<String>, ProbeError> {
        if !executable.exists() {
            debug!(path = %executable.display(), "agent is not installed");
            return Ok(None);
        }

        let output = Command::new(executable)
            .arg(VERSION_ARG)
            .output()
            .map_err(|source| ProbeError::Spawn {
                path: executable.to_path_buf(),
                source,
            })?;
        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: executable.to_path_buf(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(path = %executable.display(), %version, "probed installed version");
        Ok((!version.is_empty()).then_some(version))
    }
}
