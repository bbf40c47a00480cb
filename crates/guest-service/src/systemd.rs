//! systemd backend driven through `systemctl`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::backend::{ServiceBackend, ServiceSpec};
use crate::error::{ServiceError, ServiceResult};
use crate::status::ServiceStatus;

const UNIT_SUFFIX: &str = ".service";

/// Service backend for hosts managed by systemd.
#[derive(Debug, Clone)]
pub struct SystemdBackend {
    systemctl: PathBuf,
    unit_dir: PathBuf,
}

impl Default for SystemdBackend {
    fn default() -> Self {
        Self::new("systemctl", "/etc/systemd/system")
    }
}

impl SystemdBackend {
    pub fn new(systemctl: impl Into<PathBuf>, unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            systemctl: systemctl.into(),
            unit_dir: unit_dir.into(),
        }
    }

    fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(unit_name(name))
    }

    fn run(&self, args: &[&str]) -> ServiceResult<String> {
        debug!(command = %self.systemctl.display(), ?args, "running systemctl");
        let output = Command::new(&self.systemctl).args(args).output()?;
        if !output.status.success() {
            return Err(ServiceError::Command {
                command: format!("{} {}", self.systemctl.display(), args.join(" ")),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ServiceBackend for SystemdBackend {
    fn connect(&mut self) -> ServiceResult<()> {
        self.run(&["--version"]).map(|_| ())
    }

    fn disconnect(&mut self) -> ServiceResult<()> {
        Ok(())
    }

    fn list(&self) -> ServiceResult<Vec<String>> {
        let out = self.run(&[
            "list-unit-files",
            "--type=service",
            "--no-legend",
            "--no-pager",
        ])?;
        Ok(parse_unit_list(&out))
    }

    fn status(&self, name: &str) -> ServiceResult<ServiceStatus> {
        let unit = unit_name(name);
        let out = self.run(&["show", &unit, "--property=ActiveState", "--value"])?;
        Ok(parse_active_state(&out))
    }

    fn start(&self, name: &str) -> ServiceResult<()> {
        self.run(&["start", "--no-block", &unit_name(name)]).map(|_| ())
    }

    fn stop(&self, name: &str) -> ServiceResult<()> {
        self.run(&["stop", "--no-block", &unit_name(name)]).map(|_| ())
    }

    fn create(&self, spec: &ServiceSpec) -> ServiceResult<()> {
        fs::write(self.unit_path(&spec.name), render_unit(spec))?;
        self.run(&["daemon-reload"])?;
        self.run(&["enable", &unit_name(&spec.name)])?;
        Ok(())
    }

    fn delete(&self, name: &str) -> ServiceResult<()> {
        self.run(&["disable", &unit_name(name)])?;
        remove_if_exists(&self.unit_path(name))?;
        self.run(&["daemon-reload"])?;
        Ok(())
    }
}

fn unit_name(name: &str) -> String {
    if name.ends_with(UNIT_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{UNIT_SUFFIX}")
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Service names from `systemctl list-unit-files` output.
fn parse_unit_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|unit| unit.strip_suffix(UNIT_SUFFIX))
        .map(str::to_string)
        .collect()
}

fn parse_active_state(output: &str) -> ServiceStatus {
    match output.trim() {
        "active" => ServiceStatus::Running,
        "inactive" | "failed" => ServiceStatus::Stopped,
        "activating" => ServiceStatus::StartPending,
        "deactivating" => ServiceStatus::StopPending,
        "reloading" => ServiceStatus::ContinuePending,
        _ => ServiceStatus::Unknown,
    }
}

fn render_unit(spec: &ServiceSpec) -> String {
    let mut exec = quote_arg(&spec.executable.to_string_lossy());
    for arg in &spec.args {
        exec.push(' ');
        exec.push_str(&quote_arg(arg));
    }
    format!(
        "# {display}\n\
         [Unit]\n\
         Description={description}\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         ExecStart={exec}\n\
         Restart=on-failure\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        display = spec.display_name,
        description = spec.description,
    )
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\\') {
        return arg.to_string();
    }
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
