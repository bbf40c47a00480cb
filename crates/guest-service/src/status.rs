//! Service status values

use std::fmt;

/// State of a registered service as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceStatus {
    Unknown,
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Unknown => "unknown",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::StartPending => "start_pending",
            ServiceStatus::StopPending => "stop_pending",
            ServiceStatus::Running => "running",
            ServiceStatus::ContinuePending => "continue_pending",
            ServiceStatus::PausePending => "pause_pending",
            ServiceStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
