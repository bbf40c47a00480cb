//! Reconciliation outcome of a check
//!
//! An action combines an optional download of the published version with at
//! most one installation step. Only the six reachable combinations exist as
//! variants; a fresh install never also reports an update.

use std::fmt;

/// Installation step implied by a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A newer version should replace the installed agent
    Update,
    /// No agent is installed
    Install,
}

/// What `update` would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Noop,
    Download,
    Update,
    DownloadAndUpdate,
    Install,
    DownloadAndInstall,
}

impl Action {
    /// Build an action from its parts.
    pub fn compose(download: bool, step: Option<Step>) -> Self {
        match (download, step) {
            (false, None) => Action::Noop,
            (true, None) => Action::Download,
            (false, Some(Step::Update)) => Action::Update,
            (true, Some(Step::Update)) => Action::DownloadAndUpdate,
            (false, Some(Step::Install)) => Action::Install,
            (true, Some(Step::Install)) => Action::DownloadAndInstall,
        }
    }

    /// Whether the published version must be fetched.
    pub fn downloads(&self) -> bool {
        matches!(
            self,
            Action::Download | Action::DownloadAndUpdate | Action::DownloadAndInstall
        )
    }

    pub fn step(&self) -> Option<Step> {
        match self {
            Action::Noop | Action::Download => None,
            Action::Update | Action::DownloadAndUpdate => Some(Step::Update),
            Action::Install | Action::DownloadAndInstall => Some(Step::Install),
        }
    }

    /// Numeric code reported alongside the name (Download=1, Update=2,
    /// Install=4, combined by sum).
    pub fn code(&self) -> u8 {
        let download = u8::from(self.downloads());
        let step = match self.step() {
            None => 0,
            Some(Step::Update) => 2,
            Some(Step::Install) => 4,
        };
        download + step
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Noop => "Noop",
            Action::Download => "Download",
            Action::Update => "Update",
            Action::DownloadAndUpdate => "DownloadAndUpdate",
            Action::Install => "Install",
            Action::DownloadAndInstall => "DownloadAndInstall",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
