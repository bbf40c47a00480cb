//! Host service manager abstraction

use std::path::PathBuf;

use crate::error::ServiceResult;
use crate::status::ServiceStatus;

/// Registration parameters for a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Service name used by the host service manager
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Longer description
    pub description: String,
    /// Executable started by the service
    pub executable: PathBuf,
    /// Arguments passed to the executable
    pub args: Vec<String>,
}

/// Raw operations of a host service manager.
///
/// Implementations report what the host says and nothing more. Existence
/// checks, no-op transitions and waiting live in [`Controller`].
///
/// [`Controller`]: crate::Controller
pub trait ServiceBackend {
    /// Open a session with the service manager.
    fn connect(&mut self) -> ServiceResult<()>;

    /// Close the session.
    fn disconnect(&mut self) -> ServiceResult<()>;

    /// Names of all registered services.
    fn list(&self) -> ServiceResult<Vec<String>>;

    /// Current status of a registered service.
    fn status(&self, name: &str) -> ServiceResult<ServiceStatus>;

    /// Ask the host to start a service without waiting.
    fn start(&self, name: &str) -> ServiceResult<()>;

    /// Ask the host to stop a service without waiting.
    fn stop(&self, name: &str) -> ServiceResult<()>;

    /// Register a service configured for automatic start.
    fn create(&self, spec: &ServiceSpec) -> ServiceResult<()>;

    /// Remove a service registration.
    fn delete(&self, name: &str) -> ServiceResult<()>;
}
