//! Service lifecycle controller
//!
//! State transitions use a bounded wait: after issuing start or stop the
//! controller sleeps for one tick and checks the status once. If the target
//! state has not been reached by then, the transition fails with
//! [`ServiceError::Timeout`]. A timeout shorter than the tick fails without
//! querying at all. This caps the number of status queries per transition
//! at one.

use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::backend::{ServiceBackend, ServiceSpec};
use crate::error::{ServiceError, ServiceResult};
use crate::status::ServiceStatus;

/// Interval before the status is checked after a transition request.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Upper bound on a state transition.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Timing for bounded-wait transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub tick: Duration,
    pub timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Lifecycle controller over a [`ServiceBackend`].
#[derive(Debug)]
pub struct Controller<B: ServiceBackend> {
    backend: B,
    config: ControllerConfig,
    connected: bool,
}

impl<B: ServiceBackend> Controller<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ControllerConfig::default())
    }

    pub fn with_config(backend: B, config: ControllerConfig) -> Self {
        Self {
            backend,
            config,
            connected: false,
        }
    }

    /// Connect to the service manager.
    pub fn init(&mut self) -> ServiceResult<()> {
        if !self.connected {
            self.backend.connect()?;
            self.connected = true;
        }
        Ok(())
    }

    /// Disconnect from the service manager. Safe to call more than once.
    pub fn close(&mut self) -> ServiceResult<()> {
        if self.connected {
            self.connected = false;
            self.backend.disconnect()?;
        }
        Ok(())
    }

    /// Whether `name` is registered. Always asks the host.
    pub fn is_exist(&self, name: &str) -> ServiceResult<bool> {
        self.ensure_connected()?;
        Ok(self.backend.list()?.iter().any(|s| s == name))
    }

    /// Current status, or [`ServiceError::NotFound`] if not registered.
    pub fn status(&self, name: &str) -> ServiceResult<ServiceStatus> {
        if !self.is_exist(name)? {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        self.backend.status(name)
    }

    pub fn is_running(&self, name: &str) -> ServiceResult<bool> {
        Ok(self.status(name)? == ServiceStatus::Running)
    }

    pub fn is_stopped(&self, name: &str) -> ServiceResult<bool> {
        Ok(self.status(name)? == ServiceStatus::Stopped)
    }

    /// Start `name` and wait for it to report running.
    pub fn start(&self, name: &str) -> ServiceResult<()> {
        if self.is_running(name)? {
            debug!(service = name, "service already running");
            return Ok(());
        }
        self.backend.start(name)?;
        self.wait_for(name, ServiceStatus::Running)?;
        info!(service = name, "service started");
        Ok(())
    }

    /// Stop `name` and wait for it to report stopped.
    pub fn stop(&self, name: &str) -> ServiceResult<()> {
        if self.is_stopped(name)? {
            debug!(service = name, "service already stopped");
            return Ok(());
        }
        self.backend.stop(name)?;
        self.wait_for(name, ServiceStatus::Stopped)?;
        info!(service = name, "service stopped");
        Ok(())
    }

    /// Register a new service for automatic start.
    pub fn create(&self, spec: &ServiceSpec) -> ServiceResult<()> {
        if self.is_exist(&spec.name)? {
            return Err(ServiceError::AlreadyExist(spec.name.clone()));
        }
        self.backend.create(spec)?;
        info!(service = %spec.name, executable = %spec.executable.display(), "service created");
        Ok(())
    }

    /// Remove a service registration.
    pub fn delete(&self, name: &str) -> ServiceResult<()> {
        if !self.is_exist(name)? {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        self.backend.delete(name)?;
        info!(service = name, "service deleted");
        Ok(())
    }

    fn ensure_connected(&self) -> ServiceResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(ServiceError::Disconnected)
        }
    }

    fn wait_for(&self, name: &str, target: ServiceStatus) -> ServiceResult<()> {
        let ControllerConfig { tick, timeout } = self.config;
        if timeout < tick {
            thread::sleep(timeout);
            return Err(ServiceError::Timeout {
                name: name.to_string(),
                waited: timeout,
            });
        }

        thread::sleep(tick);
        let status = self.backend.status(name)?;
        if status == target {
            return Ok(());
        }
        debug!(service = name, %status, expected = %target, "service did not settle");
        Err(ServiceError::Timeout {
            name: name.to_string(),
            waited: tick,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BackendCall, MockBackend, Transition};
    use std::path::PathBuf;

    const NAME: &str = "guest-agent";

    fn spec() -> ServiceSpec {
        ServiceSpec {
            name: NAME.to_string(),
            display_name: "Guest Agent".to_string(),
            description: "Cloud guest agent".to_string(),
            executable: PathBuf::from("/opt/guest-agent/guest-agent"),
            args: vec!["start".to_string()],
        }
    }

    fn fast() -> ControllerConfig {
        ControllerConfig {
            tick: Duration::from_millis(5),
            timeout: Duration::from_millis(50),
        }
    }

    fn controller(backend: MockBackend) -> Controller<MockBackend> {
        let mut controller = Controller::with_config(backend, fast());
        controller.init().unwrap();
        controller
    }

    fn is_start(call: &BackendCall) -> bool {
        matches!(call, BackendCall::Start(_))
    }

    fn is_status(call: &BackendCall) -> bool {
        matches!(call, BackendCall::Status(_))
    }

    #[test]
    fn test_operations_require_init() {
        let controller = Controller::with_config(MockBackend::new(), fast());
        assert!(matches!(controller.is_exist(NAME), Err(ServiceError::Disconnected)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = MockBackend::new();
        let mut controller = controller(backend.clone());
        controller.close().unwrap();
        controller.close().unwrap();
        assert_eq!(backend.count(|c| *c == BackendCall::Disconnect), 1);
        assert!(matches!(controller.start(NAME), Err(ServiceError::Disconnected)));
    }

    #[test]
    fn test_missing_service_is_not_found() {
        let controller = controller(MockBackend::new());
        assert!(!controller.is_exist(NAME).unwrap());
        assert!(controller.is_running(NAME).unwrap_err().is_not_found());
        assert!(controller.is_stopped(NAME).unwrap_err().is_not_found());
        assert!(controller.start(NAME).unwrap_err().is_not_found());
        assert!(controller.stop(NAME).unwrap_err().is_not_found());
        assert!(controller.delete(NAME).unwrap_err().is_not_found());
    }

    #[test]
    fn test_start_when_running_issues_no_start() {
        let backend = MockBackend::new().with_service(spec(), ServiceStatus::Running);
        let controller = controller(backend.clone());

        controller.start(NAME).unwrap();

        assert_eq!(backend.count(is_start), 0);
        assert_eq!(backend.count(is_status), 1);
    }

    #[test]
    fn test_start_waits_for_running() {
        let backend = MockBackend::new().with_service(spec(), ServiceStatus::Stopped);
        let controller = controller(backend.clone());

        controller.start(NAME).unwrap();

        assert_eq!(backend.count(is_start), 1);
        assert_eq!(backend.service(NAME).unwrap().status, ServiceStatus::Running);
    }

    #[test]
    fn test_start_times_out_after_single_check() {
        let backend = MockBackend::new()
            .with_service(spec(), ServiceStatus::Stopped)
            .with_transition(Transition::Stuck);
        let controller = controller(backend.clone());

        let err = controller.start(NAME).unwrap_err();

        assert!(err.is_timeout());
        // one query before start, one after the tick
        assert_eq!(backend.count(is_status), 2);
    }

    #[test]
    fn test_timeout_shorter_than_tick_never_polls() {
        let backend = MockBackend::new()
            .with_service(spec(), ServiceStatus::Running)
            .with_transition(Transition::Stuck);
        let mut controller = Controller::with_config(
            backend.clone(),
            ControllerConfig {
                tick: Duration::from_millis(50),
                timeout: Duration::from_millis(5),
            },
        );
        controller.init().unwrap();

        let err = controller.stop(NAME).unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Timeout { waited, .. } if waited == Duration::from_millis(5)
        ));
        assert_eq!(backend.count(is_status), 1);
    }

    #[test]
    fn test_stop_symmetry() {
        let backend = MockBackend::new().with_service(spec(), ServiceStatus::Running);
        let controller = controller(backend.clone());

        controller.stop(NAME).unwrap();
        controller.stop(NAME).unwrap();

        assert_eq!(backend.count(|c| matches!(c, BackendCall::Stop(_))), 1);
        assert!(controller.is_stopped(NAME).unwrap());
    }

    #[test]
    fn test_create_and_delete() {
        let backend = MockBackend::new();
        let controller = controller(backend.clone());

        controller.create(&spec()).unwrap();
        assert!(controller.is_exist(NAME).unwrap());
        assert_eq!(backend.service(NAME).unwrap().spec.args, vec!["start"]);
        assert!(matches!(
            controller.create(&spec()),
            Err(ServiceError::AlreadyExist(_))
        ));

        controller.delete(NAME).unwrap();
        assert!(!controller.is_exist(NAME).unwrap());
    }

    #[test]
    fn test_failed_start_propagates() {
        let backend = MockBackend::new().with_service(spec(), ServiceStatus::Stopped);
        backend.fail_next_starts(1);
        let controller = controller(backend.clone());

        assert!(matches!(controller.start(NAME), Err(ServiceError::Command { .. })));
        controller.start(NAME).unwrap();
    }
}
