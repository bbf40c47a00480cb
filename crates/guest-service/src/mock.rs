//! In-memory service backend for tests
//!
//! Records every backend call and supports failure injection. Clones share
//! state, so a test can keep a handle after moving the backend into a
//! [`Controller`](crate::Controller).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{ServiceBackend, ServiceSpec};
use crate::error::{ServiceError, ServiceResult};
use crate::status::ServiceStatus;

/// A call made against the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Connect,
    Disconnect,
    List,
    Status(String),
    Start(String),
    Stop(String),
    Create(String),
    Delete(String),
}

/// How the mock reacts to a start or stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    /// The target state is reached immediately
    #[default]
    Immediate,
    /// The service stays pending forever
    Stuck,
}

#[derive(Debug, Default)]
struct MockState {
    services: BTreeMap<String, MockService>,
    calls: Vec<BackendCall>,
    transition: Transition,
    start_failures: u32,
}

/// A service registered in the mock.
#[derive(Debug, Clone)]
pub struct MockService {
    pub spec: ServiceSpec,
    pub status: ServiceStatus,
}

/// Shared-state mock of a host service manager.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a service in the given state.
    pub fn with_service(self, spec: ServiceSpec, status: ServiceStatus) -> Self {
        self.state()
            .services
            .insert(spec.name.clone(), MockService { spec, status });
        self
    }

    /// Control how start and stop requests settle.
    pub fn with_transition(self, transition: Transition) -> Self {
        self.state().transition = transition;
        self
    }

    /// Make the next `count` start requests fail.
    pub fn fail_next_starts(&self, count: u32) {
        self.state().start_failures = count;
    }

    pub fn service(&self, name: &str) -> Option<MockService> {
        self.state().services.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: BackendCall) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

fn missing(name: &str) -> ServiceError {
    ServiceError::Command {
        command: format!("mock query {name}"),
        status: Some(1),
        stderr: "no such service".to_string(),
    }
}

impl ServiceBackend for MockBackend {
    fn connect(&mut self) -> ServiceResult<()> {
        self.record(BackendCall::Connect);
        Ok(())
    }

    fn disconnect(&mut self) -> ServiceResult<()> {
        self.record(BackendCall::Disconnect);
        Ok(())
    }

    fn list(&self) -> ServiceResult<Vec<String>> {
        let state = self.record(BackendCall::List);
        Ok(state.services.keys().cloned().collect())
    }

    fn status(&self, name: &str) -> ServiceResult<ServiceStatus> {
        let state = self.record(BackendCall::Status(name.to_string()));
        state
            .services
            .get(name)
            .map(|s| s.status)
            .ok_or_else(|| missing(name))
    }

    fn start(&self, name: &str) -> ServiceResult<()> {
        let mut state = self.record(BackendCall::Start(name.to_string()));
        if state.start_failures > 0 {
            state.start_failures -= 1;
            return Err(ServiceError::Command {
                command: format!("mock start {name}"),
                status: Some(1),
                stderr: "injected start failure".to_string(),
            });
        }
        let next = match state.transition {
            Transition::Immediate => ServiceStatus::Running,
            Transition::Stuck => ServiceStatus::StartPending,
        };
        let service = state.services.get_mut(name).ok_or_else(|| missing(name))?;
        service.status = next;
        Ok(())
    }

    fn stop(&self, name: &str) -> ServiceResult<()> {
        let mut state = self.record(BackendCall::Stop(name.to_string()));
        let next = match state.transition {
            Transition::Immediate => ServiceStatus::Stopped,
            Transition::Stuck => ServiceStatus::StopPending,
        };
        let service = state.services.get_mut(name).ok_or_else(|| missing(name))?;
        service.status = next;
        Ok(())
    }

    fn create(&self, spec: &ServiceSpec) -> ServiceResult<()> {
        let mut state = self.record(BackendCall::Create(spec.name.clone()));
        state.services.insert(
            spec.name.clone(),
            MockService {
                spec: spec.clone(),
                status: ServiceStatus::Stopped,
            },
        );
        Ok(())
    }

    fn delete(&self, name: &str) -> ServiceResult<()> {
        let mut state = self.record(BackendCall::Delete(name.to_string()));
        state.services.remove(name).map(|_| ()).ok_or_else(|| missing(name))
    }
}
