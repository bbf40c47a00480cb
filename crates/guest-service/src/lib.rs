//! Service lifecycle control for the guest agent
//!
//! Wraps a host service manager behind [`ServiceBackend`] and layers the
//! agent's lifecycle rules on top in [`Controller`]: existence checks,
//! bounded-wait start and stop, and registration create/delete.

mod backend;
mod controller;
mod error;
pub mod mock;
mod status;
mod systemd;

pub use backend::{ServiceBackend, ServiceSpec};
pub use controller::{Controller, ControllerConfig, DEFAULT_TICK, DEFAULT_TIMEOUT};
pub use error::{ServiceError, ServiceResult};
pub use status::ServiceStatus;
pub use systemd::SystemdBackend;
