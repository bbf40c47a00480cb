//! Guest agent updater
//!
//! Self-update engine for the cloud guest agent. Discovers published
//! releases, caches verified builds in a local repository, installs them
//! as a host service, and rolls back to the previous build when an install
//! fails.

pub mod cancel;
pub mod config;
pub mod engine;
pub mod logging;
pub mod probe;
pub mod release;
pub mod signal;

pub use cancel::CancelToken;
pub use config::{ConfigError, UpdaterConfig};
pub use engine::{Action, Collaborators, EngineError, EngineResult, InstallLayout, UpdateEngine};
pub use release::{HttpError, ReleaseClient};
