//! Update engine and its collaborators

mod action;
mod collaborators;
mod error;
mod system;
mod updater;

pub use action::{Action, Step};
pub use collaborators::{
    ArtifactSource, InstalledVersionProbe, PublishedVersions, Repository, ServiceControl,
};
pub use error::{EngineError, EngineResult};
pub use updater::{Collaborators, InstallLayout, UpdateEngine};
