//! Production wiring from configuration

use guest_repo::{LocalRepository, RetentionPolicy};
use guest_service::{Controller, ControllerConfig, ServiceSpec, SystemdBackend};

use super::error::EngineResult;
use super::updater::{Collaborators, InstallLayout, UpdateEngine};
use crate::cancel::CancelToken;
use crate::config::UpdaterConfig;
use crate::probe::CommandProbe;
use crate::release::ReleaseClient;

impl InstallLayout {
    pub fn from_config(config: &UpdaterConfig) -> Self {
        let executable = config.install.executable_path();
        Self {
            install_dir: config.install.dir.clone(),
            executable: config.install.executable.clone(),
            temp_dir: config.install.temp_dir(),
            service: ServiceSpec {
                name: config.service.name.clone(),
                display_name: config.service.display_name.clone(),
                description: config.service.description.clone(),
                executable,
                args: config.service.args.clone(),
            },
        }
    }
}

impl UpdateEngine {
    /// Build an engine backed by the local filesystem, systemd, and the
    /// release storage described by `config`.
    pub fn from_config(config: &UpdaterConfig, cancel: CancelToken) -> EngineResult<Self> {
        let repository = LocalRepository::new(&config.repository.root, &config.install.executable)?
            .with_retention(RetentionPolicy::keep_last_n(config.repository.retention));

        let backend = SystemdBackend::new(&config.service.systemctl, &config.service.unit_dir);
        let controller = Controller::with_config(
            backend,
            ControllerConfig {
                tick: config.service.tick(),
                timeout: config.service.timeout(),
            },
        );

        let client = ReleaseClient::new(&config.release, &config.install.executable)?;

        let collaborators = Collaborators {
            repository: Box::new(repository),
            service: Box::new(controller),
            published: Box::new(client.clone()),
            artifacts: Box::new(client),
            probe: Box::new(CommandProbe),
        };
        Ok(UpdateEngine::new(
            collaborators,
            InstallLayout::from_config(config),
            cancel,
        ))
    }
}
