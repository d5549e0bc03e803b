use std::sync::Arc;

use athena_core::config::{AppConfig, ConfigError};
use athena_core::notifications::{FanoutSink, InMemoryNotificationSink, TracingNotificationSink};
use athena_core::{DemoDataset, DemoSession, DomainError, ScenarioController};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub session: Arc<DemoSession>,
    /// Notifications raised since the last API response picked them up.
    pub notifications: InMemoryNotificationSink,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("demo dataset is inconsistent: {0}")]
    Dataset(#[from] DomainError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let dataset = DemoDataset::builtin();
    dataset.validate()?;
    info!(
        event_name = "system.bootstrap.dataset_validated",
        correlation_id = "bootstrap",
        gap_count = dataset.gaps().len(),
        "demo dataset validated"
    );

    let notifications = InMemoryNotificationSink::default();
    let notifier = FanoutSink::new()
        .with(Arc::new(TracingNotificationSink))
        .with(Arc::new(notifications.clone()));
    let controller =
        ScenarioController::new(Arc::new(dataset), config.demo.timing, Arc::new(notifier))
            .with_initial_help(config.demo.tour_enabled_by_default);

    info!(
        event_name = "system.bootstrap.session_created",
        correlation_id = %controller.session_id(),
        scenario = %controller.scenario(),
        "demo session created"
    );

    Ok(Application { config, session: Arc::new(DemoSession::new(Arc::new(controller))), notifications })
}
