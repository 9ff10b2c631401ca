//! Wiring from [`AppConfig`] to a ready [`UploadSession`].

use std::sync::Arc;

use crush_events::{
    DesktopBackend, DisabledBackend, EventBus, NotificationBackend, Notifier,
};
use crush_fal::{FalClient, FalConfig};
use crush_pipeline::{Generator, SessionConfig, UploadSession};
use crush_store::{FileStore, JobStore};

use crate::config::AppConfig;

/// Build the generation stack described by `config`.
///
/// `on_activate` runs when the user clicks a completion notification.
pub fn build_generator(config: &AppConfig, on_activate: Arc<dyn Fn() + Send + Sync>) -> Generator {
    let fal = FalClient::new(
        FalConfig::new(config.fal_key.clone())
            .with_model(config.fal_model.clone())
            .with_queue_url(config.fal_queue_url.clone())
            .with_storage_url(config.fal_storage_url.clone())
            .with_poll_interval(config.poll_interval),
    );

    let store = JobStore::new(Arc::new(FileStore::new(config.state_dir.clone())));

    let notifications: Arc<dyn NotificationBackend> = if config.notifications {
        Arc::new(DesktopBackend::new().with_activation_hook(on_activate))
    } else {
        Arc::new(DisabledBackend)
    };

    Generator::new(
        Arc::new(fal),
        store,
        Arc::new(EventBus::default()),
        Arc::new(Notifier::new(notifications)),
    )
    .with_prompt(config.prompt.clone())
}

/// Build a session over a fresh generator.
pub fn build_session(config: &AppConfig, on_activate: Arc<dyn Fn() + Send + Sync>) -> UploadSession {
    UploadSession::new(
        build_generator(config, on_activate),
        SessionConfig {
            target_height: config.target_height,
            max_image_bytes: config.max_image_bytes,
        },
    )
}
