//! Host-side pieces of the KissYourCrush app: configuration, wiring,
//! the upload view model, static page content and video download.

pub mod config;
pub mod content;
pub mod download;
pub mod runtime;
pub mod view;

pub use config::{AppConfig, ConfigError};
pub use view::UploadView;
