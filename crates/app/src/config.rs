use std::path::PathBuf;
use std::time::Duration;

use crush_core::compositor::DEFAULT_TARGET_HEIGHT;
use crush_core::prompt::DEFAULT_PROMPT;
use crush_core::slot::DEFAULT_MAX_IMAGE_BYTES;
use crush_fal::client::{DEFAULT_MODEL, DEFAULT_QUEUE_URL, DEFAULT_STORAGE_URL};

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Host configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// fal API key.
    pub fal_key: String,
    /// Image-to-video model path.
    pub fal_model: String,
    pub fal_queue_url: String,
    pub fal_storage_url: String,
    /// Prompt sent with every request.
    pub prompt: String,
    /// Directory holding the persisted job snapshot.
    pub state_dir: PathBuf,
    pub poll_interval: Duration,
    pub target_height: u32,
    pub max_image_bytes: usize,
    /// Show desktop notifications on completion.
    pub notifications: bool,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                        |
    /// |--------------------------|------------------------------------------------|
    /// | `FAL_KEY`                | required                                       |
    /// | `FAL_MODEL`              | `fal-ai/minimax/video-01-live/image-to-video`  |
    /// | `FAL_QUEUE_URL`          | `https://queue.fal.run`                        |
    /// | `FAL_STORAGE_URL`        | `https://rest.alpha.fal.ai`                    |
    /// | `CRUSH_PROMPT`           | built-in prompt                                |
    /// | `CRUSH_STATE_DIR`        | `.crush`                                       |
    /// | `CRUSH_POLL_INTERVAL_MS` | `1000`                                         |
    /// | `CRUSH_TARGET_HEIGHT`    | `720`                                          |
    /// | `CRUSH_MAX_IMAGE_BYTES`  | `10485760`                                     |
    /// | `CRUSH_NOTIFICATIONS`    | `true`                                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let fal_key = var("FAL_KEY").ok_or(ConfigError::Missing("FAL_KEY"))?;
        let fal_model = var("FAL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());
        let fal_queue_url = var("FAL_QUEUE_URL").unwrap_or_else(|| DEFAULT_QUEUE_URL.into());
        let fal_storage_url =
            var("FAL_STORAGE_URL").unwrap_or_else(|| DEFAULT_STORAGE_URL.into());
        let prompt = var("CRUSH_PROMPT").unwrap_or_else(|| DEFAULT_PROMPT.into());
        let state_dir = PathBuf::from(var("CRUSH_STATE_DIR").unwrap_or_else(|| ".crush".into()));

        let poll_ms: u64 = parse(
            "CRUSH_POLL_INTERVAL_MS",
            var("CRUSH_POLL_INTERVAL_MS"),
            1000,
            "a positive number of milliseconds",
        )?;
        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "CRUSH_POLL_INTERVAL_MS",
                expected: "a positive number of milliseconds",
                value: "0".into(),
            });
        }
        let target_height: u32 = parse(
            "CRUSH_TARGET_HEIGHT",
            var("CRUSH_TARGET_HEIGHT"),
            DEFAULT_TARGET_HEIGHT,
            "a positive pixel height",
        )?;
        if target_height == 0 {
            return Err(ConfigError::Invalid {
                name: "CRUSH_TARGET_HEIGHT",
                expected: "a positive pixel height",
                value: "0".into(),
            });
        }
        let max_image_bytes: usize = parse(
            "CRUSH_MAX_IMAGE_BYTES",
            var("CRUSH_MAX_IMAGE_BYTES"),
            DEFAULT_MAX_IMAGE_BYTES,
            "a byte count",
        )?;
        let notifications = parse_bool("CRUSH_NOTIFICATIONS", var("CRUSH_NOTIFICATIONS"), true)?;

        Ok(Self {
            fal_key,
            fal_model,
            fal_queue_url,
            fal_storage_url,
            prompt,
            state_dir,
            poll_interval: Duration::from_millis(poll_ms),
            target_height,
            max_image_bytes,
            notifications,
        })
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}

fn parse_bool(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a boolean",
            value,
        }),
    }
}
