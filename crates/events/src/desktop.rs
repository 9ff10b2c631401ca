//! Desktop notification backends.

use std::io::Write;
use std::sync::Arc;

use crate::notifier::{NotificationBackend, NotificationError, Permission};

/// Application name shown by the notification daemon.
pub const APP_NAME: &str = "KissYourCrush";

/// Callback invoked when the user clicks a notification.
pub type ActivationHook = Arc<dyn Fn() + Send + Sync>;

/// Notifications through the desktop notification service.
///
/// Desktop sessions have no per-app permission prompt, so permission is
/// granted whenever the backend is enabled. The audio cue is the terminal
/// bell.
pub struct DesktopBackend {
    on_activate: Option<ActivationHook>,
}

impl DesktopBackend {
    pub fn new() -> Self {
        Self { on_activate: None }
    }

    /// Run `hook` when the user clicks a shown notification.
    pub fn with_activation_hook(mut self, hook: ActivationHook) -> Self {
        self.on_activate = Some(hook);
        self
    }
}

impl Default for DesktopBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBackend for DesktopBackend {
    fn request_permission(&self) -> Result<Permission, NotificationError> {
        Ok(Permission::Granted)
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn show(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        let handle = notify_rust::Notification::new()
            .appname(APP_NAME)
            .summary(title)
            .body(body)
            .action("default", "Open")
            .show()
            .map_err(|e| NotificationError::Dispatch(e.to_string()))?;

        if let Some(hook) = self.on_activate.clone() {
            // Blocks until the notification is clicked or dismissed.
            std::thread::spawn(move || {
                handle.wait_for_action(|action| {
                    if action == "default" {
                        hook();
                    }
                });
            });
        }
        Ok(())
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn show(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        notify_rust::Notification::new()
            .appname(APP_NAME)
            .summary(title)
            .body(body)
            .show()
            .map_err(|e| NotificationError::Dispatch(e.to_string()))?;
        Ok(())
    }

    fn play_sound(&self) -> Result<(), NotificationError> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| NotificationError::Sound(e.to_string()))
    }
}

/// Backend for hosts with notifications turned off. Always denies.
#[derive(Debug, Default)]
pub struct DisabledBackend;

impl NotificationBackend for DisabledBackend {
    fn request_permission(&self) -> Result<Permission, NotificationError> {
        Ok(Permission::Denied)
    }

    fn show(&self, _title: &str, _body: &str) -> Result<(), NotificationError> {
        Ok(())
    }

    fn play_sound(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}
