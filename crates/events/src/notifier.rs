//! Permission-gated completion notifications.
//!
//! [`Notifier`] asks the platform for permission once per session and
//! caches a definitive answer. Delivery is best effort: backend failures
//! are logged and never reach the caller.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Platform answer to a notification permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not decided yet.
    Default,
}

/// Errors raised by a [`NotificationBackend`].
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification permission request failed: {0}")]
    Permission(String),

    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),

    #[error("Audio cue failed: {0}")]
    Sound(String),
}

/// Host integration for system notifications.
pub trait NotificationBackend: Send + Sync {
    /// Ask the platform for permission to show notifications.
    fn request_permission(&self) -> Result<Permission, NotificationError>;

    /// Display a system notification.
    fn show(&self, title: &str, body: &str) -> Result<(), NotificationError>;

    /// Play a short audio cue.
    fn play_sound(&self) -> Result<(), NotificationError>;
}

/// Session-scoped notifier.
pub struct Notifier {
    backend: Arc<dyn NotificationBackend>,
    permission: Mutex<Option<Permission>>,
}

impl Notifier {
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        Self {
            backend,
            permission: Mutex::new(None),
        }
    }

    /// Request permission from the backend.
    ///
    /// `Granted` and `Denied` are cached for the rest of the session;
    /// `Default` is not, so a later call asks again. A failing request is
    /// treated as `Default`.
    pub fn request_permission(&self) -> Permission {
        if let Some(cached) = self.cached() {
            return cached;
        }

        let permission = match self.backend.request_permission() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Notification permission request failed");
                Permission::Default
            }
        };

        if permission != Permission::Default {
            if let Ok(mut slot) = self.permission.lock() {
                *slot = Some(permission);
            }
        }
        tracing::debug!(?permission, "Notification permission resolved");
        permission
    }

    /// Current permission without asking the backend.
    pub fn permission(&self) -> Permission {
        self.cached().unwrap_or(Permission::Default)
    }

    /// Show a notification and play the audio cue.
    ///
    /// No-op unless permission has been granted. Returns whether the
    /// notification was displayed.
    pub fn notify(&self, title: &str, body: &str) -> bool {
        if self.permission() != Permission::Granted {
            tracing::debug!(title, "Notification skipped, permission not granted");
            return false;
        }

        if let Err(e) = self.backend.show(title, body) {
            tracing::warn!(error = %e, title, "Failed to show notification");
            return false;
        }
        if let Err(e) = self.backend.play_sound() {
            tracing::warn!(error = %e, "Failed to play notification sound");
        }
        true
    }

    fn cached(&self) -> Option<Permission> {
        self.permission.lock().ok().and_then(|p| *p)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct ScriptedBackend {
        answers: Mutex<Vec<Permission>>,
        requests: AtomicUsize,
        shown: AtomicUsize,
        sounds: AtomicUsize,
        fail_show: bool,
    }

    impl ScriptedBackend {
        fn new(answers: Vec<Permission>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers),
                requests: AtomicUsize::new(0),
                shown: AtomicUsize::new(0),
                sounds: AtomicUsize::new(0),
                fail_show: false,
            })
        }
    }

    impl NotificationBackend for ScriptedBackend {
        fn request_permission(&self) -> Result<Permission, NotificationError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                return Err(NotificationError::Permission("no answer scripted".into()));
            }
            Ok(answers.remove(0))
        }

        fn show(&self, _title: &str, _body: &str) -> Result<(), NotificationError> {
            if self.fail_show {
                return Err(NotificationError::Dispatch("daemon unavailable".into()));
            }
            self.shown.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn play_sound(&self) -> Result<(), NotificationError> {
            self.sounds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn notify_before_permission_is_noop() {
        let backend = ScriptedBackend::new(vec![Permission::Granted]);
        let notifier = Notifier::new(backend.clone());
        assert!(!notifier.notify("Done", "Your video is ready"));
        assert_eq!(backend.shown.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn granted_permission_shows_and_plays_sound() {
        let backend = ScriptedBackend::new(vec![Permission::Granted]);
        let notifier = Notifier::new(backend.clone());

        assert_eq!(notifier.request_permission(), Permission::Granted);
        assert!(notifier.notify("Done", "Your video is ready"));
        assert_eq!(backend.shown.load(Ordering::SeqCst), 1);
        assert_eq!(backend.sounds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn denied_permission_never_shows() {
        let backend = ScriptedBackend::new(vec![Permission::Denied]);
        let notifier = Notifier::new(backend.clone());

        assert_eq!(notifier.request_permission(), Permission::Denied);
        assert!(!notifier.notify("Done", "Your video is ready"));
        assert_eq!(backend.shown.load(Ordering::SeqCst), 0);
        assert_eq!(backend.sounds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn definitive_answer_is_cached() {
        let backend = ScriptedBackend::new(vec![Permission::Granted, Permission::Denied]);
        let notifier = Notifier::new(backend.clone());

        notifier.request_permission();
        assert_eq!(notifier.request_permission(), Permission::Granted);
        assert_eq!(backend.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_answer_is_asked_again() {
        let backend = ScriptedBackend::new(vec![Permission::Default, Permission::Granted]);
        let notifier = Notifier::new(backend.clone());

        assert_eq!(notifier.request_permission(), Permission::Default);
        assert_eq!(notifier.request_permission(), Permission::Granted);
        assert_eq!(backend.requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_permission_request_degrades_to_default() {
        let backend = ScriptedBackend::new(vec![]);
        let notifier = Notifier::new(backend);
        assert_eq!(notifier.request_permission(), Permission::Default);
        assert!(!notifier.notify("Done", "Your video is ready"));
    }

    #[test]
    fn dispatch_failure_is_swallowed() {
        let backend = Arc::new(ScriptedBackend {
            answers: Mutex::new(vec![Permission::Granted]),
            requests: AtomicUsize::new(0),
            shown: AtomicUsize::new(0),
            sounds: AtomicUsize::new(0),
            fail_show: true,
        });
        let notifier = Notifier::new(backend.clone());
        notifier.request_permission();

        assert!(!notifier.notify("Done", "Your video is ready"));
        assert_eq!(backend.sounds.load(Ordering::SeqCst), 0);
    }
}
