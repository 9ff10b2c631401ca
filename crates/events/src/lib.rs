//! Job event fan-out and user notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub for [`JobEvent`]s,
//!   backed by `tokio::sync::broadcast`.
//! - [`Notifier`]: permission-gated completion notifications over a
//!   pluggable [`NotificationBackend`].
//! - [`desktop`]: desktop notification backends.

pub mod bus;
pub mod desktop;
pub mod notifier;

pub use bus::{EventBus, JobEvent};
pub use desktop::{DesktopBackend, DisabledBackend};
pub use notifier::{NotificationBackend, NotificationError, Notifier, Permission};
