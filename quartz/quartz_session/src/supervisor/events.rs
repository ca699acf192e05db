//! Notification surface for the session supervisor.
//!
//! The supervisor publishes structured events over a broadcast channel so
//! any presentation layer (notification daemon, tray applet, logging sink)
//! can observe module lifecycle changes. A lagging subscriber drops old
//! events instead of blocking the supervisor.

use tokio::sync::broadcast;
use tracing::debug;

/// A structured session event, consumed by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A module process was started (initial launch or relaunch).
    ModuleStarted { name: String },

    /// A module process terminated without a stop having been requested.
    ModuleCrashed { name: String, crash_count: u32 },

    /// The crash-loop policy disabled automatic relaunch for a module.
    AutorestartDisabled { name: String, crash_count: u32 },

    /// A module exited after an explicit stop request.
    ModuleStopped { name: String },

    /// No configured or installed window manager could be resolved.
    WindowManagerMissing,

    /// The foundation window manager process exited unexpectedly; the
    /// session is over.
    WindowManagerExited,

    /// The session finished an orderly teardown.
    SessionShutdown,
}

impl SessionEvent {
    /// User-facing message for events worth showing in a notification,
    /// where one exists.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::AutorestartDisabled { name, .. } => Some(format!(
                "Application '{name}' crashed too many times. \
                 Its autorestart has been disabled for current session."
            )),
            Self::WindowManagerMissing => Some(
                "No usable window manager was found. \
                 Select a window manager before starting the session."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// Cloneable emitter half of the session event channel.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventSender {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub(crate) fn emit(&self, event: SessionEvent) {
        debug!(?event, "session event");
        let _ = self.tx.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}
