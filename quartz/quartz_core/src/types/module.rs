//! Session-module data types.
//!
//! A session module is an independently launchable desktop-session component
//! (panel, desktop shell, launcher, window switcher, privilege handler).
//! These types describe what to launch and how a launched module is doing;
//! the supervisor owns the live bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::LaunchId;

/// An autostart entry: one session module the supervisor should run.
///
/// The `name` uniquely identifies the module within a session profile and
/// within the supervisor. Descriptors are owned by the descriptor store and
/// mutated only through its explicit add/remove/edit operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module name
    pub name: String,

    /// Command line, split on whitespace at launch (no shell quoting)
    pub command: String,

    /// Whether the module is launched at session start
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ModuleDescriptor {
    /// Create an enabled descriptor.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            enabled: true,
        }
    }
}

/// Module state in the supervision lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    /// Process is alive and being monitored.
    Running,

    /// Process crashed; a relaunch is pending.
    Restarting,

    /// A stop was requested; waiting for the process to exit.
    Stopping,

    /// Autorestart was disabled for this session (crash loop or launch
    /// failure); no live process.
    Disabled,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Restarting => write!(f, "Restarting"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Disabled => write!(f, "Disabled"),
        }
    }
}

impl ModuleState {
    /// Check if this state has (or may briefly still have) a live process.
    pub fn has_process(&self) -> bool {
        matches!(self, Self::Running | Self::Stopping)
    }

    /// Check if the supervisor may relaunch the module automatically.
    pub fn allows_autorestart(&self) -> bool {
        matches!(self, Self::Running | Self::Restarting)
    }
}

/// Read-only snapshot of a supervised module, exported to UI layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatus {
    /// Module name
    pub name: String,

    /// Launch generation the snapshot refers to
    pub launch_id: LaunchId,

    /// Current lifecycle state
    pub state: ModuleState,

    /// OS process id, if a process is alive
    pub pid: Option<u32>,

    /// Number of crashes observed this session
    pub crash_count: u32,

    /// Whether the crash-loop policy disabled automatic relaunch
    pub autorestart_disabled: bool,

    /// When the current (or last) process was started
    pub last_start: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_enabled_by_default() {
        let json = r#"{"name": "panel", "command": "quartz-panel"}"#;
        let descriptor: ModuleDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.enabled);
    }

    #[test]
    fn test_descriptor_roundtrip() {
        let descriptor = ModuleDescriptor::new("runner", "quartz-runner --daemon");
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: ModuleDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, back);
    }

    #[test]
    fn test_state_predicates() {
        assert!(ModuleState::Running.has_process());
        assert!(ModuleState::Stopping.has_process());
        assert!(!ModuleState::Disabled.has_process());
        assert!(ModuleState::Restarting.allows_autorestart());
        assert!(!ModuleState::Stopping.allows_autorestart());
        assert!(!ModuleState::Disabled.allows_autorestart());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ModuleState::Disabled.to_string(), "Disabled");
    }
}
