//! Window manager profiles and default-application preferences.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A known window manager: identity, human-readable description, and the
/// executable probed for on the search path.
///
/// Profiles are static registry entries, immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowManagerProfile {
    /// Stable identifier, stored in the session profile
    pub identifier: String,

    /// Human-readable description shown by selection UIs
    pub display_description: String,

    /// Executable name resolved against the search path
    pub executable: String,
}

impl WindowManagerProfile {
    pub fn new(
        identifier: impl Into<String>,
        display_description: impl Into<String>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_description: display_description.into(),
            executable: executable.into(),
        }
    }
}

impl fmt::Display for WindowManagerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_description, self.executable)
    }
}

/// Preferred default applications, stored alongside the autostart entries.
///
/// Consumed by external configuration surfaces; the supervisor itself never
/// reads these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultApplications {
    /// Preferred terminal emulator command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,

    /// Preferred web browser command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_display() {
        let profile = WindowManagerProfile::new("openbox", "Openbox - light-weight window manager", "openbox");
        assert_eq!(profile.to_string(), "Openbox - light-weight window manager (openbox)");
    }

    #[test]
    fn test_default_apps_skip_empty_fields() {
        let apps = DefaultApplications::default();
        assert_eq!(serde_json::to_string(&apps).unwrap(), "{}");
    }
}
