//! Window Manager Registry
//!
//! Knows the set of supported window managers and picks one. Detection
//! probes the executable search path for each known profile in the fixed
//! priority order of the registry's static list.

use std::ffi::{OsStr, OsString};

use tracing::{info, warn};

use quartz_core::types::WindowManagerProfile;

use crate::supervisor::process;

/// The static list of supported window managers, in priority order.
pub fn known_profiles() -> Vec<WindowManagerProfile> {
    vec![
        WindowManagerProfile::new(
            "openbox",
            "Openbox - light-weight window manager",
            "openbox",
        ),
        WindowManagerProfile::new(
            "kwin",
            "KWin - window manager of the KDE Software Compilation",
            "kwin",
        ),
        WindowManagerProfile::new(
            "metacity",
            "Metacity - window manager of the GNOME desktop environment",
            "metacity",
        ),
        WindowManagerProfile::new(
            "windowmaker",
            "Windowmaker - a classical lightweight window manager",
            "wmaker",
        ),
        WindowManagerProfile::new("e16", "Enlightenment 16", "e16"),
        WindowManagerProfile::new(
            "fvwm2",
            "Fvwm2 - a classical lightweight window manager",
            "fvwm2",
        ),
        WindowManagerProfile::new(
            "xfwm4",
            "Xfwm4 - a window manager for the Xfce desktop environment",
            "xfwm4",
        ),
        WindowManagerProfile::new(
            "sawfish",
            "Sawfish - a lightweight, flexible window manager",
            "sawfish",
        ),
    ]
}

/// Outcome of window manager resolution, consumed by the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The configured window manager is installed; use it.
    Configured(WindowManagerProfile),

    /// Nothing usable was configured; these are installed, in priority
    /// order, with the first as the default suggestion.
    Detected(Vec<WindowManagerProfile>),

    /// No known window manager is installed.
    NoneFound,
}

/// Registry of known window managers with installation probes.
pub struct WindowManagerRegistry {
    profiles: Vec<WindowManagerProfile>,
    search_path: Option<OsString>,
}

impl Default for WindowManagerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManagerRegistry {
    /// Registry over the built-in profile list, probing the inherited PATH.
    pub fn new() -> Self {
        Self {
            profiles: known_profiles(),
            search_path: None,
        }
    }

    /// Registry over a custom profile list (tests, exotic setups).
    pub fn with_profiles(profiles: Vec<WindowManagerProfile>) -> Self {
        Self {
            profiles,
            search_path: None,
        }
    }

    /// Probe only the given search path instead of the inherited PATH.
    pub fn with_search_path(mut self, search_path: OsString) -> Self {
        self.search_path = Some(search_path);
        self
    }

    pub(crate) fn search_path(&self) -> Option<&OsStr> {
        self.search_path.as_deref()
    }

    /// All known profiles, in priority order, installed or not.
    pub fn profiles(&self) -> &[WindowManagerProfile] {
        &self.profiles
    }

    /// The installed subset of the known profiles, in priority order.
    pub fn detect_installed(&self) -> Vec<WindowManagerProfile> {
        self.profiles
            .iter()
            .filter(|profile| self.is_installed(profile))
            .cloned()
            .collect()
    }

    /// The profile for a configured identifier, if known and installed.
    pub fn resolve_configured(&self, identifier: &str) -> Option<WindowManagerProfile> {
        let profile = self
            .profiles
            .iter()
            .find(|profile| profile.identifier == identifier)?;
        if self.is_installed(profile) {
            Some(profile.clone())
        } else {
            None
        }
    }

    /// Apply the resolution policy for session startup.
    ///
    /// A configured-and-installed window manager wins; otherwise the
    /// detected list is handed back for the UI layer to choose from. An
    /// unknown or uninstalled configured identifier falls back to
    /// detection rather than failing outright.
    pub fn resolve(&self, configured: Option<&str>) -> Resolution {
        if let Some(identifier) = configured {
            match self.resolve_configured(identifier) {
                Some(profile) => {
                    info!("Using configured window manager '{}'", identifier);
                    return Resolution::Configured(profile);
                }
                None => {
                    warn!(
                        "Configured window manager '{}' is not installed; falling back to detection",
                        identifier
                    );
                }
            }
        }

        let detected = self.detect_installed();
        if detected.is_empty() {
            Resolution::NoneFound
        } else {
            Resolution::Detected(detected)
        }
    }

    fn is_installed(&self, profile: &WindowManagerProfile) -> bool {
        process::resolve_executable(&profile.executable, self.search_path()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_profiles_priority_order() {
        let identifiers: Vec<String> = known_profiles()
            .into_iter()
            .map(|profile| profile.identifier)
            .collect();
        assert_eq!(
            identifiers,
            vec![
                "openbox",
                "kwin",
                "metacity",
                "windowmaker",
                "e16",
                "fvwm2",
                "xfwm4",
                "sawfish"
            ]
        );
    }

    #[cfg(unix)]
    mod probing {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn fake_executable(dir: &Path, name: &str) {
            let path = dir.join(name);
            fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn registry_with(dir: &Path, profiles: Vec<WindowManagerProfile>) -> WindowManagerRegistry {
            WindowManagerRegistry::with_profiles(profiles)
                .with_search_path(dir.as_os_str().to_os_string())
        }

        fn profile(identifier: &str, executable: &str) -> WindowManagerProfile {
            WindowManagerProfile::new(identifier, format!("{identifier} for tests"), executable)
        }

        #[test]
        fn test_detect_preserves_order_and_excludes_missing() {
            let dir = tempfile::tempdir().unwrap();
            fake_executable(dir.path(), "wm-c");
            fake_executable(dir.path(), "wm-a");

            let registry = registry_with(
                dir.path(),
                vec![
                    profile("a", "wm-a"),
                    profile("b", "wm-b"),
                    profile("c", "wm-c"),
                ],
            );

            let detected: Vec<String> = registry
                .detect_installed()
                .into_iter()
                .map(|p| p.identifier)
                .collect();
            assert_eq!(detected, vec!["a".to_string(), "c".to_string()]);
        }

        #[test]
        fn test_resolve_prefers_configured() {
            let dir = tempfile::tempdir().unwrap();
            fake_executable(dir.path(), "wm-a");
            fake_executable(dir.path(), "wm-b");

            let registry = registry_with(
                dir.path(),
                vec![profile("a", "wm-a"), profile("b", "wm-b")],
            );

            match registry.resolve(Some("b")) {
                Resolution::Configured(profile) => assert_eq!(profile.identifier, "b"),
                other => panic!("expected configured resolution, got {other:?}"),
            }
        }

        #[test]
        fn test_resolve_falls_back_when_configured_missing() {
            let dir = tempfile::tempdir().unwrap();
            fake_executable(dir.path(), "wm-a");

            let registry = registry_with(
                dir.path(),
                vec![profile("a", "wm-a"), profile("b", "wm-b")],
            );

            match registry.resolve(Some("b")) {
                Resolution::Detected(detected) => {
                    assert_eq!(detected.len(), 1);
                    assert_eq!(detected[0].identifier, "a");
                }
                other => panic!("expected detection fallback, got {other:?}"),
            }
        }

        #[test]
        fn test_resolve_none_found() {
            let dir = tempfile::tempdir().unwrap();
            let registry = registry_with(dir.path(), vec![profile("a", "wm-a")]);
            assert_eq!(registry.resolve(None), Resolution::NoneFound);
        }
    }
}
