//! Module Descriptor Store
//!
//! Loads and persists the session profile: autostart entries, session
//! environment variables, the configured window manager, and default
//! applications. Every mutation is validated and written back atomically,
//! so the on-disk profile never lags the in-memory one.
//!
//! The supervisor treats the store as read-only input; mutations happen
//! only through the explicit operations here (the configuration surface),
//! after which the controller is asked to reload.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

use quartz_core::types::{
    DefaultApplications, ModuleDescriptor, SessionEnvironment,
};
use quartz_core::ConfigError;

/// The persisted session profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    /// Autostart entries, launch order irrelevant
    #[serde(default = "default_modules")]
    pub modules: Vec<ModuleDescriptor>,

    /// Session-scoped environment variables
    #[serde(default)]
    pub environment: SessionEnvironment,

    /// Configured window manager identifier, if the user picked one
    #[serde(default)]
    pub window_manager: Option<String>,

    /// Preferred default applications
    #[serde(default)]
    pub default_apps: DefaultApplications,
}

/// The built-in module roster used when no profile exists yet.
fn default_modules() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::new("panel", "quartz-panel"),
        ModuleDescriptor::new("desktop", "quartz-desktop"),
        ModuleDescriptor::new("runner", "quartz-runner"),
        ModuleDescriptor::new("appswitcher", "quartz-appswitcher"),
        ModuleDescriptor::new("policykit", "quartz-policykit-agent"),
    ]
}

impl Default for SessionProfile {
    fn default() -> Self {
        Self {
            modules: default_modules(),
            environment: SessionEnvironment::new(),
            window_manager: None,
            default_apps: DefaultApplications::default(),
        }
    }
}

impl SessionProfile {
    /// Validate the profile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for descriptor in &self.modules {
            if descriptor.name.trim().is_empty() {
                return Err(ConfigError::Invalid("module name cannot be empty".to_string()));
            }
            if descriptor.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "module '{}' has an empty command",
                    descriptor.name
                )));
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate module name '{}'",
                    descriptor.name
                )));
            }
        }
        Ok(())
    }
}

/// Default on-disk location of the session profile.
///
/// `$XDG_CONFIG_HOME/quartz/session.json`, falling back to
/// `~/.config/quartz/session.json`.
pub fn default_profile_path() -> PathBuf {
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    config_home.join("quartz").join("session.json")
}

/// JSON-file-backed store for the session profile.
#[derive(Debug)]
pub struct ModuleStore {
    path: PathBuf,
    profile: RwLock<SessionProfile>,
}

impl ModuleStore {
    /// Load the profile from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let profile = Self::read_profile(&path).await?;
        Ok(Self {
            path,
            profile: RwLock::new(profile),
        })
    }

    async fn read_profile(path: &Path) -> Result<SessionProfile, ConfigError> {
        if !path.exists() {
            warn!("Session profile not found at {:?}, using defaults", path);
            return Ok(SessionProfile::default());
        }

        info!("Loading session profile from {:?}", path);
        let content = fs::read_to_string(path)
            .await
            .map_err(|err| ConfigError::LoadFailed(format!("{path:?}: {err}")))?;
        let profile: SessionProfile = serde_json::from_str(&content)
            .map_err(|err| ConfigError::ParseFailed(format!("{path:?}: {err}")))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Path the store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clone of the current profile.
    pub async fn profile(&self) -> SessionProfile {
        self.profile.read().await.clone()
    }

    /// Re-read the profile from disk, discarding in-memory state.
    pub async fn reload(&self) -> Result<(), ConfigError> {
        let fresh = Self::read_profile(&self.path).await?;
        *self.profile.write().await = fresh;
        Ok(())
    }

    /// Add a new autostart entry.
    pub async fn add_module(&self, descriptor: ModuleDescriptor) -> Result<(), ConfigError> {
        let mut profile = self.profile.write().await;
        if profile.modules.iter().any(|m| m.name == descriptor.name) {
            return Err(ConfigError::DuplicateModule(descriptor.name));
        }
        profile.modules.push(descriptor);
        self.persist(&profile).await
    }

    /// Remove an autostart entry.
    pub async fn remove_module(&self, name: &str) -> Result<(), ConfigError> {
        let mut profile = self.profile.write().await;
        let before = profile.modules.len();
        profile.modules.retain(|m| m.name != name);
        if profile.modules.len() == before {
            return Err(ConfigError::UnknownModule(name.to_string()));
        }
        self.persist(&profile).await
    }

    /// Replace the command of an existing entry.
    pub async fn edit_module(&self, name: &str, command: &str) -> Result<(), ConfigError> {
        if command.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "module '{name}' cannot have an empty command"
            )));
        }
        let mut profile = self.profile.write().await;
        let module = profile
            .modules
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| ConfigError::UnknownModule(name.to_string()))?;
        module.command = command.to_string();
        self.persist(&profile).await
    }

    /// Enable or disable an entry.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), ConfigError> {
        let mut profile = self.profile.write().await;
        let module = profile
            .modules
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| ConfigError::UnknownModule(name.to_string()))?;
        module.enabled = enabled;
        self.persist(&profile).await
    }

    /// Set a session environment variable.
    pub async fn set_variable(&self, name: &str, value: &str) -> Result<(), ConfigError> {
        let mut profile = self.profile.write().await;
        profile.environment.set(name, value);
        self.persist(&profile).await
    }

    /// Remove a session environment variable.
    pub async fn unset_variable(&self, name: &str) -> Result<(), ConfigError> {
        let mut profile = self.profile.write().await;
        profile.environment.unset(name);
        self.persist(&profile).await
    }

    /// Record the user's window manager choice.
    pub async fn set_window_manager(&self, identifier: Option<String>) -> Result<(), ConfigError> {
        let mut profile = self.profile.write().await;
        profile.window_manager = identifier;
        self.persist(&profile).await
    }

    /// Record preferred default applications.
    pub async fn set_default_applications(
        &self,
        apps: DefaultApplications,
    ) -> Result<(), ConfigError> {
        let mut profile = self.profile.write().await;
        profile.default_apps = apps;
        self.persist(&profile).await
    }

    /// Write the profile atomically: temp file in the same directory, then
    /// rename over the target.
    async fn persist(&self, profile: &SessionProfile) -> Result<(), ConfigError> {
        profile.validate()?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| ConfigError::PersistFailed(format!("{parent:?}: {err}")))?;
        }

        let content = serde_json::to_string_pretty(profile)
            .map_err(|err| ConfigError::PersistFailed(err.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|err| ConfigError::PersistFailed(format!("{tmp:?}: {err}")))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| ConfigError::PersistFailed(format!("{:?}: {err}", self.path)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("session.json")
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModuleStore::load(store_path(&dir)).await.unwrap();

        let profile = store.profile().await;
        assert_eq!(profile.modules.len(), 5);
        assert!(profile.modules.iter().any(|m| m.name == "panel"));
        assert!(profile.window_manager.is_none());
    }

    #[tokio::test]
    async fn test_mutations_persist_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        let store = ModuleStore::load(&path).await.unwrap();
        store
            .add_module(ModuleDescriptor::new("clipboard", "quartz-clipd"))
            .await
            .unwrap();
        store.set_variable("GTK_THEME", "Adwaita").await.unwrap();
        store
            .set_window_manager(Some("openbox".to_string()))
            .await
            .unwrap();

        // A second store over the same file sees everything.
        let reopened = ModuleStore::load(&path).await.unwrap();
        let profile = reopened.profile().await;
        assert!(profile.modules.iter().any(|m| m.name == "clipboard"));
        assert_eq!(profile.environment.get("GTK_THEME"), Some("Adwaita"));
        assert_eq!(profile.window_manager.as_deref(), Some("openbox"));
    }

    #[tokio::test]
    async fn test_duplicate_module_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModuleStore::load(store_path(&dir)).await.unwrap();

        let err = store
            .add_module(ModuleDescriptor::new("panel", "another-panel"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateModule(_)));
    }

    #[tokio::test]
    async fn test_remove_unknown_module_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModuleStore::load(store_path(&dir)).await.unwrap();

        let err = store.remove_module("nope").await.unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModule(_)));
    }

    #[tokio::test]
    async fn test_edit_and_disable_module() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModuleStore::load(store_path(&dir)).await.unwrap();

        store.edit_module("runner", "quartz-runner --safe").await.unwrap();
        store.set_enabled("runner", false).await.unwrap();

        let profile = store.profile().await;
        let runner = profile.modules.iter().find(|m| m.name == "runner").unwrap();
        assert_eq!(runner.command, "quartz-runner --safe");
        assert!(!runner.enabled);
    }

    #[tokio::test]
    async fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);
        std::fs::write(&path, "{ not json").unwrap();

        let err = ModuleStore::load(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[tokio::test]
    async fn test_reload_discards_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_path(&dir);

        let store = ModuleStore::load(&path).await.unwrap();
        store.set_variable("A", "1").await.unwrap();

        // Overwrite the file behind the store's back, then reload.
        let other = ModuleStore::load(&path).await.unwrap();
        other.set_variable("A", "2").await.unwrap();

        store.reload().await.unwrap();
        assert_eq!(store.profile().await.environment.get("A"), Some("2"));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let profile = SessionProfile {
            modules: vec![
                ModuleDescriptor::new("panel", "a"),
                ModuleDescriptor::new("panel", "b"),
            ],
            ..SessionProfile::default()
        };
        assert!(matches!(profile.validate(), Err(ConfigError::Invalid(_))));
    }
}
