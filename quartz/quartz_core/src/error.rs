//! Error types for the Quartz session supervisor.
//!
//! The errors are organized by subsystem, with each subsystem having its own
//! error type. The root error type, `Error`, can wrap any of the
//! subsystem-specific errors, allowing for uniform error handling at the top
//! level.

use thiserror::Error;

/// Result type used throughout the Quartz crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the Quartz system.
#[derive(Debug, Error)]
pub enum Error {
    /// Module lifecycle errors
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    /// Window manager resolution errors
    #[error("Window manager error: {0}")]
    WindowManager(#[from] WindowManagerError),

    /// Configuration store errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to session module lifecycle operations.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No module with the given name is known to the supervisor
    #[error("Module '{0}' not found")]
    NotFound(String),

    /// A live process already exists for this module name
    #[error("Module '{0}' is already running")]
    AlreadyRunning(String),

    /// The module's executable could not be resolved on the search path
    #[error("Executable '{0}' not found on PATH")]
    ExecutableNotFound(String),

    /// The OS refused to spawn the process
    #[error("Failed to spawn '{0}': {1}")]
    SpawnFailed(String, String),

    /// The module command string is empty or unparseable
    #[error("Invalid command line: {0}")]
    InvalidCommand(String),

    /// Autorestart was disabled after a crash loop; the module will not be
    /// relaunched automatically for the rest of the session
    #[error("Module '{0}' crashed too many times; autorestart disabled")]
    CrashLoop(String),

    /// The module is disabled and can only be brought back manually
    #[error("Module '{0}' is disabled for this session")]
    Disabled(String),
}

/// Errors related to window manager resolution and supervision.
#[derive(Debug, Error)]
pub enum WindowManagerError {
    /// No configured or installed window manager could be resolved
    #[error("No usable window manager found; a selection is required before the session can start")]
    Unresolved,

    /// The configured identifier does not match any known profile
    #[error("Unknown window manager identifier: {0}")]
    UnknownIdentifier(String),

    /// The window manager exited before the session considered it running
    #[error("Window manager '{0}' exited during startup")]
    ExitedEarly(String),
}

/// Errors related to the session configuration store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The profile file could not be read
    #[error("Failed to load session profile: {0}")]
    LoadFailed(String),

    /// The profile file could not be parsed
    #[error("Failed to parse session profile: {0}")]
    ParseFailed(String),

    /// The profile could not be written back to disk
    #[error("Failed to persist session profile: {0}")]
    PersistFailed(String),

    /// A module with this name already exists in the profile
    #[error("Module '{0}' already exists")]
    DuplicateModule(String),

    /// No module with this name exists in the profile
    #[error("Module '{0}' does not exist")]
    UnknownModule(String),

    /// The profile failed validation
    #[error("Invalid session profile: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_into_root() {
        let err: Error = ModuleError::NotFound("panel".to_string()).into();
        assert!(err.to_string().contains("panel"));
    }

    #[test]
    fn test_wm_unresolved_message() {
        let err = WindowManagerError::Unresolved;
        assert!(err.to_string().contains("window manager"));
    }

    #[test]
    fn test_config_duplicate_message() {
        let err = ConfigError::DuplicateModule("runner".to_string());
        assert_eq!(err.to_string(), "Module 'runner' already exists");
    }
}
