//! Quartz Session - desktop session supervision runtime
//!
//! This crate provides the session runtime: the module descriptor store,
//! the window manager registry, the process supervisor with its crash-loop
//! policy, and the session controller that sequences startup and shutdown.

pub mod config;
pub mod supervisor;
pub mod system;
pub mod wm;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::info;

use quartz_core::id::SessionId;
use quartz_core::types::ModuleStatus;

pub use supervisor::{RestartPolicy, SessionEvent};

/// Session facade that wires the runtime components together.
///
/// One `Session` is one desktop session: explicitly constructed, explicitly
/// torn down. Several simulated sessions can coexist in one process, which
/// is what the integration tests do.
pub struct Session {
    /// Identifier for log correlation
    id: SessionId,

    /// Descriptor store backing the configuration surface
    pub store: Arc<config::ModuleStore>,

    /// Process supervisor owning module lifecycles
    pub supervisor: Arc<supervisor::ModuleSupervisor>,

    /// Controller sequencing startup and shutdown
    pub controller: Arc<system::SessionController>,
}

impl Session {
    /// Create a session from the profile at `config_path`, or from the
    /// default profile location.
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config::default_profile_path);

        info!("Initializing session from {:?}", path);
        let store = Arc::new(
            config::ModuleStore::load(path)
                .await
                .context("loading session profile")?,
        );

        let supervisor = supervisor::ModuleSupervisor::new(RestartPolicy::default());
        let registry = wm::WindowManagerRegistry::new();
        let controller = Arc::new(system::SessionController::new(
            Arc::clone(&store),
            registry,
            Arc::clone(&supervisor),
        ));

        Ok(Self {
            id: SessionId::new(),
            store,
            supervisor,
            controller,
        })
    }

    /// This session's identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Subscribe to the structured event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.supervisor.subscribe()
    }

    /// Start the session (window manager, then enabled modules).
    pub async fn start(&self) -> Result<()> {
        info!("Starting session {}", self.id);
        self.controller.start_session().await
    }

    /// Tear the session down in order.
    pub async fn shutdown(&self) -> Result<()> {
        self.controller.shutdown().await
    }

    /// Shutdown followed by a fresh start against the reloaded profile.
    pub async fn restart(&self) -> Result<()> {
        self.controller.restart_session().await
    }

    /// Request graceful termination of one module.
    pub async fn stop_module(&self, name: &str) -> Result<()> {
        self.supervisor.stop(name).await?;
        Ok(())
    }

    /// Retry a module whose autorestart was disabled.
    pub async fn restart_module(&self, name: &str) -> Result<ModuleStatus> {
        let status = self.supervisor.restart_manually(name).await?;
        Ok(status)
    }

    /// Snapshot of one supervised module.
    pub async fn module_status(&self, name: &str) -> Option<ModuleStatus> {
        self.supervisor.module_status(name).await
    }

    /// Snapshots of all supervised modules.
    pub async fn statuses(&self) -> Vec<ModuleStatus> {
        self.supervisor.statuses().await
    }
}
