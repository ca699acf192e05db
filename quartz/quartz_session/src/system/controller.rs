//! Session Controller
//!
//! Sequences session startup and owns session-wide commands: resolve the
//! window manager, launch it as the foundation process, launch the enabled
//! modules, and tear everything down in order on shutdown. The window
//! manager is unsupervised (its death ends the session), so it is handled
//! here rather than by the module supervisor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use quartz_core::types::{SessionEnvironment, WindowManagerProfile};
use quartz_core::WindowManagerError;

use crate::config::ModuleStore;
use crate::supervisor::events::{EventSender, SessionEvent};
use crate::supervisor::{process, ModuleSupervisor};
use crate::wm::{Resolution, WindowManagerRegistry};

/// How long the window manager must survive after spawn before the session
/// considers it running.
const WM_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Bookkeeping for the foundation (window manager) process.
struct FoundationHandle {
    profile: WindowManagerProfile,
    pid: u32,

    /// Set before a controlled teardown so the monitor task does not treat
    /// the exit as the session dying.
    stop_flag: Arc<AtomicBool>,
}

/// Orchestrates one session: startup order, shutdown, restart.
pub struct SessionController {
    store: Arc<ModuleStore>,
    registry: WindowManagerRegistry,
    supervisor: Arc<ModuleSupervisor>,
    events: EventSender,
    wm: RwLock<Option<FoundationHandle>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    settle: Duration,
}

impl SessionController {
    pub fn new(
        store: Arc<ModuleStore>,
        registry: WindowManagerRegistry,
        supervisor: Arc<ModuleSupervisor>,
    ) -> Self {
        let events = supervisor.event_sender();
        Self {
            store,
            registry,
            supervisor,
            events,
            wm: RwLock::new(None),
            monitor: Mutex::new(None),
            settle: WM_SETTLE_DELAY,
        }
    }

    /// Shorten the window-manager settle delay (tests).
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Start the session: window manager first, then every enabled module.
    ///
    /// Module launch failures are isolated: one module failing never
    /// aborts the launch of the others. An unresolvable window manager is
    /// fatal.
    pub async fn start_session(&self) -> Result<()> {
        let profile = self.store.profile().await;
        self.supervisor
            .set_environment(profile.environment.clone())
            .await;

        let wm_profile = match self.registry.resolve(profile.window_manager.as_deref()) {
            Resolution::Configured(wm_profile) => wm_profile,
            Resolution::Detected(detected) => {
                // First detected is the default suggestion; a UI layer can
                // offer the full list before calling start_session.
                let first = detected[0].clone();
                info!(
                    "No usable window manager configured; defaulting to detected '{}'",
                    first.identifier
                );
                first
            }
            Resolution::NoneFound => {
                self.events.emit(SessionEvent::WindowManagerMissing);
                return Err(WindowManagerError::Unresolved.into());
            }
        };

        // Drain exit notices before the first module can crash.
        let monitor = tokio::spawn(Arc::clone(&self.supervisor).run());
        *self.monitor.lock() = Some(monitor);

        self.launch_window_manager(&wm_profile, &profile.environment)
            .await
            .with_context(|| format!("window manager '{}'", wm_profile.identifier))?;

        for descriptor in profile.modules.iter().filter(|d| d.enabled) {
            if let Err(err) = self.supervisor.launch(descriptor).await {
                warn!("Failed to start module '{}': {}", descriptor.name, err);
            }
        }

        info!(
            "Session started with window manager '{}'",
            wm_profile.identifier
        );
        Ok(())
    }

    /// Tear the session down: modules first, then the window manager.
    ///
    /// Individual stop errors are reported, never fatal.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down session");

        self.supervisor.stop_all().await;
        let grace = self.supervisor.policy().stop_grace;
        if !self.supervisor.await_idle(grace * 2).await {
            warn!("Some modules did not stop within the grace period");
        }

        if let Some(handle) = self.wm.write().await.take() {
            handle.stop_flag.store(true, Ordering::SeqCst);
            process::terminate(handle.pid);

            let deadline = tokio::time::Instant::now() + grace;
            while process::pid_alive(handle.pid) && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if process::pid_alive(handle.pid) {
                warn!(
                    "Window manager '{}' did not exit; forcing kill",
                    handle.profile.identifier
                );
                process::force_kill(handle.pid);
            }
            info!("Window manager '{}' stopped", handle.profile.identifier);
        }

        self.events.emit(SessionEvent::SessionShutdown);

        self.supervisor.close();
        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            let _ = monitor.await;
        }

        info!("Session shutdown complete");
        Ok(())
    }

    /// Full shutdown followed by a fresh start against the reloaded
    /// profile.
    ///
    /// Environment-variable and window-manager changes cannot apply to
    /// already-running processes, so this is how configuration changes
    /// take effect.
    pub async fn restart_session(&self) -> Result<()> {
        info!("Restarting session to apply configuration changes");
        self.shutdown().await?;
        self.store
            .reload()
            .await
            .context("reloading session profile")?;
        self.start_session().await
    }

    /// Whether a foundation process is currently registered.
    pub async fn window_manager_running(&self) -> bool {
        match self.wm.read().await.as_ref() {
            Some(handle) => process::pid_alive(handle.pid),
            None => false,
        }
    }

    /// Spawn the window manager and confirm it survives the settle delay.
    async fn launch_window_manager(
        &self,
        wm_profile: &WindowManagerProfile,
        environment: &SessionEnvironment,
    ) -> Result<()> {
        let executable =
            process::resolve_executable(&wm_profile.executable, self.registry.search_path())?;
        let mut child = process::spawn(&executable, &[], environment)
            .with_context(|| format!("spawning {executable:?}"))?;

        tokio::select! {
            _ = child.wait() => {
                return Err(WindowManagerError::ExitedEarly(wm_profile.identifier.clone()).into());
            }
            _ = tokio::time::sleep(self.settle) => {}
        }

        let pid = child
            .id()
            .ok_or_else(|| WindowManagerError::ExitedEarly(wm_profile.identifier.clone()))?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let monitor_flag = Arc::clone(&stop_flag);
        let events = self.events.clone();
        let identifier = wm_profile.identifier.clone();
        tokio::spawn(async move {
            let _ = child.wait().await;
            if !monitor_flag.load(Ordering::SeqCst) {
                warn!(
                    "Window manager '{}' exited unexpectedly; the session is over",
                    identifier
                );
                events.emit(SessionEvent::WindowManagerExited);
            }
        });

        *self.wm.write().await = Some(FoundationHandle {
            profile: wm_profile.clone(),
            pid,
            stop_flag,
        });

        info!(
            "Window manager '{}' running (pid {})",
            wm_profile.identifier, pid
        );
        Ok(())
    }
}
