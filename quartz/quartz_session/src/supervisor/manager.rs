//! Module Supervisor
//!
//! Owns the lifecycle of every session module process: launching, observing
//! exits, applying the crash-loop policy, and serving stop/restart commands.
//!
//! Each spawned child is owned by a detached wait-task that forwards an
//! `ExitNotice` over a single-consumer queue; `run` drains that queue on one
//! logical thread of control, so all bookkeeping mutations are serialized.
//! No operation blocks waiting for a child to exit.

use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, Mutex, Notify, RwLock};
use tracing::{debug, info, warn};

use quartz_core::id::LaunchId;
use quartz_core::types::{ModuleDescriptor, ModuleState, ModuleStatus, SessionEnvironment};
use quartz_core::ModuleError;

use super::events::{EventSender, SessionEvent};
use super::policy::{CrashVerdict, RestartPolicy};
use super::process;

/// Notification from a wait-task that a child process terminated.
#[derive(Debug)]
struct ExitNotice {
    name: String,
    launch_id: LaunchId,
    status: Option<std::process::ExitStatus>,
}

/// Supervisor-internal record of one running (or disabled) module.
struct ModuleEntry {
    descriptor: ModuleDescriptor,
    launch_id: LaunchId,
    pid: Option<u32>,
    state: ModuleState,
    crash_count: u32,
    crash_history: Vec<DateTime<Utc>>,
    autorestart_disabled: bool,
    stop_requested: bool,
    last_start: DateTime<Utc>,
}

impl ModuleEntry {
    fn status(&self) -> ModuleStatus {
        ModuleStatus {
            name: self.descriptor.name.clone(),
            launch_id: self.launch_id,
            state: self.state,
            pid: self.pid,
            crash_count: self.crash_count,
            autorestart_disabled: self.autorestart_disabled,
            last_start: self.last_start,
        }
    }
}

/// The module supervisor.
///
/// One instance exists per session; the session controller drives it. All
/// public operations serialize module transitions under the module-map lock,
/// so a stop racing a crash-triggered relaunch can never produce two live
/// processes for the same name.
pub struct ModuleSupervisor {
    /// Live bookkeeping, keyed by module name
    modules: RwLock<HashMap<String, ModuleEntry>>,

    /// Crash-loop and teardown policy
    policy: RestartPolicy,

    /// Variables overlaid on every child's environment
    environment: RwLock<SessionEnvironment>,

    /// Notification surface
    events: EventSender,

    /// Sender cloned into every wait-task
    exit_tx: mpsc::UnboundedSender<ExitNotice>,

    /// Receiver side, taken by `run` and put back when the loop stops
    exit_rx: Mutex<Option<mpsc::UnboundedReceiver<ExitNotice>>>,

    /// Explicit executable search path (tests); `None` means inherited PATH
    search_path: Option<OsString>,

    /// Signalled by `close` to stop the event loop
    shutdown: Notify,
}

impl ModuleSupervisor {
    /// Create a supervisor with the given policy.
    pub fn new(policy: RestartPolicy) -> Arc<Self> {
        Self::with_search_path(policy, None)
    }

    /// Create a supervisor resolving executables only in `search_path`.
    pub fn with_search_path(policy: RestartPolicy, search_path: Option<OsString>) -> Arc<Self> {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            modules: RwLock::new(HashMap::new()),
            policy,
            environment: RwLock::new(SessionEnvironment::new()),
            events: EventSender::new(64),
            exit_tx,
            exit_rx: Mutex::new(Some(exit_rx)),
            search_path,
            shutdown: Notify::new(),
        })
    }

    /// The active crash-loop policy.
    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Replace the session environment applied to subsequent launches.
    ///
    /// Already-running processes keep the environment they were started
    /// with; changes apply from the next launch on.
    pub async fn set_environment(&self, environment: SessionEnvironment) {
        *self.environment.write().await = environment;
    }

    /// Subscribe to the session event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> EventSender {
        self.events.clone()
    }

    /// Drain exit notices until `close` is called.
    ///
    /// This is the supervisor's single logical thread of control: every
    /// crash/clean-exit transition happens here or under the same lock the
    /// command operations take.
    pub async fn run(self: Arc<Self>) {
        let mut rx = match self.exit_rx.lock().await.take() {
            Some(rx) => rx,
            None => {
                warn!("Supervisor event loop is already running");
                return;
            }
        };

        debug!("Supervisor event loop started");
        loop {
            tokio::select! {
                notice = rx.recv() => match notice {
                    Some(notice) => self.handle_exit(notice).await,
                    None => break,
                },
                _ = self.shutdown.notified() => break,
            }
        }
        debug!("Supervisor event loop stopped");

        // Re-arm so a restarted session can run the loop again.
        *self.exit_rx.lock().await = Some(rx);
    }

    /// Stop the event loop started by `run`.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    /// Launch a module and register it for supervision.
    ///
    /// Fails with `Disabled` for descriptors with `enabled = false` and for
    /// modules whose autorestart was disabled this session; a launch
    /// failure records the module as disabled and is not retried.
    pub async fn launch(
        self: &Arc<Self>,
        descriptor: &ModuleDescriptor,
    ) -> Result<ModuleStatus, ModuleError> {
        if !descriptor.enabled {
            return Err(ModuleError::Disabled(descriptor.name.clone()));
        }

        let mut modules = self.modules.write().await;
        if let Some(entry) = modules.get(&descriptor.name) {
            if entry.state.has_process() || entry.state == ModuleState::Restarting {
                return Err(ModuleError::AlreadyRunning(descriptor.name.clone()));
            }
            if entry.autorestart_disabled {
                return Err(ModuleError::Disabled(descriptor.name.clone()));
            }
        }

        match self.spawn_module(descriptor).await {
            Ok((pid, launch_id)) => {
                let entry = ModuleEntry {
                    descriptor: descriptor.clone(),
                    launch_id,
                    pid: Some(pid),
                    state: ModuleState::Running,
                    crash_count: 0,
                    crash_history: Vec::new(),
                    autorestart_disabled: false,
                    stop_requested: false,
                    last_start: Utc::now(),
                };
                let status = entry.status();
                modules.insert(descriptor.name.clone(), entry);
                info!("Started module '{}' (pid {})", descriptor.name, pid);
                self.events.emit(SessionEvent::ModuleStarted {
                    name: descriptor.name.clone(),
                });
                Ok(status)
            }
            Err(err) => {
                warn!("Failed to launch module '{}': {}", descriptor.name, err);
                modules.insert(
                    descriptor.name.clone(),
                    ModuleEntry {
                        descriptor: descriptor.clone(),
                        launch_id: LaunchId::new(),
                        pid: None,
                        state: ModuleState::Disabled,
                        crash_count: 0,
                        crash_history: Vec::new(),
                        autorestart_disabled: true,
                        stop_requested: false,
                        last_start: Utc::now(),
                    },
                );
                Err(err)
            }
        }
    }

    /// Request graceful termination of a module.
    ///
    /// The subsequent exit is marked clean and removes the record once the
    /// exit notice drains; a forced kill follows if the process outlives
    /// the grace period. Stopping an unknown or already-stopped module is a
    /// no-op.
    pub async fn stop(self: &Arc<Self>, name: &str) -> Result<(), ModuleError> {
        let mut modules = self.modules.write().await;
        let Some(entry) = modules.get_mut(name) else {
            debug!("stop: module '{}' is not registered", name);
            return Ok(());
        };
        if entry.stop_requested {
            return Ok(());
        }

        let Some(pid) = entry.pid else {
            // No live process (disabled, or a relaunch still pending);
            // dropping the record also cancels any pending relaunch.
            debug!("stop: module '{}' has no process, removing record", name);
            modules.remove(name);
            return Ok(());
        };

        entry.stop_requested = true;
        entry.state = ModuleState::Stopping;
        process::terminate(pid);
        info!("Requested stop of module '{}' (pid {})", name, pid);

        let supervisor = Arc::clone(self);
        let name = name.to_string();
        let launch_id = entry.launch_id;
        let grace = self.policy.stop_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            supervisor.escalate_stop(&name, launch_id, grace).await;
        });

        Ok(())
    }

    /// Reset crash bookkeeping and relaunch a module the user explicitly
    /// asked to retry.
    pub async fn restart_manually(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<ModuleStatus, ModuleError> {
        let mut modules = self.modules.write().await;
        let Some(entry) = modules.get_mut(name) else {
            return Err(ModuleError::NotFound(name.to_string()));
        };
        if entry.state.has_process() {
            return Err(ModuleError::AlreadyRunning(name.to_string()));
        }

        entry.crash_count = 0;
        entry.crash_history.clear();
        entry.autorestart_disabled = false;
        entry.stop_requested = false;

        let descriptor = entry.descriptor.clone();
        match self.spawn_module(&descriptor).await {
            Ok((pid, launch_id)) => {
                entry.pid = Some(pid);
                entry.launch_id = launch_id;
                entry.state = ModuleState::Running;
                entry.last_start = Utc::now();
                info!("Manually restarted module '{}' (pid {})", name, pid);
                self.events.emit(SessionEvent::ModuleStarted {
                    name: name.to_string(),
                });
                Ok(entry.status())
            }
            Err(err) => {
                entry.pid = None;
                entry.state = ModuleState::Disabled;
                entry.autorestart_disabled = true;
                Err(err)
            }
        }
    }

    /// Request a stop of every registered module. Best-effort.
    pub async fn stop_all(self: &Arc<Self>) {
        let names: Vec<String> = self.modules.read().await.keys().cloned().collect();
        for name in names {
            if let Err(err) = self.stop(&name).await {
                warn!("Error stopping module '{}': {}", name, err);
            }
        }
    }

    /// Wait until no module has a live process, up to `timeout`.
    ///
    /// Returns `false` if some process was still alive at the deadline.
    pub async fn await_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let modules = self.modules.read().await;
                if modules.values().all(|entry| !entry.state.has_process()) {
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Snapshot of one module, if registered.
    pub async fn module_status(&self, name: &str) -> Option<ModuleStatus> {
        self.modules.read().await.get(name).map(ModuleEntry::status)
    }

    /// Snapshots of all registered modules, ordered by name.
    pub async fn statuses(&self) -> Vec<ModuleStatus> {
        let modules = self.modules.read().await;
        let mut statuses: Vec<ModuleStatus> = modules.values().map(ModuleEntry::status).collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Number of modules with a live process.
    pub async fn running_count(&self) -> usize {
        self.modules
            .read()
            .await
            .values()
            .filter(|entry| entry.state.has_process())
            .count()
    }

    /// Spawn the module's command and hand the child to a wait-task.
    async fn spawn_module(
        &self,
        descriptor: &ModuleDescriptor,
    ) -> Result<(u32, LaunchId), ModuleError> {
        let (program, args) = process::split_command(&descriptor.command)?;
        let executable = process::resolve_executable(&program, self.search_path.as_deref())?;
        let environment = self.environment.read().await.clone();

        let mut child = process::spawn(&executable, &args, &environment).map_err(|err| {
            ModuleError::SpawnFailed(program.clone(), err.to_string())
        })?;
        let pid = child
            .id()
            .ok_or_else(|| ModuleError::SpawnFailed(program, "exited before spawn returned".to_string()))?;

        let launch_id = LaunchId::new();
        let name = descriptor.name.clone();
        let exit_tx = self.exit_tx.clone();
        tokio::spawn(async move {
            let status = child.wait().await.ok();
            let _ = exit_tx.send(ExitNotice {
                name,
                launch_id,
                status,
            });
        });

        Ok((pid, launch_id))
    }

    /// Apply one exit notice to the bookkeeping.
    async fn handle_exit(self: &Arc<Self>, notice: ExitNotice) {
        let mut modules = self.modules.write().await;
        let Some(entry) = modules.get_mut(&notice.name) else {
            debug!("Exit notice for unregistered module '{}'", notice.name);
            return;
        };
        if entry.launch_id != notice.launch_id {
            debug!(
                "Stale exit notice for module '{}' (superseded launch)",
                notice.name
            );
            return;
        }

        if entry.stop_requested {
            debug!("Module '{}' exited after stop request", notice.name);
            modules.remove(&notice.name);
            self.events.emit(SessionEvent::ModuleStopped { name: notice.name });
            return;
        }

        // Any unrequested exit counts as a crash, successful status included.
        entry.crash_count += 1;
        entry.pid = None;
        warn!(
            "Module '{}' crashed (status {:?}, crash #{})",
            notice.name, notice.status, entry.crash_count
        );
        self.events.emit(SessionEvent::ModuleCrashed {
            name: notice.name.clone(),
            crash_count: entry.crash_count,
        });

        let now = Utc::now();
        match self.policy.assess(&mut entry.crash_history, now) {
            CrashVerdict::Disable => {
                entry.autorestart_disabled = true;
                entry.state = ModuleState::Disabled;
                warn!(
                    "Module '{}' crashed too many times; autorestart disabled for this session",
                    notice.name
                );
                self.events.emit(SessionEvent::AutorestartDisabled {
                    name: notice.name,
                    crash_count: entry.crash_count,
                });
            }
            CrashVerdict::Relaunch => {
                entry.state = ModuleState::Restarting;
                let elapsed = now
                    .signed_duration_since(entry.last_start)
                    .to_std()
                    .unwrap_or_default();
                let delay = self.policy.restart_delay.saturating_sub(elapsed);

                let supervisor = Arc::clone(self);
                let name = notice.name;
                let expected = entry.launch_id;
                tokio::spawn(async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    supervisor.relaunch_after_crash(&name, expected).await;
                });
            }
        }
    }

    /// Relaunch a crashed module, unless it was stopped or disabled in the
    /// meantime.
    async fn relaunch_after_crash(&self, name: &str, expected: LaunchId) {
        let mut modules = self.modules.write().await;
        let Some(entry) = modules.get_mut(name) else {
            return;
        };
        if entry.launch_id != expected
            || entry.stop_requested
            || entry.autorestart_disabled
            || entry.state != ModuleState::Restarting
        {
            return;
        }

        let descriptor = entry.descriptor.clone();
        match self.spawn_module(&descriptor).await {
            Ok((pid, launch_id)) => {
                entry.pid = Some(pid);
                entry.launch_id = launch_id;
                entry.state = ModuleState::Running;
                entry.last_start = Utc::now();
                info!("Relaunched module '{}' (pid {})", name, pid);
                self.events.emit(SessionEvent::ModuleStarted {
                    name: name.to_string(),
                });
            }
            Err(err) => {
                warn!("Relaunch of module '{}' failed: {}", name, err);
                entry.pid = None;
                entry.state = ModuleState::Disabled;
                entry.autorestart_disabled = true;
                self.events.emit(SessionEvent::AutorestartDisabled {
                    name: name.to_string(),
                    crash_count: entry.crash_count,
                });
            }
        }
    }

    /// Force-kill a module that ignored its termination request.
    async fn escalate_stop(&self, name: &str, launch_id: LaunchId, grace: Duration) {
        let modules = self.modules.read().await;
        if let Some(entry) = modules.get(name) {
            if entry.launch_id == launch_id && entry.state == ModuleState::Stopping {
                if let Some(pid) = entry.pid {
                    warn!(
                        "Module '{}' did not exit within {:?}; forcing kill",
                        name, grace
                    );
                    process::force_kill(pid);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy() -> RestartPolicy {
        RestartPolicy {
            restart_delay: Duration::from_millis(10),
            stop_grace: Duration::from_millis(200),
            ..RestartPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_launch_unknown_executable_disables_module() {
        let supervisor = ModuleSupervisor::new(fast_policy());
        let descriptor = ModuleDescriptor::new("ghost", "no-such-binary-4e1b");

        let err = supervisor.launch(&descriptor).await.unwrap_err();
        assert!(matches!(err, ModuleError::ExecutableNotFound(_)));

        let status = supervisor.module_status("ghost").await.unwrap();
        assert_eq!(status.state, ModuleState::Disabled);
        assert!(status.autorestart_disabled);

        // No retry: a second launch reports the module disabled.
        let err = supervisor.launch(&descriptor).await.unwrap_err();
        assert!(matches!(err, ModuleError::Disabled(_)));
    }

    #[tokio::test]
    async fn test_launch_rejects_disabled_descriptor() {
        let supervisor = ModuleSupervisor::new(fast_policy());
        let mut descriptor = ModuleDescriptor::new("panel", "true");
        descriptor.enabled = false;

        let err = supervisor.launch(&descriptor).await.unwrap_err();
        assert!(matches!(err, ModuleError::Disabled(_)));
        assert!(supervisor.module_status("panel").await.is_none());
    }

    #[tokio::test]
    async fn test_stop_unknown_module_is_a_noop() {
        let supervisor = ModuleSupervisor::new(fast_policy());
        supervisor.stop("nobody").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_double_launch_is_rejected() {
        let supervisor = ModuleSupervisor::new(fast_policy());
        let descriptor = ModuleDescriptor::new("shell", "sleep 30");

        supervisor.launch(&descriptor).await.unwrap();
        let err = supervisor.launch(&descriptor).await.unwrap_err();
        assert!(matches!(err, ModuleError::AlreadyRunning(_)));

        supervisor.stop("shell").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_manually_requires_registration() {
        let supervisor = ModuleSupervisor::new(fast_policy());
        let err = supervisor.restart_manually("nobody").await.unwrap_err();
        assert!(matches!(err, ModuleError::NotFound(_)));
    }
}
