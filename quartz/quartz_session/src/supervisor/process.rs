//! Child-process plumbing: command parsing, spawning, and signal delivery.
//!
//! Command strings are split on whitespace; no shell quoting semantics are
//! guaranteed. Executables are resolved against the inherited `PATH` (or an
//! explicit search path, which tests use).

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use tokio::process::{Child, Command};
use tracing::debug;

use quartz_core::types::SessionEnvironment;
use quartz_core::ModuleError;

/// Split a command string into program and arguments.
pub(crate) fn split_command(command: &str) -> Result<(String, Vec<String>), ModuleError> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| ModuleError::InvalidCommand(command.to_string()))?;
    Ok((program, parts.collect()))
}

/// Resolve a program name to an executable path.
///
/// With `search_path` set, only those directories are probed; otherwise the
/// inherited `PATH` is used.
pub(crate) fn resolve_executable(
    program: &str,
    search_path: Option<&OsStr>,
) -> Result<PathBuf, ModuleError> {
    let resolved = match search_path {
        Some(paths) => which::which_in(program, Some(paths), current_dir()),
        None => which::which(program),
    };
    resolved.map_err(|_| ModuleError::ExecutableNotFound(program.to_string()))
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Spawn a child process with the session environment overlaid on the
/// inherited one.
pub(crate) fn spawn(
    executable: &Path,
    args: &[String],
    environment: &SessionEnvironment,
) -> io::Result<Child> {
    let mut command = Command::new(executable);
    command.args(args);
    for (name, value) in environment.iter() {
        command.env(name, value);
    }
    command.kill_on_drop(true);
    command.spawn()
}

/// Request graceful termination. Best-effort; errors are logged, not raised.
#[cfg(unix)]
pub(crate) fn terminate(pid: u32) {
    if pid == 0 {
        return;
    }
    debug!("Sending SIGTERM to pid {}", pid);
    unsafe {
        libc::kill(pid as i32, libc::SIGTERM);
    }
}

#[cfg(windows)]
pub(crate) fn terminate(pid: u32) {
    if pid == 0 {
        return;
    }
    debug!("Requesting termination of pid {}", pid);
    let _ = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string()])
        .output();
}

/// Forcefully kill a process that ignored the termination request.
#[cfg(unix)]
pub(crate) fn force_kill(pid: u32) {
    if pid == 0 {
        return;
    }
    debug!("Sending SIGKILL to pid {}", pid);
    unsafe {
        libc::kill(pid as i32, libc::SIGKILL);
    }
}

#[cfg(windows)]
pub(crate) fn force_kill(pid: u32) {
    if pid == 0 {
        return;
    }
    debug!("Forcing termination of pid {}", pid);
    let _ = std::process::Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output();
}

/// Check whether a process with the given pid is still alive.
#[cfg(unix)]
pub(crate) fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    // kill(pid, 0) checks existence without sending a signal
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(windows)]
pub(crate) fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let output = std::process::Command::new("tasklist")
        .args(["/FI", &format!("PID eq {pid}"), "/NH"])
        .output();
    match output {
        Ok(out) => String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_program_and_args() {
        let (program, args) = split_command("quartz-panel --profile default").unwrap();
        assert_eq!(program, "quartz-panel");
        assert_eq!(args, vec!["--profile".to_string(), "default".to_string()]);
    }

    #[test]
    fn test_split_command_collapses_whitespace() {
        let (program, args) = split_command("  xterm   -e  top ").unwrap();
        assert_eq!(program, "xterm");
        assert_eq!(args, vec!["-e".to_string(), "top".to_string()]);
    }

    #[test]
    fn test_split_command_rejects_empty() {
        assert!(matches!(
            split_command("   "),
            Err(ModuleError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_resolve_missing_executable() {
        let err = resolve_executable("definitely-not-a-real-binary-9f3a", None).unwrap_err();
        assert!(matches!(err, ModuleError::ExecutableNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_in_explicit_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("fake-module");
        std::fs::write(&exe, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolved =
            resolve_executable("fake-module", Some(dir.path().as_os_str())).unwrap();
        assert_eq!(resolved, exe);

        // The explicit search path replaces PATH entirely.
        assert!(resolve_executable("sh", Some(dir.path().as_os_str())).is_err());
    }

    #[test]
    fn test_pid_zero_is_never_alive() {
        assert!(!pid_alive(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_current_process_is_alive() {
        assert!(pid_alive(std::process::id()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_applies_session_environment() {
        let mut environment = SessionEnvironment::new();
        environment.set("QUARTZ_TEST_MARKER", "42");

        let sh = resolve_executable("sh", None).unwrap();
        let args = vec![
            "-c".to_string(),
            "test \"$QUARTZ_TEST_MARKER\" = 42".to_string(),
        ];
        let mut child = spawn(&sh, &args, &environment).unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());
    }
}
