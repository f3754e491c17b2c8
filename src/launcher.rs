//! Service launching
//!
//! Each service runs as a child OS process with all three standard streams
//! inherited, so developers see live interleaved output from every service
//! on the supervisor's own console. Launch never waits for readiness; the
//! handle comes back as soon as the OS has the process.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::config::ServiceSpec;
use crate::error::{SupervisorError, SupervisorResult};
use crate::platform;

/// Anything the shutdown coordinator can fan a stop request out to.
pub trait Terminate: Send {
    fn name(&self) -> &str;

    /// Request termination once, immediately. Must tolerate a child that
    /// already exited; there is no escalation tier after this.
    fn request_termination(&mut self);
}

/// Live handle to a launched service.
#[derive(Debug)]
pub struct ManagedProcess {
    name: String,
    pid: Option<u32>,
    child: Child,
}

impl ManagedProcess {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// PID as of spawn time; `None` once the OS has reaped the child.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking liveness probe.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Wait for the child to exit and reap it.
    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }
}

impl Terminate for ManagedProcess {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_termination(&mut self) {
        // start_kill fails when the child is already gone, which is the
        // outcome a termination request wants anyway.
        if let Err(err) = self.child.start_kill() {
            debug!("service '{}': kill request ignored: {}", self.name, err);
        }
    }
}

/// Spawn a service and return its live handle without blocking.
///
/// The command is resolved through PATH up front so a missing binary is a
/// structured error instead of a raw exec failure.
pub fn launch(spec: &ServiceSpec) -> SupervisorResult<ManagedProcess> {
    let program = which::which(&spec.command).map_err(|_| SupervisorError::CommandNotFound {
        service: spec.name.clone(),
        command: spec.command.clone(),
    })?;

    let mut command = Command::new(&program);
    command
        .args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    platform::prepare_command(&mut command);

    let child = command.spawn().map_err(|err| SupervisorError::Spawn {
        service: spec.name.clone(),
        source: err,
    })?;
    let pid = child.id();
    debug!(
        "service '{}': spawned {} {:?} (pid {:?})",
        spec.name,
        program.display(),
        spec.args,
        pid
    );

    Ok(ManagedProcess {
        name: spec.name.clone(),
        pid,
        child,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec(name: &str, command: &str, args: &[&str]) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            port: 0,
            command: command.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            working_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn unknown_command_is_a_structured_error() {
        let err = launch(&spec("ghost", "definitely-not-a-real-binary-9f3a", &[])).unwrap_err();
        assert!(matches!(err, SupervisorError::CommandNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launch_returns_a_live_handle_without_blocking() {
        let mut handle = launch(&spec("sleeper", "sleep", &["30"])).expect("spawn sleep");

        let pid = handle.pid().expect("pid");
        assert!(handle.is_alive());
        assert!(crate::platform::process_alive(pid));

        handle.request_termination();
        let status = handle.wait().await.expect("wait");
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn termination_request_after_exit_does_not_panic() {
        let mut handle = launch(&spec("true", "true", &[])).expect("spawn true");
        handle.wait().await.expect("wait");

        // Child already reaped; the request must be a quiet no-op.
        handle.request_termination();
        assert!(!handle.is_alive());
    }
}
