//! Port reclamation
//!
//! Before a service is launched, whatever currently listens on its port is
//! discovered and forcefully killed. The whole path is fire-and-forget by
//! design: a free port is the common case and a success, a kill that loses
//! the race to a dying process is a success, and even a broken discovery
//! utility only costs a warning. Startup never aborts because reclamation
//! could not finish — the service's own bind failure is the backstop.

use std::io;

use tracing::{debug, warn};

use crate::platform;

/// Discovers listeners on a TCP port.
pub trait PortScanner {
    fn listeners(&self, port: u16) -> io::Result<Vec<u32>>;
}

/// Kills a process by PID.
pub trait ProcessKiller {
    fn kill(&self, pid: u32) -> io::Result<()>;
}

/// Scanner backed by the OS socket-listing utility.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortScanner;

impl PortScanner for SystemPortScanner {
    fn listeners(&self, port: u16) -> io::Result<Vec<u32>> {
        platform::list_port_pids(port)
    }
}

/// Killer backed by the OS forceful-kill primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessKiller;

impl ProcessKiller for SystemProcessKiller {
    fn kill(&self, pid: u32) -> io::Result<()> {
        platform::kill_process(pid)
    }
}

/// Called once per PID whose kill failed. Diagnostic only; the reclaim
/// outcome is unaffected.
pub type KillFailureHook = Box<dyn Fn(u16, u32, &io::Error) + Send + Sync>;

pub struct PortReclaimer<S = SystemPortScanner, K = SystemProcessKiller> {
    scanner: S,
    killer: K,
    on_kill_failure: Option<KillFailureHook>,
}

impl Default for PortReclaimer {
    fn default() -> Self {
        PortReclaimer::new(SystemPortScanner, SystemProcessKiller)
    }
}

impl<S: PortScanner, K: ProcessKiller> PortReclaimer<S, K> {
    pub fn new(scanner: S, killer: K) -> Self {
        PortReclaimer {
            scanner,
            killer,
            on_kill_failure: None,
        }
    }

    /// Observe kill failures without making them fatal.
    pub fn with_kill_failure_hook(mut self, hook: KillFailureHook) -> Self {
        self.on_kill_failure = Some(hook);
        self
    }

    /// Free a port by killing every discovered listener.
    ///
    /// Infallible by contract. Multiple listeners (SO_REUSEPORT setups) are
    /// all killed, not just the first. Returns the number of kill requests
    /// issued, which is zero for a free port.
    pub fn reclaim(&self, port: u16) -> usize {
        let pids = match self.scanner.listeners(port) {
            Ok(pids) => pids,
            Err(err) => {
                warn!("port {}: listener discovery failed: {}", port, err);
                return 0;
            }
        };

        if pids.is_empty() {
            debug!("port {}: already free", port);
            return 0;
        }

        let mut issued = 0;
        for pid in pids {
            issued += 1;
            match self.killer.kill(pid) {
                Ok(()) => debug!("port {}: killed pid {}", port, pid),
                Err(err) => {
                    warn!("port {}: failed to kill pid {}: {}", port, pid, err);
                    if let Some(hook) = &self.on_kill_failure {
                        hook(port, pid, &err);
                    }
                }
            }
        }
        issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct FixedScanner(Vec<u32>);

    impl PortScanner for FixedScanner {
        fn listeners(&self, _port: u16) -> io::Result<Vec<u32>> {
            Ok(self.0.clone())
        }
    }

    struct FailingScanner;

    impl PortScanner for FailingScanner {
        fn listeners(&self, _port: u16) -> io::Result<Vec<u32>> {
            Err(io::Error::new(io::ErrorKind::NotFound, "lsof not installed"))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingKiller {
        killed: Arc<Mutex<Vec<u32>>>,
        fail: bool,
    }

    impl ProcessKiller for RecordingKiller {
        fn kill(&self, pid: u32) -> io::Result<()> {
            self.killed.lock().push(pid);
            if self.fail {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "EPERM"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn free_port_issues_zero_kills() {
        let killer = RecordingKiller::default();
        let reclaimer = PortReclaimer::new(FixedScanner(vec![]), killer.clone());

        assert_eq!(reclaimer.reclaim(3000), 0);
        assert!(killer.killed.lock().is_empty());
    }

    #[test]
    fn single_listener_issues_one_targeted_kill() {
        let killer = RecordingKiller::default();
        let reclaimer = PortReclaimer::new(FixedScanner(vec![4242]), killer.clone());

        assert_eq!(reclaimer.reclaim(3000), 1);
        assert_eq!(*killer.killed.lock(), vec![4242]);
    }

    #[test]
    fn every_listener_is_killed() {
        let killer = RecordingKiller::default();
        let reclaimer = PortReclaimer::new(FixedScanner(vec![100, 200, 300]), killer.clone());

        assert_eq!(reclaimer.reclaim(5000), 3);
        assert_eq!(*killer.killed.lock(), vec![100, 200, 300]);
    }

    #[test]
    fn kill_failures_are_swallowed_and_reported_to_hook() {
        let killer = RecordingKiller {
            fail: true,
            ..Default::default()
        };
        let failures = Arc::new(Mutex::new(Vec::new()));
        let failures_seen = failures.clone();
        let reclaimer = PortReclaimer::new(FixedScanner(vec![7, 8]), killer.clone())
            .with_kill_failure_hook(Box::new(move |port, pid, _err| {
                failures_seen.lock().push((port, pid));
            }));

        // Both kills attempted despite both failing, nothing propagates.
        assert_eq!(reclaimer.reclaim(5000), 2);
        assert_eq!(*failures.lock(), vec![(5000, 7), (5000, 8)]);
    }

    #[test]
    fn discovery_failure_is_swallowed() {
        let killer = RecordingKiller::default();
        let reclaimer = PortReclaimer::new(FailingScanner, killer.clone());

        assert_eq!(reclaimer.reclaim(3000), 0);
        assert!(killer.killed.lock().is_empty());
    }
}
