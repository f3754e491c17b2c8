//! Coordinated shutdown
//!
//! One external signal fans termination out to every launched service. The
//! coordinator keeps an explicit registry that the launcher appends to, and
//! a one-way `Running -> ShuttingDown` latch: the fan-out drains the
//! registry, so a second signal finds nothing to re-terminate and the
//! transition stays idempotent by construction.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::info;

use crate::launcher::Terminate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    ShuttingDown,
}

pub struct ShutdownCoordinator<T: Terminate> {
    shutting_down: AtomicBool,
    registry: Mutex<Vec<T>>,
}

impl<T: Terminate> Default for ShutdownCoordinator<T> {
    fn default() -> Self {
        ShutdownCoordinator {
            shutting_down: AtomicBool::new(false),
            registry: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Terminate> ShutdownCoordinator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SupervisorState {
        if self.shutting_down.load(Ordering::SeqCst) {
            SupervisorState::ShuttingDown
        } else {
            SupervisorState::Running
        }
    }

    /// Hand a launched service over to the coordinator.
    pub fn register(&self, handle: T) {
        self.registry.lock().push(handle);
    }

    pub fn registered(&self) -> usize {
        self.registry.lock().len()
    }

    /// Transition to `ShuttingDown` and fan a termination request out to
    /// every registered handle, exactly once.
    ///
    /// The drained handles come back to the caller, which may wait on them
    /// or drop them. Repeat calls (a second signal) return an empty vec and
    /// touch nothing.
    pub fn begin_shutdown(&self) -> Vec<T> {
        let first = self
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !first {
            return Vec::new();
        }

        let mut handles = std::mem::take(&mut *self.registry.lock());
        if !handles.is_empty() {
            info!("shutting down {} service(s)", handles.len());
        }
        for handle in handles.iter_mut() {
            info!("stopping service '{}'", handle.name());
            handle.request_termination();
        }
        handles
    }
}

/// Registered termination-signal streams.
///
/// Installed once, before the services launch, so a signal arriving mid
/// startup is buffered by the runtime instead of hitting the default
/// disposition. SIGINT and SIGTERM are treated identically on Unix;
/// elsewhere only Ctrl-C is wired up.
pub struct SignalListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(SignalListener {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        Ok(SignalListener {})
    }

    /// Wait for the next termination request from the OS.
    pub async fn recv(&mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => info!("received SIGINT"),
                _ = self.terminate.recv() => info!("received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl-C");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct MockHandle {
        name: String,
        terminations: Arc<Mutex<Vec<String>>>,
    }

    impl MockHandle {
        fn new(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            MockHandle {
                name: name.to_string(),
                terminations: log.clone(),
            }
        }
    }

    impl Terminate for MockHandle {
        fn name(&self) -> &str {
            &self.name
        }

        fn request_termination(&mut self) {
            self.terminations.lock().push(self.name.clone());
        }
    }

    #[test]
    fn starts_running_with_empty_registry() {
        let coordinator: ShutdownCoordinator<MockHandle> = ShutdownCoordinator::new();
        assert_eq!(coordinator.state(), SupervisorState::Running);
        assert_eq!(coordinator.registered(), 0);
    }

    #[test]
    fn first_signal_terminates_every_handle_exactly_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = ShutdownCoordinator::new();
        coordinator.register(MockHandle::new("backend", &log));
        coordinator.register(MockHandle::new("frontend", &log));

        let drained = coordinator.begin_shutdown();

        assert_eq!(coordinator.state(), SupervisorState::ShuttingDown);
        assert_eq!(drained.len(), 2);
        assert_eq!(*log.lock(), vec!["backend", "frontend"]);
        assert_eq!(coordinator.registered(), 0);
    }

    #[test]
    fn second_signal_is_a_no_op() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let coordinator = ShutdownCoordinator::new();
        coordinator.register(MockHandle::new("backend", &log));

        let first = coordinator.begin_shutdown();
        let second = coordinator.begin_shutdown();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        // No re-issued termination on the second signal.
        assert_eq!(log.lock().len(), 1);
        assert_eq!(coordinator.state(), SupervisorState::ShuttingDown);
    }

    #[test]
    fn shutdown_with_no_registered_handles_is_fine() {
        let coordinator: ShutdownCoordinator<MockHandle> = ShutdownCoordinator::new();
        assert!(coordinator.begin_shutdown().is_empty());
        assert_eq!(coordinator.state(), SupervisorState::ShuttingDown);
    }
}
