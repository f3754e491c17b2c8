//! Supervisor lifecycle
//!
//! Orchestrates one dev-environment run: reclaim every configured port,
//! launch every service, then sit on the signal handler until the operator
//! stops the whole environment. Reclamation is strictly sequential and
//! finishes for all ports before the first launch, so a freshly started
//! service can never collide with a predecessor that was still being killed.

use tracing::info;

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::launcher::{self, ManagedProcess};
use crate::reclaim::PortReclaimer;
use crate::shutdown::{self, ShutdownCoordinator, SupervisorState};

pub struct Supervisor {
    config: SupervisorConfig,
    reclaimer: PortReclaimer,
    coordinator: ShutdownCoordinator<ManagedProcess>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Supervisor {
            config,
            reclaimer: PortReclaimer::default(),
            coordinator: ShutdownCoordinator::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.coordinator.state()
    }

    pub fn running_services(&self) -> usize {
        self.coordinator.registered()
    }

    /// Reclaim every configured port, one at a time, in declaration order.
    pub fn reclaim_ports(&self) {
        for port in self.config.ports() {
            info!("reclaiming port {}", port);
            self.reclaimer.reclaim(port);
        }
    }

    /// Launch every configured service and hand each handle to the
    /// shutdown coordinator.
    ///
    /// A spawn failure stops the startup: services launched so far are
    /// terminated through the coordinator and the error propagates.
    /// Launched services run concurrently with each other; nothing here
    /// waits on readiness.
    pub fn launch_services(&self) -> SupervisorResult<()> {
        for spec in &self.config.services {
            match launcher::launch(spec) {
                Ok(handle) => {
                    info!(
                        "started service '{}' (pid {}) on port {}",
                        spec.name,
                        handle.pid().map_or_else(|| "?".into(), |p| p.to_string()),
                        spec.port
                    );
                    self.coordinator.register(handle);
                }
                Err(err) => {
                    self.coordinator.begin_shutdown();
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Fan termination out to every launched service. Idempotent.
    pub fn shutdown(&self) -> Vec<ManagedProcess> {
        self.coordinator.begin_shutdown()
    }

    /// The full lifecycle: reclaim, launch, wait for a signal, fan out.
    ///
    /// The signal streams are registered before anything launches, so a
    /// signal delivered mid startup is buffered instead of killing the
    /// supervisor with children already running. Returns as soon as
    /// termination has been requested for every child; the process exits
    /// right after, without waiting on exit confirmations.
    pub async fn run(&self) -> SupervisorResult<()> {
        let mut signals = shutdown::SignalListener::install()
            .map_err(|err| SupervisorError::Signal { source: err })?;

        self.reclaim_ports();
        self.launch_services()?;

        info!(
            "{} service(s) running, Ctrl-C stops the environment",
            self.running_services()
        );
        signals.recv().await;

        self.shutdown();
        Ok(())
    }
}
