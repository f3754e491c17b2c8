//! Devup Library
//!
//! Development environment supervisor: port reclamation, coordinated service
//! launch with inherited console output, and signal-driven shutdown fan-out.

pub mod config;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod platform;
pub mod reclaim;
pub mod shutdown;
pub mod supervisor;

// Re-export commonly used types for convenience
pub use config::{ServiceSpec, SupervisorConfig};
pub use error::{SupervisorError, SupervisorResult};
pub use launcher::{launch, ManagedProcess, Terminate};
pub use reclaim::{PortReclaimer, PortScanner, ProcessKiller};
pub use shutdown::{ShutdownCoordinator, SupervisorState};
pub use supervisor::Supervisor;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "devup.yaml";

pub const DEFAULT_BACKEND_PORT: u16 = 5000;
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;
