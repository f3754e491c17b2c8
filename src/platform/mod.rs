//! Platform-specific process and socket plumbing
//!
//! Everything unsafe or shelling out to OS utilities lives behind this
//! module; the rest of the crate sees three small functions per platform.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::{kill_process, list_port_pids, prepare_command, process_alive};

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::{kill_process, list_port_pids, prepare_command, process_alive};
