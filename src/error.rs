//! Unified error handling for the devup supervisor
//!
//! Reclamation is deliberately infallible (best-effort, see `reclaim`), so
//! the errors here cover the two surfaces that do abort startup: the operator
//! authored configuration and the service spawn path.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the supervisor
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Configuration errors (unreadable or malformed config file)
    #[error("Configuration error: {message} (path: {path})")]
    Config {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A service command could not be resolved in PATH
    #[error("Command not found for service '{service}': '{command}' is not in PATH")]
    CommandNotFound { service: String, command: String },

    /// A service process could not be started
    #[error("Failed to spawn service '{service}': {source}")]
    Spawn {
        service: String,
        #[source]
        source: io::Error,
    },

    /// The termination-signal streams could not be registered
    #[error("Failed to install signal handlers: {source}")]
    Signal {
        #[source]
        source: io::Error,
    },
}

impl SupervisorError {
    pub fn config(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        SupervisorError::Config {
            message: message.into(),
            path: path.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SupervisorError::Config {
            message: message.into(),
            path: path.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
