//! Supervisor configuration
//!
//! The service table was historically hard-coded in the startup script; here
//! it is an explicit struct handed to the supervisor at construction. A
//! `devup.yaml` in the working directory (or an explicit `--config` path)
//! overrides the built-in backend/frontend pair.

use crate::error::{SupervisorError, SupervisorResult};
use crate::{CONFIG_FILE_NAME, DEFAULT_BACKEND_PORT, DEFAULT_FRONTEND_PORT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One managed service: where it listens, how it is started, and from where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Human-readable name used in progress lines
    pub name: String,
    /// TCP port the service will bind; reclaimed before launch
    pub port: u16,
    /// Command resolved through PATH
    pub command: String,
    /// Fixed argument list
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the child, relative paths resolved by the OS
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub services: Vec<ServiceSpec>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            services: vec![
                ServiceSpec {
                    name: "backend".to_string(),
                    port: DEFAULT_BACKEND_PORT,
                    command: "npm".to_string(),
                    args: vec!["run".to_string(), "dev:backend".to_string()],
                    working_dir: default_working_dir(),
                },
                ServiceSpec {
                    name: "frontend".to_string(),
                    port: DEFAULT_FRONTEND_PORT,
                    command: "npm".to_string(),
                    args: vec!["run".to_string(), "dev:frontend".to_string()],
                    working_dir: default_working_dir(),
                },
            ],
        }
    }
}

impl SupervisorConfig {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist and parse. Without one,
    /// `devup.yaml` in the working directory is used when present, and the
    /// built-in defaults otherwise. A malformed file is always an error:
    /// config is the one surface the operator authored, so it is the one
    /// place the supervisor refuses to guess.
    pub fn load(path: Option<&Path>) -> SupervisorResult<Self> {
        match path {
            Some(explicit) => Self::from_file(explicit),
            None => {
                let implicit = PathBuf::from(CONFIG_FILE_NAME);
                if implicit.exists() {
                    Self::from_file(&implicit)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> SupervisorResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            SupervisorError::config_with_source("failed to read config file", path, err)
        })?;
        let config: SupervisorConfig = serde_yaml::from_str(&raw).map_err(|err| {
            SupervisorError::config_with_source("failed to parse config file", path, err)
        })?;
        if config.services.is_empty() {
            return Err(SupervisorError::config(
                "config declares no services",
                path,
            ));
        }
        Ok(config)
    }

    /// Ports to reclaim, in declaration order.
    pub fn ports(&self) -> Vec<u16> {
        self.services.iter().map(|svc| svc.port).collect()
    }
}
