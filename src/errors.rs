//! Error types for the GPU fan manager

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for the GPU fan manager
pub type Result<T> = std::result::Result<T, GpuFanError>;

/// Main error type for the GPU fan manager
#[derive(Error, Debug)]
pub enum GpuFanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Already running: lock file {} exists", path.display())]
    AlreadyRunning { path: PathBuf },

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Failed to set fan {fan_id} on {gpu_id}: {reason}")]
    Actuator {
        gpu_id: String,
        fan_id: String,
        reason: String,
    },

    #[error("Command `{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },
}

impl GpuFanError {
    /// Build a configuration error scoped to one device
    pub(crate) fn device_config(gpu_id: &str, reason: impl std::fmt::Display) -> Self {
        GpuFanError::Config(format!("device {}: {}", gpu_id, reason))
    }
}
