//! GPU Fan Manager
//!
//! Periodically samples NVIDIA GPU core temperatures and drives each GPU's fans
//! to a target speed taken from a per-device quadratic curve.

pub mod args;
pub mod config;
pub mod daemon;
pub mod device;
pub mod errors;
pub mod fan;
pub mod fan_control;
pub mod fan_monitor;
pub mod gpu_temp;
pub mod lock;
pub mod logging;
pub mod nvidia_settings;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::{DeviceConfig, GlobalConfig};
pub use daemon::{Clock, ControlLoop, Scheduler, TokioClock};
pub use device::{Actuation, Device, DeviceState};
pub use errors::{GpuFanError, Result};
pub use fan::{compute_target, FanCurve};
pub use fan_control::{FanActuator, NvidiaFanController};
pub use gpu_temp::{NvidiaTempSensor, TemperatureSensor};
