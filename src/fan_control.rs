use crate::errors::{GpuFanError, Result};
use crate::nvidia_settings::NvidiaSettings;
use async_trait::async_trait;
use log::debug;

/// Fan actuator for GPU-bound fans
#[async_trait]
pub trait FanActuator: Send + Sync {
    /// Set fan `fan_id` of `gpu_id` to `percent` (0-100)
    async fn set_fan_speed(&self, gpu_id: &str, fan_id: &str, percent: u8) -> Result<()>;
}

/// Drives fans through `nvidia-settings -a`
pub struct NvidiaFanController {
    settings: NvidiaSettings,
}

impl NvidiaFanController {
    pub fn new(settings: NvidiaSettings) -> Self {
        Self { settings }
    }
}

/// Assignments that take manual control of the GPU's fans and set one target
pub fn fan_speed_args(gpu_id: &str, fan_id: &str, percent: u8) -> Vec<String> {
    vec![
        "-a".to_string(),
        format!("[{}]/GPUFanControlState=1", gpu_id),
        "-a".to_string(),
        format!("[fan:{}]/GPUTargetFanSpeed={}", fan_id, percent),
    ]
}

#[async_trait]
impl FanActuator for NvidiaFanController {
    async fn set_fan_speed(&self, gpu_id: &str, fan_id: &str, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(GpuFanError::Actuator {
                gpu_id: gpu_id.to_string(),
                fan_id: fan_id.to_string(),
                reason: format!("duty {}% out of range", percent),
            });
        }

        let output = self
            .settings
            .assign(&fan_speed_args(gpu_id, fan_id, percent))
            .await?;

        if !output.status.success() {
            return Err(GpuFanError::Actuator {
                gpu_id: gpu_id.to_string(),
                fan_id: fan_id.to_string(),
                reason: format!(
                    "nvidia-settings exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        debug!("Set fan {} of {} to {}%", fan_id, gpu_id, percent);
        Ok(())
    }
}
