use crate::errors::{GpuFanError, Result};
use crate::nvidia_settings::NvidiaSettings;
use async_trait::async_trait;
use log::{debug, trace};

/// Source of GPU core temperatures
#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    /// Current temperature of `gpu_id` in degrees, `None` when unavailable
    async fn read_temperature(&self, gpu_id: &str) -> Option<i32>;
}

/// Reads `GPUCoreTemp` through `nvidia-settings -q`
pub struct NvidiaTempSensor {
    settings: NvidiaSettings,
}

impl NvidiaTempSensor {
    pub fn new(settings: NvidiaSettings) -> Self {
        Self { settings }
    }

    async fn query(&self, gpu_id: &str) -> Result<i32> {
        let output = self
            .settings
            .query(&["-q".to_string(), "GPUCoreTemp".to_string()])
            .await?;

        if !output.status.success() {
            return Err(GpuFanError::Sensor(format!(
                "nvidia-settings exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!("GPUCoreTemp output: {}", stdout);
        parse_core_temp(&stdout, gpu_id)
            .ok_or_else(|| GpuFanError::Sensor(format!("no GPUCoreTemp reading for {}", gpu_id)))
    }
}

#[async_trait]
impl TemperatureSensor for NvidiaTempSensor {
    async fn read_temperature(&self, gpu_id: &str) -> Option<i32> {
        match self.query(gpu_id).await {
            Ok(temp) => Some(temp),
            Err(e) => {
                debug!("Temperature of {} unavailable: {}", gpu_id, e);
                None
            }
        }
    }
}

/// Extract the reading for `gpu_id` from `nvidia-settings -q GPUCoreTemp`.
///
/// The first line naming the target `[gpu_id]` wins; its last token carries
/// the value with a trailing period, e.g.
/// `Attribute 'GPUCoreTemp' (host:1[gpu:0]): 45.`
pub fn parse_core_temp(output: &str, gpu_id: &str) -> Option<i32> {
    let target = format!("[{}]", gpu_id);
    let line = output.lines().find(|line| line.contains(&target))?;
    line.split_whitespace()
        .last()?
        .trim_end_matches('.')
        .parse()
        .ok()
}
