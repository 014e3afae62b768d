//! Loading and validation of the controller configuration
//!
//! The JSON document is parsed into a loose raw form first and then checked
//! field by field. Only a validated [`DeviceConfig`] can be turned into a
//! running device.

use crate::errors::{GpuFanError, Result};
use crate::fan::FanCurve;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Integer field that may be written as a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawInt {
    Number(i64),
    Text(String),
}

impl RawInt {
    fn resolve(&self, gpu_id: &str, field: &str) -> Result<i64> {
        match self {
            RawInt::Number(n) => Ok(*n),
            RawInt::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                GpuFanError::device_config(gpu_id, format!("{} is not an integer: {:?}", field, s))
            }),
        }
    }
}

/// Identifier that may be written as a JSON string or number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawIdent {
    Text(String),
    Number(i64),
}

impl RawIdent {
    fn into_string(self) -> String {
        match self {
            RawIdent::Text(s) => s.trim().to_string(),
            RawIdent::Number(n) => n.to_string(),
        }
    }

    /// GPU targets are addressed as `gpu:N`; a bare index is expanded to that form
    fn into_gpu_id(self) -> String {
        match self {
            RawIdent::Number(n) => format!("gpu:{}", n),
            RawIdent::Text(s) => {
                let s = s.trim();
                if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                    format!("gpu:{}", s)
                } else {
                    s.to_string()
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    gpuid: Option<RawIdent>,
    tempmin: Option<RawInt>,
    tempmax: Option<RawInt>,
    fanmin: Option<RawInt>,
    fanmax: Option<RawInt>,
    fanids: Option<Vec<RawIdent>>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    interval: Option<RawInt>,
    devices: Option<Vec<RawDevice>>,
}

/// Validated configuration for one GPU and the fans bound to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    gpu_id: String,
    curve: FanCurve,
    fan_ids: Vec<String>,
}

impl DeviceConfig {
    /// Build a device config, enforcing `temp_min < temp_max`,
    /// `0 <= fan_min <= fan_max <= 100` and a non-empty set of unique fan ids
    pub fn new(
        gpu_id: impl Into<String>,
        temp_min: i64,
        temp_max: i64,
        fan_min: i64,
        fan_max: i64,
        fan_ids: Vec<String>,
    ) -> Result<Self> {
        let gpu_id = gpu_id.into();
        if gpu_id.is_empty() {
            return Err(GpuFanError::Config("device identifier is empty".to_string()));
        }

        let temp_min = to_i32(&gpu_id, "tempmin", temp_min)?;
        let temp_max = to_i32(&gpu_id, "tempmax", temp_max)?;
        if temp_min >= temp_max {
            return Err(GpuFanError::device_config(
                &gpu_id,
                format!("tempmin ({}) must be below tempmax ({})", temp_min, temp_max),
            ));
        }

        let fan_min = to_percent(&gpu_id, "fanmin", fan_min)?;
        let fan_max = to_percent(&gpu_id, "fanmax", fan_max)?;
        if fan_min > fan_max {
            return Err(GpuFanError::device_config(
                &gpu_id,
                format!("fanmin ({}) must not exceed fanmax ({})", fan_min, fan_max),
            ));
        }

        if fan_ids.is_empty() {
            return Err(GpuFanError::device_config(&gpu_id, "fanids is empty"));
        }
        let mut seen = HashSet::new();
        for fan_id in &fan_ids {
            if fan_id.is_empty() {
                return Err(GpuFanError::device_config(&gpu_id, "empty fan identifier"));
            }
            if !seen.insert(fan_id.as_str()) {
                return Err(GpuFanError::device_config(
                    &gpu_id,
                    format!("fan {} listed twice", fan_id),
                ));
            }
        }

        Ok(Self {
            gpu_id,
            curve: FanCurve::new(temp_min, temp_max, fan_min, fan_max),
            fan_ids,
        })
    }

    pub fn gpu_id(&self) -> &str {
        &self.gpu_id
    }

    pub fn curve(&self) -> &FanCurve {
        &self.curve
    }

    pub fn fan_ids(&self) -> &[String] {
        &self.fan_ids
    }
}

/// Whole-process configuration: tick interval and devices in control order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    interval: Duration,
    devices: Vec<DeviceConfig>,
}

impl GlobalConfig {
    pub fn new(interval_secs: u64, devices: Vec<DeviceConfig>) -> Result<Self> {
        if interval_secs == 0 {
            return Err(GpuFanError::Config("interval must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        for device in &devices {
            if !seen.insert(device.gpu_id()) {
                return Err(GpuFanError::device_config(device.gpu_id(), "configured twice"));
            }
        }

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            devices,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn devices(&self) -> &[DeviceConfig] {
        &self.devices
    }

    pub fn into_devices(self) -> Vec<DeviceConfig> {
        self.devices
    }

    /// Load configuration from a reader holding the JSON document
    pub fn load<R: Read>(source: R) -> Result<Self> {
        let raw: RawConfig = serde_json::from_reader(source)
            .map_err(|e| GpuFanError::Config(format!("invalid JSON: {}", e)))?;
        Self::from_raw(raw)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::load(json.as_bytes())
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|e| {
            GpuFanError::Config(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::load(std::io::BufReader::new(file))
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let interval = raw
            .interval
            .ok_or_else(|| GpuFanError::Config("missing field `interval`".to_string()))?
            .resolve("<global>", "interval")
            .map_err(|_| GpuFanError::Config("interval is not an integer".to_string()))?;
        if interval <= 0 {
            return Err(GpuFanError::Config(format!(
                "interval must be positive, got {}",
                interval
            )));
        }

        let raw_devices = raw
            .devices
            .ok_or_else(|| GpuFanError::Config("missing field `devices`".to_string()))?;

        let devices = raw_devices
            .into_iter()
            .enumerate()
            .map(|(index, device)| parse_device(index, device))
            .collect::<Result<Vec<_>>>()?;

        Self::new(interval as u64, devices)
    }
}

fn parse_device(index: usize, raw: RawDevice) -> Result<DeviceConfig> {
    let gpu_id = raw
        .gpuid
        .map(RawIdent::into_gpu_id)
        .ok_or_else(|| GpuFanError::Config(format!("device #{}: missing field `gpuid`", index)))?;

    let required = |value: Option<RawInt>, field: &str| -> Result<i64> {
        value
            .ok_or_else(|| GpuFanError::device_config(&gpu_id, format!("missing field `{}`", field)))?
            .resolve(&gpu_id, field)
    };

    let temp_min = required(raw.tempmin, "tempmin")?;
    let temp_max = required(raw.tempmax, "tempmax")?;
    let fan_min = required(raw.fanmin, "fanmin")?;
    let fan_max = required(raw.fanmax, "fanmax")?;
    let fan_ids = raw
        .fanids
        .ok_or_else(|| GpuFanError::device_config(&gpu_id, "missing field `fanids`"))?
        .into_iter()
        .map(RawIdent::into_string)
        .collect();

    DeviceConfig::new(gpu_id, temp_min, temp_max, fan_min, fan_max, fan_ids)
}

fn to_i32(gpu_id: &str, field: &str, value: i64) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| GpuFanError::device_config(gpu_id, format!("{} out of range: {}", field, value)))
}

fn to_percent(gpu_id: &str, field: &str, value: i64) -> Result<u8> {
    if !(0..=100).contains(&value) {
        return Err(GpuFanError::device_config(
            gpu_id,
            format!("{} must be between 0 and 100, got {}", field, value),
        ));
    }
    Ok(value as u8)
}
