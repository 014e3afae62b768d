//! Fakes for the sensor, actuator and clock boundaries

use crate::daemon::Clock;
use crate::errors::{GpuFanError, Result};
use crate::fan_control::FanActuator;
use crate::gpu_temp::TemperatureSensor;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock that only moves when slept on or advanced
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

/// Sensor replaying a per-GPU script; an exhausted or missing script reads as unavailable
pub struct ScriptedSensor {
    scripts: Mutex<HashMap<String, VecDeque<Option<i32>>>>,
    reads: Mutex<Vec<String>>,
    delay: Option<(Arc<ManualClock>, Duration)>,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            reads: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn script(self, gpu_id: &str, temps: impl IntoIterator<Item = Option<i32>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(gpu_id.to_string(), temps.into_iter().collect());
        self
    }

    /// Advance `clock` by `per_read` on every read
    pub fn with_delay(mut self, clock: Arc<ManualClock>, per_read: Duration) -> Self {
        self.delay = Some((clock, per_read));
        self
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemperatureSensor for ScriptedSensor {
    async fn read_temperature(&self, gpu_id: &str) -> Option<i32> {
        self.reads.lock().unwrap().push(gpu_id.to_string());
        if let Some((clock, per_read)) = &self.delay {
            clock.advance(*per_read);
        }
        self.scripts
            .lock()
            .unwrap()
            .get_mut(gpu_id)
            .and_then(|script| script.pop_front())
            .flatten()
    }
}

/// Actuator recording every call, optionally failing for some fan ids
pub struct RecordingActuator {
    calls: Mutex<Vec<(String, String, u8)>>,
    failing: HashSet<String>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::failing_on(&[])
    }

    pub fn failing_on(fan_ids: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: fan_ids.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<(String, String, u8)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn speeds(&self) -> Vec<u8> {
        self.calls().into_iter().map(|(_, _, speed)| speed).collect()
    }
}

#[async_trait]
impl FanActuator for RecordingActuator {
    async fn set_fan_speed(&self, gpu_id: &str, fan_id: &str, percent: u8) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((gpu_id.to_string(), fan_id.to_string(), percent));

        if self.failing.contains(fan_id) {
            return Err(GpuFanError::Actuator {
                gpu_id: gpu_id.to_string(),
                fan_id: fan_id.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}
