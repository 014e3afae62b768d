//! Per-GPU sampling and actuation

use crate::config::DeviceConfig;
use crate::fan_control::FanActuator;
use crate::gpu_temp::TemperatureSensor;
use log::{debug, info, warn};

/// Commanded state of a device's fans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No speed has been commanded yet
    Uncommitted,
    /// Fans were last commanded to this percentage
    Committed(u8),
}

/// Result of an [`Device::apply_fan_speed`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    /// Target equals the last commanded speed; nothing was sent
    Unchanged,
    /// One command per fan was issued
    Applied { fans: usize, failed: usize },
}

/// One GPU with its curve, its fans and the last speed sent to them
#[derive(Debug)]
pub struct Device {
    config: DeviceConfig,
    last_commanded_speed: Option<u8>,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            last_commanded_speed: None,
        }
    }

    pub fn id(&self) -> &str {
        self.config.gpu_id()
    }

    pub fn last_commanded_speed(&self) -> Option<u8> {
        self.last_commanded_speed
    }

    pub fn state(&self) -> DeviceState {
        match self.last_commanded_speed {
            None => DeviceState::Uncommitted,
            Some(speed) => DeviceState::Committed(speed),
        }
    }

    pub async fn read_temperature<S>(&self, sensor: &S) -> Option<i32>
    where
        S: TemperatureSensor + ?Sized,
    {
        sensor.read_temperature(self.id()).await
    }

    /// Send `target` to every bound fan unless it is already the commanded speed.
    ///
    /// A failing fan does not stop the remaining ones, and the target is
    /// recorded as commanded once every fan has been attempted.
    pub async fn apply_fan_speed<A>(&mut self, actuator: &A, target: u8) -> Actuation
    where
        A: FanActuator + ?Sized,
    {
        if self.last_commanded_speed == Some(target) {
            return Actuation::Unchanged;
        }

        let mut failed = 0;
        for fan_id in self.config.fan_ids() {
            if let Err(e) = actuator.set_fan_speed(self.id(), fan_id, target).await {
                warn!("{}", e);
                failed += 1;
            }
        }

        let fans = self.config.fan_ids().len();
        match self.last_commanded_speed {
            Some(previous) => info!(
                "{}: fans {}% -> {}% ({}/{} ok)",
                self.id(),
                previous,
                target,
                fans - failed,
                fans
            ),
            None => info!(
                "{}: fans set to {}% ({}/{} ok)",
                self.id(),
                target,
                fans - failed,
                fans
            ),
        }

        self.last_commanded_speed = Some(target);
        Actuation::Applied { fans, failed }
    }

    /// Sample once and drive the fans from that sample.
    ///
    /// Returns the reading used, or `None` when the sensor was unavailable,
    /// in which case the fans keep their previous speed.
    pub async fn tick<S, A>(&mut self, sensor: &S, actuator: &A) -> Option<i32>
    where
        S: TemperatureSensor + ?Sized,
        A: FanActuator + ?Sized,
    {
        let Some(temperature) = self.read_temperature(sensor).await else {
            debug!("{}: no temperature, keeping {:?}", self.id(), self.state());
            return None;
        };

        let target = self.config.curve().calculate_duty_for_temperature(temperature);
        debug!("{}: {}°C -> {}%", self.id(), temperature, target);
        self.apply_fan_speed(actuator, target).await;
        Some(temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingActuator, ScriptedSensor};

    fn device(fans: &[&str]) -> Device {
        let config = DeviceConfig::new(
            "gpu:0",
            30,
            80,
            30,
            100,
            fans.iter().map(|f| f.to_string()).collect(),
        )
        .unwrap();
        Device::new(config)
    }

    #[tokio::test]
    async fn test_hysteresis() {
        let actuator = RecordingActuator::new();
        let mut device = device(&["0"]);

        assert_eq!(device.state(), DeviceState::Uncommitted);
        assert_eq!(
            device.apply_fan_speed(&actuator, 50).await,
            Actuation::Applied { fans: 1, failed: 0 }
        );
        assert_eq!(device.apply_fan_speed(&actuator, 50).await, Actuation::Unchanged);

        assert_eq!(actuator.calls().len(), 1);
        assert_eq!(device.state(), DeviceState::Committed(50));
    }

    #[tokio::test]
    async fn test_fan_out_in_order() {
        let actuator = RecordingActuator::new();
        let mut device = device(&["3", "1", "2"]);

        device.apply_fan_speed(&actuator, 70).await;

        assert_eq!(
            actuator.calls(),
            vec![
                ("gpu:0".to_string(), "3".to_string(), 70),
                ("gpu:0".to_string(), "1".to_string(), 70),
                ("gpu:0".to_string(), "2".to_string(), 70),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_fan_does_not_block_others() {
        let actuator = RecordingActuator::failing_on(&["1"]);
        let mut device = device(&["0", "1", "2"]);

        assert_eq!(
            device.apply_fan_speed(&actuator, 40).await,
            Actuation::Applied { fans: 3, failed: 1 }
        );
        assert_eq!(actuator.calls().len(), 3);
        assert_eq!(device.last_commanded_speed(), Some(40));
    }

    #[tokio::test]
    async fn test_tick_applies_curve() {
        let sensor = ScriptedSensor::new().script("gpu:0", [Some(55), Some(56), Some(90)]);
        let actuator = RecordingActuator::new();
        let mut device = device(&["0"]);

        assert_eq!(device.tick(&sensor, &actuator).await, Some(55));
        assert_eq!(device.last_commanded_speed(), Some(47));

        // 56°C maps to 30 + 70 * 676 / 2500 = 48
        assert_eq!(device.tick(&sensor, &actuator).await, Some(56));
        assert_eq!(device.last_commanded_speed(), Some(48));

        assert_eq!(device.tick(&sensor, &actuator).await, Some(90));
        assert_eq!(device.last_commanded_speed(), Some(100));
        assert_eq!(actuator.speeds(), vec![47, 48, 100]);
    }

    #[tokio::test]
    async fn test_sensor_failure_keeps_speed() {
        let sensor = ScriptedSensor::new().script("gpu:0", [Some(60), None]);
        let actuator = RecordingActuator::new();
        let mut device = device(&["0", "1"]);

        device.tick(&sensor, &actuator).await;
        let commanded = device.last_commanded_speed();
        assert!(commanded.is_some());

        assert_eq!(device.tick(&sensor, &actuator).await, None);
        assert_eq!(device.last_commanded_speed(), commanded);
        assert_eq!(actuator.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_from_start_stays_uncommitted() {
        let sensor = ScriptedSensor::new();
        let actuator = RecordingActuator::new();
        let mut device = device(&["0"]);

        assert_eq!(device.tick(&sensor, &actuator).await, None);
        assert_eq!(device.state(), DeviceState::Uncommitted);
        assert!(actuator.calls().is_empty());
    }
}
