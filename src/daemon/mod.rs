//! Control loop: samples every device and actuates its fans on a fixed cadence

use crate::{
    config::GlobalConfig,
    device::Device,
    fan_control::FanActuator,
    fan_monitor::TemperatureLog,
    gpu_temp::TemperatureSensor,
};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for the control loop
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Wake-up times anchored at `start + k * interval`
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    start: Instant,
    interval: Duration,
}

impl Scheduler {
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self { start, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time to sleep at `now` so the next wake-up lands on the next boundary.
    ///
    /// Always within `(0, interval]`: work that overruns one or more
    /// intervals skips those boundaries instead of queueing them.
    pub fn delay(&self, now: Instant) -> Duration {
        let interval = self.interval.as_nanos();
        if interval == 0 {
            return Duration::ZERO;
        }
        // below `interval`, so the whole seconds fit back into a Duration
        let into_period = now.saturating_duration_since(self.start).as_nanos() % interval;
        let into_period = Duration::new(
            (into_period / NANOS_PER_SEC) as u64,
            (into_period % NANOS_PER_SEC) as u32,
        );
        self.interval - into_period
    }

    /// Index of the boundary interval containing `now`
    pub fn period(&self, now: Instant) -> u128 {
        let interval = self.interval.as_nanos().max(1);
        now.saturating_duration_since(self.start).as_nanos() / interval
    }
}

/// Owns the devices and drives them one after another every interval
pub struct ControlLoop<S, A, C = TokioClock> {
    devices: Vec<Device>,
    sensor: S,
    actuator: A,
    clock: C,
    scheduler: Scheduler,
    temperature_log: Option<TemperatureLog>,
}

impl<S, A, C> ControlLoop<S, A, C>
where
    S: TemperatureSensor,
    A: FanActuator,
    C: Clock,
{
    /// Build the loop from validated config; `run` restarts the schedule
    pub fn new(config: GlobalConfig, sensor: S, actuator: A, clock: C) -> Self {
        let interval = config.interval();
        let devices = config.into_devices().into_iter().map(Device::new).collect();
        let scheduler = Scheduler::new(clock.now(), interval);

        Self {
            devices,
            sensor,
            actuator,
            clock,
            scheduler,
            temperature_log: None,
        }
    }

    /// Append one record per tick to `log`
    pub fn with_temperature_log(mut self, log: TemperatureLog) -> Self {
        self.temperature_log = Some(log);
        self
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Anchor the wake-up boundaries at the current time
    pub fn restart_schedule(&mut self) {
        self.scheduler = Scheduler::new(self.clock.now(), self.scheduler.interval());
    }

    /// Sample and actuate every device once, in configured order
    pub async fn tick(&mut self) -> Vec<Option<i32>> {
        let timestamp = chrono::Utc::now();
        let mut readings = Vec::with_capacity(self.devices.len());

        for device in &mut self.devices {
            readings.push(device.tick(&self.sensor, &self.actuator).await);
        }
        debug!("Tick readings: {:?}", readings);

        if let Some(log) = &self.temperature_log {
            if let Err(e) = log.record(timestamp, &readings) {
                warn!(
                    "Failed to append temperature record to {}: {}",
                    log.path().display(),
                    e
                );
            }
        }

        readings
    }

    /// One tick followed by the sleep up to the next boundary
    pub async fn step(&mut self) {
        let began = self.clock.now();
        self.tick().await;

        let now = self.clock.now();
        let skipped = self
            .scheduler
            .period(now)
            .saturating_sub(self.scheduler.period(began));
        if skipped > 0 {
            warn!(
                "Tick took {:?}, longer than the {:?} interval; skipping {} boundary(ies)",
                now.saturating_duration_since(began),
                self.scheduler.interval(),
                skipped
            );
        }

        let delay = self.scheduler.delay(now);
        self.clock.sleep(delay).await;
    }

    /// Run until the process is stopped
    pub async fn run(&mut self) {
        self.restart_schedule();
        info!(
            "Controlling {} device(s) every {:?}",
            self.devices.len(),
            self.scheduler.interval()
        );
        loop {
            self.step().await;
        }
    }
}
