//! Main entry point for the GPU fan manager

use anyhow::Context;
use clap::Parser;
use gpu_fan_manager::{
    args::{Args, Commands, CurveArgs, RunArgs},
    fan_monitor::TemperatureLog,
    lock::LockGuard,
    logging,
    nvidia_settings::NvidiaSettings,
    ControlLoop, DeviceConfig, GlobalConfig, NvidiaFanController, NvidiaTempSensor, TokioClock,
};
use log::info;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Print version and build metadata for binary identity verification
    let pkg_version = env!("CARGO_PKG_VERSION");
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    eprintln!(
        "gpufanmanager v{} (git {}) built {}",
        pkg_version, git_hash, build_time
    );

    let args = Args::parse();
    logging::setup(args.verbose).context("failed to set up logging")?;

    let command = match args.command {
        Some(command) => command,
        None => Commands::Run(RunArgs::parse_from(["gpufanmanager"])),
    };

    match command {
        Commands::Run(run_args) => run(run_args).await,
        Commands::Check(run_args) => check(&run_args),
        Commands::Curve(curve_args) => curve(&curve_args),
    }
}

fn load_config(run_args: &RunArgs) -> anyhow::Result<GlobalConfig> {
    GlobalConfig::load_from_file(&run_args.config)
        .with_context(|| format!("failed to load {}", run_args.config.display()))
}

/// Run the control loop until SIGINT or SIGTERM
async fn run(run_args: RunArgs) -> anyhow::Result<()> {
    let _lock = LockGuard::acquire(&run_args.lock_file).context("failed to acquire lock")?;
    let config = load_config(&run_args)?;

    let settings = NvidiaSettings::new(
        run_args.display.clone(),
        Duration::from_secs(run_args.command_timeout),
    );
    let mut control = ControlLoop::new(
        config,
        NvidiaTempSensor::new(settings.clone()),
        NvidiaFanController::new(settings),
        TokioClock,
    );
    if let Some(path) = &run_args.log_file {
        info!("Recording temperatures to {}", path.display());
        control = control.with_temperature_log(TemperatureLog::new(path));
    }

    tokio::select! {
        _ = control.run() => {}
        signal = shutdown_signal() => info!("Received {}, shutting down", signal),
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut int, mut term) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(int), Ok(term)) => (int, term),
        _ => {
            log::warn!("Signal handlers unavailable, falling back to Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
            return "Ctrl-C";
        }
    };

    tokio::select! {
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl-C"
}

fn check(run_args: &RunArgs) -> anyhow::Result<()> {
    let config = load_config(run_args)?;

    println!("Configuration OK: {}", run_args.config.display());
    println!("Interval: {}s", config.interval().as_secs());
    for device in config.devices() {
        let curve = device.curve();
        println!(
            "  {}: {}..{}°C -> {}..{}%, fans [{}]",
            device.gpu_id(),
            curve.temp_min,
            curve.temp_max,
            curve.fan_min,
            curve.fan_max,
            device.fan_ids().join(", ")
        );
    }
    Ok(())
}

fn curve(curve_args: &CurveArgs) -> anyhow::Result<()> {
    let device = DeviceConfig::new(
        "curve",
        curve_args.tempmin,
        curve_args.tempmax,
        curve_args.fanmin,
        curve_args.fanmax,
        vec!["0".to_string()],
    )
    .context("invalid curve thresholds")?;
    let curve = device.curve();

    if let Some(temp) = curve_args.temp {
        println!("{}", curve.calculate_duty_for_temperature(temp));
        return Ok(());
    }

    for (temp, duty) in curve.points(curve_args.step) {
        println!("{:>5}°C  {:>3}%", temp, duty);
    }
    Ok(())
}
