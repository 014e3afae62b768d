//! Command line argument parsing for the GPU fan manager

use crate::lock::DEFAULT_LOCK_FILE;
use crate::nvidia_settings::DEFAULT_DISPLAY;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// GPU Fan Manager
///
/// Samples NVIDIA GPU temperatures and drives their fans along a quadratic curve.
#[derive(Parser, Debug)]
#[command(name = "gpufanmanager")]
#[command(about = "Closed-loop GPU fan controller")]
#[command(version)]
pub struct Args {
    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop (default)
    Run(RunArgs),
    /// Validate the configuration and print the resolved devices
    Check(RunArgs),
    /// Print the fan curve for the given thresholds
    Curve(CurveArgs),
}

/// Options of `run` and `check`.
///
/// Also parsed on its own, from the environment alone, when no subcommand is given.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// JSON configuration file
    #[arg(short, long, env = "GPU_MANAGER_CONFIG")]
    pub config: PathBuf,

    /// File receiving one temperature record per tick
    #[arg(short, long, env = "GPU_MANAGER_LOG")]
    pub log_file: Option<PathBuf>,

    /// Marker file preventing a second instance
    #[arg(long, env = "GPU_MANAGER_LOCK", default_value = DEFAULT_LOCK_FILE)]
    pub lock_file: PathBuf,

    /// X display the NVIDIA driver is attached to
    #[arg(long, env = "GPU_MANAGER_DISPLAY", default_value = DEFAULT_DISPLAY)]
    pub display: String,

    /// Seconds before an nvidia-settings call is abandoned
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub command_timeout: u64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CurveArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub tempmin: i64,
    #[arg(long, allow_hyphen_values = true)]
    pub tempmax: i64,
    #[arg(long)]
    pub fanmin: i64,
    #[arg(long)]
    pub fanmax: i64,

    /// Degrees between table rows
    #[arg(long, default_value_t = 5)]
    pub step: u32,

    /// Print only the target for this temperature
    #[arg(long, allow_hyphen_values = true)]
    pub temp: Option<i32>,
}
