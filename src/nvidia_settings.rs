//! Thin wrapper around the `nvidia-settings` command line tool
//!
//! Every invocation runs against a fixed X display and is bounded by a
//! timeout. A child that outlives the timeout is killed.

use crate::errors::{GpuFanError, Result};
use log::trace;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Default X display the NVIDIA driver is attached to
pub const DEFAULT_DISPLAY: &str = ":1";
/// Default bound on a single `nvidia-settings` call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const PROGRAM: &str = "nvidia-settings";

#[derive(Debug, Clone)]
pub struct NvidiaSettings {
    program: String,
    display: String,
    timeout: Duration,
}

impl NvidiaSettings {
    pub fn new(display: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: PROGRAM.to_string(),
            display: display.into(),
            timeout,
        }
    }

    /// Use a different executable, e.g. a wrapper script
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run `nvidia-settings` with `args` and capture stdout
    pub async fn query(&self, args: &[String]) -> Result<Output> {
        self.run(args, Stdio::piped()).await
    }

    /// Run `nvidia-settings` with `args`, discarding stdout
    pub async fn assign(&self, args: &[String]) -> Result<Output> {
        self.run(args, Stdio::null()).await
    }

    async fn run(&self, args: &[String], stdout: Stdio) -> Result<Output> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        trace!("DISPLAY={} {}", self.display, command_line);

        let child = Command::new(&self.program)
            .args(args)
            .env("DISPLAY", &self.display)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GpuFanError::Timeout {
                command: command_line.clone(),
                after: self.timeout,
            })??;

        trace!(
            "{} exited with {} ({} bytes of output)",
            command_line,
            output.status,
            output.stdout.len()
        );
        Ok(output)
    }
}

impl Default for NvidiaSettings {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY, DEFAULT_TIMEOUT)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_captures_stdout() {
        let runner = NvidiaSettings::new(":9", Duration::from_secs(5)).with_program("echo");
        let output = runner
            .query(&["-q".to_string(), "GPUCoreTemp".to_string()])
            .await
            .unwrap();

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "-q GPUCoreTemp");
    }

    #[tokio::test]
    async fn test_display_is_exported() {
        let runner = NvidiaSettings::new(":7", Duration::from_secs(5)).with_program("sh");
        let output = runner
            .query(&["-c".to_string(), "echo $DISPLAY".to_string()])
            .await
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), ":7");
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = NvidiaSettings::new(":1", Duration::from_millis(100)).with_program("sleep");
        let result = runner.assign(&["5".to_string()]).await;

        assert!(matches!(result, Err(GpuFanError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = NvidiaSettings::default().with_program("/nonexistent/nvidia-settings");
        assert!(matches!(runner.query(&[]).await, Err(GpuFanError::Io(_))));
    }
}
