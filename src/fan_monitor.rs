//! Append-only temperature record, one line per control tick

use crate::errors::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends `<unix seconds>:<t1>|<t2>|...|` lines to a file.
///
/// Unavailable readings leave their field empty.
#[derive(Debug, Clone)]
pub struct TemperatureLog {
    path: PathBuf,
}

impl TemperatureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, timestamp: DateTime<Utc>, readings: &[Option<i32>]) -> Result<()> {
        let line = format_record(timestamp, readings);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

pub fn format_record(timestamp: DateTime<Utc>, readings: &[Option<i32>]) -> String {
    let mut line = format!(
        "{}.{:03}:",
        timestamp.timestamp(),
        timestamp.timestamp_subsec_millis()
    );
    for reading in readings {
        if let Some(t) = reading {
            let _ = write!(line, "{}", t);
        }
        line.push('|');
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, millis: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, millis * 1_000_000).unwrap()
    }

    #[test]
    fn test_format_record() {
        assert_eq!(
            format_record(at(1_700_000_000, 42), &[Some(45), None, Some(71)]),
            "1700000000.042:45||71|\n"
        );
        assert_eq!(format_record(at(5, 0), &[]), "5.000:\n");
    }

    #[test]
    fn test_record_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = TemperatureLog::new(dir.path().join("temps.log"));

        log.record(at(10, 0), &[Some(50)]).unwrap();
        log.record(at(20, 500), &[None]).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "10.000:50|\n20.500:|\n");
    }

    #[test]
    fn test_record_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let log = TemperatureLog::new(dir.path().join("missing").join("temps.log"));

        assert!(log.record(at(10, 0), &[Some(50)]).is_err());
    }
}
