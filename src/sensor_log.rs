//! Append-only CSV log of temperature readings
//!
//! Every temperature message received by the bridge produces one row. The
//! file is created lazily with a single header row and is only ever appended
//! to afterwards, so an external charting consumer can tail it safely.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header row written exactly once when the file is created.
pub const CSV_HEADER: &str = "Timestamp,Temperature (°C)";

/// Consecutive append failures before escalating from warn to error logs.
pub const ESCALATION_INTERVAL: u32 = 10;

/// A single temperature observation.
///
/// The most recent reading is also cached in the bridge's watch cell; a
/// reading is immutable once taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl SensorReading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Reading stamped with the current wall clock.
    pub fn now(value: f64) -> Self {
        Self::new(Utc::now(), value)
    }
}

/// Errors from sensor log I/O.
#[derive(Debug, Error)]
pub enum SensorLogError {
    #[error("failed to create sensor log directory '{}'", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to initialize sensor log '{}'", path.display())]
    Initialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append to sensor log '{}'", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Format one CSV row: ISO-8601 UTC timestamp, then the value.
///
/// The timestamp keeps the `+00:00` offset and microsecond precision of the
/// historical log format; the value uses f64 `Display`, which round-trips
/// through `parse` exactly.
pub fn format_row(reading: &SensorReading) -> String {
    format!(
        "{},{}",
        reading
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, false),
        reading.value
    )
}

/// Append-only CSV sensor log with create-once initialization.
///
/// Single writer assumed (the bridge event task); each append is one
/// open-write-close cycle so concurrent readers observe whole rows.
#[derive(Debug, Clone)]
pub struct SensorCsvLog {
    path: PathBuf,
}

impl SensorCsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row exactly once.
    ///
    /// A no-op when the file already exists: existing rows are never
    /// truncated and the header is never duplicated, however many times the
    /// process restarts.
    pub fn ensure_initialized(&self) -> Result<(), SensorLogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| SensorLogError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                writeln!(file, "{CSV_HEADER}").map_err(|source| SensorLogError::Initialize {
                    path: self.path.clone(),
                    source,
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(SensorLogError::Initialize {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Append one reading as a single row.
    pub fn append(&self, reading: &SensorReading) -> Result<(), SensorLogError> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|source| SensorLogError::Append {
                path: self.path.clone(),
                source,
            })?;

        writeln!(file, "{}", format_row(reading)).map_err(|source| SensorLogError::Append {
            path: self.path.clone(),
            source,
        })
    }
}

/// Counts consecutive append failures so the bridge can escalate its logging
/// instead of silently dropping rows forever.
#[derive(Debug, Default)]
pub struct FailureStreak {
    consecutive: u32,
}

impl FailureStreak {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure; returns the current consecutive count.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive
    }

    /// Record a success; returns how many failures preceded it.
    pub fn record_success(&mut self) -> u32 {
        std::mem::take(&mut self.consecutive)
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Every `ESCALATION_INTERVAL`-th consecutive failure is worth an
    /// error-level log; the rest stay at warn.
    pub fn should_escalate(count: u32) -> bool {
        count > 0 && count % ESCALATION_INTERVAL == 0
    }
}
