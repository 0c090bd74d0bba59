//! Append-only audit trail of actuations and schedule installs.
//!
//! Lines look like `2024-06-01 05:30:00,012 - coop-open`, stamped in the
//! coop's timezone. When the next line would take the file to `max_bytes` the
//! file is rolled: `coop.log` becomes `coop.log.1`, `coop.log.1` becomes
//! `coop.log.2` and so on, with the oldest generation beyond `backups`
//! discarded.
//!
//! Recording never fails from the caller's point of view. A write error is
//! reported on the console and the line is dropped; the coop keeps running.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::common::utils::private_path;
use crate::time_source::TimeSource;

pub struct EventLog {
    inner: Mutex<LogFile>,
    tz: Tz,
    clock: Arc<dyn TimeSource>,
}

struct LogFile {
    path: PathBuf,
    max_bytes: u64,
    backups: u32,
    file: Option<File>,
    size: u64,
}

impl EventLog {
    /// Open (or create) the log at `path`, appending to existing content.
    pub fn open(
        path: &Path,
        max_bytes: u64,
        backups: u32,
        tz: Tz,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory {}", private_path(parent))
            })?;
        }

        let mut log_file = LogFile {
            path: path.to_path_buf(),
            max_bytes,
            backups,
            file: None,
            size: 0,
        };
        log_file.reopen()?;

        Ok(Self {
            inner: Mutex::new(log_file),
            tz,
            clock,
        })
    }

    pub fn path(&self) -> PathBuf {
        match self.inner.lock() {
            Ok(inner) => inner.path.clone(),
            Err(poisoned) => poisoned.into_inner().path.clone(),
        }
    }

    /// Append one timestamped line and echo it to the console.
    pub fn record(&self, message: &str) {
        let stamp = self
            .clock
            .now()
            .with_timezone(&self.tz)
            .format("%Y-%m-%d %H:%M:%S,%3f");
        let line = format!("{stamp} - {message}\n");

        log_decorated!("{message}");

        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = inner.append(line.as_bytes()) {
            log_error!("Event log write failed: {e}");
        }
    }
}

impl LogFile {
    fn reopen(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open event log {}", private_path(&self.path)))?;
        self.size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.file = Some(file);
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if self.max_bytes > 0 && self.size + bytes.len() as u64 >= self.max_bytes {
            self.rollover()?;
        }
        if self.file.is_none() {
            self.reopen()?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(bytes)?;
            file.flush()?;
            self.size += bytes.len() as u64;
        }
        Ok(())
    }

    fn generation(&self, n: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rollover(&mut self) -> Result<()> {
        self.file = None;

        if self.backups > 0 {
            for n in (1..self.backups).rev() {
                let from = self.generation(n);
                if from.exists() {
                    let to = self.generation(n + 1);
                    let _ = fs::remove_file(&to);
                    fs::rename(&from, &to)?;
                }
            }
            let first = self.generation(1);
            let _ = fs::remove_file(&first);
            if self.path.exists() {
                fs::rename(&self.path, &first)?;
            }
        } else {
            // Without backups the file is simply truncated
            File::create(&self.path)?;
        }

        self.reopen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_source::ManualTimeSource;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn clock() -> Arc<dyn TimeSource> {
        Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
        ))
    }

    #[test]
    fn test_line_format_uses_local_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coop.log");
        let log = EventLog::open(&path, 1_000_000, 2, chrono_tz::US::Pacific, clock()).unwrap();

        log.record("coop-open");
        log.record("Coop Opened via web button");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "2024-06-01 05:30:00,000 - coop-open");
        assert!(lines[1].ends_with(" - Coop Opened via web button"));
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coop.log");
        fs::write(&path, "earlier line\n").unwrap();
        let log = EventLog::open(&path, 1_000_000, 2, chrono_tz::UTC, clock()).unwrap();
        log.record("startup");
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier line\n"));
        assert!(content.ends_with(" - startup\n"));
    }

    #[test]
    fn test_rotation_keeps_bounded_generations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coop.log");
        // Each line is 37 bytes: 23 for the stamp, 3 for " - ", 10 + newline
        let log = EventLog::open(&path, 100, 2, chrono_tz::UTC, clock()).unwrap();

        for i in 0..12 {
            log.record(&format!("message-{i:02}"));
        }

        let current = fs::read_to_string(&path).unwrap();
        let first = fs::read_to_string(dir.path().join("coop.log.1")).unwrap();
        let second = fs::read_to_string(dir.path().join("coop.log.2")).unwrap();
        assert!(!dir.path().join("coop.log.3").exists());

        // Two lines per file, newest in the live file
        assert!(current.contains("message-11"));
        assert!(first.contains("message-09"));
        assert!(second.contains("message-07"));
        assert!(!second.contains("message-00"));
        for content in [&current, &first, &second] {
            assert!(content.len() < 100);
        }
    }
}
