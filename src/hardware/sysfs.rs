//! Linux sysfs GPIO backend.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use super::{Level, OutputPort};
use crate::common::utils::private_path;

pub struct SysfsGpio {
    root: PathBuf,
    active_low: bool,
}

impl SysfsGpio {
    pub fn new(root: PathBuf, active_low: bool) -> Self {
        Self { root, active_low }
    }

    fn pin_dir(&self, channel: u8) -> PathBuf {
        self.root.join(format!("gpio{channel}"))
    }

    fn electrical_value(&self, level: Level) -> &'static str {
        match (level, self.active_low) {
            (Level::Active, true) | (Level::Inactive, false) => "0",
            (Level::Active, false) | (Level::Inactive, true) => "1",
        }
    }
}

impl OutputPort for SysfsGpio {
    fn configure_output(&self, channel: u8) -> Result<()> {
        let pin_dir = self.pin_dir(channel);
        if !pin_dir.exists() {
            let export = self.root.join("export");
            fs::write(&export, channel.to_string())
                .with_context(|| format!("Failed to export channel {channel} via {}", private_path(&export)))?;
        }

        // "high"/"low" switch to output already at the inactive level; plain
        // "out" would drive the pin low and energise an active-low relay
        let direction = pin_dir.join("direction");
        let initial = match self.electrical_value(Level::Inactive) {
            "1" => "high",
            _ => "low",
        };
        fs::write(&direction, initial)
            .with_context(|| format!("Failed to set {} to output", private_path(&direction)))
    }

    fn set_output(&self, channel: u8, level: Level) -> Result<()> {
        let value = self.pin_dir(channel).join("value");
        fs::write(&value, self.electrical_value(level))
            .with_context(|| format!("Failed to drive channel {channel} {level}"))
    }

    fn backend_name(&self) -> &'static str {
        "sysfs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_pin(root: &std::path::Path, channel: u8) {
        let dir = root.join(format!("gpio{channel}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("direction"), "in").unwrap();
        fs::write(dir.join("value"), "1").unwrap();
    }

    #[test]
    fn test_active_low_polarity() {
        let root = tempdir().unwrap();
        fake_pin(root.path(), 24);
        let gpio = SysfsGpio::new(root.path().to_path_buf(), true);

        gpio.configure_output(24).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio24/direction")).unwrap(), "high");
        // The value file is never touched, so the relay is not pulsed on
        assert_eq!(fs::read_to_string(root.path().join("gpio24/value")).unwrap(), "1");

        gpio.set_output(24, Level::Active).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio24/value")).unwrap(), "0");
        gpio.set_output(24, Level::Inactive).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio24/value")).unwrap(), "1");
    }

    #[test]
    fn test_active_high_polarity() {
        let root = tempdir().unwrap();
        fake_pin(root.path(), 5);
        let gpio = SysfsGpio::new(root.path().to_path_buf(), false);
        gpio.configure_output(5).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio5/direction")).unwrap(), "low");
        gpio.set_output(5, Level::Active).unwrap();
        assert_eq!(fs::read_to_string(root.path().join("gpio5/value")).unwrap(), "1");
    }

    #[test]
    fn test_unexported_channel_is_exported_first() {
        let root = tempdir().unwrap();
        let gpio = SysfsGpio::new(root.path().to_path_buf(), true);
        // No kernel behind the fake root, so the pin directory never appears
        assert!(gpio.configure_output(26).is_err());
        assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "26");
    }
}
