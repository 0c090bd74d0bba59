//! Coop temperature and humidity, shown on the dashboard only.
//!
//! DHT22 sensors are exposed by the Linux `dht11` IIO driver as a device
//! directory holding `in_temp_input` (milli-°C) and `in_humidityrelative_input`
//! (milli-%). The driver returns EIO on a checksum failure, which is common,
//! so a read is retried a few times before giving up.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const READ_ATTEMPTS: u32 = 4;
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClimateReading {
    pub celsius: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

impl ClimateReading {
    pub fn fahrenheit(&self) -> f64 {
        self.celsius * 1.8 + 32.0
    }
}

pub trait ClimateSensor: Send + Sync {
    fn read(&self) -> Result<ClimateReading>;
}

pub struct IioClimateSensor {
    device: PathBuf,
    retry_delay: Duration,
}

impl IioClimateSensor {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            retry_delay: RETRY_DELAY,
        }
    }

    fn read_once(&self) -> Result<ClimateReading> {
        Ok(ClimateReading {
            celsius: read_milli(&self.device.join("in_temp_input"))?,
            humidity: read_milli(&self.device.join("in_humidityrelative_input"))?,
        })
    }
}

impl ClimateSensor for IioClimateSensor {
    fn read(&self) -> Result<ClimateReading> {
        let mut last_error = None;
        for attempt in 0..READ_ATTEMPTS {
            if attempt > 0 {
                std::thread::sleep(self.retry_delay);
            }
            match self.read_once() {
                Ok(reading) => return Ok(reading),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no read attempted")))
    }
}

fn read_milli(path: &Path) -> Result<f64> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Unexpected value '{}' in {}", raw.trim(), path.display()))?;
    Ok(value as f64 / 1000.0)
}

/// Read `sensor`, substituting zeros when it is missing or failing.
pub fn read_or_zero(sensor: Option<&dyn ClimateSensor>) -> ClimateReading {
    let Some(sensor) = sensor else {
        return ClimateReading::default();
    };
    match sensor.read() {
        Ok(reading) => reading,
        Err(e) => {
            log_warning!("Climate sensor read failed: {e:#}");
            ClimateReading::default()
        }
    }
}
