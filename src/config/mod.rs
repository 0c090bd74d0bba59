//! Configuration system for coopd with validation and private location override.
//!
//! The configuration lives in `coopd.toml`, searched at
//! `$XDG_CONFIG_HOME/coopd/coopd.toml` unless `--config DIR` points elsewhere.
//! A commented default file is written on first start.
//!
//! ```toml
//! #[Location]
//! latitude = 47.8107            # Degrees north (-90 to 90)
//! longitude = -122.3774         # Degrees east (-180 to 180)
//! timezone = "US/Pacific"       # IANA timezone of the coop
//!
//! #[Schedule]
//! refresh_at = "00:10"          # Daily recomputation of the schedule (HH:MM)
//! tunnel_open_delay = 30        # Minutes after sunrise the tunnel door opens
//! fallback_sunrise = "07:00"    # Used until a solar calculation succeeds
//! fallback_dusk = "19:00"
//! fallback_sunset = "18:30"
//! supplemental_lighting = true  # Top up short winter days with the coop light
//! target_daylight = 870         # Minutes of light per day the flock should get
//! min_light_duration = 5        # Skip supplemental light shorter than this (minutes)
//! past_due = "fire"             # "fire" or "skip" jobs already past when installed
//!
//! #[Actuators]
//! gpio_backend = "sysfs"        # "sysfs" or "dry-run"
//! active_low = true             # Relay board energises on a low output
//! settle_time = 1               # Seconds the door guard stays held after a pulse
//! guard_level_devices = false   # Lights and IR also wait for the door guard
//!
//! [pins]
//! door_close = 23
//! door_open = 24
//! ir = 25
//! coop_light = 26
//! tunnel_open = 5
//! tunnel_close = 6
//!
//! [pulses]                      # Motor run time in seconds
//! coop_open = 35
//! coop_close = 50
//! tunnel_open = 40
//! tunnel_close = 40
//! ```
//!
//! A `geo.toml` next to `coopd.toml` may hold `latitude`/`longitude` only; it
//! overrides the main file so the coop's location can be kept out of a shared
//! configuration.

use anyhow::Result;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

mod builder;
mod loading;
pub mod validation;

#[cfg(test)]
mod tests;

pub use builder::create_default_config;
pub use loading::{
    get_config_base_dir, get_config_path, get_custom_config_dir, load, load_from_path,
    set_config_dir,
};

use crate::common::constants::*;
use crate::common::utils::parse_time_of_day;

/// Private coordinates stored in `geo.toml`.
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct GeoConfig {
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
}

/// What to do with a job whose fire time has already passed when the daily
/// schedule is installed (typically after a restart in the afternoon).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PastDuePolicy {
    /// Run it right away, as the first thing the scheduler does.
    Fire,
    /// Drop it; it will be scheduled again tomorrow.
    Skip,
}

impl PastDuePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PastDuePolicy::Fire => "fire",
            PastDuePolicy::Skip => "skip",
        }
    }
}

/// How output channels are driven.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GpioBackend {
    /// Linux sysfs GPIO (`/sys/class/gpio`).
    #[serde(rename = "sysfs")]
    Sysfs,
    /// Keep channel levels in memory and log them. For bench testing.
    #[serde(rename = "dry-run")]
    DryRun,
}

impl GpioBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpioBackend::Sysfs => "sysfs",
            GpioBackend::DryRun => "dry-run",
        }
    }
}

/// Output channel for each physical function.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PinConfig {
    pub door_close: Option<u8>,
    pub door_open: Option<u8>,
    pub ir: Option<u8>,
    pub coop_light: Option<u8>,
    pub tunnel_open: Option<u8>,
    pub tunnel_close: Option<u8>,
}

impl PinConfig {
    /// All channels with their function names, defaults applied.
    pub fn channels(&self) -> [(&'static str, u8); 6] {
        [
            ("Door Close", self.door_close.unwrap_or(DEFAULT_PIN_DOOR_CLOSE)),
            ("Door Open", self.door_open.unwrap_or(DEFAULT_PIN_DOOR_OPEN)),
            ("Camera IR", self.ir.unwrap_or(DEFAULT_PIN_IR)),
            ("Coop LED", self.coop_light.unwrap_or(DEFAULT_PIN_COOP_LIGHT)),
            ("Tunnel Open", self.tunnel_open.unwrap_or(DEFAULT_PIN_TUNNEL_OPEN)),
            ("Tunnel Close", self.tunnel_close.unwrap_or(DEFAULT_PIN_TUNNEL_CLOSE)),
        ]
    }
}

/// Motor run time in seconds for each door movement.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PulseConfig {
    pub coop_open: Option<u64>,
    pub coop_close: Option<u64>,
    pub tunnel_open: Option<u64>,
    pub tunnel_close: Option<u64>,
}

/// Configuration structure for coopd.
///
/// Every field is optional in the file. [`load`] fills missing fields with
/// defaults and validates the result; the typed accessors below can therefore
/// be used without further checks on a loaded config.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,

    pub refresh_at: Option<String>,
    pub tunnel_open_delay: Option<u32>, // minutes
    pub fallback_sunrise: Option<String>,
    pub fallback_dusk: Option<String>,
    pub fallback_sunset: Option<String>,
    pub supplemental_lighting: Option<bool>,
    pub target_daylight: Option<u32>,    // minutes
    pub min_light_duration: Option<u32>, // minutes
    pub past_due: Option<PastDuePolicy>,

    pub gpio_backend: Option<GpioBackend>,
    pub gpio_root: Option<String>,
    pub active_low: Option<bool>,
    pub settle_time: Option<u64>, // seconds
    pub guard_level_devices: Option<bool>,
    pub pins: Option<PinConfig>,
    pub pulses: Option<PulseConfig>,

    pub log_file: Option<String>,
    pub log_max_bytes: Option<u64>,
    pub log_backups: Option<u32>,

    pub web_enabled: Option<bool>,
    pub listen: Option<String>,
    /// IIO device directory of a DHT temperature/humidity sensor.
    pub climate_sensor: Option<String>,
}

impl Config {
    /// Load configuration using the module's load function
    pub fn load() -> Result<Self> {
        load()
    }

    /// Load from path using the module's load_from_path function
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        load_from_path(path)
    }

    /// Get the path to the geo.toml file (in the same directory as coopd.toml)
    pub fn get_geo_path() -> Result<PathBuf> {
        Ok(get_config_base_dir()?.join("geo.toml"))
    }

    pub fn coordinates(&self) -> (f64, f64) {
        (
            self.latitude.unwrap_or(DEFAULT_LATITUDE),
            self.longitude.unwrap_or(DEFAULT_LONGITUDE),
        )
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::US::Pacific)
    }

    pub fn refresh_at(&self) -> NaiveTime {
        time_or_default(self.refresh_at.as_deref(), DEFAULT_REFRESH_AT)
    }

    pub fn fallback_sunrise(&self) -> NaiveTime {
        time_or_default(self.fallback_sunrise.as_deref(), DEFAULT_FALLBACK_SUNRISE)
    }

    pub fn fallback_dusk(&self) -> NaiveTime {
        time_or_default(self.fallback_dusk.as_deref(), DEFAULT_FALLBACK_DUSK)
    }

    pub fn fallback_sunset(&self) -> NaiveTime {
        time_or_default(self.fallback_sunset.as_deref(), DEFAULT_FALLBACK_SUNSET)
    }

    pub fn tunnel_open_delay(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.tunnel_open_delay
                .unwrap_or(DEFAULT_TUNNEL_OPEN_DELAY_MINUTES) as i64,
        )
    }

    pub fn past_due(&self) -> PastDuePolicy {
        self.past_due.unwrap_or(PastDuePolicy::Fire)
    }

    pub fn gpio_backend(&self) -> GpioBackend {
        self.gpio_backend.unwrap_or(GpioBackend::Sysfs)
    }

    pub fn gpio_root(&self) -> PathBuf {
        PathBuf::from(self.gpio_root.as_deref().unwrap_or(DEFAULT_GPIO_ROOT))
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_secs(self.settle_time.unwrap_or(DEFAULT_SETTLE_SECONDS))
    }

    pub fn pins(&self) -> PinConfig {
        self.pins.clone().unwrap_or_default()
    }

    pub fn pulse(&self, seconds: Option<u64>, default: u64) -> Duration {
        Duration::from_secs(seconds.unwrap_or(default))
    }

    pub fn pulses(&self) -> PulseConfig {
        self.pulses.clone().unwrap_or_default()
    }

    /// Event log location; defaults to the XDG data directory.
    pub fn log_file(&self) -> PathBuf {
        match self.log_file.as_deref() {
            Some(path) => expand_home(path),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
                .join(DEFAULT_LOG_FILE_NAME),
        }
    }

    pub fn listen(&self) -> &str {
        self.listen.as_deref().unwrap_or(DEFAULT_LISTEN)
    }

    pub fn web_enabled(&self) -> bool {
        self.web_enabled.unwrap_or(DEFAULT_WEB_ENABLED)
    }

    pub fn climate_sensor(&self) -> Option<PathBuf> {
        self.climate_sensor.as_deref().map(expand_home)
    }

    /// Print the effective settings as a log block.
    pub fn log_config(&self) {
        let (lat, lon) = self.coordinates();
        log_block_start!("Loaded configuration");
        log_indented!("Location: {lat:.4}°, {lon:.4}° ({})", self.timezone());
        log_indented!(
            "Schedule refresh at {} | tunnel opens sunrise +{} min",
            self.refresh_at().format("%H:%M"),
            self.tunnel_open_delay().num_minutes()
        );
        log_indented!(
            "Fallback times: sunrise {} | dusk {} | sunset {}",
            self.fallback_sunrise().format("%H:%M"),
            self.fallback_dusk().format("%H:%M"),
            self.fallback_sunset().format("%H:%M")
        );
        if self.supplemental_lighting.unwrap_or(DEFAULT_SUPPLEMENTAL_LIGHTING) {
            log_indented!(
                "Supplemental light up to {} min of daylight (minimum run {} min)",
                self.target_daylight.unwrap_or(DEFAULT_TARGET_DAYLIGHT_MINUTES),
                self.min_light_duration.unwrap_or(DEFAULT_MIN_LIGHT_MINUTES)
            );
        } else {
            log_indented!("Supplemental light disabled");
        }
        log_indented!(
            "GPIO: {} backend, {}, past-due jobs: {}",
            self.gpio_backend().as_str(),
            if self.active_low.unwrap_or(DEFAULT_ACTIVE_LOW) {
                "active-low"
            } else {
                "active-high"
            },
            self.past_due().as_str()
        );
        if self.web_enabled() {
            log_indented!("Web control on http://{}", self.listen());
        }
    }
}

fn time_or_default(value: Option<&str>, default: &str) -> NaiveTime {
    value
        .and_then(|s| parse_time_of_day(s).ok())
        .or_else(|| parse_time_of_day(default).ok())
        .unwrap_or(NaiveTime::MIN)
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
