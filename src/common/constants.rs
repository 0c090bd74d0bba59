//! Application-wide constants and defaults.
//!
//! Defaults describe the original installation: a coop in Edmonds, WA with a
//! relay board on a Raspberry Pi whose inputs are active-low.

use std::time::Duration;

// # Location

pub const DEFAULT_LATITUDE: f64 = 47.8107;
pub const DEFAULT_LONGITUDE: f64 = -122.3774;
pub const DEFAULT_TIMEZONE: &str = "US/Pacific";

// # Schedule

/// Fallback times of day used until the first successful solar calculation.
pub const DEFAULT_FALLBACK_SUNRISE: &str = "07:00";
pub const DEFAULT_FALLBACK_DUSK: &str = "19:00";
pub const DEFAULT_FALLBACK_SUNSET: &str = "18:30";

/// Time of day at which the daily schedule is recomputed. Early enough to land
/// before any realistic light-on time, late enough to sit clear of the DST
/// switch at 02:00.
pub const DEFAULT_REFRESH_AT: &str = "00:10";

pub const DEFAULT_TUNNEL_OPEN_DELAY_MINUTES: u32 = 30;
pub const DEFAULT_SUPPLEMENTAL_LIGHTING: bool = true;
/// Total light per day the flock should get (14.5 hours).
pub const DEFAULT_TARGET_DAYLIGHT_MINUTES: u32 = 870;
/// Supplemental light is only scheduled if it would run longer than this.
pub const DEFAULT_MIN_LIGHT_MINUTES: u32 = 5;
pub const DEFAULT_PAST_DUE: &str = "fire";

pub const MAXIMUM_TUNNEL_OPEN_DELAY_MINUTES: u32 = 720;
pub const MAXIMUM_TARGET_DAYLIGHT_MINUTES: u32 = 1440;

// # Actuators

pub const DEFAULT_GPIO_BACKEND: &str = "sysfs";
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";
pub const DEFAULT_ACTIVE_LOW: bool = true;
pub const DEFAULT_GUARD_LEVEL_DEVICES: bool = false;
pub const DEFAULT_SETTLE_SECONDS: u64 = 1;
pub const MAXIMUM_SETTLE_SECONDS: u64 = 60;
/// Longest motor run accepted from configuration.
pub const MAXIMUM_PULSE_SECONDS: u64 = 300;

pub const DEFAULT_PIN_DOOR_CLOSE: u8 = 23;
pub const DEFAULT_PIN_DOOR_OPEN: u8 = 24;
pub const DEFAULT_PIN_IR: u8 = 25;
pub const DEFAULT_PIN_COOP_LIGHT: u8 = 26;
pub const DEFAULT_PIN_TUNNEL_OPEN: u8 = 5;
pub const DEFAULT_PIN_TUNNEL_CLOSE: u8 = 6;

pub const DEFAULT_PULSE_COOP_OPEN: u64 = 35;
pub const DEFAULT_PULSE_COOP_CLOSE: u64 = 50;
pub const DEFAULT_PULSE_TUNNEL_OPEN: u64 = 40;
pub const DEFAULT_PULSE_TUNNEL_CLOSE: u64 = 40;

// # Event log

pub const DEFAULT_LOG_FILE_NAME: &str = "coop.log";
pub const DEFAULT_LOG_MAX_BYTES: u64 = 1_000_000;
pub const DEFAULT_LOG_BACKUPS: u32 = 2;
pub const MINIMUM_LOG_MAX_BYTES: u64 = 1024;
pub const MAXIMUM_LOG_BACKUPS: u32 = 20;

// # Web

pub const DEFAULT_WEB_ENABLED: bool = true;
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5000";

// # Runtime

/// Upper bound on how long the scheduler sleeps before re-checking the
/// running flag.
pub const SCHEDULER_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const IPC_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const IPC_CLIENT_TIMEOUT: Duration = Duration::from_secs(MAXIMUM_PULSE_SECONDS + 30);

pub const CONFIG_FILE_NAME: &str = "coopd.toml";
pub const APP_DIR_NAME: &str = "coopd";
pub const SOCKET_FILE_NAME: &str = "coopd.sock";
pub const LOCK_FILE_NAME: &str = "coopd.lock";

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
