//! Configuration loading functionality.
//!
//! Resolves the configuration path, creates a default file on first start,
//! merges `geo.toml` coordinates and fills unset fields with defaults.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::validation::validate_config;
use super::{Config, GeoConfig, PinConfig, PulseConfig};
use crate::common::constants::*;
use crate::common::utils::private_path;

/// Global configuration directory, set once at startup
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Set the configuration directory for the current process.
/// This can only be called once, typically at startup.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// Get the custom configuration directory if one was set.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Directory holding coopd.toml and geo.toml.
pub fn get_config_base_dir() -> Result<PathBuf> {
    let config_path = get_config_path()?;
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// Configuration file path: `--config DIR` if given, else the XDG location.
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load configuration using automatic path detection.
///
/// Creates a default configuration file if none exists.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
    }

    load_from_path(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            private_path(&config_path)
        )
    })
}

/// Load configuration from a specific path.
///
/// Does NOT create a default config if the path doesn't exist.
pub fn load_from_path(path: &PathBuf) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found at {}", private_path(path));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", private_path(path)))?;

    // geo.toml values go through the same validation as the main file
    load_geo_override_from_path(&mut config, path)?;

    apply_defaults(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Fill every unset field with its default.
pub(crate) fn apply_defaults(config: &mut Config) {
    config.latitude.get_or_insert(DEFAULT_LATITUDE);
    config.longitude.get_or_insert(DEFAULT_LONGITUDE);
    config
        .timezone
        .get_or_insert_with(|| DEFAULT_TIMEZONE.to_string());

    config
        .refresh_at
        .get_or_insert_with(|| DEFAULT_REFRESH_AT.to_string());
    config
        .tunnel_open_delay
        .get_or_insert(DEFAULT_TUNNEL_OPEN_DELAY_MINUTES);
    config
        .fallback_sunrise
        .get_or_insert_with(|| DEFAULT_FALLBACK_SUNRISE.to_string());
    config
        .fallback_dusk
        .get_or_insert_with(|| DEFAULT_FALLBACK_DUSK.to_string());
    config
        .fallback_sunset
        .get_or_insert_with(|| DEFAULT_FALLBACK_SUNSET.to_string());
    config
        .supplemental_lighting
        .get_or_insert(DEFAULT_SUPPLEMENTAL_LIGHTING);
    config
        .target_daylight
        .get_or_insert(DEFAULT_TARGET_DAYLIGHT_MINUTES);
    config
        .min_light_duration
        .get_or_insert(DEFAULT_MIN_LIGHT_MINUTES);
    config.past_due.get_or_insert(super::PastDuePolicy::Fire);

    config.gpio_backend.get_or_insert(super::GpioBackend::Sysfs);
    config
        .gpio_root
        .get_or_insert_with(|| DEFAULT_GPIO_ROOT.to_string());
    config.active_low.get_or_insert(DEFAULT_ACTIVE_LOW);
    config.settle_time.get_or_insert(DEFAULT_SETTLE_SECONDS);
    config
        .guard_level_devices
        .get_or_insert(DEFAULT_GUARD_LEVEL_DEVICES);

    let pins = config.pins.get_or_insert_with(PinConfig::default);
    pins.door_close.get_or_insert(DEFAULT_PIN_DOOR_CLOSE);
    pins.door_open.get_or_insert(DEFAULT_PIN_DOOR_OPEN);
    pins.ir.get_or_insert(DEFAULT_PIN_IR);
    pins.coop_light.get_or_insert(DEFAULT_PIN_COOP_LIGHT);
    pins.tunnel_open.get_or_insert(DEFAULT_PIN_TUNNEL_OPEN);
    pins.tunnel_close.get_or_insert(DEFAULT_PIN_TUNNEL_CLOSE);

    let pulses = config.pulses.get_or_insert_with(PulseConfig::default);
    pulses.coop_open.get_or_insert(DEFAULT_PULSE_COOP_OPEN);
    pulses.coop_close.get_or_insert(DEFAULT_PULSE_COOP_CLOSE);
    pulses.tunnel_open.get_or_insert(DEFAULT_PULSE_TUNNEL_OPEN);
    pulses.tunnel_close.get_or_insert(DEFAULT_PULSE_TUNNEL_CLOSE);

    config.log_max_bytes.get_or_insert(DEFAULT_LOG_MAX_BYTES);
    config.log_backups.get_or_insert(DEFAULT_LOG_BACKUPS);

    config.web_enabled.get_or_insert(DEFAULT_WEB_ENABLED);
    config
        .listen
        .get_or_insert_with(|| DEFAULT_LISTEN.to_string());
}

/// Load geo.toml from the directory of a specific config path
pub(crate) fn load_geo_override_from_path(config: &mut Config, config_path: &Path) -> Result<()> {
    let Some(parent) = config_path.parent() else {
        return Ok(());
    };
    let geo_path = parent.join("geo.toml");

    if !geo_path.exists() {
        return Ok(());
    }

    match fs::read_to_string(&geo_path) {
        Ok(content) => match toml::from_str::<GeoConfig>(&content) {
            Ok(geo_config) => {
                if let Some(lat) = geo_config.latitude {
                    config.latitude = Some(lat);
                }
                if let Some(lon) = geo_config.longitude {
                    config.longitude = Some(lon);
                }
            }
            Err(e) => {
                log_warning!("Failed to parse geo.toml: {e}. Using coordinates from main config.");
            }
        },
        Err(e) => {
            log_warning!("Failed to read geo.toml: {e}. Using coordinates from main config.");
        }
    }

    Ok(())
}
