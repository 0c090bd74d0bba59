//! Default configuration file creation.
//!
//! Produces a commented `coopd.toml` with aligned comments so the file reads
//! well when an operator opens it for the first time.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Create a default config file at `path`.
///
/// If a `geo.toml` already exists next to it, coordinates are left out of the
/// main file so they keep living in the private override only.
pub fn create_default_config(path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let geo_exists = path
        .parent()
        .map(|dir| dir.join("geo.toml").exists())
        .unwrap_or(false);

    let mut builder = ConfigBuilder::new().add_section("Location");
    if !geo_exists {
        builder = builder
            .add_setting(
                "latitude",
                &format!("{DEFAULT_LATITUDE:.4}"),
                "Degrees north (-90 to 90)",
            )
            .add_setting(
                "longitude",
                &format!("{DEFAULT_LONGITUDE:.4}"),
                "Degrees east (-180 to 180)",
            );
    }

    let content = builder
        .add_setting(
            "timezone",
            &format!("\"{DEFAULT_TIMEZONE}\""),
            "IANA timezone of the coop",
        )
        .add_section("Schedule")
        .add_setting(
            "refresh_at",
            &format!("\"{DEFAULT_REFRESH_AT}\""),
            "Daily recomputation of the schedule (HH:MM)",
        )
        .add_setting(
            "tunnel_open_delay",
            &DEFAULT_TUNNEL_OPEN_DELAY_MINUTES.to_string(),
            "Minutes after sunrise the tunnel door opens",
        )
        .add_setting(
            "fallback_sunrise",
            &format!("\"{DEFAULT_FALLBACK_SUNRISE}\""),
            "Used until a solar calculation succeeds",
        )
        .add_setting(
            "fallback_dusk",
            &format!("\"{DEFAULT_FALLBACK_DUSK}\""),
            "Used until a solar calculation succeeds",
        )
        .add_setting(
            "fallback_sunset",
            &format!("\"{DEFAULT_FALLBACK_SUNSET}\""),
            "Used until a solar calculation succeeds",
        )
        .add_setting(
            "supplemental_lighting",
            &DEFAULT_SUPPLEMENTAL_LIGHTING.to_string(),
            "Top up short winter days with the coop light",
        )
        .add_setting(
            "target_daylight",
            &DEFAULT_TARGET_DAYLIGHT_MINUTES.to_string(),
            "Minutes of light per day (sun plus lamp)",
        )
        .add_setting(
            "min_light_duration",
            &DEFAULT_MIN_LIGHT_MINUTES.to_string(),
            "Skip supplemental light shorter than this (minutes)",
        )
        .add_setting(
            "past_due",
            &format!("\"{DEFAULT_PAST_DUE}\""),
            "\"fire\" or \"skip\" jobs already past when the schedule is installed",
        )
        .add_section("Actuators")
        .add_setting(
            "gpio_backend",
            &format!("\"{DEFAULT_GPIO_BACKEND}\""),
            "\"sysfs\" or \"dry-run\"",
        )
        .add_setting(
            "active_low",
            &DEFAULT_ACTIVE_LOW.to_string(),
            "Relay board energises on a low output",
        )
        .add_setting(
            "settle_time",
            &DEFAULT_SETTLE_SECONDS.to_string(),
            "Seconds the door guard stays held after a pulse",
        )
        .add_setting(
            "guard_level_devices",
            &DEFAULT_GUARD_LEVEL_DEVICES.to_string(),
            "Lights and IR also wait for the door guard",
        )
        .add_section("Event log")
        .add_setting(
            "log_max_bytes",
            &DEFAULT_LOG_MAX_BYTES.to_string(),
            "Rotate the event log at this size",
        )
        .add_setting(
            "log_backups",
            &DEFAULT_LOG_BACKUPS.to_string(),
            "Rotated files kept (coop.log.1, coop.log.2, ...)",
        )
        .add_section("Web")
        .add_setting(
            "web_enabled",
            &DEFAULT_WEB_ENABLED.to_string(),
            "Serve the manual override page",
        )
        .add_setting(
            "listen",
            &format!("\"{DEFAULT_LISTEN}\""),
            "Address of the override page",
        )
        .build();

    let tables = format!(
        "\n\n[pins]\ndoor_close = {DEFAULT_PIN_DOOR_CLOSE}\ndoor_open = {DEFAULT_PIN_DOOR_OPEN}\n\
         ir = {DEFAULT_PIN_IR}\ncoop_light = {DEFAULT_PIN_COOP_LIGHT}\n\
         tunnel_open = {DEFAULT_PIN_TUNNEL_OPEN}\ntunnel_close = {DEFAULT_PIN_TUNNEL_CLOSE}\n\
         \n[pulses] # Motor run time in seconds\ncoop_open = {DEFAULT_PULSE_COOP_OPEN}\n\
         coop_close = {DEFAULT_PULSE_COOP_CLOSE}\ntunnel_open = {DEFAULT_PULSE_TUNNEL_OPEN}\n\
         tunnel_close = {DEFAULT_PULSE_TUNNEL_CLOSE}\n"
    );

    fs::write(path, content + &tables)
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration at {}", private_path(path));
    Ok(())
}

struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        // One column for every comment in the file
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for (index, entry) in self.entries.into_iter().enumerate() {
            match entry {
                ConfigEntry::Section(title) => {
                    if index > 0 {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn test_builder_aligns_comments() {
        let text = ConfigBuilder::new()
            .add_section("A")
            .add_setting("x", "1", "short")
            .add_setting("longer_key", "\"value\"", "long")
            .build();
        let columns: Vec<usize> = text
            .lines()
            .filter(|l| l.contains(" = "))
            .map(|l| l.find('#').unwrap())
            .collect();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], columns[1]);
    }
}
