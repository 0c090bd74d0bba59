//! Configuration validation functionality.
//!
//! Rejects settings that would leave the coop in a bad state: impossible
//! coordinates, unparseable times, motor pulses long enough to strip a gear,
//! two functions wired to the same output channel.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::net::SocketAddr;

use super::Config;
use crate::common::constants::*;
use crate::common::utils::parse_time_of_day;

/// Validate a configuration. Unset fields are accepted and later take their
/// defaults.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }

    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    if let Some(ref tz) = config.timezone {
        tz.parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("timezone '{tz}' is not a known IANA timezone"))?;
    }

    for (key, value) in [
        ("refresh_at", &config.refresh_at),
        ("fallback_sunrise", &config.fallback_sunrise),
        ("fallback_dusk", &config.fallback_dusk),
        ("fallback_sunset", &config.fallback_sunset),
    ] {
        if let Some(time) = value {
            parse_time_of_day(time).with_context(|| format!("Invalid {key} in config"))?;
        }
    }

    if let (Some(rise), Some(set)) = (&config.fallback_sunrise, &config.fallback_sunset)
        && parse_time_of_day(rise)? >= parse_time_of_day(set)?
    {
        anyhow::bail!("fallback_sunrise ({rise}) must be earlier than fallback_sunset ({set})");
    }

    if let Some(delay) = config.tunnel_open_delay
        && delay > MAXIMUM_TUNNEL_OPEN_DELAY_MINUTES
    {
        anyhow::bail!(
            "tunnel_open_delay ({} minutes) must be at most {} minutes",
            delay,
            MAXIMUM_TUNNEL_OPEN_DELAY_MINUTES
        );
    }

    if let Some(target) = config.target_daylight
        && target > MAXIMUM_TARGET_DAYLIGHT_MINUTES
    {
        anyhow::bail!(
            "target_daylight ({} minutes) must be at most {} minutes",
            target,
            MAXIMUM_TARGET_DAYLIGHT_MINUTES
        );
    }

    if let Some(settle) = config.settle_time
        && settle > MAXIMUM_SETTLE_SECONDS
    {
        anyhow::bail!(
            "settle_time ({} s) must be at most {} seconds",
            settle,
            MAXIMUM_SETTLE_SECONDS
        );
    }

    if let Some(ref pulses) = config.pulses {
        for (key, value) in [
            ("coop_open", pulses.coop_open),
            ("coop_close", pulses.coop_close),
            ("tunnel_open", pulses.tunnel_open),
            ("tunnel_close", pulses.tunnel_close),
        ] {
            validate_pulse(key, value)?;
        }
    }

    validate_pins(config)?;

    if let Some(max_bytes) = config.log_max_bytes
        && max_bytes < MINIMUM_LOG_MAX_BYTES
    {
        anyhow::bail!(
            "log_max_bytes ({}) must be at least {} bytes",
            max_bytes,
            MINIMUM_LOG_MAX_BYTES
        );
    }

    if let Some(backups) = config.log_backups
        && !(1..=MAXIMUM_LOG_BACKUPS).contains(&backups)
    {
        anyhow::bail!(
            "log_backups ({}) must be between 1 and {}",
            backups,
            MAXIMUM_LOG_BACKUPS
        );
    }

    if let Some(ref listen) = config.listen {
        listen
            .parse::<SocketAddr>()
            .with_context(|| format!("listen address '{listen}' is not HOST:PORT"))?;
    }

    Ok(())
}

fn validate_pulse(key: &str, seconds: Option<u64>) -> Result<()> {
    if let Some(seconds) = seconds
        && !(1..=MAXIMUM_PULSE_SECONDS).contains(&seconds)
    {
        anyhow::bail!(
            "pulses.{} ({} s) must be between 1 and {} seconds",
            key,
            seconds,
            MAXIMUM_PULSE_SECONDS
        );
    }
    Ok(())
}

/// Each output channel drives exactly one relay.
fn validate_pins(config: &Config) -> Result<()> {
    let mut seen: HashMap<u8, &str> = HashMap::new();
    for (name, channel) in config.pins().channels() {
        if let Some(other) = seen.insert(channel, name) {
            anyhow::bail!("{name} and {other} are both assigned to output channel {channel}");
        }
    }
    Ok(())
}
