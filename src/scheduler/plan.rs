//! Turning a day's solar times into actuation jobs.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::actuator::Command;
use crate::common::constants::*;
use crate::config::Config;
use crate::geo::SolarTimes;

/// Schedule-shaping settings taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSettings {
    pub tunnel_open_delay: Duration,
    pub supplemental_lighting: bool,
    pub target_daylight_minutes: i64,
    pub min_light_minutes: i64,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            tunnel_open_delay: Duration::minutes(DEFAULT_TUNNEL_OPEN_DELAY_MINUTES as i64),
            supplemental_lighting: DEFAULT_SUPPLEMENTAL_LIGHTING,
            target_daylight_minutes: DEFAULT_TARGET_DAYLIGHT_MINUTES as i64,
            min_light_minutes: DEFAULT_MIN_LIGHT_MINUTES as i64,
        }
    }
}

impl PlanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tunnel_open_delay: config.tunnel_open_delay(),
            supplemental_lighting: config
                .supplemental_lighting
                .unwrap_or(DEFAULT_SUPPLEMENTAL_LIGHTING),
            target_daylight_minutes: config
                .target_daylight
                .unwrap_or(DEFAULT_TARGET_DAYLIGHT_MINUTES) as i64,
            min_light_minutes: config
                .min_light_duration
                .unwrap_or(DEFAULT_MIN_LIGHT_MINUTES) as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedJob {
    pub command: Command,
    pub fire_at: DateTime<Tz>,
}

/// Minutes of lamp light needed before sunrise to reach the daylight target.
///
/// Whole minutes, truncated toward zero. Negative on days longer than the
/// target.
pub fn supplemental_light_minutes(
    sunrise: DateTime<Tz>,
    sunset: DateTime<Tz>,
    target_minutes: i64,
) -> i64 {
    let daylight_ms = (sunset - sunrise).num_milliseconds();
    (target_minutes * 60_000 - daylight_ms) / 60_000
}

/// The day's jobs in insertion order: doors first, then lighting.
pub fn derive_plan(times: &SolarTimes, settings: &PlanSettings) -> Vec<PlannedJob> {
    let sunrise = times.sunrise.at;
    let dusk = times.dusk.at;

    let mut plan = vec![
        PlannedJob {
            command: Command::OpenCoop,
            fire_at: sunrise,
        },
        PlannedJob {
            command: Command::OpenTunnel,
            fire_at: sunrise + settings.tunnel_open_delay,
        },
        PlannedJob {
            command: Command::CloseCoop,
            fire_at: dusk,
        },
        PlannedJob {
            command: Command::CloseTunnel,
            fire_at: dusk,
        },
    ];

    if settings.supplemental_lighting {
        let needed = supplemental_light_minutes(
            sunrise,
            times.sunset.at,
            settings.target_daylight_minutes,
        );
        if needed > settings.min_light_minutes {
            plan.push(PlannedJob {
                command: Command::LightOn,
                fire_at: sunrise - Duration::minutes(needed),
            });
            plan.push(PlannedJob {
                command: Command::LightOff,
                fire_at: sunrise,
            });
        }
    }

    plan
}
