//! Solar event resolution with fallback.
//!
//! [`SolarTimeResolver::resolve`] never fails. A live calculation that errors,
//! panics or lands on the wrong calendar day is replaced by the last good
//! time of day for that event (initially the configured fallback) on the
//! requested date, and the result is marked [`Provenance::Fallback`].

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

use crate::common::utils::local_datetime;
use crate::config::Config;

/// The solar events the schedule is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolarEvent {
    Sunrise,
    /// Civil dusk, the sun 6° below the horizon.
    Dusk,
    Sunset,
}

impl SolarEvent {
    pub const ALL: [SolarEvent; 3] = [SolarEvent::Sunrise, SolarEvent::Dusk, SolarEvent::Sunset];

    pub fn as_str(&self) -> &'static str {
        match self {
            SolarEvent::Sunrise => "sunrise",
            SolarEvent::Dusk => "dusk",
            SolarEvent::Sunset => "sunset",
        }
    }
}

impl fmt::Display for SolarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a resolved time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTime {
    pub at: DateTime<Tz>,
    pub provenance: Provenance,
}

impl ResolvedTime {
    pub fn is_live(&self) -> bool {
        self.provenance == Provenance::Live
    }
}

/// All events for one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarTimes {
    pub date: NaiveDate,
    pub sunrise: ResolvedTime,
    pub dusk: ResolvedTime,
    pub sunset: ResolvedTime,
}

/// Time of day used for each event when a live calculation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackTimes {
    pub sunrise: NaiveTime,
    pub dusk: NaiveTime,
    pub sunset: NaiveTime,
}

impl FallbackTimes {
    pub fn get(&self, event: SolarEvent) -> NaiveTime {
        match event {
            SolarEvent::Sunrise => self.sunrise,
            SolarEvent::Dusk => self.dusk,
            SolarEvent::Sunset => self.sunset,
        }
    }

    fn set(&mut self, event: SolarEvent, time: NaiveTime) {
        match event {
            SolarEvent::Sunrise => self.sunrise = time,
            SolarEvent::Dusk => self.dusk = time,
            SolarEvent::Sunset => self.sunset = time,
        }
    }
}

/// Anything that can produce the UTC instant of a solar event on a date.
pub trait SolarSource: Send + Sync {
    fn event_time(&self, event: SolarEvent, date: NaiveDate) -> Result<DateTime<Utc>>;
}

/// NOAA-style calculation from the `sunrise` crate.
pub struct AstronomicalSource {
    latitude: f64,
    longitude: f64,
}

impl AstronomicalSource {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl SolarSource for AstronomicalSource {
    fn event_time(&self, event: SolarEvent, date: NaiveDate) -> Result<DateTime<Utc>> {
        use sunrise::{Coordinates, DawnType, SolarDay};

        let coord = Coordinates::new(self.latitude, self.longitude).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid coordinates {:.4}°, {:.4}°",
                self.latitude,
                self.longitude
            )
        })?;

        let kind = match event {
            SolarEvent::Sunrise => sunrise::SolarEvent::Sunrise,
            SolarEvent::Dusk => sunrise::SolarEvent::Dusk(DawnType::Civil),
            SolarEvent::Sunset => sunrise::SolarEvent::Sunset,
        };

        // Polar day/night can push the underlying arithmetic out of range
        std::panic::catch_unwind(|| SolarDay::new(coord, date).event_time(kind))
            .map_err(|_| anyhow::anyhow!("Solar calculation for {event} on {date} did not converge"))
    }
}

pub struct SolarTimeResolver {
    source: Box<dyn SolarSource>,
    tz: Tz,
    cache: Mutex<FallbackTimes>,
}

impl SolarTimeResolver {
    pub fn new(source: Box<dyn SolarSource>, tz: Tz, fallback: FallbackTimes) -> Self {
        Self {
            source,
            tz,
            cache: Mutex::new(fallback),
        }
    }

    /// Astronomical source at the configured location, with configured fallbacks.
    pub fn from_config(config: &Config) -> Self {
        let (latitude, longitude) = config.coordinates();
        Self::new(
            Box::new(AstronomicalSource::new(latitude, longitude)),
            config.timezone(),
            FallbackTimes {
                sunrise: config.fallback_sunrise(),
                dusk: config.fallback_dusk(),
                sunset: config.fallback_sunset(),
            },
        )
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Resolve one event for `date` in the coop's timezone.
    pub fn resolve(&self, event: SolarEvent, date: NaiveDate) -> ResolvedTime {
        match self.live_time(event, date) {
            Ok(at) => {
                if let Ok(mut cache) = self.cache.lock() {
                    cache.set(event, at.time());
                }
                ResolvedTime {
                    at,
                    provenance: Provenance::Live,
                }
            }
            Err(e) => {
                let time = self.fallback_times().get(event);
                log_warning!(
                    "Could not calculate {event} for {date}: {e}. Using {}",
                    time.format("%H:%M")
                );
                ResolvedTime {
                    at: local_datetime(&self.tz, date, time),
                    provenance: Provenance::Fallback,
                }
            }
        }
    }

    pub fn resolve_day(&self, date: NaiveDate) -> SolarTimes {
        SolarTimes {
            date,
            sunrise: self.resolve(SolarEvent::Sunrise, date),
            dusk: self.resolve(SolarEvent::Dusk, date),
            sunset: self.resolve(SolarEvent::Sunset, date),
        }
    }

    /// Times of day a failed calculation would currently fall back to.
    pub fn fallback_times(&self) -> FallbackTimes {
        match self.cache.lock() {
            Ok(cache) => *cache,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn live_time(&self, event: SolarEvent, date: NaiveDate) -> Result<DateTime<Tz>> {
        let at = self
            .source
            .event_time(event, date)?
            .with_timezone(&self.tz);
        if at.date_naive() != date {
            anyhow::bail!(
                "{event} resolved to {} which is not on the requested day",
                at.format("%Y-%m-%d %H:%M")
            );
        }
        Ok(at)
    }
}

/// Print resolved times as an indented block.
pub fn log_solar_times(times: &SolarTimes) {
    for (event, resolved) in [
        (SolarEvent::Sunrise, times.sunrise),
        (SolarEvent::Dusk, times.dusk),
        (SolarEvent::Sunset, times.sunset),
    ] {
        log_indented!(
            "{:>8}: {} ({})",
            event.as_str(),
            resolved.at.format("%H:%M:%S"),
            resolved.provenance.as_str()
        );
    }
}
