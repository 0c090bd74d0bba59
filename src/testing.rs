//! Test doubles shared by unit and integration tests.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::actuator::{Command, CommandSink, Outcome};
use crate::common::utils::local_datetime;
use crate::geo::{SolarEvent, SolarSource};
use crate::time_source::TimeSource;

/// Solar source that answers with the same local times every day.
pub struct FixedSolarSource {
    tz: Tz,
    sunrise: NaiveTime,
    dusk: NaiveTime,
    sunset: NaiveTime,
    available: AtomicBool,
}

impl FixedSolarSource {
    /// Times as "HH:MM".
    pub fn new(tz: Tz, sunrise: &str, dusk: &str, sunset: &str) -> Self {
        let parse = |s: &str| NaiveTime::parse_from_str(s, "%H:%M").unwrap_or(NaiveTime::MIN);
        Self {
            tz,
            sunrise: parse(sunrise),
            dusk: parse(dusk),
            sunset: parse(sunset),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing the source (or getting it back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl SolarSource for FixedSolarSource {
    fn event_time(&self, event: SolarEvent, date: NaiveDate) -> Result<DateTime<Utc>> {
        if !self.available.load(Ordering::SeqCst) {
            anyhow::bail!("solar source unavailable");
        }
        let time = match event {
            SolarEvent::Sunrise => self.sunrise,
            SolarEvent::Dusk => self.dusk,
            SolarEvent::Sunset => self.sunset,
        };
        Ok(local_datetime(&self.tz, date, time).with_timezone(&Utc))
    }
}

impl SolarSource for Arc<FixedSolarSource> {
    fn event_time(&self, event: SolarEvent, date: NaiveDate) -> Result<DateTime<Utc>> {
        self.as_ref().event_time(event, date)
    }
}

/// Command sink that records what it was asked to do and when.
pub struct RecordingSink {
    clock: Arc<dyn TimeSource>,
    calls: Mutex<Vec<(Command, DateTime<Utc>)>>,
    panic_on: Option<Command>,
}

impl RecordingSink {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            clock,
            calls: Mutex::new(Vec::new()),
            panic_on: None,
        }
    }

    /// Panic whenever `command` is executed.
    pub fn panicking_on(mut self, command: Command) -> Self {
        self.panic_on = Some(command);
        self
    }

    pub fn calls(&self) -> Vec<(Command, DateTime<Utc>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.calls().into_iter().map(|(command, _)| command).collect()
    }
}

impl CommandSink for RecordingSink {
    fn execute(&self, command: Command) -> Outcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((command, self.clock.now()));
        }
        if self.panic_on == Some(command) {
            panic!("simulated fault in {command}");
        }
        Outcome::Completed
    }
}
