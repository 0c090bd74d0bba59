//! Shared busy guard and actuation sequencing.
//!
//! All guarded actuators share one flag: while a door motor runs (plus a
//! short settle period) every other guarded request is rejected on the spot.
//! A rejected request is logged and dropped, never queued or retried, so a
//! button mashed during a door run cannot stack up motor pulses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{Actuator, Drive, Outcome};
use crate::event_log::EventLog;
use crate::hardware::{Level, OutputPort};
use crate::time_source::TimeSource;

/// Held while a guarded actuation is in progress; releases on drop.
#[must_use]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct ActuatorCoordinator {
    busy: AtomicBool,
    output: Arc<dyn OutputPort>,
    events: Arc<EventLog>,
    clock: Arc<dyn TimeSource>,
    settle: Duration,
}

impl ActuatorCoordinator {
    pub fn new(
        output: Arc<dyn OutputPort>,
        events: Arc<EventLog>,
        clock: Arc<dyn TimeSource>,
        settle: Duration,
    ) -> Self {
        Self {
            busy: AtomicBool::new(false),
            output,
            events,
            clock,
            settle,
        }
    }

    /// Take the guard if nobody holds it. Never blocks.
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Carry out one actuation. Writes exactly one event log line.
    pub fn run(&self, actuator: &Actuator) -> Outcome {
        match actuator.drive {
            Drive::Pulse(duration) => self.run_timed(actuator, duration),
            Drive::Set(level) => self.set_level(actuator, level),
        }
    }

    fn run_timed(&self, actuator: &Actuator, duration: Duration) -> Outcome {
        let name = actuator.name();
        let Some(_guard) = self.try_acquire() else {
            self.events.record(&format!("DOOR IN USE - DID NOT RUN {name}"));
            return Outcome::Skipped;
        };

        let started = self.output.set_output(actuator.channel, Level::Active);
        if started.is_ok() {
            self.clock.sleep(duration);
        }
        // Always try to release the relay, even if energising reported an error
        let stopped = self.output.set_output(actuator.channel, Level::Inactive);

        let outcome = match started.and(stopped) {
            Ok(()) => {
                self.events.record(&name);
                Outcome::Completed
            }
            Err(e) => {
                log_error!("{name} on channel {}: {e:#}", actuator.channel);
                self.events.record(&format!("{name} FAILED - {e}"));
                Outcome::Failed
            }
        };

        self.clock.sleep(self.settle);
        outcome
    }

    fn set_level(&self, actuator: &Actuator, level: Level) -> Outcome {
        let name = actuator.name();
        let _guard = if actuator.guarded {
            match self.try_acquire() {
                Some(guard) => Some(guard),
                None => {
                    self.events.record(&format!("DOOR IN USE - DID NOT RUN {name}"));
                    return Outcome::Skipped;
                }
            }
        } else {
            None
        };

        match self.output.set_output(actuator.channel, level) {
            Ok(()) => {
                self.events.record(&name);
                Outcome::Completed
            }
            Err(e) => {
                log_error!("{name} on channel {}: {e:#}", actuator.channel);
                self.events.record(&format!("{name} FAILED - {e}"));
                Outcome::Failed
            }
        }
    }
}
