//! Manual override entry point shared by the web buttons and `coopd trigger`.
//!
//! Requests bypass the scheduler and go straight to the [`CommandSink`], so a
//! manual door run competes for the same busy guard as a scheduled one.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::actuator::{Command, CommandSink, Outcome};
use crate::event_log::EventLog;

/// Where a manual request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Web,
    Cli,
}

impl Source {
    fn phrase(&self) -> &'static str {
        match self {
            Source::Web => "via web button",
            Source::Cli => "via command line",
        }
    }
}

/// What the caller gets back: a short human string plus the raw outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideReply {
    pub result: String,
    pub outcome: Outcome,
}

pub struct OverrideGateway {
    sink: Arc<dyn CommandSink>,
    events: Arc<EventLog>,
}

impl OverrideGateway {
    pub fn new(sink: Arc<dyn CommandSink>, events: Arc<EventLog>) -> Self {
        Self { sink, events }
    }

    /// Run `command` now. Blocks for the length of a pulse.
    pub fn handle(&self, command: Command, source: Source) -> OverrideReply {
        self.events.record(&format!(
            "{} {}",
            command.manual_description(),
            source.phrase()
        ));

        let outcome = self.sink.execute(command);
        let result = match outcome {
            Outcome::Completed => command.confirmation().to_string(),
            Outcome::Skipped => format!("Door in use - {} did not run", command.label()),
            Outcome::Failed => format!("{} failed - see the event log", command.label()),
        };
        OverrideReply { result, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ActuatorCoordinator, Enclosure};
    use crate::config::Config;
    use crate::hardware::dry_run::DryRunOutput;
    use crate::time_source::{ManualTimeSource, TimeSource};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn fixture() -> (tempfile::TempDir, Arc<Enclosure>, Arc<EventLog>) {
        let dir = tempdir().unwrap();
        let clock: Arc<dyn TimeSource> = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap(),
        ));
        let events = Arc::new(
            EventLog::open(
                &dir.path().join("coop.log"),
                1_000_000,
                2,
                chrono_tz::US::Pacific,
                clock.clone(),
            )
            .unwrap(),
        );
        let coordinator = ActuatorCoordinator::new(
            Arc::new(DryRunOutput::new()),
            events.clone(),
            clock,
            std::time::Duration::from_secs(1),
        );
        let enclosure = Arc::new(Enclosure::new(&Config::default(), coordinator));
        (dir, enclosure, events)
    }

    #[test]
    fn test_web_request_runs_and_is_logged() {
        let (_dir, enclosure, events) = fixture();
        let gateway = OverrideGateway::new(enclosure, events.clone());

        let reply = gateway.handle(Command::OpenCoop, Source::Web);
        assert_eq!(reply.result, "Opened coop");
        assert_eq!(reply.outcome, Outcome::Completed);

        let log = std::fs::read_to_string(events.path()).unwrap();
        assert!(log.contains(" - Coop Opened via web button\n"));
        assert!(log.contains(" - coop-open\n"));
    }

    #[test]
    fn test_busy_guard_rejects_manual_door() {
        let (_dir, enclosure, events) = fixture();
        let gateway = OverrideGateway::new(enclosure.clone(), events.clone());

        let _held = enclosure.coordinator().try_acquire().unwrap();
        let reply = gateway.handle(Command::CloseTunnel, Source::Cli);
        assert_eq!(reply.outcome, Outcome::Skipped);
        assert!(reply.result.contains("did not run"));

        let log = std::fs::read_to_string(events.path()).unwrap();
        assert!(log.contains("Tunnel Closed via command line"));
        assert!(log.contains("DOOR IN USE - DID NOT RUN tunnel-close"));
    }

    #[test]
    fn test_level_devices_ignore_busy_guard() {
        let (_dir, enclosure, events) = fixture();
        let gateway = OverrideGateway::new(enclosure.clone(), events);

        let _held = enclosure.coordinator().try_acquire().unwrap();
        let reply = gateway.handle(Command::IrOn, Source::Web);
        assert_eq!(reply.result, "Turned IR on");
    }
}
