//! The coop's fixed set of actuators.

use std::collections::HashMap;
use std::time::Duration;

use super::{Actuator, ActuatorCoordinator, Command, CommandSink, Drive, Outcome};
use crate::common::constants::*;
use crate::config::Config;
use crate::hardware::Level;

pub struct Enclosure {
    coordinator: ActuatorCoordinator,
    actuators: HashMap<Command, Actuator>,
}

impl Enclosure {
    /// Build one actuator per command from the pin and pulse settings.
    pub fn new(config: &Config, coordinator: ActuatorCoordinator) -> Self {
        let pins = config.pins();
        let pulses = config.pulses();
        let guard_levels = config
            .guard_level_devices
            .unwrap_or(DEFAULT_GUARD_LEVEL_DEVICES);

        let door = |component: &'static str,
                    action: &'static str,
                    channel: u8,
                    seconds: Option<u64>,
                    default: u64| Actuator {
            component,
            action,
            channel,
            drive: Drive::Pulse(Duration::from_secs(seconds.unwrap_or(default))),
            guarded: true,
        };
        let switch = |component: &'static str, action: &'static str, channel: u8, level: Level| Actuator {
            component,
            action,
            channel,
            drive: Drive::Set(level),
            guarded: guard_levels,
        };

        let door_open = pins.door_open.unwrap_or(DEFAULT_PIN_DOOR_OPEN);
        let door_close = pins.door_close.unwrap_or(DEFAULT_PIN_DOOR_CLOSE);
        let tunnel_open = pins.tunnel_open.unwrap_or(DEFAULT_PIN_TUNNEL_OPEN);
        let tunnel_close = pins.tunnel_close.unwrap_or(DEFAULT_PIN_TUNNEL_CLOSE);
        let ir = pins.ir.unwrap_or(DEFAULT_PIN_IR);
        let light = pins.coop_light.unwrap_or(DEFAULT_PIN_COOP_LIGHT);

        let actuators = HashMap::from([
            (
                Command::OpenCoop,
                door("coop", "open", door_open, pulses.coop_open, DEFAULT_PULSE_COOP_OPEN),
            ),
            (
                Command::CloseCoop,
                door("coop", "close", door_close, pulses.coop_close, DEFAULT_PULSE_COOP_CLOSE),
            ),
            (
                Command::OpenTunnel,
                door("tunnel", "open", tunnel_open, pulses.tunnel_open, DEFAULT_PULSE_TUNNEL_OPEN),
            ),
            (
                Command::CloseTunnel,
                door(
                    "tunnel",
                    "close",
                    tunnel_close,
                    pulses.tunnel_close,
                    DEFAULT_PULSE_TUNNEL_CLOSE,
                ),
            ),
            (Command::IrOn, switch("IR light", "on", ir, Level::Active)),
            (Command::IrOff, switch("IR light", "off", ir, Level::Inactive)),
            (Command::LightOn, switch("Coop light", "on", light, Level::Active)),
            (Command::LightOff, switch("Coop light", "off", light, Level::Inactive)),
        ]);

        Self {
            coordinator,
            actuators,
        }
    }

    pub fn actuator(&self, command: Command) -> Option<&Actuator> {
        self.actuators.get(&command)
    }

    pub fn coordinator(&self) -> &ActuatorCoordinator {
        &self.coordinator
    }
}

impl CommandSink for Enclosure {
    fn execute(&self, command: Command) -> Outcome {
        match self.actuators.get(&command) {
            Some(actuator) => self.coordinator.run(actuator),
            None => {
                log_error!("No actuator configured for {command}");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PinConfig, PulseConfig};
    use crate::event_log::EventLog;
    use crate::hardware::DryRunOutput;
    use crate::time_source::ManualTimeSource;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_every_command_has_an_actuator() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let events = Arc::new(
            EventLog::open(&dir.path().join("coop.log"), 1_000_000, 2, chrono_tz::UTC, clock.clone())
                .unwrap(),
        );
        let output = Arc::new(DryRunOutput::new());
        let config = Config {
            pins: Some(PinConfig {
                coop_light: Some(19),
                ..Default::default()
            }),
            pulses: Some(PulseConfig {
                coop_close: Some(45),
                ..Default::default()
            }),
            ..Default::default()
        };
        let enclosure = Enclosure::new(
            &config,
            ActuatorCoordinator::new(output.clone(), events, clock, Duration::from_secs(1)),
        );

        for command in Command::ALL {
            assert!(enclosure.actuator(command).is_some(), "{command}");
        }

        let close = enclosure.actuator(Command::CloseCoop).unwrap();
        assert_eq!(close.channel, DEFAULT_PIN_DOOR_CLOSE);
        assert_eq!(close.drive, Drive::Pulse(Duration::from_secs(45)));
        assert_eq!(close.name(), "coop-close");

        let light = enclosure.actuator(Command::LightOn).unwrap();
        assert_eq!(light.channel, 19);
        assert!(!light.guarded);

        assert_eq!(enclosure.execute(Command::LightOn), Outcome::Completed);
        assert_eq!(output.level(19), Some(Level::Active));
    }
}
