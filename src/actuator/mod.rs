//! Physical actuators and the commands that drive them.
//!
//! A [`Command`] is what the outside world asks for ("open the coop"). The
//! [`Enclosure`] maps each command to an [`Actuator`] (which channel, pulsed or
//! level-set, guarded or not) and hands it to the [`ActuatorCoordinator`],
//! which owns the shared busy guard and the output port.
//!
//! ```text
//!   DailyScheduler ──┐
//!   web handler  ────┼──▶ CommandSink::execute ──▶ ActuatorCoordinator ──▶ OutputPort
//!   IPC listener ────┘                                    │
//!                                                         └──▶ EventLog
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::hardware::Level;

pub mod coordinator;
pub mod enclosure;

pub use coordinator::{ActuatorCoordinator, BusyGuard};
pub use enclosure::Enclosure;

/// Every operation the coop can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    OpenCoop,
    CloseCoop,
    OpenTunnel,
    CloseTunnel,
    IrOn,
    IrOff,
    LightOn,
    LightOff,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::OpenCoop,
        Command::CloseCoop,
        Command::OpenTunnel,
        Command::CloseTunnel,
        Command::IrOn,
        Command::IrOff,
        Command::LightOn,
        Command::LightOff,
    ];

    /// Kebab-case name used on the command line and in IPC messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::OpenCoop => "coop-open",
            Command::CloseCoop => "coop-close",
            Command::OpenTunnel => "tunnel-open",
            Command::CloseTunnel => "tunnel-close",
            Command::IrOn => "ir-on",
            Command::IrOff => "ir-off",
            Command::LightOn => "light-on",
            Command::LightOff => "light-off",
        }
    }

    /// Scheduled job label.
    pub fn label(&self) -> &'static str {
        match self {
            Command::OpenCoop => "Coop Open",
            Command::CloseCoop => "Coop Close",
            Command::OpenTunnel => "Tunnel Open",
            Command::CloseTunnel => "Tunnel Close",
            Command::IrOn => "IR On",
            Command::IrOff => "IR Off",
            Command::LightOn => "Coop Light On",
            Command::LightOff => "Coop Light Off",
        }
    }

    /// Path segment of the manual override route.
    pub fn route(&self) -> &'static str {
        match self {
            Command::OpenCoop => "manualcoopopen",
            Command::CloseCoop => "manualcoopclose",
            Command::OpenTunnel => "manualtunnelopen",
            Command::CloseTunnel => "manualtunnelclose",
            Command::IrOn => "manualiron",
            Command::IrOff => "manualiroff",
            Command::LightOn => "manualcooplighton",
            Command::LightOff => "manualcooplightoff",
        }
    }

    /// Short reply returned to a manual caller.
    pub fn confirmation(&self) -> &'static str {
        match self {
            Command::OpenCoop => "Opened coop",
            Command::CloseCoop => "Closed coop",
            Command::OpenTunnel => "Opened tunnel",
            Command::CloseTunnel => "Closed tunnel",
            Command::IrOn => "Turned IR on",
            Command::IrOff => "Turned IR off",
            Command::LightOn => "Turned light on",
            Command::LightOff => "Turned light off",
        }
    }

    /// Event log wording for a manual trigger, completed with the source.
    pub fn manual_description(&self) -> &'static str {
        match self {
            Command::OpenCoop => "Coop Opened",
            Command::CloseCoop => "Coop Closed",
            Command::OpenTunnel => "Tunnel Opened",
            Command::CloseTunnel => "Tunnel Closed",
            Command::IrOn => "IR on",
            Command::IrOff => "IR off",
            Command::LightOn => "Coop light on",
            Command::LightOff => "Coop light off",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Command::ALL.iter().map(|c| c.as_str()).collect();
                format!("Unknown command '{s}'. Expected one of: {}", known.join(", "))
            })
    }
}

/// How an actuator moves its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    /// Energise for a fixed time, then release. Door motors.
    Pulse(Duration),
    /// Latch at a level. Lights and IR.
    Set(Level),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actuator {
    pub component: &'static str,
    pub action: &'static str,
    pub channel: u8,
    pub drive: Drive,
    /// Whether this actuator competes for the shared busy guard.
    pub guarded: bool,
}

impl Actuator {
    /// Identity used in the event log, e.g. `coop-open` or `IR light-on`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.component, self.action)
    }
}

/// Result of one actuation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    /// The busy guard was held; nothing was touched.
    Skipped,
    /// The output port reported an error.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        }
    }
}

/// Anything that can carry out a command.
///
/// Implemented by [`Enclosure`]; the scheduler and override gateway only see
/// this trait.
pub trait CommandSink: Send + Sync {
    fn execute(&self, command: Command) -> Outcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_parse_back() {
        for command in Command::ALL {
            assert_eq!(command.as_str().parse::<Command>(), Ok(command));
        }
        let err = "coop-explode".parse::<Command>().unwrap_err();
        assert!(err.contains("coop-open"));
    }

    #[test]
    fn test_routes_are_unique() {
        let mut routes: Vec<&str> = Command::ALL.iter().map(|c| c.route()).collect();
        routes.sort_unstable();
        routes.dedup();
        assert_eq!(routes.len(), Command::ALL.len());
    }
}
