//! Output channel abstraction for the relay board.
//!
//! Everything above this module speaks in logical levels: [`Level::Active`]
//! energises a relay, [`Level::Inactive`] releases it. Each backend maps that
//! to electrical values itself, so the active-low wiring of the coop's relay
//! board is a backend setting rather than something actuators need to know.
//!
//! ## Backends
//!
//! - [`sysfs::SysfsGpio`]: Linux sysfs GPIO under `/sys/class/gpio`
//! - [`dry_run::DryRunOutput`]: in-memory levels, for bench runs and tests

use anyhow::Result;
use std::fmt;
use std::sync::Arc;

use crate::config::{Config, GpioBackend};

pub mod dry_run;
pub mod sysfs;

pub use dry_run::DryRunOutput;
pub use sysfs::SysfsGpio;

/// Logical output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Active,
    Inactive,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Active => f.write_str("active"),
            Level::Inactive => f.write_str("inactive"),
        }
    }
}

/// A bank of digital outputs addressed by channel number.
///
/// Implementations are shared between the scheduler thread and request
/// handlers, so both methods take `&self`.
pub trait OutputPort: Send + Sync {
    /// Prepare a channel for output. Called once per channel at startup.
    fn configure_output(&self, channel: u8) -> Result<()>;

    fn set_output(&self, channel: u8, level: Level) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Create the output backend selected in the configuration.
pub fn create_output(config: &Config) -> Arc<dyn OutputPort> {
    match config.gpio_backend() {
        GpioBackend::Sysfs => Arc::new(SysfsGpio::new(
            config.gpio_root(),
            config.active_low.unwrap_or(crate::common::constants::DEFAULT_ACTIVE_LOW),
        )),
        GpioBackend::DryRun => Arc::new(DryRunOutput::new()),
    }
}

/// Configure every channel as an output and drive it inactive.
///
/// A channel that fails is reported and skipped; the remaining channels are
/// still initialised so one bad relay does not take the whole coop offline.
pub fn initialize_outputs(output: &dyn OutputPort, channels: &[(&'static str, u8)]) -> usize {
    log_block_start!("Initialising {} outputs ({})", channels.len(), output.backend_name());
    let mut failures = 0;
    for &(name, channel) in channels {
        let result = output
            .configure_output(channel)
            .and_then(|()| output.set_output(channel, Level::Inactive));
        match result {
            Ok(()) => log_indented!("{name:<12} channel {channel:>2} off"),
            Err(e) => {
                failures += 1;
                log_error!("{name} (channel {channel}) could not be initialised: {e}");
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_drives_all_channels_inactive() {
        let output = DryRunOutput::new();
        let channels = [("Door Open", 24), ("Door Close", 23), ("Coop LED", 26)];
        let failures = initialize_outputs(&output, &channels);
        assert_eq!(failures, 0);
        for (_, channel) in channels {
            assert_eq!(output.level(channel), Some(Level::Inactive));
        }
    }

    #[test]
    fn test_create_output_respects_backend() {
        let config = Config {
            gpio_backend: Some(GpioBackend::DryRun),
            ..Default::default()
        };
        assert_eq!(create_output(&config).backend_name(), "dry-run");

        let config = Config::default();
        assert_eq!(create_output(&config).backend_name(), "sysfs");
    }
}
