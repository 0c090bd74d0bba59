//! `coopd trigger <command>`: run one command through the running daemon.
//!
//! The request goes over the control socket rather than touching the GPIO
//! directly, so it is subject to the daemon's busy guard.

use anyhow::Result;

use crate::actuator::{Command, Outcome};
use crate::io::ipc::{IpcClient, socket_path};

/// Send `command` to the daemon and report the outcome.
///
/// Returns the outcome so the caller can choose an exit status.
pub fn handle_trigger_command(command: Command, debug_enabled: bool) -> Result<Outcome> {
    log_version!();
    if debug_enabled {
        log_pipe!();
        log_debug!(
            "Sending {command} to {}",
            crate::common::utils::private_path(&socket_path())
        );
    }

    log_block_start!("Running {} ...", command.label());
    let reply = IpcClient::connect()?.send(command)?;

    match reply.outcome {
        Outcome::Completed => log_decorated!("{}", reply.result),
        Outcome::Skipped => log_warning!("{}", reply.result),
        Outcome::Failed => log_error!("{}", reply.result),
    }
    log_end!();
    Ok(reply.outcome)
}
