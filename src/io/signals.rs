//! Unix signal handling.
//!
//! SIGINT, SIGTERM and SIGHUP all mean "shut down": the handler thread clears
//! the shared running flag and the scheduler loop, IPC listener and web server
//! notice it on their next poll.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM},
    iterator::{Handle, Signals},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Signal handling state shared between threads.
pub struct SignalState {
    /// Cleared once a shutdown signal arrives.
    pub running: Arc<AtomicBool>,
    handle: Handle,
}

impl SignalState {
    /// Stop the handler thread (used on normal shutdown).
    pub fn close(&self) {
        self.handle.close();
    }
}

pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to register signal handlers")?;
    let handle = signals.handle();

    let running_clone = running.clone();
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                let name = match sig {
                    SIGINT => "SIGINT (Ctrl+C)",
                    SIGTERM => "SIGTERM",
                    SIGHUP => "SIGHUP",
                    _ => "unexpected signal",
                };
                if debug_enabled {
                    log_debug!("Received {name}");
                }
                if running_clone.swap(false, Ordering::SeqCst) {
                    log_pipe!();
                    log_info!("Received {name}, shutting down...");
                }
            }
        })
        .context("failed to spawn signal handler thread")?;

    Ok(SignalState { running, handle })
}
