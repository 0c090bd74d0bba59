//! Control socket used by `coopd trigger`.
//!
//! The protocol is one JSON object per line over a Unix socket. A client
//! connects, writes a request, and reads exactly one reply:
//!
//! ```text
//! → {"command":"coop-open"}
//! ← {"result":"Opened coop","outcome":"completed"}
//! ← {"error":"Unknown command 'coop-explode'. ..."}
//! ```
//!
//! Requests are handed to the daemon's [`OverrideGateway`], so a command-line
//! override shares the same busy guard as the scheduler and the web buttons.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::common::constants::SOCKET_FILE_NAME;
use crate::common::utils::runtime_dir;
use crate::gateway::{OverrideGateway, OverrideReply};

pub mod client;
mod server;

pub use client::IpcClient;
use server::IpcSocketServer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcRequest {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpcResponse {
    Reply(OverrideReply),
    Error { error: String },
}

/// `$XDG_RUNTIME_DIR/coopd.sock`, or under `/run/user/{uid}`.
pub fn socket_path() -> PathBuf {
    runtime_dir().join(SOCKET_FILE_NAME)
}

/// Listener thread for the control socket.
pub struct IpcServer {
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl IpcServer {
    /// Bind `socket_path` and serve requests until `running` is cleared.
    pub fn start(
        socket_path: PathBuf,
        gateway: Arc<OverrideGateway>,
        running: Arc<AtomicBool>,
        debug_enabled: bool,
    ) -> Result<Self> {
        // Bind before spawning so a bad path is reported to the caller
        let server = IpcSocketServer::new(socket_path, gateway)?;

        let thread_handle = std::thread::Builder::new()
            .name("ipc-server".to_string())
            .spawn(move || {
                if let Err(e) = server.run(&running, debug_enabled) {
                    log_error!("Control socket stopped: {e:#}");
                }
            })
            .context("Failed to spawn IPC server thread")?;

        Ok(Self {
            thread_handle: Some(thread_handle),
        })
    }

    /// Wait for the listener to notice the cleared running flag and exit.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.thread_handle.take() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("IPC server thread panicked"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
