//! Unix socket server for the control socket.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use super::{IpcRequest, IpcResponse};
use crate::actuator::Command;
use crate::common::constants::{IPC_CLIENT_TIMEOUT, IPC_POLL_INTERVAL};
use crate::common::utils::private_path;
use crate::gateway::{OverrideGateway, Source};

pub(super) struct IpcSocketServer {
    socket_path: PathBuf,
    listener: UnixListener,
    gateway: Arc<OverrideGateway>,
}

impl IpcSocketServer {
    pub(super) fn new(socket_path: PathBuf, gateway: Arc<OverrideGateway>) -> Result<Self> {
        // A socket left by a crashed daemon would make bind fail
        if socket_path.exists() {
            std::fs::remove_file(&socket_path).with_context(|| {
                format!("Failed to remove existing socket {}", private_path(&socket_path))
            })?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create socket directory {}", private_path(parent))
            })?;
        }

        let listener = UnixListener::bind(&socket_path).with_context(|| {
            format!("Failed to bind Unix socket {}", private_path(&socket_path))
        })?;
        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking mode")?;

        Ok(Self {
            socket_path,
            listener,
            gateway,
        })
    }

    pub(super) fn run(self, running: &AtomicBool, debug_enabled: bool) -> Result<()> {
        if debug_enabled {
            log_debug!("Control socket listening on {}", private_path(&self.socket_path));
        }

        while running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, _)) => self.spawn_client(stream, debug_enabled),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(IPC_POLL_INTERVAL);
                }
                Err(e) => {
                    log_warning!("Control socket accept failed: {e}");
                    thread::sleep(IPC_POLL_INTERVAL);
                }
            }
        }

        if debug_enabled {
            log_debug!("Control socket shutting down");
        }
        self.cleanup()
    }

    /// Each request gets its own thread: a door pulse blocks for up to a minute.
    fn spawn_client(&self, stream: UnixStream, debug_enabled: bool) {
        let gateway = Arc::clone(&self.gateway);
        let spawned = thread::Builder::new()
            .name("ipc-client".to_string())
            .spawn(move || {
                if let Err(e) = serve_client(stream, &gateway)
                    && debug_enabled
                {
                    log_debug!("Control client error: {e:#}");
                }
            });
        if let Err(e) = spawned {
            log_error!("Failed to spawn control client thread: {e}");
        }
    }

    fn cleanup(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove socket file {}", private_path(&self.socket_path))
            })?;
        }
        Ok(())
    }
}

fn serve_client(stream: UnixStream, gateway: &OverrideGateway) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(IPC_CLIENT_TIMEOUT))?;

    let mut line = String::new();
    BufReader::new(stream.try_clone()?)
        .read_line(&mut line)
        .context("Failed to read request")?;

    let response = match parse_request(&line) {
        Ok(command) => IpcResponse::Reply(gateway.handle(command, Source::Cli)),
        Err(error) => IpcResponse::Error { error },
    };

    let mut writer = stream;
    let mut body = serde_json::to_string(&response)?;
    body.push('\n');
    writer.write_all(body.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn parse_request(line: &str) -> Result<Command, String> {
    let request: IpcRequest =
        serde_json::from_str(line.trim()).map_err(|e| format!("Malformed request: {e}"))?;
    request.command.parse()
}
