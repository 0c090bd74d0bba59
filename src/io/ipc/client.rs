//! Client side of the control socket.

use anyhow::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use super::{IpcRequest, IpcResponse, socket_path};
use crate::actuator::Command;
use crate::common::constants::IPC_CLIENT_TIMEOUT;
use crate::common::utils::private_path;
use crate::gateway::OverrideReply;

pub struct IpcClient {
    stream: UnixStream,
}

impl IpcClient {
    /// Connect to the running daemon's socket.
    pub fn connect() -> Result<Self> {
        Self::connect_to(&socket_path())
    }

    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).with_context(|| {
            format!(
                "Failed to connect to coopd at {}. Is coopd running?",
                private_path(path)
            )
        })?;
        // Long enough for the slowest door pulse
        stream
            .set_read_timeout(Some(IPC_CLIENT_TIMEOUT))
            .context("Failed to set read timeout on control socket")?;
        Ok(Self { stream })
    }

    /// Ask the daemon to run `command` and wait for the outcome.
    pub fn send(mut self, command: Command) -> Result<OverrideReply> {
        let mut request = serde_json::to_string(&IpcRequest {
            command: command.as_str().to_string(),
        })?;
        request.push('\n');
        self.stream
            .write_all(request.as_bytes())
            .context("Failed to send request to coopd")?;

        let mut line = String::new();
        BufReader::new(&self.stream)
            .read_line(&mut line)
            .context("Failed to read reply from coopd")?;
        if line.trim().is_empty() {
            bail!("coopd closed the connection without replying");
        }

        match serde_json::from_str::<IpcResponse>(line.trim())
            .with_context(|| format!("Failed to parse reply: {}", line.trim()))?
        {
            IpcResponse::Reply(reply) => Ok(reply),
            IpcResponse::Error { error } => bail!("coopd rejected the request: {error}"),
        }
    }
}
