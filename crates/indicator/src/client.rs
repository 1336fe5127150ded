use std::{
    io::{Read, Write},
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use anyhow::{bail, Context, Result};

use crate::{
    daemon_response::DaemonResponse,
    opts::{ActionClientOnly, ActionWithServer},
    paths::IndicatorPaths,
    wire,
};

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(200);

pub fn handle_client_only_action(paths: &IndicatorPaths, action: ActionClientOnly) -> Result<()> {
    match action {
        ActionClientOnly::Logs => follow_logs(paths),
    }
}

/// Follow the daemon's log file until interrupted.
pub fn follow_logs(paths: &IndicatorPaths) -> Result<()> {
    let log_file = paths.get_log_file();
    if !log_file.exists() {
        bail!("No log file at {}, the daemon was never started in the background", log_file.display());
    }
    let status = std::process::Command::new("tail")
        .arg("-f")
        .arg(log_file)
        .stdin(Stdio::null())
        .status()
        .context("Failed to run tail on the log file")?;
    log::debug!("tail exited with {}", status);
    Ok(())
}

/// A daemon that answered a ping on the IPC socket of a config dir.
#[derive(Debug)]
pub struct DaemonClient {
    socket: PathBuf,
}

impl DaemonClient {
    /// Ping the daemon up to `attempts` times, pausing between tries while it starts up.
    pub fn connect(paths: &IndicatorPaths, attempts: usize) -> Result<Self> {
        let socket = paths.get_ipc_socket_file();
        for attempt in 1..=attempts {
            match exchange(socket, &ActionWithServer::Ping) {
                Ok(_) => return Ok(DaemonClient { socket: socket.to_path_buf() }),
                Err(err) => log::debug!("Ping {}/{} on {} failed: {:#}", attempt, attempts, socket.display(), err),
            }
            if attempt < attempts {
                std::thread::sleep(CONNECT_RETRY_DELAY);
            }
        }
        bail!("No indicator daemon is listening on {}", socket.display())
    }

    pub fn is_running(paths: &IndicatorPaths) -> bool {
        exchange(paths.get_ipc_socket_file(), &ActionWithServer::Ping).is_ok()
    }

    /// Send one command. `Ok(None)` means the daemon took the command but had nothing to say.
    pub fn request(&self, action: &ActionWithServer) -> Result<Option<DaemonResponse>> {
        exchange(&self.socket, action).with_context(|| format!("Error while forwarding {:?} to the daemon", action))
    }
}

fn exchange(socket: &Path, action: &ActionWithServer) -> Result<Option<DaemonResponse>> {
    let mut stream = UnixStream::connect(socket).with_context(|| format!("Failed to connect to {}", socket.display()))?;
    stream.write_all(&wire::encode_request(action)?).context("Failed to write command to IPC stream")?;

    stream.set_read_timeout(Some(wire::RESPONSE_TIMEOUT)).context("Failed to set read timeout")?;
    let mut answer = Vec::new();
    stream.read_to_end(&mut answer).context("Error reading response from the daemon")?;
    wire::decode_response(&answer)
}
