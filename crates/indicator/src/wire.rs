//! Framing of the messages on the IPC socket.
//!
//! A request is a big-endian `u32` byte count followed by the bincode encoded [`ActionWithServer`].
//! The answer is a bincode encoded [`DaemonResponse`] running up to the end of the stream, or nothing at all.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{daemon_response::DaemonResponse, opts::ActionWithServer};

/// Requests larger than this are refused before their payload is read.
pub const MAX_REQUEST_BYTES: u32 = 1 << 20;

/// How long either side waits for the daemon to answer a command.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(100);

pub fn encode_request(action: &ActionWithServer) -> Result<Vec<u8>> {
    let payload = bincode::serialize(action).context("Failed to encode command")?;
    let byte_count = u32::try_from(payload.len())
        .ok()
        .filter(|count| *count <= MAX_REQUEST_BYTES)
        .with_context(|| format!("Command of {} bytes is too large to send", payload.len()))?;

    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&byte_count.to_be_bytes());
    frame.extend(payload);
    Ok(frame)
}

pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<ActionWithServer> {
    let byte_count = reader.read_u32().await.context("Failed to read the size of an IPC request")?;
    if byte_count > MAX_REQUEST_BYTES {
        bail!("IPC request of {} bytes exceeds the limit of {} bytes", byte_count, MAX_REQUEST_BYTES);
    }
    let mut payload = vec![0u8; byte_count as usize];
    reader.read_exact(&mut payload).await.context("IPC request ended before its announced size")?;
    bincode::deserialize(&payload).context("Failed to parse IPC request")
}

/// An empty answer means the command has nothing to report, which is not a failure.
pub fn decode_response(bytes: &[u8]) -> Result<Option<DaemonResponse>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    bincode::deserialize(bytes).map(Some).context("Failed to parse the daemon's response")
}
