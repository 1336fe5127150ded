use std::path::Path;

use anyhow::{Context, Result};
use tokio::{io::AsyncWriteExt, net::UnixStream, sync::mpsc::UnboundedSender};

use crate::{app::DaemonCommand, wire};

/// Accept clients on the IPC socket until the daemon exits, serving each on its own task.
pub async fn run_server(evt_send: UnboundedSender<DaemonCommand>, socket_path: &Path) -> Result<()> {
    let listener = tokio::net::UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind IPC socket {}", socket_path.display()))?;
    log::info!("Listening for commands on {}", socket_path.display());

    crate::loop_select_exiting! {
        connection = listener.accept() => match connection {
            Ok((stream, _addr)) => {
                tokio::spawn(serve_client(stream, evt_send.clone()));
            }
            Err(err) => log::warn!("Failed to accept IPC client: {}", err),
        }
    }
    Ok(())
}

async fn serve_client(mut stream: UnixStream, evt_send: UnboundedSender<DaemonCommand>) {
    crate::print_result_err!("while serving an IPC client", forward_request(&mut stream, &evt_send).await);
    // the client reads its answer up to the end of the stream
    crate::print_result_err!("while closing an IPC connection", stream.shutdown().await);
}

/// Hand one request to the app and write back its answer, if it gives one in time.
async fn forward_request(stream: &mut UnixStream, evt_send: &UnboundedSender<DaemonCommand>) -> Result<()> {
    let action = wire::read_request(stream).await?;
    log::debug!("IPC request: {:?}", action);

    let (command, response_recv) = action.into_daemon_command();
    evt_send.send(command).context("The daemon stopped taking commands")?;
    let Some(mut response_recv) = response_recv else {
        return Ok(());
    };

    match tokio::time::timeout(wire::RESPONSE_TIMEOUT, response_recv.recv()).await {
        Ok(Some(response)) => {
            let answer = bincode::serialize(&response).context("Failed to encode response")?;
            stream.write_all(&answer).await.context("Failed to send response to IPC client")?;
        }
        Ok(None) => log::debug!("Command finished without an answer"),
        Err(_) => log::warn!("The daemon did not answer within {:?}", wire::RESPONSE_TIMEOUT),
    }
    Ok(())
}
