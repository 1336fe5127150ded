use std::{io::IsTerminal, os::unix::io::AsRawFd, path::Path};

use anyhow::{Context, Result};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::{
    app::{App, DaemonCommand},
    application_lifecycle,
    config::{self, IndicatorConfig},
    error_handling_ctx, ipc_server,
    paths::IndicatorPaths,
};

const DEFAULT_LANG: &str = "C";

/// Where the daemon ended up running, seen from the process that launched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launched {
    /// The daemon detached and keeps running on its own.
    InBackground,
    /// The daemon ran in this process and has shut down.
    Finished,
}

/// Start the daemon for a config dir, running `initial` as its first command.
pub fn launch(paths: IndicatorPaths, initial: Option<DaemonCommand>, detach: bool) -> Result<Launched> {
    std::env::set_current_dir(paths.get_config_dir())
        .with_context(|| format!("Failed to change working directory to {}", paths.get_config_dir().display()))?;
    log::info!("Loading paths: {}", &paths);
    let config = load_config(&paths);

    if detach && !detach_from_terminal(paths.get_log_file())? {
        return Ok(Launched::InBackground);
    }
    log::info!("Indicator daemon starting with {} icon(s) and {} feature(s)", config.icons.len(), config.features.len());

    simple_signal::set_handler(&[simple_signal::Signal::Int, simple_signal::Signal::Term], |_| {
        log::info!("Shutting down indicator daemon...");
        application_lifecycle::send_exit();
    });

    let rt = tokio::runtime::Builder::new_current_thread()
        .thread_name("indicator-daemon")
        .enable_all()
        .build()
        .context("Failed to initialize tokio runtime")?;
    rt.block_on(async {
        let (evt_send, evt_recv) = tokio::sync::mpsc::unbounded_channel();
        let lang = std::env::var("LANG").unwrap_or_else(|_| DEFAULT_LANG.to_string());
        let mut app = App::new(&config, evt_send.clone(), lang);
        spawn_ipc_server(&paths, evt_send);
        app.start();
        if let Some(command) = initial {
            app.handle_command(command);
        }
        run_app(&mut app, evt_recv).await;
    });

    crate::print_result_err!("while removing the IPC socket", paths.remove_ipc_socket());
    log::info!("Indicator daemon stopped");
    Ok(Launched::Finished)
}

/// A broken config file is reported, and the daemon starts without icons instead.
fn load_config(paths: &IndicatorPaths) -> IndicatorConfig {
    config::read_from_file(paths.get_config_file()).unwrap_or_else(|err| {
        error_handling_ctx::print_error(err);
        IndicatorConfig::default()
    })
}

fn spawn_ipc_server(paths: &IndicatorPaths, evt_send: UnboundedSender<DaemonCommand>) {
    let socket_path = paths.get_ipc_socket_file().to_path_buf();
    tokio::spawn(async move {
        crate::print_result_err!("while running the IPC server", ipc_server::run_server(evt_send, &socket_path).await);
    });
}

/// Feed commands into the app until it is stopped or the daemon is told to exit, then stop it.
async fn run_app(app: &mut App, mut evt_recv: UnboundedReceiver<DaemonCommand>) {
    crate::loop_select_exiting! {
        Some(command) = evt_recv.recv() => {
            app.handle_command(command);
            if app.is_stopped() || application_lifecycle::is_exiting() {
                break;
            }
        },
        else => break,
    }
    app.stop_application();
}

/// Double fork away from the controlling terminal and send stdout and stderr to the log file.
/// Returns false in the launching process and true in the daemon.
fn detach_from_terminal(log_file: &Path) -> Result<bool> {
    use nix::unistd::{fork, setsid, ForkResult};

    if let ForkResult::Parent { child } = unsafe { fork()? } {
        log::debug!("Daemon is detaching through process {}", child);
        return Ok(false);
    }
    setsid()?;
    if let ForkResult::Parent { .. } = unsafe { fork()? } {
        std::process::exit(0);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Error opening log file {} for writing", log_file.display()))?;
    let outputs = [
        (std::io::stdout().is_terminal(), std::io::stdout().as_raw_fd()),
        (std::io::stderr().is_terminal(), std::io::stderr().as_raw_fd()),
    ];
    for (_, fd) in outputs.into_iter().filter(|(is_terminal, _)| *is_terminal) {
        nix::unistd::dup2(file.as_raw_fd(), fd)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_broken_config_starts_empty() {
        let dir = std::env::temp_dir().join(format!("indicator-server-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = IndicatorPaths::from_config_dir(&dir).unwrap();
        std::fs::write(paths.get_config_file(), r#"{ "icons": [ { "name": "wifi" "#).unwrap();

        assert_eq!(load_config(&paths), IndicatorConfig::default());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
