use std::time::Duration;

use anyhow::{Context, Result};
use clap::CommandFactory as _;

use crate::{
    app::DaemonCommand,
    client::DaemonClient,
    daemon_response::DaemonResponse,
    opts::{Action, ActionWithServer, Opt},
    paths::IndicatorPaths,
    server::Launched,
};

mod app;
mod application_lifecycle;
mod client;
mod config;
mod daemon_response;
mod display_backend;
mod error_handling_ctx;
mod features;
mod ipc_server;
mod opts;
mod paths;
mod server;
mod util;
mod wire;

/// How often a command pings the daemon before concluding that none is running.
const CONNECT_ATTEMPTS: usize = 5;

fn main() {
    let opts = Opt::from_env();
    init_logger(opts.log_debug);

    if let Action::ShellCompletions { shell } = opts.action {
        clap_complete::generate(shell, &mut opts::RawOpt::command(), "indicator", &mut std::io::stdout());
        return;
    }

    if let Err(err) = run(opts) {
        error_handling_ctx::print_error(err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over `--debug` when it is set.
fn init_logger(debug: bool) {
    if std::env::var("RUST_LOG").is_ok() {
        pretty_env_logger::init_timed();
        return;
    }
    let level = if debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    pretty_env_logger::formatted_timed_builder().filter(Some("indicator"), level).filter(Some("indicator_core"), level).init();
}

fn run(opts: Opt) -> Result<()> {
    let paths = match &opts.config_path {
        Some(config_dir) => IndicatorPaths::from_config_dir(config_dir),
        None => IndicatorPaths::default(),
    }
    .context("Failed to initialize indicator paths")?;

    let restarts = match &opts.action {
        Action::Daemon => true,
        Action::WithServer(action) => action.can_start_daemon(),
        Action::ShellCompletions { .. } | Action::ClientOnly(_) => false,
    };
    if opts.restart && restarts {
        stop_running_daemon(&paths)?;
    }

    let follow_logs = match opts.action {
        Action::ShellCompletions { .. } => false,
        Action::ClientOnly(action) => {
            client::handle_client_only_action(&paths, action)?;
            false
        }
        Action::Daemon if DaemonClient::is_running(&paths) => {
            eprintln!("An indicator daemon is already running for {}", paths.get_config_dir().display());
            true
        }
        Action::Daemon => launch_daemon(&paths, None, !opts.no_daemonize, opts.show_logs)? == Launched::InBackground,
        Action::WithServer(ActionWithServer::KillServer) => {
            if let Some(response) = DaemonClient::connect(&paths, 1)?.request(&ActionWithServer::KillServer)? {
                print_response(response);
            }
            false
        }
        Action::WithServer(action) => forward_to_daemon(&paths, action, !opts.no_daemonize, opts.show_logs)?,
    };

    if follow_logs && opts.show_logs {
        client::follow_logs(&paths)?;
    }
    Ok(())
}

/// Send a command to the daemon of this config dir. Without a daemon, one is started that
/// runs the command first, if the command allows it.
fn forward_to_daemon(paths: &IndicatorPaths, action: ActionWithServer, autostart: bool, show_logs: bool) -> Result<bool> {
    match DaemonClient::connect(paths, CONNECT_ATTEMPTS) {
        Ok(client) => {
            if let Some(response) = client.request(&action)? {
                print_response(response);
            }
            Ok(true)
        }
        Err(err) if autostart && action.can_start_daemon() => {
            log::warn!("{:#}, starting one", err);
            let (command, _) = action.into_daemon_command();
            Ok(launch_daemon(paths, Some(command), true, show_logs)? == Launched::InBackground)
        }
        Err(err) => Err(err),
    }
}

fn launch_daemon(paths: &IndicatorPaths, initial: Option<DaemonCommand>, detach: bool, show_logs: bool) -> Result<Launched> {
    log::info!("Initializing indicator daemon ({})", paths.get_ipc_socket_file().display());
    paths.remove_ipc_socket()?;
    if detach && !show_logs {
        println!("The daemon logs to {}, run `indicator logs` to follow it.", paths.get_log_file().display());
    }
    server::launch(paths.clone(), initial, detach)
}

fn stop_running_daemon(paths: &IndicatorPaths) -> Result<()> {
    match DaemonClient::connect(paths, 1) {
        Ok(client) => {
            if let Some(response) = client.request(&ActionWithServer::KillServer)? {
                print_response(response);
            }
            // give the old daemon time to let go of its socket
            std::thread::sleep(Duration::from_millis(200));
        }
        Err(err) => log::debug!("Nothing to restart: {:#}", err),
    }
    Ok(())
}

fn print_response(response: DaemonResponse) {
    if response.is_failure() {
        eprintln!("{}", response);
        std::process::exit(1);
    }
    let message = response.to_string();
    if !message.is_empty() {
        println!("{}", message);
    }
}
