use clap::{Parser, Subcommand};
use indicator_core::{AnimationKind, IconName};
use serde::{Deserialize, Serialize};

use crate::{
    app::{self, DaemonCommand, IconAction},
    daemon_response::{DaemonResponse, DaemonResponseReceiver, DaemonResponseSender},
};

/// Struct that gets generated from `RawOpt`.
#[derive(Debug, PartialEq)]
pub struct Opt {
    pub log_debug: bool,
    pub show_logs: bool,
    pub restart: bool,
    pub config_path: Option<std::path::PathBuf>,
    pub action: Action,
    pub no_daemonize: bool,
}

#[derive(Parser, Debug, PartialEq)]
#[command(version, about)]
pub(super) struct RawOpt {
    /// Write out debug logs. (To read the logs, run `indicator logs`).
    #[arg(long = "debug", global = true)]
    log_debug: bool,

    /// Override the path to the configuration directory (directory that contains indicator.json)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Watch the log output after executing the command
    #[arg(long = "logs", global = true)]
    show_logs: bool,

    /// Avoid daemonizing the daemon process
    #[arg(long = "no-daemonize", global = true)]
    no_daemonize: bool,

    /// Restart the daemon completely before running the command
    #[arg(long = "restart", global = true)]
    restart: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Action {
    /// Generate a shell completion script
    ShellCompletions {
        #[arg(short, long)]
        shell: clap_complete::shells::Shell,
    },

    /// Start the indicator daemon.
    #[command(name = "daemon", alias = "d")]
    Daemon,

    #[command(flatten)]
    ClientOnly(ActionClientOnly),

    #[command(flatten)]
    WithServer(ActionWithServer),
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ActionClientOnly {
    /// Print and watch the indicator logs
    #[command(name = "logs")]
    Logs,
}

#[derive(Subcommand, Debug, Serialize, Deserialize, PartialEq)]
pub enum ActionWithServer {
    /// Ping the indicator daemon, checking if it is reachable.
    #[command(name = "ping")]
    Ping,

    /// Kill the indicator daemon
    #[command(name = "kill", alias = "k")]
    KillServer,

    /// Ask for an icon to be shown. It stays pending if its area has no free slot for it.
    #[command(name = "show", alias = "s")]
    Show { icon: IconName },

    /// Hide an icon, giving up its slot
    #[command(name = "hide", alias = "h")]
    Hide { icon: IconName },

    /// Start an animation on an icon. `none` stops it.
    #[command(name = "animate", alias = "a")]
    Animate { icon: IconName, kind: AnimationKind },

    /// Change the text and/or image of an icon
    #[command(name = "update", alias = "u")]
    Update {
        icon: IconName,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        image: Option<String>,
    },

    /// Change the priority of an icon. Lower values are more important.
    #[command(name = "priority", alias = "p")]
    SetPriority {
        icon: IconName,
        #[arg(allow_negative_numbers = true)]
        priority: i32,
    },

    /// Re-run slot allocation and re-render every area
    #[command(name = "refresh", alias = "r")]
    Refresh,

    /// Print the visible and pending icons of every area
    #[command(name = "state")]
    ShowState,

    /// Make every feature module poll right away
    #[command(name = "wake-up")]
    WakeUp,

    /// Tell the feature modules that the display language changed
    #[command(name = "lang")]
    Lang { lang: String },
}

impl Opt {
    pub fn from_env() -> Self {
        let raw: RawOpt = RawOpt::parse();
        raw.into()
    }
}

impl From<RawOpt> for Opt {
    fn from(other: RawOpt) -> Self {
        let RawOpt { log_debug, config, show_logs, no_daemonize, restart, action } = other;
        Opt { log_debug, show_logs, restart, config_path: config, action, no_daemonize }
    }
}

impl ActionWithServer {
    pub fn can_start_daemon(&self) -> bool {
        !matches!(self, ActionWithServer::Ping | ActionWithServer::KillServer)
    }

    pub fn into_daemon_command(self) -> (DaemonCommand, Option<DaemonResponseReceiver>) {
        let command = match self {
            ActionWithServer::Ping => {
                let (sender, recv) = DaemonResponseSender::channel();
                crate::print_result_err!("while answering a ping", sender.send(DaemonResponse::Success("pong".to_owned())));
                return (DaemonCommand::NoOp, Some(recv));
            }
            ActionWithServer::KillServer => DaemonCommand::KillServer,
            ActionWithServer::WakeUp => DaemonCommand::WakeUp,
            ActionWithServer::Lang { lang } => DaemonCommand::LangChanged(lang),
            ActionWithServer::Show { icon } => return icon_command(icon, IconAction::Show),
            ActionWithServer::Hide { icon } => return icon_command(icon, IconAction::Hide),
            ActionWithServer::Animate { icon, kind } => return icon_command(icon, IconAction::Animate(kind)),
            ActionWithServer::Update { icon, text, image } => return icon_command(icon, IconAction::Update { text, image }),
            ActionWithServer::SetPriority { icon, priority } => {
                return icon_command(icon, IconAction::SetPriority(priority))
            }
            ActionWithServer::Refresh => return with_response_channel(DaemonCommand::RefreshDisplay),
            ActionWithServer::ShowState => return with_response_channel(DaemonCommand::PrintState),
        };
        (command, None)
    }
}

fn icon_command(name: IconName, action: IconAction) -> (DaemonCommand, Option<DaemonResponseReceiver>) {
    with_response_channel(|sender| app::DaemonCommand::Icon { name, action, sender: Some(sender) })
}

fn with_response_channel<O, F>(f: F) -> (O, Option<DaemonResponseReceiver>)
where
    F: FnOnce(DaemonResponseSender) -> O,
{
    let (sender, recv) = DaemonResponseSender::channel();
    (f(sender), Some(recv))
}
