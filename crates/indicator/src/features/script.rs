use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use indicator_core::AnimationKind;
use tokio::sync::{mpsc::UnboundedSender, watch, Notify};
use tokio_util::sync::CancellationToken;

use super::{FeatureContext, FeatureModule};
use crate::{
    app::{DaemonCommand, IconAction},
    config::FeatureDefinition,
};

/// A feature module backed by a shell command.
///
/// The command runs every `interval_ms`, on a wake-up request and whenever the language changes.
/// Each line it prints is one instruction for the feature's icon:
/// `show`, `hide`, `animate <kind>`, `text <text>` or `image <path>`.
#[derive(Debug)]
pub struct ScriptFeature {
    definition: FeatureDefinition,
    cancellation_token: Option<CancellationToken>,
    wake: Arc<Notify>,
    lang_send: Option<watch::Sender<String>>,
}

impl ScriptFeature {
    pub fn new(definition: FeatureDefinition) -> Self {
        ScriptFeature { definition, cancellation_token: None, wake: Arc::new(Notify::new()), lang_send: None }
    }
}

impl FeatureModule for ScriptFeature {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn init(&mut self, ctx: &FeatureContext) -> Result<()> {
        if self.cancellation_token.is_some() {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current().context("Script features need a running tokio runtime")?;

        log::debug!("starting script feature {}", self.definition.name);
        let cancellation_token = CancellationToken::new();
        let (lang_send, mut lang_recv) = watch::channel(ctx.lang.clone());
        self.cancellation_token = Some(cancellation_token.clone());
        self.lang_send = Some(lang_send);

        let definition = self.definition.clone();
        let evt_send = ctx.evt_send.clone();
        let wake = self.wake.clone();
        runtime.spawn(async move {
            let lang = lang_recv.borrow().clone();
            crate::print_result_err!("while polling a feature script", run_poll_once(&definition, &lang, &evt_send).await);

            crate::loop_select_exiting! {
                _ = cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(definition.interval()) => {
                    let lang = lang_recv.borrow().clone();
                    crate::print_result_err!("while polling a feature script", run_poll_once(&definition, &lang, &evt_send).await);
                }
                _ = wake.notified() => {
                    let lang = lang_recv.borrow().clone();
                    crate::print_result_err!("while polling a feature script", run_poll_once(&definition, &lang, &evt_send).await);
                }
                Ok(()) = lang_recv.changed() => {
                    let lang = lang_recv.borrow_and_update().clone();
                    crate::print_result_err!("while polling a feature script", run_poll_once(&definition, &lang, &evt_send).await);
                }
            }
        });
        Ok(())
    }

    fn fini(&mut self) {
        if let Some(token) = self.cancellation_token.take() {
            log::debug!("stopped script feature {}", self.definition.name);
            token.cancel();
        }
        self.lang_send = None;
    }

    fn lang_changed(&mut self, lang: &str) {
        if let Some(lang_send) = &self.lang_send {
            lang_send.send_replace(lang.to_string());
        }
    }

    fn wake_up(&mut self) {
        self.wake.notify_one();
    }
}

/// Run the feature command once, forwarding every instruction it prints to the app.
async fn run_poll_once(definition: &FeatureDefinition, lang: &str, evt_send: &UnboundedSender<DaemonCommand>) -> Result<()> {
    log::debug!("Running command of feature {}: {}", definition.name, definition.command);
    let output = tokio::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(&definition.command)
        .env("LANG", lang)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to run the command of feature {}", definition.name))?;
    if !output.status.success() {
        bail!("Execution of `{}` failed with {}", definition.command, output.status);
    }

    let stdout = String::from_utf8(output.stdout).context("Feature command printed invalid utf-8")?;
    for line in stdout.lines() {
        match parse_feature_line(line) {
            Ok(Some(action)) => {
                evt_send.send(DaemonCommand::Icon { name: definition.icon.clone(), action, sender: None })?;
            }
            Ok(None) => {}
            Err(err) => log::warn!("Feature {} printed an unknown instruction: {}", definition.name, err),
        }
    }
    Ok(())
}

/// Parse one output line of a feature command. Blank lines are no instruction.
pub fn parse_feature_line(line: &str) -> Result<Option<IconAction>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (instruction, argument) = match line.split_once(char::is_whitespace) {
        Some((instruction, argument)) => (instruction, Some(argument.trim())),
        None => (line, None),
    };
    let action = match (instruction, argument) {
        ("show", None) => IconAction::Show,
        ("hide", None) => IconAction::Hide,
        ("animate", Some(kind)) => {
            IconAction::Animate(kind.parse::<AnimationKind>().map_err(|_| anyhow!("unknown animation `{}`", kind))?)
        }
        ("text", Some(text)) => IconAction::Update { text: Some(text.to_string()), image: None },
        ("image", Some(path)) => IconAction::Update { text: None, image: Some(crate::util::expand_home(path)) },
        ("priority", Some(priority)) => {
            IconAction::SetPriority(priority.parse().with_context(|| format!("invalid priority `{}`", priority))?)
        }
        _ => bail!("`{}`", line),
    };
    Ok(Some(action))
}
