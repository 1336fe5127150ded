use std::time::Instant;

use anyhow::{bail, Context, Result};
use indicator_core::{AnimationKind, IconName, IndicatorState, TimerId, Toolkit};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    config::IndicatorConfig,
    daemon_response::{DaemonResponse, DaemonResponseSender},
    display_backend::HeadlessToolkit,
    error_handling_ctx,
    features::{FeatureContext, FeatureRegistry, ScriptFeature},
};

/// What a client or a feature module wants done to a single icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconAction {
    Show,
    Hide,
    Animate(AnimationKind),
    /// Replace the text and/or image, keeping whatever isn't given.
    Update {
        text: Option<String>,
        image: Option<String>,
    },
    SetPriority(i32),
}

#[derive(Debug)]
pub enum DaemonCommand {
    NoOp,
    Icon {
        name: IconName,
        action: IconAction,
        sender: Option<DaemonResponseSender>,
    },
    RefreshDisplay(DaemonResponseSender),
    AnimationTick(TimerId),
    WakeUp,
    LangChanged(String),
    PrintState(DaemonResponseSender),
    KillServer,
}

/// Owns the indicator state. Every change to it goes through [`App::handle_command`],
/// which only ever runs on the daemon's event loop.
#[derive(Debug)]
pub struct App {
    pub state: IndicatorState<HeadlessToolkit>,
    pub features: FeatureRegistry,
    pub app_evt_send: UnboundedSender<DaemonCommand>,
    pub lang: String,
    stopped: bool,
}

impl App {
    pub fn new(config: &IndicatorConfig, app_evt_send: UnboundedSender<DaemonCommand>, lang: String) -> Self {
        let mut state = IndicatorState::new(HeadlessToolkit::new(app_evt_send.clone()));
        for icon in &config.icons {
            crate::print_result_err!("while registering an icon", state.register_icon(icon.to_descriptor()));
        }

        let mut features = FeatureRegistry::default();
        for definition in &config.features {
            features.register(Box::new(ScriptFeature::new(definition.clone())));
        }
        App { state, features, app_evt_send, lang, stopped: false }
    }

    /// Start the feature modules. Has to be called from within the tokio runtime.
    pub fn start(&mut self) {
        let ctx = FeatureContext { evt_send: self.app_evt_send.clone(), lang: self.lang.clone() };
        if self.features.is_empty() {
            log::info!("No feature modules configured, icons only change on request");
            return;
        }
        self.features.init_all(&ctx);
        log::info!("Started {} feature module(s): {}", self.features.len(), self.features.names());
    }

    /// Handle a DaemonCommand event.
    pub fn handle_command(&mut self, event: DaemonCommand) {
        if !matches!(event, DaemonCommand::AnimationTick(_)) {
            log::debug!("Handling event: {:?}", &event);
        }
        if let Err(err) = self.try_handle_command(event) {
            error_handling_ctx::print_error(err);
        }
    }

    fn try_handle_command(&mut self, event: DaemonCommand) -> Result<()> {
        match event {
            DaemonCommand::NoOp => {}
            DaemonCommand::Icon { name, action, sender } => {
                let result = self.apply_icon_action(&name, action);
                match sender {
                    Some(sender) => sender.send(result)?,
                    // nobody is waiting for the outcome, so failures only go to the log
                    None => {
                        result?;
                    }
                }
            }
            DaemonCommand::RefreshDisplay(sender) => {
                self.state.update_display();
                sender.send(DaemonResponse::Success(String::new()))?;
            }
            DaemonCommand::AnimationTick(timer) => {
                if !self.state.animation_tick(timer, Instant::now()) {
                    self.state.toolkit_mut().cancel_timer(timer);
                }
            }
            DaemonCommand::WakeUp => {
                log::info!("Waking up {} feature module(s)", self.features.len());
                self.features.wake_up();
            }
            DaemonCommand::LangChanged(lang) => {
                log::info!("Language changed to {}", lang);
                self.features.lang_changed(&lang);
                self.lang = lang;
            }
            DaemonCommand::PrintState(sender) => {
                sender.send(DaemonResponse::Success(self.state.describe()))?;
            }
            DaemonCommand::KillServer => {
                log::info!("Received kill command, stopping server!");
                self.stop_application();
                crate::application_lifecycle::send_exit();
            }
        }
        Ok(())
    }

    /// Apply an action to the icon with the given name, returning a message for the client.
    fn apply_icon_action(&mut self, name: &IconName, action: IconAction) -> Result<String> {
        let handle = self.state.handle_by_name(name.as_str()).with_context(|| format!("There is no icon named {}", name))?;
        let icon = self.state.try_icon(handle)?;
        let area = icon.area;

        let message = match action {
            IconAction::Show => {
                if self.state.icon_show(handle) {
                    format!("{} is shown", name)
                } else {
                    format!("{} is waiting for a free slot in the {} area", name, area)
                }
            }
            IconAction::Hide => {
                self.state.icon_hide(handle);
                String::new()
            }
            IconAction::Animate(kind) => {
                self.state.icon_set_animation(handle, kind);
                String::new()
            }
            IconAction::Update { text, image } => {
                if text.is_none() && image.is_none() {
                    bail!("Nothing to update for {}, give a text or an image", name);
                }
                let mut payload = icon.payload.clone();
                payload.text = text.or(payload.text);
                payload.image = image.or(payload.image);
                self.state.icon_update(handle, payload);
                String::new()
            }
            IconAction::SetPriority(priority) => {
                if !self.state.icon_set_priority(handle, priority) {
                    bail!("Priority {} is out of range for the {} area", priority, area);
                }
                String::new()
            }
        };
        Ok(message)
    }

    /// Stop the feature modules and take every icon off screen.
    pub fn stop_application(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.features.fini_all();
        let handles: Vec<_> = self.state.icons().map(|(handle, _)| handle).collect();
        for handle in handles {
            self.state.unregister_icon(handle);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
