//! Feature modules: the producers that decide when their icons are shown, animated or updated.
//!
//! Every module is driven through the same lifecycle. The app calls `init` once at start-up,
//! forwards language changes and wake-up requests to all modules, and calls `fini` on shutdown.
//! Modules never touch the indicator state directly; they send `DaemonCommand`s to the app.

pub mod script;

use anyhow::Result;
use itertools::Itertools;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::DaemonCommand;

pub use script::ScriptFeature;

/// What a feature module gets to work with on start-up.
#[derive(Debug, Clone)]
pub struct FeatureContext {
    pub evt_send: UnboundedSender<DaemonCommand>,
    pub lang: String,
}

pub trait FeatureModule: std::fmt::Debug {
    fn name(&self) -> &str;
    fn init(&mut self, ctx: &FeatureContext) -> Result<()>;
    fn fini(&mut self);
    fn lang_changed(&mut self, lang: &str);
    fn wake_up(&mut self);
}

#[derive(Debug, Default)]
pub struct FeatureRegistry {
    features: Vec<Box<dyn FeatureModule>>,
}

impl FeatureRegistry {
    pub fn register(&mut self, feature: Box<dyn FeatureModule>) {
        self.features.push(feature);
    }

    /// Initialize every module. A module that fails to start is logged and dropped, the rest keep going.
    pub fn init_all(&mut self, ctx: &FeatureContext) {
        self.features.retain_mut(|feature| match feature.init(ctx) {
            Ok(()) => {
                log::debug!("Initialized feature {}", feature.name());
                true
            }
            Err(err) => {
                log::error!("Failed to initialize feature {}: {:?}", feature.name(), err);
                false
            }
        });
    }

    pub fn fini_all(&mut self) {
        for feature in self.features.iter_mut() {
            feature.fini();
        }
    }

    pub fn lang_changed(&mut self, lang: &str) {
        for feature in self.features.iter_mut() {
            feature.lang_changed(lang);
        }
    }

    pub fn wake_up(&mut self) {
        for feature in self.features.iter_mut() {
            feature.wake_up();
        }
    }

    pub fn names(&self) -> String {
        self.features.iter().map(|feature| feature.name()).join(", ")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
