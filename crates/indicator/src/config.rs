//! The `indicator.json` configuration: which icons exist, and which feature modules drive them.

use std::{collections::HashSet, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use indicator_core::{Area, IconDescriptor, IconKind, IconName};
use serde::{Deserialize, Serialize};

use crate::util;

const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub icons: Vec<IconDefinition>,
    #[serde(default)]
    pub features: Vec<FeatureDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconDefinition {
    pub name: IconName,
    pub area: Area,
    pub priority: i32,
    #[serde(default)]
    pub kind: IconKind,
    pub image: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub always_top: bool,
    pub size: Option<(u32, u32)>,
}

impl IconDefinition {
    pub fn to_descriptor(&self) -> IconDescriptor {
        let mut descriptor = IconDescriptor::new(self.name.clone(), self.area, self.priority).with_kind(self.kind);
        if let Some(image) = &self.image {
            descriptor = descriptor.with_image(util::expand_home(image));
        }
        if let Some(text) = &self.text {
            descriptor = descriptor.with_text(text.clone());
        }
        if let Some((width, height)) = self.size {
            descriptor = descriptor.with_size(width, height);
        }
        if self.always_top {
            descriptor = descriptor.pinned();
        }
        descriptor
    }
}

/// A shell command that is polled periodically, and whose output drives one icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureDefinition {
    pub name: String,
    pub icon: IconName,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    pub command: String,
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl FeatureDefinition {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl IndicatorConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: IndicatorConfig = serde_json::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut icon_names = HashSet::new();
        for icon in &self.icons {
            if !icon_names.insert(icon.name.as_str()) {
                bail!("Icon {} is defined more than once", icon.name);
            }
            if !icon.area.accepts_priority(icon.priority) {
                bail!("Icon {} has priority {}, which the {} area does not accept", icon.name, icon.priority, icon.area);
            }
        }
        let mut feature_names = HashSet::new();
        for feature in &self.features {
            if !feature_names.insert(feature.name.as_str()) {
                bail!("Feature {} is defined more than once", feature.name);
            }
            if !icon_names.contains(feature.icon.as_str()) {
                bail!("Feature {} refers to icon {}, which is not defined", feature.name, feature.icon);
            }
            if feature.interval_ms == 0 {
                bail!("Feature {} needs an interval_ms greater than 0", feature.name);
            }
        }
        Ok(())
    }
}

/// Read the configuration file. A config dir without a configuration file yields the empty configuration.
pub fn read_from_file(path: impl AsRef<Path>) -> Result<IndicatorConfig> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!("No configuration at {}, starting without any icons", path.display());
        return Ok(IndicatorConfig::default());
    }
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    IndicatorConfig::parse(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
}
