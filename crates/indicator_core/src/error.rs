use thiserror::Error;

use crate::{arena::IconHandle, icon::IconKind, wrappers::IconName, Area};

#[derive(Error, Debug)]
pub enum Error {
    #[error("An icon named {0} is already registered")]
    DuplicateIcon(IconName),
    #[error("{0} does not refer to a registered icon")]
    InvalidHandle(IconHandle),
    #[error("Priority {priority} is out of range for the {area} area")]
    InvalidPriority { area: Area, priority: i32 },
    #[error("Icon {name} of kind {kind} has no {missing} to display")]
    MissingPayload { name: IconName, kind: IconKind, missing: &'static str },
    #[error("Failed to create widget: {0}")]
    WidgetCreation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
