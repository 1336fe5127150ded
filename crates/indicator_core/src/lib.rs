//! Slot allocation for the icons of an indicator strip.
//!
//! Icons live in one of seven areas. Which of them are actually on screen is decided by
//! [`IndicatorState`], based on priorities, the capacity of each area and the occupancy of the
//! shared areas. Rendering goes through the [`Toolkit`] trait.

pub mod arena;
pub mod capacity;
pub mod error;
pub mod icon;
pub mod lifecycle;
pub mod list;
pub mod slot_box;
pub mod state;
pub mod toolkit;
pub mod wrappers;

pub use arena::{IconArena, IconHandle};
pub use capacity::Occupancy;
pub use error::{Error, Result};
pub use icon::*;
pub use slot_box::AdmitDecision;
pub use state::IndicatorState;
pub use toolkit::{ContainerHandle, ObjectHandle, RecordingToolkit, TimerId, Toolkit, ToolkitCall};
pub use wrappers::*;
