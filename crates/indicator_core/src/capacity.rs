//! Slot budgets of the indicator areas.
//!
//! The system, mini-control and notification areas share one strip, so each of their capacities
//! depends on how many icons the other two currently show. Nothing here is cached: every check
//! recomputes the budgets from the live view occupancy.

use crate::icon::{Area, FIXED_SLOT_COUNT};

pub const FIXED_SYSTEM_MAX: usize = 5;
pub const FIXED_MINICTRL_BASE: usize = 2;
pub const MAX_NOTI_ICONS: usize = 7;
pub const SINGLE_SLOT_CAPACITY: usize = 1;

/// Number of icons currently shown in each of the areas sharing the strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Occupancy {
    pub system: usize,
    pub minictrl: usize,
    pub notification: usize,
}

pub fn enabled_system_count(occupancy: Occupancy) -> usize {
    let mut count = FIXED_SYSTEM_MAX;
    // notification and mini-control icons always keep at least one slot each
    if occupancy.notification > 0 {
        count -= 1;
    }
    if occupancy.minictrl > 0 {
        count -= 1;
    }
    count
}

pub fn enabled_minictrl_count(occupancy: Occupancy) -> usize {
    let system = occupancy.system;
    let (shrink_at, grow_at) = if occupancy.notification > 0 { (3, 1) } else { (4, 2) };
    if system >= shrink_at {
        FIXED_MINICTRL_BASE - 1
    } else if system <= grow_at {
        FIXED_MINICTRL_BASE + 1
    } else {
        FIXED_MINICTRL_BASE
    }
}

pub fn enabled_notification_count(occupancy: Occupancy) -> usize {
    MAX_NOTI_ICONS.saturating_sub(occupancy.system + occupancy.minictrl).max(1)
}

pub fn capacity(area: Area, occupancy: Occupancy) -> usize {
    match area {
        Area::Fixed => FIXED_SLOT_COUNT,
        Area::System => enabled_system_count(occupancy),
        Area::MiniControl => enabled_minictrl_count(occupancy),
        Area::Notification => enabled_notification_count(occupancy),
        Area::ConnectionSystem | Area::Alarm | Area::MoreNotification => SINGLE_SLOT_CAPACITY,
    }
}
