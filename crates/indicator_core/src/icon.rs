use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{
    toolkit::{ObjectHandle, TimerId},
    wrappers::IconName,
};

/// Number of fixed slots. Fixed icons use their priority as the slot index.
pub const FIXED_SLOT_COUNT: usize = 11;

/// Icon that is always kept at the head of the notification registry.
pub const MORE_NOTIFICATION_ICON: &str = "more_notify";

/// Interval between two frames of a downloading / uploading animation.
pub const ANIMATION_FRAME_INTERVAL: Duration = Duration::from_millis(300);

/// Number of frames a downloading / uploading animation cycles through.
pub const ANIMATION_FRAME_COUNT: u32 = 7;

/// The region of the indicator strip an icon is displayed in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Area {
    Fixed,
    System,
    MiniControl,
    Notification,
    ConnectionSystem,
    Alarm,
    MoreNotification,
}

impl Area {
    pub const COUNT: usize = 7;

    pub const ALL: [Area; Area::COUNT] = [
        Area::Fixed,
        Area::System,
        Area::MiniControl,
        Area::Notification,
        Area::ConnectionSystem,
        Area::Alarm,
        Area::MoreNotification,
    ];

    pub fn index(self) -> usize {
        match self {
            Area::Fixed => 0,
            Area::System => 1,
            Area::MiniControl => 2,
            Area::Notification => 3,
            Area::ConnectionSystem => 4,
            Area::Alarm => 5,
            Area::MoreNotification => 6,
        }
    }

    /// Whether the capacity of this area depends on the occupancy of the other areas.
    pub fn is_dynamic(self) -> bool {
        matches!(self, Area::System | Area::MiniControl | Area::Notification)
    }

    /// Check whether the given priority is usable in this area.
    pub fn accepts_priority(self, priority: i32) -> bool {
        match self {
            Area::Fixed => usize::try_from(priority).map_or(false, |p| p < FIXED_SLOT_COUNT),
            _ => true,
        }
    }
}

/// A value for every [`Area`], indexable by the area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerArea<T>([T; Area::COUNT]);

impl<T> PerArea<T> {
    pub fn from_fn(mut f: impl FnMut(Area) -> T) -> Self {
        PerArea(std::array::from_fn(|i| f(Area::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Area, &T)> {
        Area::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Default> Default for PerArea<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> std::ops::Index<Area> for PerArea<T> {
    type Output = T;

    fn index(&self, area: Area) -> &T {
        &self.0[area.index()]
    }
}

impl<T> std::ops::IndexMut<Area> for PerArea<T> {
    fn index_mut(&mut self, area: Area) -> &mut T {
        &mut self.0[area.index()]
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IconKind {
    #[default]
    Image,
    Text,
    TextWithImage,
    Digit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconPayload {
    pub image: Option<String>,
    pub text: Option<String>,
}

impl IconPayload {
    pub fn image(path: impl Into<String>) -> Self {
        IconPayload { image: Some(path.into()), text: None }
    }

    pub fn text(text: impl Into<String>) -> Self {
        IconPayload { image: None, text: Some(text.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHint {
    pub width: u32,
    pub height: u32,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnimationKind {
    #[default]
    None,
    Blink,
    Rotate,
    Metronome,
    Downloading,
    Uploading,
}

impl AnimationKind {
    /// Downloading and uploading cycle through frames on a timer,
    /// every other animation is played back by the toolkit itself.
    pub fn is_frame_based(self) -> bool {
        matches!(self, AnimationKind::Downloading | AnimationKind::Uploading)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationState {
    pub kind: AnimationKind,
    pub frame: u32,
    pub last_frame: Option<Instant>,
    /// Repeating frame timer, owned exclusively by the icon while animating.
    pub timer: Option<TimerId>,
}

impl AnimationState {
    pub fn is_active(&self) -> bool {
        self.kind != AnimationKind::None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub enum LifecycleState {
    #[default]
    Hidden,
    Materializing,
    Shown,
    Disposing,
}

/// A single status icon: identity, placement, and the transient state the allocator keeps for it.
#[derive(Debug, Clone, PartialEq)]
pub struct IconDescriptor {
    pub name: IconName,
    pub kind: IconKind,
    pub area: Area,
    /// Lower values take precedence.
    pub priority: i32,
    /// Pinned icons can't be evicted by competitors of the same priority.
    pub always_top: bool,
    pub payload: IconPayload,
    pub size_hint: Option<SizeHint>,
    pub(crate) wish_to_show: bool,
    pub(crate) exist_in_view: bool,
    pub(crate) object: Option<ObjectHandle>,
    pub(crate) lifecycle: LifecycleState,
    pub(crate) animation: AnimationState,
}

impl IconDescriptor {
    pub fn new(name: impl Into<IconName>, area: Area, priority: i32) -> Self {
        IconDescriptor {
            name: name.into(),
            kind: IconKind::Image,
            area,
            priority,
            always_top: false,
            payload: IconPayload::default(),
            size_hint: None,
            wish_to_show: false,
            exist_in_view: false,
            object: None,
            lifecycle: LifecycleState::Hidden,
            animation: AnimationState::default(),
        }
    }

    pub fn with_kind(mut self, kind: IconKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_image(mut self, path: impl Into<String>) -> Self {
        self.payload.image = Some(path.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.payload.text = Some(text.into());
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size_hint = Some(SizeHint { width, height });
        self
    }

    pub fn pinned(mut self) -> Self {
        self.always_top = true;
        self
    }

    /// Whether the owner of this icon wants it visible.
    pub fn wish_to_show(&self) -> bool {
        self.wish_to_show
    }

    /// Whether this icon currently occupies a slot in its area's view list.
    pub fn exist_in_view(&self) -> bool {
        self.exist_in_view
    }

    /// Whether an on-screen object is currently allocated for this icon.
    pub fn obj_exists(&self) -> bool {
        self.object.is_some()
    }

    pub fn object(&self) -> Option<ObjectHandle> {
        self.object
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.wish_to_show && !self.exist_in_view
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.wish_to_show && self.exist_in_view
    }

    pub(crate) fn is_reserved_head(&self) -> bool {
        self.area == Area::Notification && self.name.as_str() == MORE_NOTIFICATION_ICON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use std::str::FromStr;

    #[test]
    fn test_area_index_matches_all() {
        for (i, area) in Area::ALL.iter().enumerate() {
            assert_eq!(area.index(), i);
        }
    }

    #[test]
    fn test_fixed_priority_range() {
        assert!(Area::Fixed.accepts_priority(0));
        assert!(Area::Fixed.accepts_priority(10));
        assert!(!Area::Fixed.accepts_priority(11));
        assert!(!Area::Fixed.accepts_priority(-1));
        assert!(Area::System.accepts_priority(-1));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Area::from_str("mini_control").unwrap(), Area::MiniControl);
        assert_eq!(AnimationKind::from_str("downloading").unwrap(), AnimationKind::Downloading);
        assert_eq!(IconKind::from_str("text_with_image").unwrap(), IconKind::TextWithImage);
        assert!(Area::from_str("somewhere").is_err());
    }

    #[test]
    fn test_area_names_round_trip() {
        let names = hashmap! {
            "fixed" => Area::Fixed,
            "system" => Area::System,
            "mini_control" => Area::MiniControl,
            "notification" => Area::Notification,
            "connection_system" => Area::ConnectionSystem,
            "alarm" => Area::Alarm,
            "more_notification" => Area::MoreNotification,
        };
        assert_eq!(names.len(), Area::COUNT);
        for (name, area) in names {
            assert_eq!(area.to_string(), name);
            assert_eq!(Area::from_str(name).unwrap(), area);
        }
    }
}
